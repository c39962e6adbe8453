//! Private Data Subfield (PDS) sub-codec.
//!
//! Container fields carry a concatenation of sub-records: a 4-digit
//! decimal tag, a 3-digit decimal length, then that many characters.
//! Decoded subfields surface as `PDS<nnnn>` keys next to the raw
//! container value; on encode the keys are re-assembled in ascending
//! tag order and spilt across the configured container fields in
//! chunks of at most 999 characters.

use log::debug;

use crate::error::Error;
use crate::value::{Record, Value};

/// Maximum characters a single container field can carry.
const CONTAINER_CAPACITY: usize = 999;

/// Walk a container payload, returning `(tag, value)` pairs in wire
/// order.
pub fn decode(bit: u32, payload: &str) -> Result<Vec<(u16, String)>, Error> {
    let chars: Vec<char> = payload.chars().collect();
    let mut at = 0;
    let mut subfields = Vec::new();

    while at < chars.len() {
        if at + 7 > chars.len() {
            return Err(Error::pds(
                bit,
                format!("partial tag/length at offset {at}"),
            ));
        }
        let tag = digits(&chars[at..at + 4])
            .ok_or_else(|| Error::pds(bit, format!("non-numeric tag at offset {at}")))?;
        let length = digits(&chars[at + 4..at + 7])
            .ok_or_else(|| Error::pds(bit, format!("non-numeric length at offset {at}")))?
            as usize;
        if at + 7 + length > chars.len() {
            return Err(Error::pds(
                bit,
                format!("tag {tag:04} length {length} overruns the container"),
            ));
        }
        let value: String = chars[at + 7..at + 7 + length].iter().collect();
        debug!("pds tag={tag:04} len={length}");
        subfields.push((tag, value));
        at += 7 + length;
    }
    Ok(subfields)
}

/// Merge decoded subfields into a record as `PDS<nnnn>` keys.
/// Duplicate tags keep the last decoded value.
pub fn project(record: &mut Record, subfields: Vec<(u16, String)>) {
    for (tag, value) in subfields {
        record.insert(format!("PDS{tag:04}"), Value::Text(value));
    }
}

/// Assemble all `PDS*` keys of a record into container payload chunks.
///
/// Tags are emitted in ascending numeric order; a new chunk starts
/// whenever the current one would exceed the container capacity. An
/// empty result means the record carries no subfields.
pub fn assemble(record: &Record) -> Result<Vec<String>, Error> {
    let mut tagged: Vec<(u16, &str)> = Vec::new();
    for (key, value) in record {
        let Some(tag_text) = key.strip_prefix("PDS") else {
            continue;
        };
        // tags must fit the 4-digit wire form
        let Some(tag) = tag_text.parse::<u16>().ok().filter(|&t| t <= 9999) else {
            continue;
        };
        let text = value
            .as_text()
            .ok_or_else(|| Error::pds(0, format!("{key} holds a non-text value")))?;
        tagged.push((tag, text));
    }
    tagged.sort_by_key(|&(tag, _)| tag);

    let mut chunks = Vec::new();
    let mut chunk = String::new();
    for (tag, text) in tagged {
        let length = text.chars().count();
        if length > CONTAINER_CAPACITY {
            return Err(Error::pds(
                0,
                format!("PDS{tag:04} value of {length} characters cannot fit a container"),
            ));
        }
        let entry = format!("{tag:04}{length:03}{text}");
        if chunk.chars().count() + entry.chars().count() > CONTAINER_CAPACITY {
            chunks.push(std::mem::take(&mut chunk));
        }
        chunk.push_str(&entry);
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn digits(chars: &[char]) -> Option<u16> {
    let mut out: u16 = 0;
    for &c in chars {
        out = out.checked_mul(10)?.checked_add(c.to_digit(10)? as u16)?;
    }
    Some(out)
}
