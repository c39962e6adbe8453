//! Whole-message codec.
//!
//! [`MessageCodec`] drives the bitmap, field, PDS and projection layers
//! for a complete message: MTI, bitmap, then each present field in
//! ascending element order. `loads` produces a flat record; `dumps`
//! consumes one. Both fail fast -- the first violation aborts the
//! message and nothing partial is returned.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::config::{BitConfig, Processor};
use crate::encoding::Encoding;
use crate::error::Error;
use crate::value::{from_hex, to_hex, Record, Value};
use crate::{bitmap, dates, field, pds, processor};

/// Message codec options over a shared field table.
#[derive(Debug, Clone)]
pub struct MessageCodec<'a> {
    bit_config: &'a BitConfig,
    encoding: Encoding,
    /// Bitmap as ASCII hex characters instead of raw bytes.
    hex_bitmap: bool,
    /// Binary field values as uppercase hex text instead of bytes.
    hex_bin: bool,
}

impl<'a> MessageCodec<'a> {
    pub fn new(bit_config: &'a BitConfig) -> Self {
        MessageCodec {
            bit_config,
            encoding: Encoding::default(),
            hex_bitmap: false,
            hex_bin: false,
        }
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn hex_bitmap(mut self, hex_bitmap: bool) -> Self {
        self.hex_bitmap = hex_bitmap;
        self
    }

    pub fn hex_bin(mut self, hex_bin: bool) -> Self {
        self.hex_bin = hex_bin;
        self
    }

    /// Deserialise a message byte string to a flat record.
    pub fn loads(&self, data: &[u8]) -> Result<Record, Error> {
        let mut record = Record::new();

        let mti_raw = data
            .get(..4)
            .ok_or_else(|| Error::Mti("message shorter than an MTI".to_string()))?;
        let mti = self
            .encoding
            .decode(mti_raw)
            .map_err(|_| Error::Mti(format!("undecodable MTI bytes {mti_raw:02X?}")))?;
        if mti.len() != 4 || !mti.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Mti(format!("{mti:?} is not a 4-digit MTI")));
        }
        record.insert("MTI".to_string(), Value::Text(mti));

        let (present, bitmap_len) = self.read_bitmap(&data[4..])?;
        let mut at = 4 + bitmap_len;

        for &bit in &present {
            let spec = self
                .bit_config
                .get(bit)
                .ok_or_else(|| Error::Config(format!("no field configuration for DE{bit}")))?;
            debug!("decoding DE{bit} ({}) at offset {at}", spec.name);
            let (mut value, consumed) = field::decode(bit, spec, &data[at..], self.encoding)?;
            at += consumed;

            if let Some(pattern) = &spec.date_format {
                if let Value::Text(text) = &value {
                    let iso = dates::wire_to_iso(bit, pattern, text)?;
                    value = Value::Text(iso);
                }
            }

            match (spec.processor, &mut value) {
                (Some(Processor::Pan), Value::Text(text)) => {
                    *text = processor::mask_pan(text);
                }
                (Some(Processor::PanPrefix), Value::Text(text)) => {
                    *text = processor::pan_prefix(text);
                }
                (Some(Processor::Icc), Value::Bytes(bytes)) => {
                    processor::project_icc(&mut record, bytes);
                }
                (Some(Processor::De43), Value::Text(text)) => {
                    processor::project_de43(&mut record, text);
                }
                _ => {}
            }

            if spec.subfields {
                let text = value
                    .as_text()
                    .ok_or_else(|| Error::pds(bit, "container value is not text"))?;
                pds::project(&mut record, pds::decode(bit, text)?);
            }

            if self.hex_bin {
                if let Value::Bytes(bytes) = &value {
                    let hex = to_hex(bytes);
                    value = Value::Text(hex);
                }
            }
            record.insert(format!("DE{bit}"), value);
        }

        if at != data.len() {
            return Err(Error::LengthMismatch {
                indicated: at,
                actual: data.len(),
            });
        }
        Ok(record)
    }

    /// Serialise a flat record to a message byte string.
    pub fn dumps(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let staged = self.stage_fields(record)?;

        let mti = record
            .get("MTI")
            .and_then(Value::as_text)
            .ok_or_else(|| Error::Mti("record has no MTI".to_string()))?;
        if mti.len() != 4 || !mti.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Mti(format!("{mti:?} is not a 4-digit MTI")));
        }

        let present: BTreeSet<u32> = staged.keys().copied().collect();
        let mut out = self.encoding.encode(mti).map_err(|_| {
            Error::Mti(format!("MTI {mti:?} cannot be represented in {}", self.encoding.name()))
        })?;
        out.extend(self.write_bitmap(&present));

        for (bit, value) in &staged {
            let spec = self.bit_config.get(*bit).expect("staged fields are configured");
            debug!("encoding DE{bit} ({})", spec.name);

            let value = match &spec.date_format {
                Some(pattern) => match value {
                    Value::Text(text) => Value::Text(dates::iso_to_wire(*bit, pattern, text)?),
                    other => other.clone(),
                },
                None => value.clone(),
            };
            out.extend(field::encode(*bit, spec, &value, self.encoding)?);
        }
        Ok(out)
    }

    /// Work out the data elements to emit: configured `DE<n>` keys with
    /// non-empty values, with PDS subfields re-assembled into their
    /// container fields.
    fn stage_fields(&self, record: &Record) -> Result<BTreeMap<u32, Value>, Error> {
        let mut staged: BTreeMap<u32, Value> = BTreeMap::new();

        for (key, value) in record {
            if key == "MTI" || key.starts_with("PDS") {
                continue;
            }
            let Some(bit) = de_key(key) else {
                debug!("ignoring projected key {key}");
                continue;
            };
            if bit == 1 {
                warn!("ignoring caller-supplied DE1: the bitmap is computed");
                continue;
            }
            if self.bit_config.get(bit).is_none() {
                warn!("ignoring DE{bit}: not in the field configuration");
                continue;
            }
            if value.is_empty() {
                debug!("dropping empty DE{bit}");
                continue;
            }
            staged.insert(bit, value.clone());
        }

        let chunks = pds::assemble(record)?;
        if !chunks.is_empty() {
            let containers = self.bit_config.pds_containers();
            if chunks.len() > containers.len() {
                let field = containers.last().copied().unwrap_or(0);
                return Err(Error::pds(
                    field,
                    format!(
                        "{} PDS chunks but only {} container fields configured",
                        chunks.len(),
                        containers.len()
                    ),
                ));
            }
            for (container, chunk) in containers.into_iter().zip(chunks) {
                if staged.insert(container, Value::Text(chunk)).is_some() {
                    warn!("overwriting supplied DE{container} with assembled PDS data");
                }
            }
        }
        Ok(staged)
    }

    fn read_bitmap(&self, data: &[u8]) -> Result<(BTreeSet<u32>, usize), Error> {
        if !self.hex_bitmap {
            return bitmap::decode(data);
        }
        // hex bitmaps are ASCII hex characters regardless of the
        // message encoding
        let primary = hex_bitmap_bytes(data, bitmap::PRIMARY_LEN)?;
        let full = if primary[0] & 0x80 != 0 {
            hex_bitmap_bytes(data, bitmap::FULL_LEN)?
        } else {
            primary
        };
        let consumed = full.len() * 2;
        let (present, _) = bitmap::decode(&full)?;
        Ok((present, consumed))
    }

    fn write_bitmap(&self, present: &BTreeSet<u32>) -> Vec<u8> {
        let bytes = bitmap::encode(present);
        if self.hex_bitmap {
            to_hex(&bytes).to_lowercase().into_bytes()
        } else {
            bytes
        }
    }
}

fn hex_bitmap_bytes(data: &[u8], want: usize) -> Result<Vec<u8>, Error> {
    let raw = data
        .get(..want * 2)
        .ok_or_else(|| Error::Bitmap(format!("need {} hex chars, have {}", want * 2, data.len())))?;
    let text = std::str::from_utf8(raw)
        .ok()
        .map(str::to_string)
        .ok_or_else(|| Error::Bitmap("hex bitmap is not ASCII".to_string()))?;
    from_hex(&text).ok_or_else(|| Error::Bitmap(format!("malformed hex bitmap {text:?}")))
}

/// Parse a `DE<n>` key; projected keys like `DE43_NAME` do not count.
fn de_key(key: &str) -> Option<u32> {
    let digits = key.strip_prefix("DE")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&bit| (1..=128).contains(&bit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_bit_config;

    #[test]
    fn test_de_key() {
        assert_eq!(de_key("DE2"), Some(2));
        assert_eq!(de_key("DE128"), Some(128));
        assert_eq!(de_key("DE43_NAME"), None);
        assert_eq!(de_key("ICC_DATA"), None);
        assert_eq!(de_key("DE999"), None);
    }

    #[test]
    fn test_caller_de1_is_ignored() {
        let config = default_bit_config();
        let codec = MessageCodec::new(&config);
        let mut record = Record::new();
        record.insert("MTI".into(), Value::Text("1144".into()));
        record.insert("DE1".into(), Value::Text("ffffffffffffffff".into()));
        record.insert("DE2".into(), Value::Text("4444555566667777".into()));
        let bytes = codec.dumps(&record).unwrap();
        // primary bitmap only, bit 2 set
        assert_eq!(&bytes[4..12], &[0x40, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_values_dropped() {
        let config = default_bit_config();
        let codec = MessageCodec::new(&config);
        let mut record = Record::new();
        record.insert("MTI".into(), Value::Text("1234".into()));
        record.insert("DE2".into(), Value::Text("".into()));
        record.insert("DE24".into(), Value::Text("200".into()));
        let decoded = codec.loads(&codec.dumps(&record).unwrap()).unwrap();
        assert!(!decoded.contains_key("DE2"));
        assert_eq!(decoded.get("DE24"), Some(&Value::Text("200".into())));
    }

    #[test]
    fn test_trailing_data_fails() {
        let config = default_bit_config();
        let codec = MessageCodec::new(&config);
        let mut record = Record::new();
        record.insert("MTI".into(), Value::Text("1144".into()));
        record.insert("DE2".into(), Value::Text("123".into()));
        let mut bytes = codec.dumps(&record).unwrap();
        bytes.push(b'X');
        assert!(matches!(
            codec.loads(&bytes),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
