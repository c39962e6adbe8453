//! Decode-side field projections.
//!
//! Some fields carry structure the flat record wants broken out:
//! the ICC field holds an EMV TLV bundle, DE43 packs the merchant
//! name and address, and PAN fields may be masked for downstream
//! consumers. Projections only ever add or rewrite decoder output;
//! the encoder ignores the derived keys.

use log::warn;

use crate::value::{to_hex, Record, Value};

/// EMV tags where the first byte flags a two-byte tag number.
const TWO_BYTE_TAG_PREFIXES: [u8; 2] = [0x9F, 0x5F];

/// Project an ICC TLV bundle: the whole value as hex under `ICC_DATA`,
/// plus one `TAG<hh>` key per EMV tag.
///
/// The walk is tolerant: a truncated trailing tag ends the walk rather
/// than failing the record, since the bundle is opaque to the wire
/// format.
pub fn project_icc(record: &mut Record, data: &[u8]) {
    record.insert(
        "ICC_DATA".to_string(),
        Value::Text(to_hex(data).to_lowercase()),
    );

    let mut at = 0;
    while at < data.len() {
        let tag_len = if TWO_BYTE_TAG_PREFIXES.contains(&data[at]) { 2 } else { 1 };
        if at + tag_len > data.len() {
            warn!("truncated ICC tag at offset {at}");
            break;
        }
        let tag = &data[at..at + tag_len];
        at += tag_len;

        // low-values tag ends the bundle
        if tag == [0x00] {
            break;
        }

        let Some(&length) = data.get(at) else {
            warn!("ICC tag {} missing its length byte", to_hex(tag));
            break;
        };
        at += 1;
        let length = length as usize;
        if at + length > data.len() {
            warn!("ICC tag {} length {length} overruns the bundle", to_hex(tag));
            break;
        }
        record.insert(
            format!("TAG{}", to_hex(tag)),
            Value::Text(to_hex(&data[at..at + length]).to_lowercase()),
        );
        at += length;
    }
}

/// Split the merchant name/location field into its parts.
///
/// The layout is `name\address\suburb\` followed by a 10 character
/// postcode, 3 character state and 3 character country. Values that do
/// not follow the layout project nothing.
pub fn project_de43(record: &mut Record, text: &str) {
    let parts: Vec<&str> = text.split('\\').collect();
    let [name, address, suburb, tail] = parts[..] else {
        return;
    };
    let tail_chars: Vec<char> = tail.chars().collect();
    if tail_chars.len() != 16 || name.is_empty() {
        return;
    }
    let postcode: String = tail_chars[..10].iter().collect();
    let state: String = tail_chars[10..13].iter().collect();
    let country: String = tail_chars[13..16].iter().collect();
    if country.chars().any(char::is_whitespace) {
        return;
    }

    let mut put = |key: &str, value: String| {
        record.insert(key.to_string(), Value::Text(value));
    };
    put("DE43_NAME", name.trim_end().to_string());
    put("DE43_ADDRESS", address.trim_end().to_string());
    put("DE43_SUBURB", suburb.trim_end().to_string());
    put("DE43_POSTCODE", postcode.trim_end().to_string());
    put("DE43_STATE", state);
    put("DE43_COUNTRY", country);
}

/// Mask a PAN, keeping the first 6 and last 4 digits.
pub fn mask_pan(pan: &str) -> String {
    let chars: Vec<char> = pan.chars().collect();
    if chars.len() <= 10 {
        return pan.to_string();
    }
    let first: String = chars[..6].iter().collect();
    let last: String = chars[chars.len() - 4..].iter().collect();
    format!("{first}{}{last}", "*".repeat(chars.len() - 10))
}

/// Keep only the 9-digit PAN prefix.
pub fn pan_prefix(pan: &str) -> String {
    pan.chars().take(9).collect()
}
