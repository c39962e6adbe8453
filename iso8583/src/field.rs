//! Single field codec.
//!
//! A field's wire form is shaped by its [`FieldSpec`]: fixed width or a
//! 2/3 digit character length prefix, crossed with a data type that
//! determines what one "unit" of length means -- a character for text,
//! a byte for binary, a displayed digit for packed BCD.

use crate::config::{DataType, FieldKind, FieldSpec};
use crate::encoding::Encoding;
use crate::error::Error;
use crate::value::{from_hex, Value};

/// Decode one field from the front of `data`.
///
/// Returns the value and the number of wire bytes consumed.
pub fn decode(
    bit: u32,
    spec: &FieldSpec,
    data: &[u8],
    encoding: Encoding,
) -> Result<(Value, usize), Error> {
    let prefix_digits = spec.kind.prefix_digits();
    let length = if prefix_digits == 0 {
        spec.length
    } else {
        read_length_prefix(bit, spec, data, encoding)?
    };

    let width = wire_width(spec.data_type, length);
    let payload = data
        .get(prefix_digits..prefix_digits + width)
        .ok_or_else(|| {
            Error::field(
                bit,
                format!(
                    "field data truncated: need {} bytes, have {}",
                    prefix_digits + width,
                    data.len()
                ),
            )
        })?;

    let value = match spec.data_type {
        DataType::Binary => Value::Bytes(payload.to_vec()),
        DataType::PackedNumeric => Value::Text(unpack_bcd(bit, payload, length)?),
        DataType::Alphanumeric | DataType::Numeric => {
            Value::Text(encoding.decode(payload).map_err(|e| e.in_field(bit))?)
        }
    };
    Ok((value, prefix_digits + width))
}

fn read_length_prefix(
    bit: u32,
    spec: &FieldSpec,
    data: &[u8],
    encoding: Encoding,
) -> Result<usize, Error> {
    let digits = spec.kind.prefix_digits();
    let raw = data.get(..digits).ok_or_else(|| {
        Error::field(
            bit,
            format!("length prefix truncated: need {digits} bytes, have {}", data.len()),
        )
    })?;
    let text = encoding.decode(raw).map_err(|e| e.in_field(bit))?;
    let length = text
        .parse::<usize>()
        .ok()
        .filter(|_| text.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| Error::field(bit, format!("invalid length prefix {text:?}")))?;
    if spec.length > 0 && length > spec.length {
        return Err(Error::field(
            bit,
            format!("length {length} exceeds declared maximum {}", spec.length),
        ));
    }
    Ok(length)
}

/// Wire byte count for `length` units of the given data type.
fn wire_width(data_type: DataType, length: usize) -> usize {
    match data_type {
        DataType::PackedNumeric => length.div_ceil(2),
        _ => length,
    }
}

fn unpack_bcd(bit: u32, payload: &[u8], digits: usize) -> Result<String, Error> {
    let mut out = String::with_capacity(payload.len() * 2);
    for &byte in payload {
        for nibble in [byte >> 4, byte & 0x0F] {
            if nibble > 9 {
                return Err(Error::field(
                    bit,
                    format!("invalid BCD nibble 0x{nibble:X}"),
                ));
            }
            out.push(char::from(b'0' + nibble));
        }
    }
    // odd digit counts are left-zero-padded on the wire
    if digits % 2 == 1 {
        if !out.starts_with('0') {
            return Err(Error::field(bit, "odd-length BCD value missing pad nibble"));
        }
        out.remove(0);
    }
    Ok(out)
}

/// Encode one field, returning its wire bytes.
pub fn encode(
    bit: u32,
    spec: &FieldSpec,
    value: &Value,
    encoding: Encoding,
) -> Result<Vec<u8>, Error> {
    let (unit_len, body) = match spec.data_type {
        DataType::Binary => {
            let bytes = binary_payload(bit, value)?;
            (bytes.len(), bytes)
        }
        DataType::PackedNumeric => {
            let digits = digit_payload(bit, spec, value)?;
            (digits.chars().count(), pack_bcd(&digits))
        }
        DataType::Numeric => {
            let digits = digit_payload(bit, spec, value)?;
            (
                digits.chars().count(),
                encoding.encode(&digits).map_err(|e| e.in_field(bit))?,
            )
        }
        DataType::Alphanumeric => {
            let text = text_payload(bit, spec, value)?;
            (
                text.chars().count(),
                encoding.encode(&text).map_err(|e| e.in_field(bit))?,
            )
        }
    };

    match spec.kind {
        FieldKind::Fixed => {
            if unit_len != spec.length {
                return Err(Error::field(
                    bit,
                    format!("fixed field holds {unit_len} units, expected {}", spec.length),
                ));
            }
            Ok(body)
        }
        FieldKind::LlVar | FieldKind::LllVar => {
            let digits = spec.kind.prefix_digits();
            if spec.length > 0 && unit_len > spec.length {
                return Err(Error::field(
                    bit,
                    format!("length {unit_len} exceeds declared maximum {}", spec.length),
                ));
            }
            if unit_len >= 10usize.pow(digits as u32) {
                return Err(Error::field(
                    bit,
                    format!("length {unit_len} does not fit a {digits}-digit prefix"),
                ));
            }
            let prefix = format!("{unit_len:0width$}", width = digits);
            let mut out = encoding.encode(&prefix).map_err(|e| e.in_field(bit))?;
            out.extend(body);
            Ok(out)
        }
    }
}

/// Raw bytes for a binary field; text values are read as hex.
fn binary_payload(bit: u32, value: &Value) -> Result<Vec<u8>, Error> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        Value::Text(t) => from_hex(t)
            .ok_or_else(|| Error::field(bit, format!("malformed hex for binary field: {t:?}"))),
    }
}

/// Digit string for numeric fields, zero padded to fixed widths.
/// Values wider than a fixed field fail rather than truncate.
fn digit_payload(bit: u32, spec: &FieldSpec, value: &Value) -> Result<String, Error> {
    let text = value
        .as_text()
        .ok_or_else(|| Error::field(bit, "numeric field requires a text value"))?;
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::field(bit, format!("non-numeric value {text:?}")));
    }
    if spec.kind == FieldKind::Fixed {
        let digits = text.chars().count();
        if digits > spec.length {
            return Err(Error::field(
                bit,
                format!("value of {digits} digits overflows width {}", spec.length),
            ));
        }
        return Ok(format!("{text:0>width$}", width = spec.length));
    }
    Ok(text.to_string())
}

/// Text for alphanumeric fields: fixed widths space pad on the right
/// and truncate over-long values.
fn text_payload(bit: u32, spec: &FieldSpec, value: &Value) -> Result<String, Error> {
    let text = value
        .as_text()
        .ok_or_else(|| Error::field(bit, "text field requires a text value"))?;
    if spec.kind == FieldKind::Fixed {
        let truncated: String = text.chars().take(spec.length).collect();
        return Ok(format!("{truncated:<width$}", width = spec.length));
    }
    Ok(text.to_string())
}

fn pack_bcd(digits: &str) -> Vec<u8> {
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    padded
        .as_bytes()
        .chunks(2)
        .map(|pair| ((pair[0] - b'0') << 4) | (pair[1] - b'0'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataType, FieldKind, FieldSpec};

    fn llvar() -> FieldSpec {
        FieldSpec::new("test", FieldKind::LlVar, 0)
    }

    #[test]
    fn test_llvar_round_trip() {
        let spec = llvar();
        let encoded = encode(2, &spec, &Value::Text("4564320012321122".into()), Encoding::Latin1)
            .unwrap();
        assert_eq!(encoded, b"164564320012321122");
        let (value, consumed) = decode(2, &spec, &encoded, Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Text("4564320012321122".into()));
        assert_eq!(consumed, 18);
    }

    #[test]
    fn test_lllvar_prefix() {
        let spec = FieldSpec::new("test", FieldKind::LllVar, 0);
        let encoded = encode(72, &spec, &Value::Text("abc".into()), Encoding::Latin1).unwrap();
        assert_eq!(encoded, b"003abc");
    }

    #[test]
    fn test_llvar_zero_length() {
        let spec = llvar();
        let encoded = encode(2, &spec, &Value::Text("".into()), Encoding::Latin1).unwrap();
        assert_eq!(encoded, b"00");
        let (value, consumed) = decode(2, &spec, b"00", Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Text("".into()));
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_fixed_alphanumeric_pads_and_truncates() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 6);
        assert_eq!(
            encode(41, &spec, &Value::Text("AB".into()), Encoding::Latin1).unwrap(),
            b"AB    "
        );
        assert_eq!(
            encode(41, &spec, &Value::Text("ABCDEFGH".into()), Encoding::Latin1).unwrap(),
            b"ABCDEF"
        );
    }

    #[test]
    fn test_fixed_numeric_pads_left() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 8).data_type(DataType::Numeric);
        assert_eq!(
            encode(71, &spec, &Value::Text("1234".into()), Encoding::Latin1).unwrap(),
            b"00001234"
        );
    }

    #[test]
    fn test_fixed_numeric_overflow_fails() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 3).data_type(DataType::Numeric);
        assert!(encode(24, &spec, &Value::Text("1234".into()), Encoding::Latin1).is_err());
    }

    #[test]
    fn test_ebcdic_length_prefix() {
        let spec = llvar();
        let encoded = encode(2, &spec, &Value::Text("123".into()), Encoding::Cp500).unwrap();
        assert_eq!(encoded, vec![0xF0, 0xF3, 0xF1, 0xF2, 0xF3]);
        let (value, _) = decode(2, &spec, &encoded, Encoding::Cp500).unwrap();
        assert_eq!(value, Value::Text("123".into()));
    }

    #[test]
    fn test_binary_field() {
        let spec = FieldSpec::new("test", FieldKind::LllVar, 255).data_type(DataType::Binary);
        let payload = vec![0x9F, 0x26, 0x00];
        let encoded = encode(55, &spec, &Value::Bytes(payload.clone()), Encoding::Latin1).unwrap();
        assert_eq!(&encoded[..3], b"003");
        assert_eq!(&encoded[3..], &payload[..]);
        let (value, consumed) = decode(55, &spec, &encoded, Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Bytes(payload));
        assert_eq!(consumed, 6);

        // text values for binary fields are read as hex
        let from_hex_text =
            encode(55, &spec, &Value::Text("9F2600".into()), Encoding::Latin1).unwrap();
        assert_eq!(from_hex_text, encoded);
        assert!(encode(55, &spec, &Value::Text("9F260".into()), Encoding::Latin1).is_err());
    }

    #[test]
    fn test_bcd_even_length() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 6).data_type(DataType::PackedNumeric);
        let encoded = encode(3, &spec, &Value::Text("123456".into()), Encoding::Latin1).unwrap();
        assert_eq!(encoded, vec![0x12, 0x34, 0x56]);
        let (value, consumed) = decode(3, &spec, &encoded, Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Text("123456".into()));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_bcd_odd_length_pads_high_nibble() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 5).data_type(DataType::PackedNumeric);
        let encoded = encode(3, &spec, &Value::Text("12345".into()), Encoding::Latin1).unwrap();
        assert_eq!(encoded, vec![0x01, 0x23, 0x45]);
        let (value, _) = decode(3, &spec, &encoded, Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Text("12345".into()));
    }

    #[test]
    fn test_bcd_llvar_counts_digits() {
        let spec = FieldSpec::new("test", FieldKind::LlVar, 0).data_type(DataType::PackedNumeric);
        let encoded = encode(2, &spec, &Value::Text("12345".into()), Encoding::Latin1).unwrap();
        // prefix counts displayed digits, payload is packed
        assert_eq!(encoded, vec![b'0', b'5', 0x01, 0x23, 0x45]);
        let (value, consumed) = decode(2, &spec, &encoded, Encoding::Latin1).unwrap();
        assert_eq!(value, Value::Text("12345".into()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_bcd_invalid_nibble() {
        let spec = FieldSpec::new("test", FieldKind::Fixed, 2).data_type(DataType::PackedNumeric);
        assert!(decode(3, &spec, &[0x1A], Encoding::Latin1).is_err());
    }

    #[test]
    fn test_decode_errors() {
        let spec = llvar();
        // non-digit length prefix
        assert!(decode(2, &spec, b"XX123", Encoding::Latin1).is_err());
        // binary junk where digits expected, under ascii
        assert!(decode(2, &spec, &[0x00, 0x00, b'1'], Encoding::Ascii).is_err());
        // truncated payload
        assert!(decode(2, &spec, b"05123", Encoding::Latin1).is_err());
        // over the declared maximum
        let capped = FieldSpec::new("test", FieldKind::LlVar, 4);
        assert!(decode(2, &capped, b"0512345", Encoding::Latin1).is_err());
    }
}
