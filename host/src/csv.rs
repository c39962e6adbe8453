//! CSV projection of flat records.
//!
//! Emits the configured columns in order; keys absent from a record
//! become empty cells. Quoting follows RFC 4180: cells containing the
//! delimiter, quotes or line breaks are quoted, with quotes doubled.

use std::io::{self, Write};

use iso8583::Record;

pub fn write_header<W: Write>(out: &mut W, columns: &[String]) -> io::Result<()> {
    write_row_cells(out, columns.iter().map(String::as_str))
}

pub fn write_record<W: Write>(out: &mut W, columns: &[String], record: &Record) -> io::Result<()> {
    let cells: Vec<String> = columns
        .iter()
        .map(|key| record.get(key).map(|v| v.to_string()).unwrap_or_default())
        .collect();
    write_row_cells(out, cells.iter().map(String::as_str))
}

fn write_row_cells<'a, W, I>(out: &mut W, cells: I) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = &'a str>,
{
    let mut first = true;
    for cell in cells {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        write_cell(out, cell)?;
    }
    out.write_all(b"\n")
}

fn write_cell<W: Write>(out: &mut W, cell: &str) -> io::Result<()> {
    let needs_quotes = cell.contains(&[',', '"', '\n', '\r'][..]);
    if !needs_quotes {
        return out.write_all(cell.as_bytes());
    }
    out.write_all(b"\"")?;
    out.write_all(cell.replace('"', "\"\"").as_bytes())?;
    out.write_all(b"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso8583::Value;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_rows() {
        let cols = columns(&["MTI", "DE2", "DE4"]);
        let mut record = Record::new();
        record.insert("MTI".into(), Value::Text("1144".into()));
        record.insert("DE2".into(), Value::Text("4444555566667777".into()));

        let mut out = Vec::new();
        write_header(&mut out, &cols).unwrap();
        write_record(&mut out, &cols, &record).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "MTI,DE2,DE4\n1144,4444555566667777,\n"
        );
    }

    #[test]
    fn test_quoting() {
        let cols = columns(&["DE43_NAME"]);
        let mut record = Record::new();
        record.insert("DE43_NAME".into(), Value::Text("SHOP, THE \"BIG\" ONE".into()));

        let mut out = Vec::new();
        write_record(&mut out, &cols, &record).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"SHOP, THE \"\"BIG\"\" ONE\"\n"
        );
    }

    #[test]
    fn test_binary_values_render_as_hex() {
        let cols = columns(&["DE55"]);
        let mut record = Record::new();
        record.insert("DE55".into(), Value::Bytes(vec![0x9F, 0x26]));

        let mut out = Vec::new();
        write_record(&mut out, &cols, &record).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "9F26\n");
    }
}
