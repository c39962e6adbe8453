//! Build a small blocked clearing file in memory, then read it back.
//!
//! Run with: cargo run --example create_and_read_ipm

use iso8583::{default_bit_config, Encoding, MessageCodec, Record, Value};
use mciipm::{IpmReader, IpmWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = default_bit_config();
    let codec = || MessageCodec::new(&table).encoding(Encoding::Cp500);

    let mut header = Record::new();
    header.insert("MTI".into(), Value::Text("1644".into()));
    header.insert("DE24".into(), Value::Text("697".into()));

    let mut presentment = Record::new();
    presentment.insert("MTI".into(), Value::Text("1240".into()));
    presentment.insert("DE2".into(), Value::Text("4444555566667777".into()));
    presentment.insert("DE4".into(), Value::Text("000000012300".into()));
    presentment.insert("PDS0158".into(), Value::Text("MCC0000".into()));

    let mut file = Vec::new();
    let mut writer = IpmWriter::blocked(&mut file, codec());
    writer.write(&header)?;
    writer.write(&presentment)?;
    writer.close()?;

    println!("wrote {} bytes ({} blocks)", file.len(), file.len() / 1014);

    for record in IpmReader::blocked(&file[..], codec()) {
        let record = record?;
        println!("MTI {}", record["MTI"]);
        for (key, value) in &record {
            if key != "MTI" {
                println!("  {key} = {value}");
            }
        }
    }
    Ok(())
}
