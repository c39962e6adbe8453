//! IPM file readers and writers.
//!
//! An IPM file is a VBS stream (optionally 1014 blocked) whose records
//! are ISO 8583 messages. [`IpmReader`] iterates flat records;
//! [`IpmWriter`] appends them and must be closed to produce a valid
//! file.
//!
//! ```no_run
//! use std::fs::File;
//! use iso8583::{default_bit_config, Encoding, MessageCodec};
//! use mciipm::IpmReader;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let table = default_bit_config();
//! let codec = MessageCodec::new(&table).encoding(Encoding::Cp500);
//! let file = File::open("clearing.ipm")?;
//! for record in IpmReader::blocked(file, codec) {
//!     println!("{:?}", record?);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};

use log::debug;

use iso8583::{bitmap, BitConfig, Encoding, MessageCodec, Record};

use crate::error::Error;
use crate::vbs::{VbsReader, VbsWriter, DEFAULT_MAX_RECORD_LENGTH};

/// Reads the ISO 8583 records of an IPM file.
pub struct IpmReader<'a, R: Read> {
    vbs: VbsReader<R>,
    codec: MessageCodec<'a>,
}

impl<'a, R: Read> IpmReader<'a, R> {
    pub fn new(source: R, codec: MessageCodec<'a>) -> Self {
        IpmReader {
            vbs: VbsReader::new(source),
            codec,
        }
    }

    pub fn blocked(source: R, codec: MessageCodec<'a>) -> Self {
        IpmReader {
            vbs: VbsReader::blocked(source),
            codec,
        }
    }

    /// Select framing from a flag, the shape the CLI tools use.
    pub fn with_blocking(source: R, codec: MessageCodec<'a>, blocked: bool) -> Self {
        if blocked {
            Self::blocked(source, codec)
        } else {
            Self::new(source, codec)
        }
    }

    pub fn records_read(&self) -> usize {
        self.vbs.records_read()
    }
}

impl<R: Read> Iterator for IpmReader<'_, R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let payload = match self.vbs.next()? {
            Ok(payload) => payload,
            Err(e) => return Some(Err(e)),
        };
        let record_number = self.vbs.records_read();
        debug!("decoding IPM record {record_number} ({} bytes)", payload.len());
        Some(self.codec.loads(&payload).map_err(|source| Error::Record {
            record: record_number,
            source,
        }))
    }
}

/// Writes ISO 8583 records to an IPM file.
pub struct IpmWriter<'a, W: Write> {
    vbs: VbsWriter<W>,
    codec: MessageCodec<'a>,
}

impl<'a, W: Write> IpmWriter<'a, W> {
    pub fn new(sink: W, codec: MessageCodec<'a>) -> Self {
        IpmWriter {
            vbs: VbsWriter::new(sink),
            codec,
        }
    }

    pub fn blocked(sink: W, codec: MessageCodec<'a>) -> Self {
        IpmWriter {
            vbs: VbsWriter::blocked(sink),
            codec,
        }
    }

    pub fn with_blocking(sink: W, codec: MessageCodec<'a>, blocked: bool) -> Self {
        if blocked {
            Self::blocked(sink, codec)
        } else {
            Self::new(sink, codec)
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<(), Error> {
        let payload = self.codec.dumps(record).map_err(|source| Error::Record {
            record: self.vbs.records_written() + 1,
            source,
        })?;
        self.vbs.write(&payload)
    }

    pub fn write_many<'r, I>(&mut self, records: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.vbs.records_written()
    }

    /// Finalise the file. Mandatory.
    pub fn close(self) -> Result<(), Error> {
        self.vbs.close()
    }
}

/// What a first look at an IPM file suggests about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmInfo {
    pub is_valid: bool,
    /// Why the file does not look like an IPM file, when it does not.
    pub reason: Option<String>,
    pub is_blocked: bool,
    /// Probable encoding judged from the MTI bytes.
    pub encoding: Option<&'static str>,
}

/// Inspect the opening bytes of an IPM file.
///
/// Works on a sample (the first couple of thousand bytes is plenty)
/// and is meant for diagnostics, not validation: it checks that the
/// first record length is sane and that the bitmap only flags
/// configured fields.
pub fn ipm_info(sample: &[u8], bit_config: &BitConfig) -> IpmInfo {
    let mut info = IpmInfo {
        is_valid: false,
        reason: None,
        is_blocked: false,
        encoding: None,
    };

    if sample.len() < 24 {
        info.reason = Some("file does not have sufficient data to be valid".to_string());
        return info;
    }

    let record_length = u32::from_be_bytes(sample[..4].try_into().expect("4 bytes")) as usize;
    if record_length > DEFAULT_MAX_RECORD_LENGTH {
        info.reason = Some(format!(
            "first record length ({record_length}) exceeds the maximum record length \
             ({DEFAULT_MAX_RECORD_LENGTH}) which usually indicates a file issue"
        ));
        return info;
    }

    if let Err(reason) = bitmap_check(&sample[8..24], bit_config) {
        info.reason = Some(reason);
        return info;
    }

    info.is_blocked = block_1014_check(sample);
    info.encoding = encoding_check(&sample[4..8]);
    info.is_valid = true;
    info
}

/// Every flagged bit must have field configuration.
fn bitmap_check(bitmap_bytes: &[u8], bit_config: &BitConfig) -> Result<(), String> {
    let (present, _) = bitmap::decode(bitmap_bytes).map_err(|e| e.to_string())?;
    for bit in present {
        if bit_config.get(bit).is_none() {
            return Err(format!("bitmap uses DE{bit} which is not used in IPM"));
        }
    }
    Ok(())
}

/// Blocked files carry `0x40 0x40` at the end of each 1014 span.
fn block_1014_check(sample: &[u8]) -> bool {
    if sample.len() < 1014 {
        return false;
    }
    if sample[1012..1014] != [0x40, 0x40] {
        return false;
    }
    if sample.len() == 1014 {
        return true;
    }
    sample.len() >= 2028 && sample[2026..2028] == [0x40, 0x40]
}

/// Judge the encoding family from the MTI bytes.
fn encoding_check(mti: &[u8]) -> Option<&'static str> {
    for encoding in [Encoding::Latin1, Encoding::Cp037] {
        if let Ok(text) = encoding.decode(mti) {
            if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                return Some(encoding.name());
            }
        }
    }
    None
}
