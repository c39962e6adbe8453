//! # mciipm -- Mastercard IPM clearing file readers and writers
//!
//! * VBS record framing (4-byte big-endian length prefix, zero-length
//!   terminator): [`VbsReader`] / [`VbsWriter`]
//! * 1014 block framing over the VBS stream: [`Unblock1014`] /
//!   [`Block1014`]
//! * IPM files (ISO 8583 records in VBS framing): [`IpmReader`] /
//!   [`IpmWriter`]
//! * IPM parameter extracts: [`IpmParamReader`]
//!
//! Readers are single-pass pull iterators over any `io::Read`; writers
//! append to any `io::Write` and must be explicitly closed -- the
//! terminator record and trailing block padding only exist once
//! `close` runs.

pub mod block;
pub mod config;
pub mod error;
pub mod ipm;
pub mod params;
pub mod vbs;

pub use block::{block_1014, unblock_1014, Block1014, Unblock1014};
pub use config::Config;
pub use error::Error;
pub use ipm::{ipm_info, IpmInfo, IpmReader, IpmWriter};
pub use params::{default_param_tables, IpmParamReader, ParamTables};
pub use vbs::{VbsReader, VbsWriter};

/// Frame a list of payloads as a single VBS byte string.
pub fn vbs_from_records<I>(records: I, blocked: bool) -> Result<Vec<u8>, Error>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut out = Vec::new();
    let mut writer = if blocked {
        VbsWriter::blocked(&mut out)
    } else {
        VbsWriter::new(&mut out)
    };
    writer.write_many(records)?;
    writer.close()?;
    Ok(out)
}

/// Unpack a VBS byte string into its payloads.
pub fn vbs_to_records(data: &[u8], blocked: bool) -> Result<Vec<Vec<u8>>, Error> {
    let reader = if blocked {
        VbsReader::blocked(data)
    } else {
        VbsReader::new(data)
    };
    reader.collect()
}
