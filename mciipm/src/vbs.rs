//! Variable blocked sequential (VBS) record framing.
//!
//! Each record is a 4-byte big-endian length followed by that many
//! payload bytes; a zero length terminates the stream. Readers are
//! single-pass and strict: hitting EOF mid-record or before the
//! terminator fails with a truncation error. Writers must be closed to
//! emit the terminator -- a file without one is invalid.

use std::io::{self, Read, Write};

use log::{debug, warn};

use crate::block::{Block1014, Unblock1014};
use crate::error::Error;

/// Default ceiling on record lengths. A length prefix beyond this is
/// taken as file corruption rather than a genuine record.
pub const DEFAULT_MAX_RECORD_LENGTH: usize = 6000;

enum Source<R: Read> {
    Plain(R),
    Unblocked(Unblock1014<R>),
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Plain(r) => r.read(buf),
            Source::Unblocked(r) => r.read(buf),
        }
    }
}

/// Iterates the records of a VBS stream.
pub struct VbsReader<R: Read> {
    source: Source<R>,
    record_number: usize,
    max_record_length: usize,
    finished: bool,
}

impl<R: Read> VbsReader<R> {
    /// Read an unblocked VBS stream.
    pub fn new(source: R) -> Self {
        Self::build(Source::Plain(source))
    }

    /// Read a 1014-blocked stream.
    pub fn blocked(source: R) -> Self {
        Self::build(Source::Unblocked(Unblock1014::new(source)))
    }

    fn build(source: Source<R>) -> Self {
        VbsReader {
            source,
            record_number: 0,
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            finished: false,
        }
    }

    pub fn max_record_length(mut self, max: usize) -> Self {
        self.max_record_length = max;
        self
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> usize {
        self.record_number
    }

    fn read_exact_counted(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut have = 0;
        while have < buf.len() {
            let n = self.source.read(&mut buf[have..])?;
            if n == 0 {
                break;
            }
            have += n;
        }
        Ok(have)
    }

    fn next_record(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let record = self.record_number + 1;

        let mut length_raw = [0u8; 4];
        let have = self.read_exact_counted(&mut length_raw)?;
        if have != 4 {
            return Err(Error::Truncated {
                record,
                needed: 4,
                got: have,
            });
        }

        let length = u32::from_be_bytes(length_raw) as usize;
        debug!("record {record}: length {length}");
        if length > self.max_record_length {
            return Err(Error::RecordLength {
                record,
                length,
                max: self.max_record_length,
            });
        }
        if length == 0 {
            self.finished = true;
            return Ok(None);
        }

        let mut payload = vec![0u8; length];
        let have = self.read_exact_counted(&mut payload)?;
        if have != length {
            return Err(Error::Truncated {
                record,
                needed: length,
                got: have,
            });
        }
        self.record_number = record;
        Ok(Some(payload))
    }
}

impl<R: Read> Iterator for VbsReader<R> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

enum Sink<W: Write> {
    Plain(W),
    Blocked(Block1014<W>),
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Blocked(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Blocked(w) => w.flush(),
        }
    }
}

/// Writes VBS records. [`VbsWriter::close`] emits the zero-length
/// terminator (and block padding) that make the output a valid file.
pub struct VbsWriter<W: Write> {
    sink: Sink<W>,
    record_number: usize,
    finalised: bool,
}

impl<W: Write> VbsWriter<W> {
    /// Write an unblocked VBS stream.
    pub fn new(sink: W) -> Self {
        Self::build(Sink::Plain(sink))
    }

    /// Write a 1014-blocked stream.
    pub fn blocked(sink: W) -> Self {
        Self::build(Sink::Blocked(Block1014::new(sink)))
    }

    fn build(sink: Sink<W>) -> Self {
        VbsWriter {
            sink,
            record_number: 0,
            finalised: false,
        }
    }

    pub fn write(&mut self, payload: &[u8]) -> Result<(), Error> {
        let length = u32::try_from(payload.len()).map_err(|_| Error::RecordLength {
            record: self.record_number + 1,
            length: payload.len(),
            max: u32::MAX as usize,
        })?;
        self.sink.write_all(&length.to_be_bytes())?;
        self.sink.write_all(payload)?;
        self.record_number += 1;
        Ok(())
    }

    pub fn write_many<I>(&mut self, payloads: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for payload in payloads {
            self.write(payload.as_ref())?;
        }
        Ok(())
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.record_number
    }

    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    /// Terminate the stream. Mandatory: without it the file has no
    /// end-of-stream record and blocked output is missing its padding.
    pub fn close(mut self) -> Result<(), Error> {
        self.sink.write_all(&0u32.to_be_bytes())?;
        if let Sink::Blocked(blocker) = &mut self.sink {
            blocker.finalise()?;
        }
        self.sink.flush()?;
        self.finalised = true;
        Ok(())
    }
}

impl<W: Write> Drop for VbsWriter<W> {
    fn drop(&mut self) {
        if !self.finalised {
            warn!(
                "VBS writer dropped without close after {} records: output has no terminator",
                self.record_number
            );
        }
    }
}
