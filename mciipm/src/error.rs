use std::io;

use thiserror::Error;

/// Errors raised while reading or writing clearing files.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying stream failure.
    #[error("I/O failure: {0}")]
    Io(io::Error),

    /// EOF arrived mid-record or before the stream terminator.
    #[error("record {record}: truncated - needed {needed} bytes, got {got}")]
    Truncated {
        record: usize,
        needed: usize,
        got: usize,
    },

    /// A record length prefix beyond the configured maximum. Usually a
    /// sign of reading a blocked file without unblocking, or of a wrong
    /// encoding.
    #[error("record {record}: length {length} exceeds the maximum record length {max}")]
    RecordLength {
        record: usize,
        length: usize,
        max: usize,
    },

    /// 1014 framing violation.
    #[error("1014 block: {0}")]
    Block(String),

    /// A record that failed ISO 8583 decoding or encoding.
    #[error("record {record}: {source}")]
    Record {
        record: usize,
        #[source]
        source: iso8583::Error,
    },

    /// A parameter record that does not fit its table layout.
    #[error("record {record}: {reason}")]
    Param { record: usize, reason: String },

    /// Missing or unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Marker wrapped into `io::Error` by the unblocking reader so framing
/// violations survive the `Read` trait boundary.
#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct BlockViolation(pub String);

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<BlockViolation>()) {
            let inner = err
                .into_inner()
                .expect("checked above")
                .downcast::<BlockViolation>()
                .expect("checked above");
            return Error::Block(inner.0);
        }
        Error::Io(err)
    }
}

impl BlockViolation {
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self)
    }
}
