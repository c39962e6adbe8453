use thiserror::Error;

/// Errors raised while encoding or decoding an ISO 8583 message.
///
/// Field-level variants carry the data element number they refer to.
/// Errors produced below the field layer (encoding, PDS walk) start out
/// with field number 0 and are attributed by the caller via
/// [`Error::in_field`].
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable field configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A byte or character that cannot be represented in the message encoding.
    #[error("DE{field}: cannot represent {detail} in {encoding}")]
    Encoding {
        field: u32,
        encoding: &'static str,
        detail: String,
    },

    /// Message type indicator missing, short, or non-numeric.
    #[error("invalid MTI: {0}")]
    Mti(String),

    /// Field-level length, type, or format violation.
    #[error("DE{field}: {reason}")]
    Field { field: u32, reason: String },

    /// Malformed PDS container payload.
    #[error("PDS container DE{field}: {reason}")]
    Pds { field: u32, reason: String },

    /// Bitmap that cannot be decoded.
    #[error("bitmap: {0}")]
    Bitmap(String),

    /// Message shorter or longer than the bitmap indicates.
    #[error("message length mismatch: bitmap indicates {indicated} data bytes, message has {actual}")]
    LengthMismatch { indicated: usize, actual: usize },
}

impl Error {
    /// Attribute an unattributed error to a data element number.
    pub(crate) fn in_field(mut self, bit: u32) -> Self {
        match &mut self {
            Error::Encoding { field, .. }
            | Error::Field { field, .. }
            | Error::Pds { field, .. } => {
                if *field == 0 {
                    *field = bit;
                }
            }
            _ => {}
        }
        self
    }

    pub(crate) fn field(bit: u32, reason: impl Into<String>) -> Self {
        Error::Field {
            field: bit,
            reason: reason.into(),
        }
    }

    pub(crate) fn pds(bit: u32, reason: impl Into<String>) -> Self {
        Error::Pds {
            field: bit,
            reason: reason.into(),
        }
    }
}
