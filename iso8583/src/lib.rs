//! # iso8583 -- ISO 8583 message parsing for clearing messages
//!
//! Converts raw ISO 8583 message byte strings to flat key/value
//! records and back, including the Mastercard private data subfield
//! (PDS) structures carried inside container fields.
//!
//! Record keys:
//!
//! * `MTI` -- message type indicator
//! * `DE<n>` -- data elements 2..128
//! * `PDS<nnnn>` -- private data subfields
//! * `TAG<hh>`, `ICC_DATA`, `DE43_*` -- decoder projections
//!
//! Parse a message with the built-in field table:
//!
//! ```
//! let bitmap = [0x40, 0, 0, 0, 0, 0, 0, 0];
//! let mut message = b"1144".to_vec();
//! message.extend(bitmap);
//! message.extend(b"164444555566667777");
//!
//! let record = iso8583::loads(&message).unwrap();
//! assert_eq!(record["MTI"], iso8583::Value::Text("1144".into()));
//! assert_eq!(record["DE2"], iso8583::Value::Text("4444555566667777".into()));
//! assert_eq!(iso8583::dumps(&record).unwrap(), message);
//! ```
//!
//! Pick an encoding and options with [`MessageCodec`]:
//!
//! ```
//! use iso8583::{default_bit_config, Encoding, MessageCodec};
//!
//! let table = default_bit_config();
//! let codec = MessageCodec::new(&table).encoding(Encoding::Cp500);
//! # let _ = codec;
//! ```

pub mod bitmap;
pub mod config;
pub mod dates;
pub mod encoding;
pub mod error;
pub mod field;
pub mod pds;
pub mod processor;
pub mod value;

mod message;

pub use config::{default_bit_config, BitConfig, DataType, FieldKind, FieldSpec, Processor};
pub use encoding::Encoding;
pub use error::Error;
pub use message::MessageCodec;
pub use value::{Record, Value};

use once_cell::sync::Lazy;

static DEFAULT_BIT_CONFIG: Lazy<BitConfig> = Lazy::new(default_bit_config);

/// Deserialise a message using the built-in field table and latin-1.
pub fn loads(data: &[u8]) -> Result<Record, Error> {
    MessageCodec::new(&DEFAULT_BIT_CONFIG).loads(data)
}

/// Serialise a record using the built-in field table and latin-1.
pub fn dumps(record: &Record) -> Result<Vec<u8>, Error> {
    MessageCodec::new(&DEFAULT_BIT_CONFIG).dumps(record)
}
