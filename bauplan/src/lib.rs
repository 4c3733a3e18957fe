//! A schema-directed binary codec. A [`Schema`](bauplan_schema::Schema) describes the
//! shape of a [`Value`](bauplan_schema::Value); [`encode`] turns the pair into a compact
//! byte sequence and [`decode`] reconstructs an equivalent value from it. Sender and
//! receiver must agree on the schema: the payload carries no field names and no schema
//! metadata, only a short envelope with a protocol version and a 64-bit structural
//! [`fingerprint`] so disagreement is caught before any body byte is read.
//!
//! Both operations run to completion synchronously, own their cursor and share nothing,
//! so independent calls may run in parallel.
//!
//! # Examples
//!
//! ```
//! use bauplan_schema::{Schema, Value};
//! use std::collections::BTreeMap;
//!
//! let schema = Schema::object(vec![
//!     ("name", Schema::String),
//!     ("age", Schema::Number.optional()),
//! ]);
//! let value = Value::Record(BTreeMap::from([
//!     ("name".to_string(), Value::Str("Jo".to_string())),
//! ]));
//!
//! let bytes = bauplan::encode(&schema, &value).unwrap();
//! assert_eq!(1, bytes[0]);              // protocol version
//! let fingerprint = bauplan::fingerprint(&schema).unwrap();
//! assert_eq!(&fingerprint.to_be_bytes(), &bytes[1..9]);
//! assert_eq!(&bytes[9..], &[
//!     0x40,                             // object header
//!     0x20, 0x02,                       // string of length 2
//!     0x4a, 0x6f,                       // 'J' 'o'
//!     0x4c,                             // absent optional field: no `age` key
//! ]);
//!
//! let roundtrip = bauplan::decode(&schema, &bytes).unwrap();
//! assert_eq!(value, roundtrip);
//! ```

mod decode;
mod encode;
mod error;
mod fingerprint;
mod header;
mod num;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{DecodeError, EncodeError, Unsupported};
pub use fingerprint::fingerprint;
pub use header::{Header, Tag};
pub use num::NumTag;

use bauplan_schema::{Schema, Value};

/// The envelope protocol version.
pub const VERSION: u8 = 1;

/// The fixed envelope length: one version byte plus the big-endian 64-bit fingerprint.
pub const ENVELOPE_LEN: usize = 9;

/// Validates `value` under `schema` and encodes it into a fresh buffer: the 9-byte
/// envelope followed by the recursive body encoding.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>, EncodeError> {
    schema.safe_parse(value).map_err(EncodeError::Validation)?;
    let print = fingerprint(schema)?;
    let mut buf = Vec::with_capacity(ENVELOPE_LEN + 16);
    buf.push(VERSION);
    buf.extend_from_slice(&print.to_be_bytes());
    Encoder::encode(schema, value, &mut buf)?;
    Ok(buf)
}

/// Verifies the envelope, decodes the body under `schema` and re-validates the
/// reconstructed value. The result is whatever the validator yields, so defaults and
/// transforms apply here.
pub fn decode(schema: &Schema, buf: &[u8]) -> Result<Value, DecodeError> {
    if buf.len() < ENVELOPE_LEN {
        return Err(DecodeError::Eof);
    }
    if buf[0] != VERSION {
        return Err(DecodeError::Version(buf[0]));
    }
    let found = u64::from_be_bytes(buf[1..ENVELOPE_LEN].try_into().unwrap());
    let expected = fingerprint(schema)?;
    if found != expected {
        return Err(DecodeError::Fingerprint { expected, found });
    }
    let body = &buf[ENVELOPE_LEN..];
    let (value, consumed) = Decoder::decode(schema, body)?;
    if consumed != body.len() {
        return Err(DecodeError::Trailing(body.len() - consumed));
    }
    schema.safe_parse(&value).map_err(DecodeError::Validation)
}
