use bauplan_schema::{Schema, ValidationError};
use std::fmt::{self, Display, Formatter};

/// A schema shape the codec refuses to put on wire, one variant per refused kind so every
/// rejection names its cause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unsupported {
    Any,
    Unknown,
    Never,
    Void,
    Function,
    Symbol,
    Promise,
    /// Objects admitting unknown keys have no statically known shape.
    Passthrough,
    /// Unions carry a 5-bit option index on wire.
    UnionArity(usize),
    /// Intersections are only defined for primitives and pairs of records.
    Intersection(&'static str),
    /// A lazy schema was reached before being resolved.
    UnresolvedLazy,
}

impl Unsupported {

    /// The refusal for a schema kind the codec rejects outright, if this is one.
    pub fn refusal(schema: &Schema) -> Option<Unsupported> {
        match schema {
            Schema::Any => Some(Unsupported::Any),
            Schema::Unknown => Some(Unsupported::Unknown),
            Schema::Never => Some(Unsupported::Never),
            Schema::Void => Some(Unsupported::Void),
            Schema::Function => Some(Unsupported::Function),
            Schema::Symbol => Some(Unsupported::Symbol),
            Schema::Promise => Some(Unsupported::Promise),
            _ => None,
        }
    }

}

impl std::error::Error for Unsupported {}

impl Display for Unsupported {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Unsupported::Any => f.write_str("Cannot serialize the any schema"),
            Unsupported::Unknown => f.write_str("Cannot serialize the unknown schema"),
            Unsupported::Never => f.write_str("Cannot serialize the never schema"),
            Unsupported::Void => f.write_str("Cannot serialize the void schema"),
            Unsupported::Function => f.write_str("Cannot serialize a function schema"),
            Unsupported::Symbol => f.write_str("Cannot serialize a symbol schema"),
            Unsupported::Promise => f.write_str("Cannot serialize a promise schema"),
            Unsupported::Passthrough => f.write_str("Cannot serialize an object that passes unknown keys through"),
            Unsupported::UnionArity(n) => write!(f, "Union with {} options exceeds the 32-option limit", n),
            Unsupported::Intersection(kind) => write!(f, "Cannot serialize an intersection over {}", kind),
            Unsupported::UnresolvedLazy => f.write_str("A lazy schema was used before being resolved"),
        }
    }
}

#[derive(Debug)]
pub enum EncodeError {
    Io(std::io::Error),
    /// The input failed validation at the encode boundary.
    Validation(ValidationError),
    Unsupported(Unsupported),
    /// String payloads carry a 20-bit byte length.
    StringTooLong(usize),
    /// Sequences carry at most a 19-bit element count.
    TooManyElements(usize),
    /// Records and maps carry at most a 19-bit pair count.
    TooManyEntries(usize),
    /// Arbitrary-precision integers must fit the signed 64-bit range.
    BigIntRange(i128),
    /// A transform was reached while encoding a catch replacement; the replacement lives in
    /// post-transform space and cannot be mapped back onto the base schema.
    TransformAfterCatch,
    MissingField(String),
    /// Schema and value disagree in a way entry validation should have caught.
    Unexpected { expected: &'static str, found: &'static str },
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            EncodeError::Validation(e) => Some(e),
            EncodeError::Unsupported(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            EncodeError::Io(e) => write!(f, "IO error when writing bytes: {}", e),
            EncodeError::Validation(e) => write!(f, "Input failed validation: {}", e),
            EncodeError::Unsupported(e) => write!(f, "{}", e),
            EncodeError::StringTooLong(len) => write!(f, "String of {} bytes exceeds the 20-bit length limit", len),
            EncodeError::TooManyElements(len) => write!(f, "Sequence of {} elements exceeds the 19-bit length limit", len),
            EncodeError::TooManyEntries(len) => write!(f, "Container of {} entries exceeds the 19-bit length limit", len),
            EncodeError::BigIntRange(n) => write!(f, "Bigint {} is outside the signed 64-bit range", n),
            EncodeError::TransformAfterCatch => f.write_str("A transform cannot run while encoding a catch replacement"),
            EncodeError::MissingField(name) => write!(f, "Required field `{}` is missing", name),
            EncodeError::Unexpected { expected, found } => write!(f, "Expected {}, found {}", expected, found),
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}

impl From<Unsupported> for EncodeError {
    fn from(e: Unsupported) -> EncodeError {
        EncodeError::Unsupported(e)
    }
}

#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// Unexpected end of buffer while decoding.
    Eof,
    /// Envelope protocol version differs from ours.
    Version(u8),
    /// Envelope fingerprint differs from the one recomputed over the given schema: the
    /// endpoints disagree on the schema. Raised before any body byte is read.
    Fingerprint { expected: u64, found: u64 },
    /// The reserved wire family.
    Tag(u8),
    /// An unassigned numeric subtag.
    Subtag(u8),
    /// The reserved sequence length form.
    ReservedLength,
    /// Union option index beyond the schema's option count.
    UnionIndex { index: u8, arity: usize },
    /// Wire element count differs from the tuple's declared arity.
    Arity { expected: usize, found: usize },
    Utf8(std::str::Utf8Error),
    /// Bytes left over after the value body.
    Trailing(usize),
    /// Declared container length did not fit in memory.
    Allocation(usize),
    Unsupported(Unsupported),
    /// Wire header family differs from what the schema dictates.
    Unexpected { expected: &'static str, found: &'static str },
    /// The reconstructed value failed re-validation at the decode boundary.
    Validation(ValidationError),
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Utf8(e) => Some(e),
            DecodeError::Unsupported(e) => Some(e),
            DecodeError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeError::Eof => f.write_str("Unexpected end of buffer while decoding"),
            DecodeError::Version(v) => write!(f, "Protocol version {} is not supported", v),
            DecodeError::Fingerprint { expected, found } => {
                write!(f, "Schema fingerprint mismatch: ours is {:016x}, the payload carries {:016x}", expected, found)
            }
            DecodeError::Tag(t) => write!(f, "Unexpected type tag {} while decoding header", t),
            DecodeError::Subtag(s) => write!(f, "Unexpected numeric subtag {:#x} while decoding header", s),
            DecodeError::ReservedLength => f.write_str("Reserved sequence length form on the wire"),
            DecodeError::UnionIndex { index, arity } => {
                write!(f, "Union option index {} out of range for {} options", index, arity)
            }
            DecodeError::Arity { expected, found } => {
                write!(f, "Tuple of length {} encoded with {} elements", expected, found)
            }
            DecodeError::Utf8(e) => write!(f, "String slice was not valid Utf-8: {}", e),
            DecodeError::Trailing(n) => write!(f, "{} trailing bytes after the value body", n),
            DecodeError::Allocation(n) => write!(f, "Could not reserve space for {} elements", n),
            DecodeError::Unsupported(e) => write!(f, "{}", e),
            DecodeError::Unexpected { expected, found } => write!(f, "Expected {}, found {}", expected, found),
            DecodeError::Validation(e) => write!(f, "Reconstructed value failed validation: {}", e),
        }
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(e: std::str::Utf8Error) -> DecodeError {
        DecodeError::Utf8(e)
    }
}

impl From<Unsupported> for DecodeError {
    fn from(e: Unsupported) -> DecodeError {
        DecodeError::Unsupported(e)
    }
}
