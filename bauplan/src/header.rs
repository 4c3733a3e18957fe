//! Every encoded value begins with a header whose first byte carries a wire family in its
//! high three bits. The low five bits are family-specific: numerics put a subtag there,
//! strings and the container families pack a length form flag plus the high bits of the
//! length, unions hold the option index, and the object family distinguishes its four
//! one-byte markers in bits 3..2. Length forms that spill over continue into one or two
//! following bytes, high byte first. Everything after the header (numeric payloads, UTF-8
//! bytes, millisecond timestamps) is little-endian.

use crate::error::{DecodeError, EncodeError};
use crate::num::NumTag;
use std::convert::TryFrom;
use std::io::Write;

/// Define the wire families here as enum variants aren't types (yet)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tag {
    Num = 0,
    Str = 1,
    Obj = 2,
    Date = 3,
    Seq = 4,
    Union = 5,
    Map = 6,
}

impl TryFrom<u8> for Tag {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            x if x == Tag::Num as u8 => Ok(Tag::Num),
            x if x == Tag::Str as u8 => Ok(Tag::Str),
            x if x == Tag::Obj as u8 => Ok(Tag::Obj),
            x if x == Tag::Date as u8 => Ok(Tag::Date),
            x if x == Tag::Seq as u8 => Ok(Tag::Seq),
            x if x == Tag::Union as u8 => Ok(Tag::Union),
            x if x == Tag::Map as u8 => Ok(Tag::Map),
            _ => Err(()),
        }
    }
}

// Object-family subcodes, bits 3..2 of the header byte.
const OBJECT: u8 = 0;
const NULL: u8 = 1;
const UNDEFINED: u8 = 2;
const ABSENT: u8 = 3;

/// The complete one-byte null marker, for the decoder's lookahead.
pub const NULL_BYTE: u8 = (Tag::Obj as u8) << 5 | NULL << 2;
/// The complete one-byte explicit-undefined marker.
pub const UNDEFINED_BYTE: u8 = (Tag::Obj as u8) << 5 | UNDEFINED << 2;
/// The complete one-byte absent-optional-field marker.
pub const ABSENT_BYTE: u8 = (Tag::Obj as u8) << 5 | ABSENT << 2;

/// Strings carry a 20-bit byte length at most.
pub const MAX_STR_LEN: usize = 1 << 20;
/// Sequences carry a 19-bit element count at most.
pub const MAX_SEQ_LEN: usize = 1 << 19;
/// Records and maps carry a 19-bit pair count at most.
pub const MAX_ENTRIES: usize = 1 << 19;
/// Unions carry a 5-bit option index.
pub const MAX_UNION_ARITY: usize = 32;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Header {
    /// Numeric and boolean forms. The subtag determines the payload width.
    Num(NumTag),
    /// The value is the byte length of the following UTF-8 payload.
    Str(usize),
    /// An object body follows: one encoding per field in schema-declared order.
    Object,
    Null,
    /// The explicit undefined value, distinct from an absent field.
    Undefined,
    /// An optional record field whose key was not present in the source record.
    Absent,
    /// Eight bytes of little-endian milliseconds since the epoch follow.
    Date,
    /// The value is the element count of the following sequence body.
    Seq(usize),
    /// The value is the option index; the option's encoding follows.
    Union(u8),
    /// The value is the pair count of a string-keyed record body.
    Record(usize),
    /// The value is the pair count of a keyed map body.
    Map(usize),
}

impl Header {

    /// Returns the mnemonic of the header. This is useful for error messages.
    pub fn name(&self) -> &'static str {
        match *self {
            Header::Num(_)    => "Num",
            Header::Str(_)    => "Str",
            Header::Object    => "Object",
            Header::Null      => "Null",
            Header::Undefined => "Undefined",
            Header::Absent    => "Absent",
            Header::Date      => "Date",
            Header::Seq(_)    => "Seq",
            Header::Union(_)  => "Union",
            Header::Record(_) => "Record",
            Header::Map(_)    => "Map",
        }
    }

    /// Returns the number of written bytes.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<usize, EncodeError> {
        match *self {
            Header::Num(tag) => {
                w.write_all(&[(Tag::Num as u8) << 5 | tag.to_bits()])?;
                Ok(1)
            }
            Header::Str(len) => {
                let base = (Tag::Str as u8) << 5;
                if len < 1 << 12 {
                    w.write_all(&[base | (len >> 8) as u8, len as u8])?;
                    Ok(2)
                } else if len < MAX_STR_LEN {
                    w.write_all(&[base | 0x10 | (len >> 16) as u8, (len >> 8) as u8, len as u8])?;
                    Ok(3)
                } else {
                    Err(EncodeError::StringTooLong(len))
                }
            }
            Header::Object    => { w.write_all(&[(Tag::Obj as u8) << 5 | OBJECT << 2])?; Ok(1) }
            Header::Null      => { w.write_all(&[NULL_BYTE])?; Ok(1) }
            Header::Undefined => { w.write_all(&[UNDEFINED_BYTE])?; Ok(1) }
            Header::Absent    => { w.write_all(&[ABSENT_BYTE])?; Ok(1) }
            Header::Date      => { w.write_all(&[(Tag::Date as u8) << 5])?; Ok(1) }
            Header::Seq(len) => {
                let base = (Tag::Seq as u8) << 5;
                if len < 8 {
                    w.write_all(&[base | len as u8])?;
                    Ok(1)
                } else if len < 1 << 11 {
                    w.write_all(&[base | 0x08 | (len >> 8) as u8, len as u8])?;
                    Ok(2)
                } else if len < MAX_SEQ_LEN {
                    w.write_all(&[base | 0x10 | (len >> 16) as u8, (len >> 8) as u8, len as u8])?;
                    Ok(3)
                } else {
                    Err(EncodeError::TooManyElements(len))
                }
            }
            Header::Union(index) => {
                w.write_all(&[(Tag::Union as u8) << 5 | index])?;
                Ok(1)
            }
            Header::Record(n) => Self::encode_entries(n, 0x00, w),
            Header::Map(n)    => Self::encode_entries(n, 0x10, w),
        }
    }

    fn encode_entries<W: Write>(n: usize, kind: u8, w: &mut W) -> Result<usize, EncodeError> {
        let base = (Tag::Map as u8) << 5 | kind;
        if n < 1 << 11 {
            w.write_all(&[base | (n >> 8) as u8, n as u8])?;
            Ok(2)
        } else if n < MAX_ENTRIES {
            w.write_all(&[base | 0x08 | (n >> 16) as u8, (n >> 8) as u8, n as u8])?;
            Ok(3)
        } else {
            Err(EncodeError::TooManyEntries(n))
        }
    }

    /// Returns the decoded header and the number of consumed bytes.
    pub fn decode<B: ?Sized + AsRef<[u8]>>(buf: &B) -> Result<(Self, usize), DecodeError> {
        let buf = buf.as_ref();
        let first = *buf.first().ok_or(DecodeError::Eof)?;
        let tag = Tag::try_from(first >> 5).map_err(|_| DecodeError::Tag(first >> 5))?;
        match tag {
            Tag::Num => Ok((Header::Num(NumTag::from_bits(first & 0x1F)?), 1)),
            Tag::Str => {
                if first & 0x10 == 0 {
                    let len = ((first & 0x0F) as usize) << 8 | Self::byte_at(buf, 1)? as usize;
                    Ok((Header::Str(len), 2))
                } else {
                    let len = ((first & 0x0F) as usize) << 16
                        | (Self::byte_at(buf, 1)? as usize) << 8
                        | Self::byte_at(buf, 2)? as usize;
                    Ok((Header::Str(len), 3))
                }
            }
            Tag::Obj => match (first >> 2) & 0x03 {
                OBJECT => Ok((Header::Object, 1)),
                NULL => Ok((Header::Null, 1)),
                UNDEFINED => Ok((Header::Undefined, 1)),
                ABSENT => Ok((Header::Absent, 1)),
                _ => unreachable!(),
            },
            Tag::Date => Ok((Header::Date, 1)),
            Tag::Seq => match (first >> 3) & 0x03 {
                0 => Ok((Header::Seq((first & 0x07) as usize), 1)),
                1 => {
                    let len = ((first & 0x07) as usize) << 8 | Self::byte_at(buf, 1)? as usize;
                    Ok((Header::Seq(len), 2))
                }
                2 => {
                    let len = ((first & 0x07) as usize) << 16
                        | (Self::byte_at(buf, 1)? as usize) << 8
                        | Self::byte_at(buf, 2)? as usize;
                    Ok((Header::Seq(len), 3))
                }
                _ => Err(DecodeError::ReservedLength),
            },
            Tag::Union => Ok((Header::Union(first & 0x1F), 1)),
            Tag::Map => {
                let (n, consumed) = if first & 0x08 == 0 {
                    (((first & 0x07) as usize) << 8 | Self::byte_at(buf, 1)? as usize, 2)
                } else {
                    let n = ((first & 0x07) as usize) << 16
                        | (Self::byte_at(buf, 1)? as usize) << 8
                        | Self::byte_at(buf, 2)? as usize;
                    (n, 3)
                };
                if first & 0x10 == 0 {
                    Ok((Header::Record(n), consumed))
                } else {
                    Ok((Header::Map(n), consumed))
                }
            }
        }
    }

    #[inline]
    fn byte_at(buf: &[u8], at: usize) -> Result<u8, DecodeError> {
        buf.get(at).copied().ok_or(DecodeError::Eof)
    }

}
