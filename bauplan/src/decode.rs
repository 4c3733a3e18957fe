//! Schema-directed decoding. The decoder never guesses from the bytes alone: the schema
//! dictates which family is expected next and a header of any other family is malformed
//! input. Absence markers are resolved with a one-byte lookahead against the schema's
//! optional/nullable predicates, mirroring the encoder exactly.

use crate::encode::merge_fields;
use crate::error::{DecodeError, Unsupported};
use crate::header::{Header, ABSENT_BYTE, MAX_UNION_ARITY, NULL_BYTE, UNDEFINED_BYTE};
use crate::num::NumTag;
use bauplan_schema::{MemberKind, Schema, Value};
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::str::from_utf8;

fn unexpected(expected: &'static str, found: Header) -> DecodeError {
    DecodeError::Unexpected { expected, found: found.name() }
}

/// Used to decode a value under its schema from a caller-owned buffer. Strings are the
/// only payloads that get copied; containers allocate their own heap space.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {

    /// Decode a single value of the given schema. Returns the value and the number of
    /// consumed bytes.
    pub fn decode(schema: &Schema, buf: &'a [u8]) -> Result<(Value, usize), DecodeError> {
        let mut decoder = Decoder { buf, pos: 0 };
        let value = decoder.decode_value(schema)?;
        Ok((value, decoder.pos))
    }

    fn decode_value(&mut self, schema: &Schema) -> Result<Value, DecodeError> {
        if let Some(refusal) = Unsupported::refusal(schema) {
            return Err(refusal.into());
        }
        if schema.is_nullable() && self.peek()? == NULL_BYTE {
            self.pos += 1;
            return Ok(Value::Null);
        }
        if schema.is_optional() && self.peek()? == UNDEFINED_BYTE {
            self.pos += 1;
            return Ok(Value::Undefined);
        }
        match schema {
            Schema::String => self.decode_str(),
            // Subtags within the numeric family all decode here; the boundary validation
            // sorts a stray bool under a number schema out afterwards.
            Schema::Number | Schema::Nan | Schema::BigInt | Schema::Bool => self.decode_number(),
            Schema::Date => self.decode_date(),
            Schema::Literal(literal) => self.decode_literal(literal),
            Schema::Enum(kind, _) => match kind {
                MemberKind::Str => self.decode_str(),
                MemberKind::Num => self.decode_number(),
            },
            Schema::Object { fields, passthrough } => {
                if *passthrough {
                    return Err(Unsupported::Passthrough.into());
                }
                self.decode_object(fields)
            }
            Schema::Array(element) => {
                let len = self.expect_seq()?;
                let mut items = Vec::new();
                items.try_reserve(len).map_err(|_| DecodeError::Allocation(len))?;
                for _ in 0..len {
                    items.push(self.decode_value(element)?);
                }
                Ok(Value::Array(items))
            }
            Schema::Tuple(schemas) => {
                let len = self.expect_seq()?;
                if len != schemas.len() {
                    return Err(DecodeError::Arity { expected: schemas.len(), found: len });
                }
                let mut items = Vec::new();
                items.try_reserve(len).map_err(|_| DecodeError::Allocation(len))?;
                for schema in schemas {
                    items.push(self.decode_value(schema)?);
                }
                Ok(Value::Array(items))
            }
            Schema::Set(element) => {
                let len = self.expect_seq()?;
                let mut items: Vec<Value> = Vec::new();
                items.try_reserve(len).map_err(|_| DecodeError::Allocation(len))?;
                for _ in 0..len {
                    let item = self.decode_value(element)?;
                    // Set semantics: duplicates collapse silently.
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
                Ok(Value::Set(items))
            }
            Schema::Union(options) | Schema::DiscriminatedUnion(_, options) => {
                if options.len() > MAX_UNION_ARITY {
                    return Err(Unsupported::UnionArity(options.len()).into());
                }
                let index = match self.decode_header()? {
                    Header::Union(index) => index,
                    header => return Err(unexpected("Union", header)),
                };
                let option = options
                    .get(index as usize)
                    .ok_or(DecodeError::UnionIndex { index, arity: options.len() })?;
                self.decode_value(option)
            }
            Schema::Record(key, val) => {
                let len = match self.decode_header()? {
                    Header::Record(len) => len,
                    header => return Err(unexpected("Record", header)),
                };
                let mut entries = BTreeMap::new();
                for _ in 0..len {
                    let name = match self.decode_value(key)? {
                        Value::Str(s) => s,
                        v => return Err(DecodeError::Unexpected { expected: "string", found: v.kind() }),
                    };
                    let value = self.decode_value(val)?;
                    // Entries land in file order; a duplicate key keeps the last one.
                    entries.insert(name, value);
                }
                Ok(Value::Record(entries))
            }
            Schema::Map(key, val) => {
                let len = match self.decode_header()? {
                    Header::Map(len) => len,
                    header => return Err(unexpected("Map", header)),
                };
                let mut pairs = Vec::new();
                pairs.try_reserve(len).map_err(|_| DecodeError::Allocation(len))?;
                for _ in 0..len {
                    let k = self.decode_value(key)?;
                    let v = self.decode_value(val)?;
                    pairs.push((k, v));
                }
                Ok(Value::Map(pairs))
            }
            Schema::Intersection(left, right) => match merge_fields(left, right) {
                Some(fields) => self.decode_object(&fields),
                None => match left.strip() {
                    Schema::String
                    | Schema::Number
                    | Schema::BigInt
                    | Schema::Bool
                    | Schema::Nan
                    | Schema::Literal(_)
                    | Schema::Enum(_, _) => self.decode_value(left),
                    other => Err(Unsupported::Intersection(kind_name(other)).into()),
                },
            },
            Schema::Optional(inner)
            | Schema::Nullable(inner)
            | Schema::Branded(inner)
            | Schema::Readonly(inner)
            | Schema::Default(inner, _)
            | Schema::Catch(inner, _)
            | Schema::Refine(inner, _)
            | Schema::Transform(inner, _) => self.decode_value(inner),
            Schema::Preprocess(_, inner) => self.decode_value(inner),
            Schema::Pipeline(input, _) => self.decode_value(input),
            Schema::Lazy(lazy) => {
                self.decode_value(lazy.get().ok_or(Unsupported::UnresolvedLazy)?)
            }
            Schema::Any => Err(Unsupported::Any.into()),
            Schema::Unknown => Err(Unsupported::Unknown.into()),
            Schema::Never => Err(Unsupported::Never.into()),
            Schema::Void => Err(Unsupported::Void.into()),
            Schema::Function => Err(Unsupported::Function.into()),
            Schema::Symbol => Err(Unsupported::Symbol.into()),
            Schema::Promise => Err(Unsupported::Promise.into()),
        }
    }

    fn decode_object(&mut self, fields: &[(String, Schema)]) -> Result<Value, DecodeError> {
        match self.decode_header()? {
            Header::Object => {}
            header => return Err(unexpected("Object", header)),
        }
        let mut entries = BTreeMap::new();
        for (name, field) in fields {
            if self.peek()? == ABSENT_BYTE && field.is_optional() {
                self.pos += 1;
                continue;
            }
            entries.insert(name.clone(), self.decode_value(field)?);
        }
        Ok(Value::Record(entries))
    }

    fn decode_number(&mut self) -> Result<Value, DecodeError> {
        let tag = match self.decode_header()? {
            Header::Num(tag) => tag,
            header => return Err(unexpected("Num", header)),
        };
        Ok(match tag {
            NumTag::I8 => Value::Int(self.decode_slice(1)?[0] as i8 as i64),
            NumTag::I16 => Value::Int(i16::from_le_bytes(self.decode_slice(2)?.try_into().unwrap()) as i64),
            NumTag::I32 => Value::Int(i32::from_le_bytes(self.decode_slice(4)?.try_into().unwrap()) as i64),
            NumTag::I64 => Value::Int(i64::from_le_bytes(self.decode_slice(8)?.try_into().unwrap())),
            NumTag::Big => Value::BigInt(i64::from_le_bytes(self.decode_slice(8)?.try_into().unwrap()) as i128),
            NumTag::F64 => Value::F64(f64::from_le_bytes(self.decode_slice(8)?.try_into().unwrap())),
            NumTag::Nan => Value::F64(f64::NAN),
            NumTag::PosInf => Value::F64(f64::INFINITY),
            NumTag::NegInf => Value::F64(f64::NEG_INFINITY),
            NumTag::True => Value::Bool(true),
            NumTag::False => Value::Bool(false),
        })
    }

    fn decode_str(&mut self) -> Result<Value, DecodeError> {
        let len = match self.decode_header()? {
            Header::Str(len) => len,
            header => return Err(unexpected("Str", header)),
        };
        Ok(Value::Str(from_utf8(self.decode_slice(len)?)?.to_string()))
    }

    fn decode_date(&mut self) -> Result<Value, DecodeError> {
        match self.decode_header()? {
            Header::Date => {}
            header => return Err(unexpected("Date", header)),
        }
        Ok(Value::Date(i64::from_le_bytes(self.decode_slice(8)?.try_into().unwrap())))
    }

    fn decode_literal(&mut self, literal: &Value) -> Result<Value, DecodeError> {
        match literal {
            Value::Str(_) => self.decode_str(),
            Value::Int(_) | Value::F64(_) | Value::BigInt(_) | Value::Bool(_) => self.decode_number(),
            Value::Date(_) => self.decode_date(),
            Value::Null => match self.decode_header()? {
                Header::Null => Ok(Value::Null),
                header => Err(unexpected("Null", header)),
            },
            Value::Undefined => match self.decode_header()? {
                Header::Undefined => Ok(Value::Undefined),
                header => Err(unexpected("Undefined", header)),
            },
            v => Err(DecodeError::Unexpected { expected: "primitive literal", found: v.kind() }),
        }
    }

    fn expect_seq(&mut self) -> Result<usize, DecodeError> {
        match self.decode_header()? {
            Header::Seq(len) => Ok(len),
            header => Err(unexpected("Seq", header)),
        }
    }

    #[inline]
    fn peek(&self) -> Result<u8, DecodeError> {
        self.buf.get(self.pos).copied().ok_or(DecodeError::Eof)
    }

    fn decode_header(&mut self) -> Result<Header, DecodeError> {
        let (header, consumed) = Header::decode(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(header)
    }

    fn decode_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf[self.pos..].len() < len {
            Err(DecodeError::Eof)
        } else {
            self.pos += len;
            Ok(&self.buf[self.pos - len..self.pos])
        }
    }

}

fn kind_name(schema: &Schema) -> &'static str {
    match schema {
        Schema::Array(_) => "array",
        Schema::Tuple(_) => "tuple",
        Schema::Set(_) => "set",
        Schema::Union(_) | Schema::DiscriminatedUnion(_, _) => "union",
        Schema::Record(_, _) => "record",
        Schema::Map(_, _) => "map",
        Schema::Date => "date",
        Schema::Intersection(_, _) => "intersection",
        _ => "schema",
    }
}
