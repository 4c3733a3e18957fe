//! Schema-directed encoding. The encoder walks the raw input value guided by the schema:
//! decorators unwrap, preprocessors run, defaults and transforms are left to the validator
//! on the far side. Dispatch order is part of the wire contract: refusals first, then the
//! null/undefined short-circuit, then the concrete families.

use crate::error::{EncodeError, Unsupported};
use crate::header::{Header, MAX_UNION_ARITY};
use crate::num::{NumTag, MAX_SAFE_INT};
use bauplan_schema::{MemberKind, Schema, Value};
use std::collections::BTreeMap;
use std::io::Write;

fn unexpected(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::Unexpected { expected, found: found.kind() }
}

/// Two intersected record schemas travel as a single record: left field order, the right
/// side wins name collisions, right-only fields appended. `None` when either side is not a
/// plain (decorated) object.
pub(crate) fn merge_fields(left: &Schema, right: &Schema) -> Option<Vec<(String, Schema)>> {
    let (left_fields, left_passthrough) = left.as_object()?;
    let (right_fields, right_passthrough) = right.as_object()?;
    if left_passthrough || right_passthrough {
        return None;
    }
    let mut fields: Vec<(String, Schema)> = Vec::with_capacity(left_fields.len() + right_fields.len());
    for (name, schema) in left_fields {
        let effective = right_fields
            .iter()
            .find(|(right_name, _)| right_name == name)
            .map(|(_, right_schema)| right_schema)
            .unwrap_or(schema);
        fields.push((name.clone(), effective.clone()));
    }
    for (name, schema) in right_fields {
        if !left_fields.iter().any(|(left_name, _)| left_name == name) {
            fields.push((name.clone(), schema.clone()));
        }
    }
    Some(fields)
}

/// Used to encode a value under its schema. The `replaced` flag marks that a catch has
/// substituted its replacement somewhere up the spine; such a value already lives in
/// post-transform space, so reaching a transform under the flag is fatal.
pub struct Encoder<'w, W: Write> {
    writer: &'w mut W,
    replaced: bool,
}

impl<'w, W: Write> Encoder<'w, W> {

    /// Encode a value to the given writer. The resulting `usize` is the amount of bytes
    /// that got written. The value is assumed to have passed `safe_parse`; disagreements
    /// still surface as errors, never as panics.
    pub fn encode(schema: &Schema, value: &Value, writer: &'w mut W) -> Result<usize, EncodeError> {
        Self { writer, replaced: false }.encode_value(schema, value)
    }

    fn encode_value(&mut self, schema: &Schema, value: &Value) -> Result<usize, EncodeError> {
        if let Some(refusal) = Unsupported::refusal(schema) {
            return Err(refusal.into());
        }
        // The absence markers outrank every family rule.
        if matches!(value, Value::Null) && schema.is_nullable() {
            return Header::Null.encode(self.writer);
        }
        if matches!(value, Value::Undefined) && schema.is_optional() {
            return Header::Undefined.encode(self.writer);
        }
        match schema {
            Schema::String => self.encode_str(value),
            Schema::Number | Schema::Nan => self.encode_number(value),
            Schema::BigInt => self.encode_bigint(value),
            Schema::Bool => self.encode_bool(value),
            Schema::Date => self.encode_date(value),
            Schema::Literal(literal) => self.encode_literal(literal, value),
            Schema::Enum(kind, _) => match kind {
                MemberKind::Str => self.encode_str(value),
                MemberKind::Num => self.encode_number(value),
            },
            Schema::Object { fields, passthrough } => {
                if *passthrough {
                    return Err(Unsupported::Passthrough.into());
                }
                self.encode_object(fields, value)
            }
            Schema::Array(element) => match value {
                Value::Array(items) => {
                    self.encode_seq(items.len(), items.iter().map(|item| (element.as_ref(), item)))
                }
                v => Err(unexpected("array", v)),
            },
            Schema::Tuple(items) => match value {
                Value::Array(elements) => {
                    if elements.len() != items.len() {
                        return Err(unexpected("tuple", value));
                    }
                    self.encode_seq(elements.len(), items.iter().zip(elements))
                }
                v => Err(unexpected("tuple", v)),
            },
            Schema::Set(element) => match value {
                Value::Set(items) => {
                    self.encode_seq(items.len(), items.iter().map(|item| (element.as_ref(), item)))
                }
                v => Err(unexpected("set", v)),
            },
            Schema::Union(options) => self.encode_union(options, value),
            Schema::DiscriminatedUnion(key, options) => self.encode_discriminated(key, options, value),
            Schema::Record(key, val) => match value {
                Value::Record(entries) => self.encode_record_entries(key, val, entries),
                v => Err(unexpected("record", v)),
            },
            Schema::Map(key, val) => match value {
                Value::Map(pairs) => self.encode_map_entries(key, val, pairs),
                v => Err(unexpected("map", v)),
            },
            Schema::Intersection(left, right) => self.encode_intersection(left, right, value),
            Schema::Optional(inner)
            | Schema::Nullable(inner)
            | Schema::Branded(inner)
            | Schema::Readonly(inner)
            | Schema::Default(inner, _)
            | Schema::Refine(inner, _) => self.encode_value(inner, value),
            Schema::Catch(inner, replacement) => match inner.safe_parse(value) {
                Ok(_) => self.encode_value(inner, value),
                Err(_) => {
                    let previous = self.replaced;
                    self.replaced = true;
                    let written = self.encode_value(inner, replacement);
                    self.replaced = previous;
                    written
                }
            },
            Schema::Lazy(lazy) => {
                self.encode_value(lazy.get().ok_or(Unsupported::UnresolvedLazy)?, value)
            }
            Schema::Pipeline(input, _) => self.encode_value(input, value),
            Schema::Preprocess(pre, inner) => self.encode_value(inner, &pre.apply(value)),
            Schema::Transform(inner, _) => {
                if self.replaced {
                    Err(EncodeError::TransformAfterCatch)
                } else {
                    self.encode_value(inner, value)
                }
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

    fn encode_number(&mut self, value: &Value) -> Result<usize, EncodeError> {
        match value {
            Value::Int(n) => {
                if n.unsigned_abs() > MAX_SAFE_INT as u64 {
                    tracing::warn!(value = *n, "integer exceeds the safe range of the number type");
                }
                let tag = NumTag::narrow(*n);
                let written = Header::Num(tag).encode(self.writer)?;
                let bytes = n.to_le_bytes();
                self.writer.write_all(&bytes[..tag.payload()])?;
                Ok(written + tag.payload())
            }
            Value::F64(x) if x.is_nan() => Header::Num(NumTag::Nan).encode(self.writer),
            Value::F64(x) if *x == f64::INFINITY => Header::Num(NumTag::PosInf).encode(self.writer),
            Value::F64(x) if *x == f64::NEG_INFINITY => Header::Num(NumTag::NegInf).encode(self.writer),
            Value::F64(x) => {
                let written = Header::Num(NumTag::F64).encode(self.writer)?;
                self.writer.write_all(&x.to_le_bytes())?;
                Ok(written + 8)
            }
            v => Err(unexpected("number", v)),
        }
    }

    fn encode_bigint(&mut self, value: &Value) -> Result<usize, EncodeError> {
        match value {
            Value::BigInt(n) => {
                let narrowed = i64::try_from(*n).map_err(|_| EncodeError::BigIntRange(*n))?;
                let written = Header::Num(NumTag::Big).encode(self.writer)?;
                self.writer.write_all(&narrowed.to_le_bytes())?;
                Ok(written + 8)
            }
            v => Err(unexpected("bigint", v)),
        }
    }

    fn encode_bool(&mut self, value: &Value) -> Result<usize, EncodeError> {
        match value {
            Value::Bool(true) => Header::Num(NumTag::True).encode(self.writer),
            Value::Bool(false) => Header::Num(NumTag::False).encode(self.writer),
            v => Err(unexpected("bool", v)),
        }
    }

    fn encode_str(&mut self, value: &Value) -> Result<usize, EncodeError> {
        match value {
            Value::Str(s) => {
                let written = Header::Str(s.len()).encode(self.writer)?;
                self.writer.write_all(s.as_bytes())?;
                Ok(written + s.len())
            }
            v => Err(unexpected("string", v)),
        }
    }

    fn encode_date(&mut self, value: &Value) -> Result<usize, EncodeError> {
        match value {
            Value::Date(millis) => {
                let written = Header::Date.encode(self.writer)?;
                self.writer.write_all(&millis.to_le_bytes())?;
                Ok(written + 8)
            }
            v => Err(unexpected("date", v)),
        }
    }

    /// Literal schemas dispatch on the literal value's runtime kind.
    fn encode_literal(&mut self, literal: &Value, value: &Value) -> Result<usize, EncodeError> {
        match literal {
            Value::Str(_) => self.encode_str(value),
            Value::Int(_) | Value::F64(_) => self.encode_number(value),
            Value::BigInt(_) => self.encode_bigint(value),
            Value::Bool(_) => self.encode_bool(value),
            Value::Date(_) => self.encode_date(value),
            Value::Null => Header::Null.encode(self.writer),
            Value::Undefined => Header::Undefined.encode(self.writer),
            v => Err(unexpected("primitive literal", v)),
        }
    }

    fn encode_object(&mut self, fields: &[(String, Schema)], value: &Value) -> Result<usize, EncodeError> {
        let map = match value {
            Value::Record(m) => m,
            v => return Err(unexpected("record", v)),
        };
        let mut written = Header::Object.encode(self.writer)?;
        for (name, field) in fields {
            written += match map.get(name) {
                Some(v) => self.encode_value(field, v)?,
                None if field.is_optional() => Header::Absent.encode(self.writer)?,
                None => return Err(EncodeError::MissingField(name.clone())),
            };
        }
        Ok(written)
    }

    fn encode_seq<'a>(
        &mut self,
        len: usize,
        pairs: impl Iterator<Item = (&'a Schema, &'a Value)>,
    ) -> Result<usize, EncodeError> {
        let mut written = Header::Seq(len).encode(self.writer)?;
        for (schema, value) in pairs {
            written += self.encode_value(schema, value)?;
        }
        Ok(written)
    }

    fn encode_record_entries(
        &mut self,
        key: &Schema,
        val: &Schema,
        entries: &BTreeMap<String, Value>,
    ) -> Result<usize, EncodeError> {
        let mut written = Header::Record(entries.len()).encode(self.writer)?;
        for (name, value) in entries {
            written += self.encode_value(key, &Value::Str(name.clone()))?;
            written += self.encode_value(val, value)?;
        }
        Ok(written)
    }

    fn encode_map_entries(
        &mut self,
        key: &Schema,
        val: &Schema,
        pairs: &[(Value, Value)],
    ) -> Result<usize, EncodeError> {
        let mut written = Header::Map(pairs.len()).encode(self.writer)?;
        for (k, v) in pairs {
            written += self.encode_value(key, k)?;
            written += self.encode_value(val, v)?;
        }
        Ok(written)
    }

    /// The option chosen is the first one, in declaration order, whose validator accepts
    /// the value.
    fn encode_union(&mut self, options: &[Schema], value: &Value) -> Result<usize, EncodeError> {
        if options.len() > MAX_UNION_ARITY {
            return Err(Unsupported::UnionArity(options.len()).into());
        }
        for (index, option) in options.iter().enumerate() {
            if option.safe_parse(value).is_ok() {
                let written = Header::Union(index as u8).encode(self.writer)?;
                return Ok(written + self.encode_value(option, value)?);
            }
        }
        Err(unexpected("matching union option", value))
    }

    /// Same wire form as a plain union; the discriminant picks the option without trying
    /// every validator.
    fn encode_discriminated(
        &mut self,
        key: &str,
        options: &[Schema],
        value: &Value,
    ) -> Result<usize, EncodeError> {
        if options.len() > MAX_UNION_ARITY {
            return Err(Unsupported::UnionArity(options.len()).into());
        }
        let map = match value {
            Value::Record(m) => m,
            v => return Err(unexpected("record", v)),
        };
        let tag = map.get(key).ok_or_else(|| EncodeError::MissingField(key.to_string()))?;
        for (index, option) in options.iter().enumerate() {
            if option.discriminant(key) == Some(tag) {
                let written = Header::Union(index as u8).encode(self.writer)?;
                return Ok(written + self.encode_value(option, value)?);
            }
        }
        Err(unexpected("matching union option", value))
    }

    /// Intersections have no tag of their own. Primitive values travel once under their
    /// primitive form; two record schemas merge and travel as one record.
    fn encode_intersection(
        &mut self,
        left: &Schema,
        right: &Schema,
        value: &Value,
    ) -> Result<usize, EncodeError> {
        match value {
            Value::Int(_) | Value::F64(_) => self.encode_number(value),
            Value::BigInt(_) => self.encode_bigint(value),
            Value::Bool(_) => self.encode_bool(value),
            Value::Str(_) => self.encode_str(value),
            Value::Record(_) => match merge_fields(left, right) {
                Some(fields) => self.encode_object(&fields, value),
                None => Err(Unsupported::Intersection(value.kind()).into()),
            },
            v => Err(Unsupported::Intersection(v.kind()).into()),
        }
    }

}
