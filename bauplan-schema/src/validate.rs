//! Validation is the safe-parse capability the codec consumes: a total function from
//! (schema, value) to either a parsed output value or an error, never a panic. The output
//! is what a caller observes after a round-trip; defaults, catches, preprocessors,
//! transforms and pipelines all land here.

use crate::schema::Schema;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Mismatch { expected: &'static str, found: &'static str },
    MissingField(String),
    Literal(&'static str),
    EnumMember(&'static str),
    TupleArity { expected: usize, found: usize },
    NoUnionMatch,
    Discriminant(String),
    Refinement,
    Never,
    UnresolvedLazy,
    Unmergeable(&'static str, &'static str),
}

impl std::error::Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ValidationError::Mismatch { expected, found } => write!(f, "Expected {}, found {}", expected, found),
            ValidationError::MissingField(name) => write!(f, "Required field `{}` is missing", name),
            ValidationError::Literal(found) => write!(f, "Value of kind {} does not match the literal", found),
            ValidationError::EnumMember(found) => write!(f, "Value of kind {} is not a member of the enum", found),
            ValidationError::TupleArity { expected, found } => write!(f, "Tuple of length {} given {} elements", expected, found),
            ValidationError::NoUnionMatch => f.write_str("No union option accepts the value"),
            ValidationError::Discriminant(key) => write!(f, "No option matches the discriminant at `{}`", key),
            ValidationError::Refinement => f.write_str("Value fails a refinement"),
            ValidationError::Never => f.write_str("The never schema accepts nothing"),
            ValidationError::UnresolvedLazy => f.write_str("A lazy schema was used before being resolved"),
            ValidationError::Unmergeable(left, right) => write!(f, "Cannot merge intersection results of kinds {} and {}", left, right),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ValidationError {
    ValidationError::Mismatch { expected, found: found.kind() }
}

/// Intersections parse the value under both sides and merge the two outputs: records merge
/// right-biased, equal primitives collapse, everything else is a conflict.
fn merge(left: Value, right: Value) -> Result<Value, ValidationError> {
    match (left, right) {
        (Value::Record(mut out), Value::Record(overlay)) => {
            for (key, value) in overlay {
                out.insert(key, value);
            }
            Ok(Value::Record(out))
        }
        (left, right) => {
            if left == right {
                Ok(right)
            } else {
                Err(ValidationError::Unmergeable(left.kind(), right.kind()))
            }
        }
    }
}

impl Schema {

    /// Parse `value` under this schema without throwing. On success the returned value has
    /// all value-producing decorators applied.
    pub fn safe_parse(&self, value: &Value) -> Result<Value, ValidationError> {
        match self {
            Schema::String => match value {
                Value::Str(_) => Ok(value.clone()),
                v => Err(mismatch("string", v)),
            },
            Schema::Number => match value {
                Value::Int(_) => Ok(value.clone()),
                Value::F64(x) if !x.is_nan() => Ok(value.clone()),
                v => Err(mismatch("number", v)),
            },
            Schema::BigInt => match value {
                Value::BigInt(_) => Ok(value.clone()),
                v => Err(mismatch("bigint", v)),
            },
            Schema::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                v => Err(mismatch("bool", v)),
            },
            Schema::Date => match value {
                Value::Date(_) => Ok(value.clone()),
                v => Err(mismatch("date", v)),
            },
            Schema::Nan => match value {
                Value::F64(x) if x.is_nan() => Ok(value.clone()),
                v => Err(mismatch("nan", v)),
            },
            Schema::Literal(literal) => {
                if value == literal {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::Literal(value.kind()))
                }
            }
            Schema::Enum(_, members) => {
                if members.iter().any(|member| member == value) {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::EnumMember(value.kind()))
                }
            }
            Schema::Object { fields, passthrough } => {
                let map = match value {
                    Value::Record(m) => m,
                    v => return Err(mismatch("record", v)),
                };
                let mut out = BTreeMap::new();
                for (name, field) in fields {
                    match map.get(name) {
                        Some(v) => {
                            out.insert(name.clone(), field.safe_parse(v)?);
                        }
                        // An absent key stays absent unless the field schema turns
                        // undefined into something concrete (a default).
                        None => match field.safe_parse(&Value::Undefined) {
                            Ok(Value::Undefined) => {}
                            Ok(v) => {
                                out.insert(name.clone(), v);
                            }
                            Err(_) => return Err(ValidationError::MissingField(name.clone())),
                        },
                    }
                }
                if *passthrough {
                    for (key, v) in map {
                        if !fields.iter().any(|(name, _)| name == key) {
                            out.insert(key.clone(), v.clone());
                        }
                    }
                }
                Ok(Value::Record(out))
            }
            Schema::Array(element) => {
                let items = match value {
                    Value::Array(v) => v,
                    v => return Err(mismatch("array", v)),
                };
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(element.safe_parse(item)?);
                }
                Ok(Value::Array(out))
            }
            Schema::Tuple(items) => {
                let elements = match value {
                    Value::Array(v) => v,
                    v => return Err(mismatch("tuple", v)),
                };
                if elements.len() != items.len() {
                    return Err(ValidationError::TupleArity { expected: items.len(), found: elements.len() });
                }
                let mut out = Vec::with_capacity(elements.len());
                for (schema, element) in items.iter().zip(elements) {
                    out.push(schema.safe_parse(element)?);
                }
                Ok(Value::Array(out))
            }
            Schema::Set(element) => {
                let items = match value {
                    Value::Set(v) => v,
                    v => return Err(mismatch("set", v)),
                };
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let parsed = element.safe_parse(item)?;
                    if !out.contains(&parsed) {
                        out.push(parsed);
                    }
                }
                Ok(Value::Set(out))
            }
            Schema::Union(options) => {
                for option in options {
                    if let Ok(v) = option.safe_parse(value) {
                        return Ok(v);
                    }
                }
                Err(ValidationError::NoUnionMatch)
            }
            Schema::DiscriminatedUnion(key, options) => {
                let map = match value {
                    Value::Record(m) => m,
                    v => return Err(mismatch("record", v)),
                };
                let tag = map.get(key).ok_or_else(|| ValidationError::MissingField(key.clone()))?;
                for option in options {
                    if option.discriminant(key) == Some(tag) {
                        return option.safe_parse(value);
                    }
                }
                Err(ValidationError::Discriminant(key.clone()))
            }
            Schema::Record(key, val) => {
                let map = match value {
                    Value::Record(m) => m,
                    v => return Err(mismatch("record", v)),
                };
                let mut out = BTreeMap::new();
                for (name, v) in map {
                    let parsed_key = match key.safe_parse(&Value::Str(name.clone()))? {
                        Value::Str(s) => s,
                        v => return Err(mismatch("string", &v)),
                    };
                    out.insert(parsed_key, val.safe_parse(v)?);
                }
                Ok(Value::Record(out))
            }
            Schema::Map(key, val) => {
                let pairs = match value {
                    Value::Map(p) => p,
                    v => return Err(mismatch("map", v)),
                };
                let mut out = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    out.push((key.safe_parse(k)?, val.safe_parse(v)?));
                }
                Ok(Value::Map(out))
            }
            Schema::Intersection(left, right) => {
                let a = left.safe_parse(value)?;
                let b = right.safe_parse(value)?;
                merge(a, b)
            }
            Schema::Optional(inner) => match value {
                Value::Undefined => Ok(Value::Undefined),
                v => inner.safe_parse(v),
            },
            Schema::Nullable(inner) => match value {
                Value::Null => Ok(Value::Null),
                v => inner.safe_parse(v),
            },
            Schema::Default(inner, default) => match value {
                Value::Undefined => inner.safe_parse(default),
                v => inner.safe_parse(v),
            },
            Schema::Catch(inner, replacement) => {
                inner.safe_parse(value).or_else(|_| Ok(replacement.clone()))
            }
            Schema::Lazy(lazy) => lazy.get().ok_or(ValidationError::UnresolvedLazy)?.safe_parse(value),
            Schema::Branded(inner) | Schema::Readonly(inner) => inner.safe_parse(value),
            Schema::Pipeline(input, output) => {
                let v = input.safe_parse(value)?;
                output.safe_parse(&v)
            }
            Schema::Refine(inner, predicate) => {
                let v = inner.safe_parse(value)?;
                if predicate.check(&v) {
                    Ok(v)
                } else {
                    Err(ValidationError::Refinement)
                }
            }
            Schema::Preprocess(pre, inner) => inner.safe_parse(&pre.apply(value)),
            Schema::Transform(inner, transform) => {
                let v = inner.safe_parse(value)?;
                Ok(transform.apply(&v))
            }
            Schema::Any | Schema::Unknown => Ok(value.clone()),
            Schema::Never => Err(ValidationError::Never),
            Schema::Void => match value {
                Value::Undefined => Ok(Value::Undefined),
                v => Err(mismatch("void", v)),
            },
            Schema::Function => Err(mismatch("function", value)),
            Schema::Symbol => Err(mismatch("symbol", value)),
            Schema::Promise => Err(mismatch("promise", value)),
        }
    }

    /// Whether the schema tolerates the explicit undefined value. Defined behaviorally, so
    /// defaults and catches count as optional, exactly as the codec's absence markers need.
    pub fn is_optional(&self) -> bool {
        self.safe_parse(&Value::Undefined).is_ok()
    }

    /// Whether the schema tolerates the explicit null value.
    pub fn is_nullable(&self) -> bool {
        self.safe_parse(&Value::Null).is_ok()
    }

}
