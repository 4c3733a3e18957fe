//! The atom of a `bauplan` exchange is the `Value`. It covers exactly the domain the codec
//! can put on wire: numbers, strings, timestamps, the two distinct absence markers and the
//! composite containers. Anything else (functions, symbols, promises) has no representation
//! here and therefore cannot reach the codec at all.

use std::collections::BTreeMap;

/// A structured in-memory value.
///
/// `Record` doubles as the shape of both fixed-field objects and string-keyed records; the
/// schema decides which wire form it takes. An optional object field distinguishes three
/// states: key missing from the map, key present mapping to [`Value::Undefined`], and key
/// present with a concrete value. All three survive a round-trip.
#[derive(Debug, Clone)]
pub enum Value {
    /// The explicit null value.
    Null,
    /// The explicit undefined value. Distinct from an absent record key.
    Undefined,
    Bool(bool),
    /// A number that is a mathematical integer. Narrowed on wire to the smallest form.
    Int(i64),
    /// An arbitrary-precision integer. Only values within the signed 64-bit range encode.
    BigInt(i128),
    /// A number that is fractional or non-finite. Always travels as IEEE-754 f64.
    F64(f64),
    Str(String),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Array(Vec<Value>),
    /// Encoded like an array; duplicates collapse when a set is reconstructed.
    Set(Vec<Value>),
    Record(BTreeMap<String, Value>),
    /// `Map` uses a `Vec` of pairs because `f64` keys implement neither `Ord` nor `Hash`
    /// and thus a `Value` cannot be used as a key in any of the standard library maps.
    Map(Vec<(Value, Value)>),
}

impl Value {

    /// Returns the name of the value's kind. This is useful for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null                      => "null",
            Value::Undefined                 => "undefined",
            Value::Bool(_)                   => "bool",
            Value::Int(_)                    => "integer",
            Value::BigInt(_)                 => "bigint",
            Value::F64(x) if x.is_nan()      => "nan",
            Value::F64(_)                    => "number",
            Value::Str(_)                    => "string",
            Value::Date(_)                   => "date",
            Value::Array(_)                  => "array",
            Value::Set(_)                    => "set",
            Value::Record(_)                 => "record",
            Value::Map(_)                    => "map",
        }
    }

}

/// Structural equality with floats compared bitwise, except that any NaN equals any other
/// NaN: the wire keeps no NaN payload, so all NaNs are one value. `0.0 != -0.0` holds.
/// This is the equality under which round-trips are exact.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null)             => true,
            (Value::Undefined, Value::Undefined)   => true,
            (Value::Bool(a), Value::Bool(b))       => a == b,
            (Value::Int(a), Value::Int(b))         => a == b,
            (Value::BigInt(a), Value::BigInt(b))   => a == b,
            (Value::F64(a), Value::F64(b))         => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b))         => a == b,
            (Value::Date(a), Value::Date(b))       => a == b,
            (Value::Array(a), Value::Array(b))     => a == b,
            (Value::Set(a), Value::Set(b))         => a == b,
            (Value::Record(a), Value::Record(b))   => a == b,
            (Value::Map(a), Value::Map(b))         => a == b,
            _ => false,
        }
    }
}
