//! End-to-end scenarios over the public API: envelope plus body, byte-exact where the
//! format is pinned, round-trip equality everywhere else.

use bauplan::{decode, encode, fingerprint, DecodeError};
use bauplan_schema::{LazySchema, MemberKind, Schema, Value};
use proptest::prelude::*;

fn record(entries: Vec<(&str, Value)>) -> Value {
    Value::Record(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn assert_roundtrip(schema: &Schema, value: Value) {
    let bytes = encode(schema, &value).unwrap();
    assert_eq!(value, decode(schema, &bytes).unwrap(), "schema {:?}", schema);
}

fn body(bytes: &[u8]) -> &[u8] {
    &bytes[9..]
}

#[test]
fn integer_wire_form() {
    let bytes = encode(&Schema::Number, &Value::Int(42)).unwrap();
    assert_eq!(1, bytes[0]);
    assert_eq!(
        &fingerprint(&Schema::Number).unwrap().to_be_bytes(),
        &bytes[1..9]
    );
    assert_eq!(&[0x00, 0x2A], body(&bytes));
    assert_eq!(Value::Int(42), decode(&Schema::Number, &bytes).unwrap());
}

#[test]
fn string_wire_form() {
    let bytes = encode(&Schema::String, &Value::Str("hi".to_string())).unwrap();
    assert_eq!(&[0x20, 0x02, 0x68, 0x69], body(&bytes));
    assert_eq!(Value::Str("hi".to_string()), decode(&Schema::String, &bytes).unwrap());
}

#[test]
fn absent_optional_field_wire_form() {
    let schema = Schema::object(vec![("a", Schema::String), ("b", Schema::Number.optional())]);
    let value = record(vec![("a", Value::Str("x".to_string()))]);
    let bytes = encode(&schema, &value).unwrap();
    assert_eq!(&[0x40, 0x20, 0x01, 0x78, 0x4C], body(&bytes));
    let back = decode(&schema, &bytes).unwrap();
    // No `b` key materializes on the way back.
    assert_eq!(value, back);
}

#[test]
fn discriminated_union_wire_form() {
    let schema = Schema::discriminated_union(
        "t",
        vec![
            Schema::object(vec![
                ("t", Schema::Literal(Value::Str("p".to_string()))),
                ("n", Schema::Number),
            ]),
            Schema::object(vec![("t", Schema::Literal(Value::Str("q".to_string())))]),
        ],
    );
    let value = record(vec![("t", Value::Str("q".to_string()))]);
    let bytes = encode(&schema, &value).unwrap();
    assert_eq!(0xA1, body(&bytes)[0]);
    assert_eq!(value, decode(&schema, &bytes).unwrap());
}

#[test]
fn eight_elements_force_the_mid_length_form() {
    let schema = Schema::array(Schema::Number);
    let value = Value::Array(vec![Value::Int(0); 8]);
    let bytes = encode(&schema, &value).unwrap();
    assert_eq!(&[0x88, 0x08], &body(&bytes)[..2]);
    assert_eq!(18, body(&bytes).len());
    assert_eq!(value, decode(&schema, &bytes).unwrap());
}

#[test]
fn lazy_recursive_list() {
    let lazy = LazySchema::unresolved();
    let node = Schema::object(vec![
        ("v", Schema::Number),
        ("next", Schema::Lazy(lazy.clone()).optional()),
    ]);
    lazy.resolve(node.clone()).ok();
    // The fingerprint terminates despite the cycle and stays stable.
    assert_eq!(fingerprint(&node).unwrap(), fingerprint(&node).unwrap());
    let list = record(vec![
        ("v", Value::Int(1)),
        (
            "next",
            record(vec![
                ("v", Value::Int(2)),
                ("next", record(vec![("v", Value::Int(3))])),
            ]),
        ),
    ]);
    assert_roundtrip(&node, list);
}

#[test]
fn optional_field_tristate_roundtrips() {
    let schema = Schema::object(vec![("foo", Schema::String.optional())]);
    let inputs = [
        record(vec![]),
        record(vec![("foo", Value::Undefined)]),
        record(vec![("foo", Value::Str("x".to_string()))]),
    ];
    let encodings: Vec<Vec<u8>> = inputs.iter().map(|v| encode(&schema, v).unwrap()).collect();
    assert_ne!(encodings[0], encodings[1]);
    assert_ne!(encodings[1], encodings[2]);
    assert_ne!(encodings[0], encodings[2]);
    for (input, bytes) in inputs.iter().zip(&encodings) {
        assert_eq!(*input, decode(&schema, bytes).unwrap());
    }
}

#[test]
fn union_prefers_the_first_option() {
    // Both options accept the value; declaration order wins.
    let schema = Schema::union(vec![
        Schema::Number,
        Schema::Number.refine(|_| true),
    ]);
    let bytes = encode(&schema, &Value::Int(1)).unwrap();
    assert_eq!(0xA0, body(&bytes)[0]);
}

#[test]
fn cross_schema_rejection() {
    let one = Schema::object(vec![("a", Schema::String)]);
    let other = Schema::object(vec![("a", Schema::Number)]);
    let bytes = encode(&one, &record(vec![("a", Value::Str("x".to_string()))])).unwrap();
    assert!(matches!(
        decode(&other, &bytes),
        Err(DecodeError::Fingerprint { .. })
    ));
    // A renamed field is the same schema as far as the wire cares.
    let renamed = Schema::object(vec![("b", Schema::String)]);
    assert_eq!(
        record(vec![("b", Value::Str("x".to_string()))]),
        decode(&renamed, &bytes).unwrap()
    );
}

#[test]
fn primitive_battery() {
    assert_roundtrip(&Schema::Number, Value::Int(0));
    assert_roundtrip(&Schema::Number, Value::Int(-129));
    assert_roundtrip(&Schema::Number, Value::Int(i64::MAX));
    assert_roundtrip(&Schema::Number, Value::F64(2.5));
    assert_roundtrip(&Schema::Number, Value::F64(-0.0));
    assert_roundtrip(&Schema::Number, Value::F64(f64::INFINITY));
    assert_roundtrip(&Schema::Number, Value::F64(f64::NEG_INFINITY));
    assert_roundtrip(&Schema::Nan, Value::F64(f64::NAN));
    assert_roundtrip(&Schema::Bool, Value::Bool(true));
    assert_roundtrip(&Schema::Bool, Value::Bool(false));
    assert_roundtrip(&Schema::BigInt, Value::BigInt(-5));
    assert_roundtrip(&Schema::Date, Value::Date(1_700_000_000_000));
    assert_roundtrip(&Schema::Date, Value::Date(-1));
    assert_roundtrip(&Schema::String, Value::Str(String::new()));
    assert_roundtrip(&Schema::String, Value::Str("Üben von Xylophon und Querflöte".to_string()));
    assert_roundtrip(&Schema::String, Value::Str("x".repeat(5000)));
}

#[test]
fn composite_battery() {
    assert_roundtrip(
        &Schema::array(Schema::String.nullable()),
        Value::Array(vec![
            Value::Str("a".to_string()),
            Value::Null,
            Value::Str("b".to_string()),
        ]),
    );
    assert_roundtrip(
        &Schema::tuple(vec![Schema::Number, Schema::String, Schema::Bool]),
        Value::Array(vec![
            Value::Int(1),
            Value::Str("two".to_string()),
            Value::Bool(false),
        ]),
    );
    assert_roundtrip(
        &Schema::set_of(Schema::Number),
        Value::Set(vec![Value::Int(3), Value::Int(1), Value::Int(2)]),
    );
    assert_roundtrip(
        &Schema::record(Schema::String, Schema::array(Schema::Number)),
        record(vec![
            ("a", Value::Array(vec![Value::Int(1)])),
            ("b", Value::Array(vec![])),
        ]),
    );
    assert_roundtrip(
        &Schema::map(Schema::Number, Schema::String),
        Value::Map(vec![
            (Value::F64(1.5), Value::Str("x".to_string())),
            (Value::Int(2), Value::Str("y".to_string())),
        ]),
    );
    assert_roundtrip(
        &Schema::object(vec![
            ("nested", Schema::object(vec![("deep", Schema::array(Schema::Bool))])),
        ]),
        record(vec![(
            "nested",
            record(vec![("deep", Value::Array(vec![Value::Bool(true)]))]),
        )]),
    );
}

#[test]
fn enum_and_literal_battery() {
    let species = Schema::Enum(
        MemberKind::Str,
        vec![
            Value::Str("PrionailurusViverrinus".to_string()),
            Value::Str("LynxLynx".to_string()),
        ],
    );
    assert_roundtrip(&species, Value::Str("LynxLynx".to_string()));
    let levels = Schema::Enum(MemberKind::Num, vec![Value::Int(0), Value::Int(10)]);
    assert_roundtrip(&levels, Value::Int(10));
    assert_roundtrip(&Schema::Literal(Value::Int(-7)), Value::Int(-7));
    assert_roundtrip(&Schema::Literal(Value::Bool(true)), Value::Bool(true));
}

#[test]
fn decorator_battery() {
    assert_roundtrip(&Schema::String.optional(), Value::Undefined);
    assert_roundtrip(&Schema::String.optional(), Value::Str("here".to_string()));
    assert_roundtrip(&Schema::String.nullable(), Value::Null);
    assert_roundtrip(&Schema::Number.branded().readonly(), Value::Int(12));
    assert_roundtrip(
        &Schema::Number.pipe(Schema::Number.refine(|v| matches!(v, Value::Int(_)))),
        Value::Int(3),
    );
    // Preprocess must be idempotent; re-validation on decode applies it again.
    let trimmed = Schema::String.preprocess(|v| match v {
        Value::Str(s) => Value::Str(s.trim().to_string()),
        v => v.clone(),
    });
    let bytes = encode(&trimmed, &Value::Str("  padded  ".to_string())).unwrap();
    assert_eq!(Value::Str("padded".to_string()), decode(&trimmed, &bytes).unwrap());
}

#[test]
fn intersection_roundtrips() {
    let schema = Schema::object(vec![("a", Schema::Number)])
        .and(Schema::object(vec![("b", Schema::String)]));
    assert_roundtrip(
        &schema,
        record(vec![("a", Value::Int(1)), ("b", Value::Str("x".to_string()))]),
    );
    assert_roundtrip(&Schema::Number.and(Schema::Number), Value::Int(5));
}

#[test]
fn catch_roundtrips_through_the_validator() {
    let schema = Schema::object(vec![("n", Schema::Number.catch(Value::Int(1)))]);
    // The replacement travels on the wire when the input is rejected.
    let bytes = encode(&schema, &record(vec![("n", Value::Str("bad".to_string()))])).unwrap();
    assert_eq!(record(vec![("n", Value::Int(1))]), decode(&schema, &bytes).unwrap());
}

#[test]
fn deep_nesting_roundtrips() {
    let mut schema = Schema::Number;
    let mut value = Value::Int(7);
    for _ in 0..64 {
        schema = Schema::array(schema);
        value = Value::Array(vec![value]);
    }
    assert_roundtrip(&schema, value);
}

proptest! {
    #[test]
    fn integers_roundtrip(n in any::<i64>()) {
        let bytes = encode(&Schema::Number, &Value::Int(n)).unwrap();
        prop_assert_eq!(Value::Int(n), decode(&Schema::Number, &bytes).unwrap());
    }

    #[test]
    fn integers_narrow_to_the_minimal_form(n in any::<i64>()) {
        let bytes = encode(&Schema::Number, &Value::Int(n)).unwrap();
        let expected = if i8::try_from(n).is_ok() {
            0x00
        } else if i16::try_from(n).is_ok() {
            0x02
        } else if i32::try_from(n).is_ok() {
            0x03
        } else {
            0x05
        };
        prop_assert_eq!(expected, bytes[9]);
    }

    #[test]
    fn floats_roundtrip(x in any::<f64>()) {
        let bytes = encode(&Schema::union(vec![Schema::Number, Schema::Nan]), &Value::F64(x)).unwrap();
        let back = decode(&Schema::union(vec![Schema::Number, Schema::Nan]), &bytes).unwrap();
        // Bitwise value equality treats NaN as equal to NaN.
        prop_assert_eq!(Value::F64(x), back);
    }

    #[test]
    fn strings_roundtrip(s in ".{0,300}") {
        let bytes = encode(&Schema::String, &Value::Str(s.clone())).unwrap();
        prop_assert_eq!(Value::Str(s), decode(&Schema::String, &bytes).unwrap());
    }
}
