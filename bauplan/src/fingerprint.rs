//! The schema-identity fingerprint: a 64-bit FNV-1a hash over a canonical structural
//! summary of the schema. The summary holds one wire-family byte per node (subtag bits are
//! deliberately not part of it), node before children, children in declared order.
//! Decorators contribute nothing and delegate to their inner schema, so a renamed or
//! freshly-branded field keeps the fingerprint while a reordered, added or removed one
//! changes it. The hash function is part of the on-wire contract.

use crate::error::Unsupported;
use crate::header::{Tag, MAX_UNION_ARITY};
use bauplan_schema::{MemberKind, Schema, Value};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Computes the fingerprint of a schema, or the refusal that makes it unserializable.
pub fn fingerprint(schema: &Schema) -> Result<u64, Unsupported> {
    let mut summary = Vec::new();
    let mut visited = Vec::new();
    summarize(schema, &mut summary, &mut visited)?;
    Ok(fnv1a(&summary))
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ *byte as u64).wrapping_mul(FNV_PRIME))
}

/// The wire family a literal of this value kind travels under.
fn value_tag(value: &Value) -> Tag {
    match value {
        Value::Bool(_) | Value::Int(_) | Value::BigInt(_) | Value::F64(_) => Tag::Num,
        Value::Str(_) => Tag::Str,
        Value::Date(_) => Tag::Date,
        Value::Null | Value::Undefined | Value::Record(_) => Tag::Obj,
        Value::Array(_) | Value::Set(_) => Tag::Seq,
        Value::Map(_) => Tag::Map,
    }
}

fn summarize(schema: &Schema, out: &mut Vec<u8>, visited: &mut Vec<usize>) -> Result<(), Unsupported> {
    match schema {
        Schema::Number | Schema::BigInt | Schema::Bool | Schema::Nan => {
            out.push(Tag::Num as u8);
            Ok(())
        }
        Schema::String => {
            out.push(Tag::Str as u8);
            Ok(())
        }
        Schema::Date => {
            out.push(Tag::Date as u8);
            Ok(())
        }
        Schema::Literal(value) => {
            out.push(value_tag(value) as u8);
            Ok(())
        }
        Schema::Enum(kind, _) => {
            out.push(match kind {
                MemberKind::Str => Tag::Str as u8,
                MemberKind::Num => Tag::Num as u8,
            });
            Ok(())
        }
        Schema::Object { fields, passthrough } => {
            if *passthrough {
                return Err(Unsupported::Passthrough);
            }
            out.push(Tag::Obj as u8);
            for (_, field) in fields {
                summarize(field, out, visited)?;
            }
            Ok(())
        }
        Schema::Array(element) | Schema::Set(element) => {
            out.push(Tag::Seq as u8);
            summarize(element, out, visited)
        }
        Schema::Tuple(items) => {
            out.push(Tag::Seq as u8);
            for item in items {
                summarize(item, out, visited)?;
            }
            Ok(())
        }
        Schema::Union(options) | Schema::DiscriminatedUnion(_, options) => {
            if options.len() > MAX_UNION_ARITY {
                return Err(Unsupported::UnionArity(options.len()));
            }
            out.push(Tag::Union as u8);
            for option in options {
                summarize(option, out, visited)?;
            }
            Ok(())
        }
        Schema::Record(key, value) | Schema::Map(key, value) => {
            out.push(Tag::Map as u8);
            summarize(key, out, visited)?;
            summarize(value, out, visited)
        }
        Schema::Intersection(left, right) => {
            summarize(left, out, visited)?;
            summarize(right, out, visited)
        }
        Schema::Optional(inner)
        | Schema::Nullable(inner)
        | Schema::Branded(inner)
        | Schema::Readonly(inner)
        | Schema::Default(inner, _)
        | Schema::Catch(inner, _)
        | Schema::Refine(inner, _)
        | Schema::Transform(inner, _) => summarize(inner, out, visited),
        Schema::Preprocess(_, inner) => summarize(inner, out, visited),
        Schema::Pipeline(input, _) => summarize(input, out, visited),
        Schema::Lazy(lazy) => {
            let target = lazy.get().ok_or(Unsupported::UnresolvedLazy)?;
            if visited.contains(&lazy.key()) {
                return Ok(());
            }
            visited.push(lazy.key());
            summarize(target, out, visited)
        }
        Schema::Any => Err(Unsupported::Any),
        Schema::Unknown => Err(Unsupported::Unknown),
        Schema::Never => Err(Unsupported::Never),
        Schema::Void => Err(Unsupported::Void),
        Schema::Function => Err(Unsupported::Function),
        Schema::Symbol => Err(Unsupported::Symbol),
        Schema::Promise => Err(Unsupported::Promise),
    }
}

#[cfg(test)]
mod tests {
    use super::{fingerprint, fnv1a};
    use crate::error::Unsupported;
    use bauplan_schema::{LazySchema, Schema, Value};

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(0xcbf2_9ce4_8422_2325, fnv1a(b""));
        assert_eq!(0xaf63_dc4c_8601_ec8c, fnv1a(b"a"));
        assert_eq!(0x8594_4171_f739_67e8, fnv1a(b"foobar"));
    }

    #[test]
    fn renaming_a_field_keeps_the_fingerprint() {
        let a = Schema::object(vec![("a", Schema::String), ("b", Schema::Number)]);
        let b = Schema::object(vec![("x", Schema::String), ("y", Schema::Number)]);
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn structural_changes_move_the_fingerprint() {
        let base = Schema::object(vec![("a", Schema::String), ("b", Schema::Number)]);
        let reordered = Schema::object(vec![("b", Schema::Number), ("a", Schema::String)]);
        let grown = Schema::object(vec![
            ("a", Schema::String),
            ("b", Schema::Number),
            ("c", Schema::Bool),
        ]);
        let shrunk = Schema::object(vec![("a", Schema::String)]);
        let retagged = Schema::object(vec![("a", Schema::Date), ("b", Schema::Number)]);
        let base_print = fingerprint(&base).unwrap();
        assert_ne!(base_print, fingerprint(&reordered).unwrap());
        assert_ne!(base_print, fingerprint(&grown).unwrap());
        assert_ne!(base_print, fingerprint(&shrunk).unwrap());
        assert_ne!(base_print, fingerprint(&retagged).unwrap());
    }

    #[test]
    fn union_arity_moves_the_fingerprint() {
        let two = Schema::union(vec![Schema::String, Schema::Number]);
        let three = Schema::union(vec![Schema::String, Schema::Number, Schema::Bool]);
        assert_ne!(fingerprint(&two).unwrap(), fingerprint(&three).unwrap());
    }

    #[test]
    fn decorators_are_transparent() {
        let plain = Schema::object(vec![("a", Schema::String)]);
        let decorated = Schema::object(vec![(
            "a",
            Schema::String
                .optional()
                .nullable()
                .branded()
                .readonly()
                .with_default(Value::Str(String::new()))
                .refine(|_| true),
        )]);
        assert_eq!(fingerprint(&plain).unwrap(), fingerprint(&decorated).unwrap());
    }

    #[test]
    fn record_and_map_share_a_family() {
        // Subtag bits are not part of the summary, so the container kind flag is invisible.
        let record = Schema::record(Schema::String, Schema::Number);
        let map = Schema::map(Schema::String, Schema::Number);
        assert_eq!(fingerprint(&record).unwrap(), fingerprint(&map).unwrap());
    }

    #[test]
    fn lazy_recursion_terminates() {
        let lazy = LazySchema::unresolved();
        let node = Schema::object(vec![
            ("v", Schema::Number),
            ("next", Schema::Lazy(lazy.clone()).optional()),
        ]);
        lazy.resolve(node.clone()).ok();
        let print = fingerprint(&node).unwrap();
        assert_eq!(print, fingerprint(&node).unwrap());
    }

    #[test]
    fn lazy_nodes_are_visited_once_per_instance() {
        let shared = LazySchema::unresolved();
        shared.resolve(Schema::Number).ok();
        let first = LazySchema::unresolved();
        first.resolve(Schema::Number).ok();
        let second = LazySchema::unresolved();
        second.resolve(Schema::Number).ok();
        // Re-visits of one node are silent; two distinct nodes of the same shape both count.
        let revisited = Schema::tuple(vec![Schema::Lazy(shared.clone()), Schema::Lazy(shared)]);
        let distinct = Schema::tuple(vec![Schema::Lazy(first), Schema::Lazy(second)]);
        assert_ne!(fingerprint(&revisited).unwrap(), fingerprint(&distinct).unwrap());
        assert_eq!(
            fingerprint(&revisited).unwrap(),
            fingerprint(&Schema::tuple(vec![Schema::Number])).unwrap()
        );
    }

    #[test]
    fn refusals() {
        assert_eq!(Err(Unsupported::Any), fingerprint(&Schema::Any));
        assert_eq!(Err(Unsupported::Promise), fingerprint(&Schema::Promise));
        assert_eq!(
            Err(Unsupported::Passthrough),
            fingerprint(&Schema::passthrough_object(vec![("a", Schema::String)]))
        );
        assert_eq!(
            Err(Unsupported::UnionArity(33)),
            fingerprint(&Schema::union(vec![Schema::Number; 33]))
        );
        assert_eq!(
            Err(Unsupported::UnresolvedLazy),
            fingerprint(&Schema::Lazy(LazySchema::unresolved()))
        );
    }
}
