//! A `Schema` describes the shape of a [`Value`]: one variant per wire family, one variant
//! per decorator, and one variant per kind the codec refuses outright. The original design
//! classifies schema nodes by identity checks against runtime classes; here the dispatcher
//! is exhaustive pattern matching and an unsupported shape simply has no variant to hide in.

use crate::value::Value;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// The declared member kind of a native enum. Enums dispatch on this, not on the
/// individual members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberKind {
    Str,
    Num,
}

/// A pure predicate attached by [`Schema::Refine`]. Never changes the value.
#[derive(Clone)]
pub struct Predicate(Rc<dyn Fn(&Value) -> bool>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Predicate(Rc::new(f))
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// An input transformation attached by [`Schema::Preprocess`]. Runs before the base schema
/// on both encode and re-validation, so it must be idempotent; this is documented, not
/// enforced.
#[derive(Clone)]
pub struct Preprocessor(Rc<dyn Fn(&Value) -> Value>);

impl Preprocessor {
    pub fn new(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Preprocessor(Rc::new(f))
    }

    pub fn apply(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Preprocessor")
    }
}

/// An output transformation attached by [`Schema::Transform`]. Runs after base-schema
/// parsing; the post-transform shape is not known structurally, so the codec never runs it
/// while encoding.
#[derive(Clone)]
pub struct Transformer(Rc<dyn Fn(&Value) -> Value>);

impl Transformer {
    pub fn new(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Transformer(Rc::new(f))
    }

    pub fn apply(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer")
    }
}

/// The lazy indirection that makes recursive schemas expressible: a reference-counted
/// once-settable cell. Clones share the cell, so a schema can reference itself through a
/// clone taken before [`LazySchema::resolve`].
#[derive(Clone)]
pub struct LazySchema(Rc<OnceCell<Schema>>);

impl LazySchema {
    pub fn unresolved() -> Self {
        LazySchema(Rc::new(OnceCell::new()))
    }

    /// Settles the cell. Returns the schema back if the cell was already resolved.
    pub fn resolve(&self, schema: Schema) -> Result<(), Schema> {
        self.0.set(schema)
    }

    pub fn get(&self) -> Option<&Schema> {
        self.0.get()
    }

    /// Identity of the underlying cell. Fingerprinting keys its visited set on this.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

// A resolved lazy node may be cyclic; printing the target would not terminate.
impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(_) => f.write_str("LazySchema(resolved)"),
            None => f.write_str("LazySchema(unresolved)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    // Concrete primitives.
    String,
    Number,
    BigInt,
    Bool,
    Date,
    Nan,
    /// Dispatched by the literal value's runtime kind.
    Literal(Value),
    /// Dispatched by the declared member kind.
    Enum(MemberKind, Vec<Value>),
    // Composites.
    Object {
        fields: Vec<(String, Schema)>,
        /// Unknown keys pass through validation. Such objects have no statically known
        /// shape and the codec refuses them.
        passthrough: bool,
    },
    Array(Box<Schema>),
    Tuple(Vec<Schema>),
    Set(Box<Schema>),
    Union(Vec<Schema>),
    /// A union whose options all carry a literal at the named key. Same wire form as
    /// [`Schema::Union`]; the discriminant only short-circuits option selection.
    DiscriminatedUnion(String, Vec<Schema>),
    /// String-keyed record: key schema, then value schema.
    Record(Box<Schema>, Box<Schema>),
    /// Arbitrarily keyed map: key schema, then value schema.
    Map(Box<Schema>, Box<Schema>),
    Intersection(Box<Schema>, Box<Schema>),
    // Decorators.
    Optional(Box<Schema>),
    Nullable(Box<Schema>),
    /// Inner schema plus the value that replaces an undefined input during validation.
    Default(Box<Schema>, Value),
    /// Inner schema plus the replacement produced when the inner schema rejects.
    Catch(Box<Schema>, Value),
    Lazy(LazySchema),
    Branded(Box<Schema>),
    Readonly(Box<Schema>),
    /// Input side, then output side. Only the input side shapes the wire.
    Pipeline(Box<Schema>, Box<Schema>),
    Refine(Box<Schema>, Predicate),
    Preprocess(Preprocessor, Box<Schema>),
    Transform(Box<Schema>, Transformer),
    // Kinds the codec refuses to serialize. Present so each gets its own rejection.
    Any,
    Unknown,
    Never,
    Void,
    Function,
    Symbol,
    Promise,
}

impl Schema {

    pub fn object(fields: Vec<(&str, Schema)>) -> Schema {
        Schema::Object {
            fields: fields.into_iter().map(|(n, s)| (n.to_string(), s)).collect(),
            passthrough: false,
        }
    }

    pub fn passthrough_object(fields: Vec<(&str, Schema)>) -> Schema {
        Schema::Object {
            fields: fields.into_iter().map(|(n, s)| (n.to_string(), s)).collect(),
            passthrough: true,
        }
    }

    pub fn array(element: Schema) -> Schema {
        Schema::Array(Box::new(element))
    }

    pub fn tuple(items: Vec<Schema>) -> Schema {
        Schema::Tuple(items)
    }

    pub fn set_of(element: Schema) -> Schema {
        Schema::Set(Box::new(element))
    }

    pub fn union(options: Vec<Schema>) -> Schema {
        Schema::Union(options)
    }

    pub fn discriminated_union(key: &str, options: Vec<Schema>) -> Schema {
        Schema::DiscriminatedUnion(key.to_string(), options)
    }

    pub fn record(key: Schema, value: Schema) -> Schema {
        Schema::Record(Box::new(key), Box::new(value))
    }

    pub fn map(key: Schema, value: Schema) -> Schema {
        Schema::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(self) -> Schema {
        Schema::Optional(Box::new(self))
    }

    pub fn nullable(self) -> Schema {
        Schema::Nullable(Box::new(self))
    }

    pub fn branded(self) -> Schema {
        Schema::Branded(Box::new(self))
    }

    pub fn readonly(self) -> Schema {
        Schema::Readonly(Box::new(self))
    }

    pub fn with_default(self, value: Value) -> Schema {
        Schema::Default(Box::new(self), value)
    }

    pub fn catch(self, replacement: Value) -> Schema {
        Schema::Catch(Box::new(self), replacement)
    }

    pub fn and(self, other: Schema) -> Schema {
        Schema::Intersection(Box::new(self), Box::new(other))
    }

    pub fn pipe(self, output: Schema) -> Schema {
        Schema::Pipeline(Box::new(self), Box::new(output))
    }

    pub fn refine(self, predicate: impl Fn(&Value) -> bool + 'static) -> Schema {
        Schema::Refine(Box::new(self), Predicate::new(predicate))
    }

    pub fn preprocess(self, f: impl Fn(&Value) -> Value + 'static) -> Schema {
        Schema::Preprocess(Preprocessor::new(f), Box::new(self))
    }

    pub fn transform(self, f: impl Fn(&Value) -> Value + 'static) -> Schema {
        Schema::Transform(Box::new(self), Transformer::new(f))
    }

    /// Peels decorators that leave the object shape untouched and yields the field list,
    /// or `None` for anything that is not (a decorated) object. Used to merge intersected
    /// records and to probe discriminated-union options.
    pub fn as_object(&self) -> Option<(&[(String, Schema)], bool)> {
        match self {
            Schema::Object { fields, passthrough } => Some((fields, *passthrough)),
            Schema::Branded(inner)
            | Schema::Readonly(inner)
            | Schema::Refine(inner, _) => inner.as_object(),
            Schema::Lazy(lazy) => lazy.get().and_then(|s| s.as_object()),
            _ => None,
        }
    }

    /// The literal carried at `key` by this (decorated) object schema, if any. Option
    /// selection in discriminated unions matches on this.
    pub fn discriminant(&self, key: &str) -> Option<&Value> {
        let (fields, _) = self.as_object()?;
        let (_, field) = fields.iter().find(|(name, _)| name == key)?;
        match field.strip() {
            Schema::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Peels all value-preserving decorators down to the first structural node.
    pub fn strip(&self) -> &Schema {
        match self {
            Schema::Branded(inner)
            | Schema::Readonly(inner)
            | Schema::Refine(inner, _)
            | Schema::Optional(inner)
            | Schema::Nullable(inner) => inner.strip(),
            Schema::Lazy(lazy) => match lazy.get() {
                Some(inner) => inner.strip(),
                None => self,
            },
            _ => self,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::{LazySchema, Schema};
    use crate::value::Value;

    #[test]
    fn lazy_resolves_once() {
        let lazy = LazySchema::unresolved();
        assert!(lazy.get().is_none());
        assert!(lazy.resolve(Schema::Number).is_ok());
        assert!(lazy.resolve(Schema::String).is_err());
        assert!(matches!(lazy.get(), Some(Schema::Number)));
    }

    #[test]
    fn lazy_clones_share_the_cell() {
        let lazy = LazySchema::unresolved();
        let alias = lazy.clone();
        assert_eq!(lazy.key(), alias.key());
        assert!(lazy.resolve(Schema::Bool).is_ok());
        assert!(matches!(alias.get(), Some(Schema::Bool)));
        assert_ne!(lazy.key(), LazySchema::unresolved().key());
    }

    #[test]
    fn discriminant_sees_through_decorators() {
        let option = Schema::object(vec![
            ("t", Schema::Literal(Value::Str("p".to_string()))),
            ("n", Schema::Number),
        ])
        .readonly();
        assert_eq!(Some(&Value::Str("p".to_string())), option.discriminant("t"));
        assert_eq!(None, option.discriminant("n"));
    }

    #[test]
    fn debug_of_cyclic_schema_terminates() {
        let lazy = LazySchema::unresolved();
        let node = Schema::object(vec![
            ("v", Schema::Number),
            ("next", Schema::Lazy(lazy.clone()).optional()),
        ]);
        lazy.resolve(node.clone()).ok();
        let printed = format!("{:?}", node);
        assert!(printed.contains("LazySchema(resolved)"));
    }
}
