//! Dynamic value model matched by patterns
//!
//! Subjects are plain data: primitives, arrays, keyed objects (optionally
//! instances of a [`Class`]), regular expressions and class values. The
//! matcher only inspects type and shape, so this module carries just enough
//! behaviour for that: strict equality, instance-of checks and string
//! coercion for regular-expression subjects.

use crate::error::MatchResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

static UNDEFINED: Value = Value::Undefined;

/// A named class with single inheritance
///
/// Classes are compared by identity, never by name: two classes created with
/// the same name are unrelated.
#[derive(Debug)]
pub struct Class {
    name: String,
    parent: Option<Arc<Class>>,
}

struct BuiltinClasses {
    object: Arc<Class>,
    array: Arc<Class>,
    regexp: Arc<Class>,
}

// Initialised on first use and never mutated afterwards.
static BUILTINS: Lazy<BuiltinClasses> = Lazy::new(|| {
    let object = Arc::new(Class {
        name: "Object".to_string(),
        parent: None,
    });
    let array = Arc::new(Class {
        name: "Array".to_string(),
        parent: Some(Arc::clone(&object)),
    });
    let regexp = Arc::new(Class {
        name: "RegExp".to_string(),
        parent: Some(Arc::clone(&object)),
    });
    BuiltinClasses { object, array, regexp }
});

impl Class {
    /// Create a new class deriving directly from `Object`
    pub fn new(name: impl Into<String>) -> Arc<Class> {
        Self::extends(name, Class::object())
    }

    /// Create a new class deriving from `parent`
    pub fn extends(name: impl Into<String>, parent: &Arc<Class>) -> Arc<Class> {
        Arc::new(Class {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
        })
    }

    /// The built-in root class every object, array and regex is an instance of
    pub fn object() -> &'static Arc<Class> {
        &BUILTINS.object
    }

    /// The built-in class of array values
    pub fn array() -> &'static Arc<Class> {
        &BUILTINS.array
    }

    /// The built-in class of regular expression values
    pub fn regexp() -> &'static Arc<Class> {
        &BUILTINS.regexp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    /// Check whether `self` is `other` or inherits from it
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, other) {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Class {}

/// Keyed mapping value, optionally an instance of a user class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    class: Option<Arc<Class>>,
    fields: BTreeMap<String, Value>,
}

impl Object {
    /// Create an empty plain object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty instance of `class`
    pub fn instance(class: &Arc<Class>) -> Self {
        Self {
            class: Some(Arc::clone(class)),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The user class this object is an instance of, `None` for plain objects
    pub fn class(&self) -> Option<&Arc<Class>> {
        self.class.as_ref()
    }

    /// Create an empty object of the same class
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            class: self.class.clone(),
            fields: BTreeMap::new(),
        }
    }
}

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    RegExp,
    Class,
}

impl ValueKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::RegExp => "regexp",
            ValueKind::Class => "class",
        }
    }
}

/// A dynamically typed value
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Regex(Regex),
    Class(Arc<Class>),
}

impl Value {
    /// Compile `pattern` into a regular expression value
    pub fn regex(pattern: &str) -> MatchResult<Value> {
        Ok(Value::Regex(Regex::new(pattern)?))
    }

    /// Parse JSON text into a value
    pub fn from_json(json: &str) -> MatchResult<Value> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Ok(parsed.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Regex(_) => ValueKind::RegExp,
            Value::Class(_) => ValueKind::Class,
        }
    }

    /// Primitives are the values a literal pattern can hold
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// Strict (`===`) equality
    ///
    /// Primitives compare by value with IEEE semantics (`NaN` is unequal to
    /// itself, `0` equals `-0`); classes compare by identity. Compound values
    /// carry no identity here and are never strictly equal.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The class this value is an instance of, if any
    pub fn class_of(&self) -> Option<&Arc<Class>> {
        match self {
            Value::Array(_) => Some(Class::array()),
            Value::Regex(_) => Some(Class::regexp()),
            Value::Object(obj) => Some(obj.class().unwrap_or(Class::object())),
            _ => None,
        }
    }

    /// Instance-of check walking the class chain
    pub fn instance_of(&self, class: &Class) -> bool {
        self.class_of()
            .map_or(false, |own| own.is_subclass_of(class))
    }

    /// Coerce to a string the way a dynamic host does for `String(value)`
    ///
    /// Classes have no source text here, so a class coerces to `class Name`
    /// rather than its declaration.
    pub fn coerce_to_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.coerce_to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Regex(re) => format!("/{}/", re.as_str()),
            Value::Class(class) => format!("class {}", class.name()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the number as an integer if it has no fractional part
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Look up an object field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form carries an explicit sign: 1e+21, 1e-7
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    /// Structural equality, used for comparing destructured results
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            _ => self.strict_eq(other),
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Missing keys and non-object values index to `Undefined`
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&UNDEFINED)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_array()
            .and_then(|items| items.get(index))
            .unwrap_or(&UNDEFINED)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => {
                if let Some(class) = obj.class() {
                    write!(f, "{} ", class.name())?;
                }
                if obj.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in obj.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, " }}")
            }
            Value::Regex(re) => write!(f, "/{}/", re.as_str()),
            Value::Class(class) => write!(f, "[class {}]", class.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Regex> for Value {
    fn from(re: Regex) -> Self {
        Value::Regex(re)
    }
}

impl From<Arc<Class>> for Value {
    fn from(class: Arc<Class>) -> Self {
        Value::Class(class)
    }
}

impl From<&Arc<Class>> for Value {
    fn from(class: &Arc<Class>) -> Self {
        Value::Class(Arc::clone(class))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut obj = Object::new();
                for (key, value) in map {
                    obj.insert(key, Value::from(value));
                }
                Value::Object(obj)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_distinguishes_types() {
        assert!(Value::from(1).strict_eq(&Value::from(1.0)));
        assert!(!Value::from(1).strict_eq(&Value::from("1")));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
        assert!(Value::Number(0.0).strict_eq(&Value::Number(-0.0)));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(!Value::from(vec![1]).strict_eq(&Value::from(vec![1])));
    }

    #[test]
    fn instance_of_walks_the_class_chain() {
        let foo = Class::new("Foo");
        let bar = Class::extends("Bar", &foo);
        let bar_instance = Value::from(Object::instance(&bar).with("x", 1));

        assert!(bar_instance.instance_of(&bar));
        assert!(bar_instance.instance_of(&foo));
        assert!(bar_instance.instance_of(Class::object()));
        assert!(!Value::from(Object::new()).instance_of(&foo));
        assert!(Value::from(vec![1, 2]).instance_of(Class::object()));
        assert!(!Value::from("foo").instance_of(Class::object()));
    }

    #[test]
    fn classes_with_equal_names_are_distinct() {
        let a = Class::new("Foo");
        let b = Class::new("Foo");
        assert!(!a.is_subclass_of(&b));
        assert!(!Value::from(&a).strict_eq(&Value::from(&b)));
    }

    #[test]
    fn string_coercion_follows_host_rules() {
        assert_eq!(Value::from(1).coerce_to_string(), "1");
        assert_eq!(Value::from(1.5).coerce_to_string(), "1.5");
        assert_eq!(Value::Number(-0.0).coerce_to_string(), "0");
        assert_eq!(Value::Number(1e21).coerce_to_string(), "1e+21");
        assert_eq!(Value::Number(-1.5e22).coerce_to_string(), "-1.5e+22");
        assert_eq!(Value::Number(1e-7).coerce_to_string(), "1e-7");
        assert_eq!(Value::Number(2.5e-8).coerce_to_string(), "2.5e-8");
        assert_eq!(Value::Number(1e20).coerce_to_string(), "100000000000000000000");
        assert_eq!(Value::Number(0.000001).coerce_to_string(), "0.000001");
        assert_eq!(Value::Undefined.coerce_to_string(), "undefined");
        assert_eq!(
            Value::Array(vec![Value::from(1), Value::Null, Value::from("a")]).coerce_to_string(),
            "1,,a"
        );
        assert_eq!(Value::from(Object::new()).coerce_to_string(), "[object Object]");
        assert_eq!(Value::from(&Class::new("Foo")).coerce_to_string(), "class Foo");
    }

    #[test]
    fn json_conversion_and_indexing() {
        let value = Value::from_json(r#"{"x": {"y": [1, "two", null]}}"#).unwrap();
        assert_eq!(value["x"]["y"][0], Value::from(1));
        assert_eq!(value["x"]["y"][1].as_str(), Some("two"));
        assert_eq!(value["x"]["y"][2], Value::Null);
        assert!(value["missing"].is_undefined());
        assert!(value["x"]["y"][10].is_undefined());
    }

    #[test]
    fn display_is_readable() {
        let foo = Class::new("Foo");
        let value = Value::from(Object::instance(&foo).with("x", 1).with("y", "a"));
        assert_eq!(value.to_string(), r#"Foo { x: 1, y: "a" }"#);
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }
}
