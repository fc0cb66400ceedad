//! Custom matcher kinds
//!
//! Any type implementing [`Matcher`] can be embedded in a pattern. Kinds that
//! should be constructible from plain data are registered in a
//! [`MatcherRegistry`] under a discriminant tag and built by the compiler from
//! a `(kind, argument)` pair.

use crate::compile::{Compiler, RawPattern};
use crate::error::{MatchError, MatchResult};
use crate::pattern::Pattern;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Extension point for new matcher kinds
pub trait Matcher: fmt::Debug + Send + Sync {
    /// Discriminant tag of this matcher kind
    fn kind(&self) -> &str;

    /// Match `subject`, returning the destructured value on success
    fn match_value(&self, subject: &Value) -> Option<Value>;
}

/// Builds a matcher from its compiler and data argument
pub type MatcherFactory =
    Arc<dyn Fn(&Compiler, &Value) -> MatchResult<Arc<dyn Matcher>> + Send + Sync>;

/// Registry of matcher kinds constructible from data
#[derive(Clone)]
pub struct MatcherRegistry {
    factories: HashMap<String, MatcherFactory>,
}

impl MatcherRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in kinds (`path`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(PathMatcher::KIND, |compiler, argument| {
            Ok(Arc::new(PathMatcher::from_argument(compiler, argument)?) as Arc<dyn Matcher>)
        });
        registry
    }

    /// Register a factory, replacing any previous one with the same kind
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&Compiler, &Value) -> MatchResult<Arc<dyn Matcher>> + Send + Sync + 'static,
    {
        self.factories
            .insert(kind.into(), Arc::new(factory))
            .is_some()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub(crate) fn build(
        &self,
        compiler: &Compiler,
        kind: &str,
        argument: &Value,
    ) -> MatchResult<Arc<dyn Matcher>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| MatchError::UnknownMatcherKind(kind.to_string()))?;
        factory(compiler, argument)
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// One step of a [`PathMatcher`] descent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    Field(String),
    Index(usize),
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        PathKey::Field(key.to_string())
    }
}

impl From<String> for PathKey {
    fn from(key: String) -> Self {
        PathKey::Field(key)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

/// Matches a pattern against a value nested inside the subject
///
/// The descent is null-safe: a missing field or index yields `Undefined`
/// rather than failing. On success the subject itself is the destructured
/// value, so several paths can be combined under a conjunction.
#[derive(Debug)]
pub struct PathMatcher {
    keys: Vec<PathKey>,
    pattern: Pattern,
}

impl PathMatcher {
    pub const KIND: &'static str = "path";

    pub fn new(pattern: Pattern, keys: Vec<PathKey>) -> Self {
        Self { keys, pattern }
    }

    /// Build from `{ "keys": [..], "pattern": .. }`; a missing pattern is a wildcard
    pub fn from_argument(compiler: &Compiler, argument: &Value) -> MatchResult<Self> {
        let object = argument
            .as_object()
            .ok_or_else(|| MatchError::invalid_argument(Self::KIND, "argument must be an object"))?;
        let keys = object
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| MatchError::invalid_argument(Self::KIND, "`keys` must be an array"))?
            .iter()
            .map(|key| match key {
                Value::String(field) => Ok(PathKey::Field(field.clone())),
                Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(PathKey::Index(*n as usize)),
                other => Err(MatchError::invalid_argument(
                    Self::KIND,
                    format!("unsupported key {other}"),
                )),
            })
            .collect::<MatchResult<Vec<_>>>()?;
        let pattern = match object.get("pattern") {
            Some(raw) => compiler.compile(RawPattern::Value(raw.clone()))?,
            None => Pattern::any(),
        };
        Ok(Self::new(pattern, keys))
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    fn resolve<'v>(&self, subject: &'v Value) -> &'v Value {
        self.keys.iter().fold(subject, |value, key| match key {
            PathKey::Field(field) => &value[field.as_str()],
            PathKey::Index(index) => &value[*index],
        })
    }
}

impl Matcher for PathMatcher {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn match_value(&self, subject: &Value) -> Option<Value> {
        self.pattern
            .match_value(self.resolve(subject))
            .map(|_| subject.clone())
    }
}
