//! Pattern compiler and pattern builders
//!
//! Raw patterns are cheap, infallible descriptions built with the functions
//! in this module or converted from plain values. [`Compiler::compile`] turns
//! them into [`Pattern`]s, rejecting malformed shapes up front.

use crate::config::{ExtraKeys, MatchConfig};
use crate::error::{MatchError, MatchResult};
use crate::pattern::{
    Extractor, Guard, MappingPattern, Node, Pattern, RegexPattern, SequencePattern, TypeTag,
};
use crate::registry::{Matcher, MatcherRegistry, PathKey, PathMatcher};
use crate::value::{Class, Object, Value};
use regex::Regex;
use std::sync::Arc;

/// An uncompiled pattern description
#[derive(Debug, Clone)]
pub enum RawPattern {
    /// Plain data: primitives are literals, `Undefined` is a wildcard, arrays
    /// and objects compile structurally, regexes and classes as themselves
    Value(Value),
    /// Wildcard sentinel
    Any,
    /// Open-tail sentinel, only valid directly inside a sequence
    Rest,
    Seq(Vec<RawPattern>),
    Map {
        entries: Vec<(String, RawPattern)>,
        extra_keys: Option<ExtraKeys>,
    },
    Or(Vec<RawPattern>),
    And(Vec<RawPattern>),
    Path {
        pattern: Box<RawPattern>,
        keys: Vec<PathKey>,
    },
    /// A kind looked up in the compiler's registry
    Registered {
        kind: String,
        argument: Value,
    },
    Custom(Arc<dyn Matcher>),
    /// Already compiled; passes through the compiler unchanged
    Compiled(Pattern),
    Tagged {
        tag: TypeTag,
        pattern: Box<RawPattern>,
    },
    Guarded {
        pattern: Box<RawPattern>,
        guard: Guard,
    },
}

impl RawPattern {
    /// Attach a guard evaluated on the destructured value
    pub fn when(self, guard: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        RawPattern::Guarded {
            pattern: Box::new(self),
            guard: Guard::new(guard),
        }
    }

    /// Attach a type tag checked before the pattern
    pub fn tagged(self, tag: TypeTag) -> Self {
        RawPattern::Tagged {
            tag,
            pattern: Box::new(self),
        }
    }
}

/// The wildcard sentinel
pub fn any() -> RawPattern {
    RawPattern::Any
}

/// The rest sentinel for open-ended sequences
pub fn rest() -> RawPattern {
    RawPattern::Rest
}

/// Ordered sequence pattern
pub fn seq<I, P>(items: I) -> RawPattern
where
    I: IntoIterator<Item = P>,
    P: Into<RawPattern>,
{
    RawPattern::Seq(items.into_iter().map(Into::into).collect())
}

fn entries<I, K, P>(entries: I) -> Vec<(String, RawPattern)>
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<RawPattern>,
{
    entries
        .into_iter()
        .map(|(key, pattern)| (key.into(), pattern.into()))
        .collect()
}

/// Keyed mapping pattern using the configured extra-key policy
pub fn map<I, K, P>(items: I) -> RawPattern
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<RawPattern>,
{
    RawPattern::Map {
        entries: entries(items),
        extra_keys: None,
    }
}

/// Mapping pattern that rejects unlisted subject keys
pub fn strict_map<I, K, P>(items: I) -> RawPattern
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<RawPattern>,
{
    RawPattern::Map {
        entries: entries(items),
        extra_keys: Some(ExtraKeys::Reject),
    }
}

/// Mapping pattern that tolerates unlisted subject keys
pub fn loose_map<I, K, P>(items: I) -> RawPattern
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<RawPattern>,
{
    RawPattern::Map {
        entries: entries(items),
        extra_keys: Some(ExtraKeys::Ignore),
    }
}

/// Disjunction; attach a guard with [`RawPattern::when`]
pub fn or<I, P>(alternatives: I) -> RawPattern
where
    I: IntoIterator<Item = P>,
    P: Into<RawPattern>,
{
    RawPattern::Or(alternatives.into_iter().map(Into::into).collect())
}

/// Conjunction; attach a guard with [`RawPattern::when`]
pub fn and<I, P>(conjuncts: I) -> RawPattern
where
    I: IntoIterator<Item = P>,
    P: Into<RawPattern>,
{
    RawPattern::And(conjuncts.into_iter().map(Into::into).collect())
}

/// Match `pattern` against the value found by descending `keys`
pub fn path<P, I, K>(pattern: P, keys: I) -> RawPattern
where
    P: Into<RawPattern>,
    I: IntoIterator<Item = K>,
    K: Into<PathKey>,
{
    RawPattern::Path {
        pattern: Box::new(pattern.into()),
        keys: keys.into_iter().map(Into::into).collect(),
    }
}

/// Require the subject to be an instance of `class` before matching `pattern`
pub fn instance_of(class: &Arc<Class>, pattern: impl Into<RawPattern>) -> RawPattern {
    pattern.into().tagged(TypeTag::Instance(Arc::clone(class)))
}

/// Run `extract` before `pattern`, matching `pattern` against its output
pub fn extract(
    name: impl Into<String>,
    extract: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    pattern: impl Into<RawPattern>,
) -> RawPattern {
    pattern
        .into()
        .tagged(TypeTag::Extract(Extractor::new(name, extract)))
}

/// A matcher kind built from the compiler's registry
pub fn registered(kind: impl Into<String>, argument: impl Into<Value>) -> RawPattern {
    RawPattern::Registered {
        kind: kind.into(),
        argument: argument.into(),
    }
}

/// Embed a custom matcher
pub fn custom(matcher: impl Matcher + 'static) -> RawPattern {
    RawPattern::Custom(Arc::new(matcher))
}

/// Compile with the default configuration
pub fn pattern(raw: impl Into<RawPattern>) -> MatchResult<Pattern> {
    Compiler::default().compile(raw)
}

/// Turns raw patterns into compiled matchers
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: MatchConfig,
    registry: MatcherRegistry,
}

impl Compiler {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            registry: MatcherRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: MatcherRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MatcherRegistry {
        &mut self.registry
    }

    /// Compile a raw pattern
    pub fn compile(&self, raw: impl Into<RawPattern>) -> MatchResult<Pattern> {
        self.compile_at(raw.into(), 0)
    }

    fn compile_at(&self, raw: RawPattern, depth: usize) -> MatchResult<Pattern> {
        if depth >= self.config.max_pattern_depth {
            return Err(MatchError::PatternTooDeep {
                limit: self.config.max_pattern_depth,
            });
        }

        match raw {
            RawPattern::Compiled(pattern) => Ok(pattern),
            RawPattern::Value(value) => self.compile_value(value, depth),
            RawPattern::Any => Ok(Pattern::any()),
            RawPattern::Rest => Err(MatchError::unsupported(
                "rest marker outside of a sequence",
            )),
            RawPattern::Seq(items) => self.compile_sequence(items, depth),
            RawPattern::Map {
                entries,
                extra_keys,
            } => self.compile_mapping(entries, extra_keys, depth),
            RawPattern::Or(alternatives) => Ok(Pattern::new(Node::Or(
                self.compile_alternatives("or", alternatives, depth)?,
            ))),
            RawPattern::And(conjuncts) => Ok(Pattern::new(Node::And(
                self.compile_alternatives("and", conjuncts, depth)?,
            ))),
            RawPattern::Path { pattern, keys } => {
                let inner = self.compile_at(*pattern, depth + 1)?;
                Ok(Pattern::new(Node::Custom(Arc::new(PathMatcher::new(
                    inner, keys,
                )))))
            }
            RawPattern::Registered { kind, argument } => {
                let matcher = self.registry.build(self, &kind, &argument)?;
                Ok(Pattern::new(Node::Custom(matcher)))
            }
            RawPattern::Custom(matcher) => Ok(Pattern::new(Node::Custom(matcher))),
            RawPattern::Tagged { tag, pattern } => {
                Ok(self.compile_at(*pattern, depth)?.with_tag(tag))
            }
            RawPattern::Guarded { pattern, guard } => {
                let compiled = self.compile_at(*pattern, depth)?;
                if self.config.enable_guards {
                    Ok(compiled.with_guard(guard))
                } else {
                    pm_log_debug!(kind = compiled.kind_name(), "guards disabled, dropping guard");
                    Ok(compiled)
                }
            }
        }
    }

    fn compile_value(&self, value: Value, depth: usize) -> MatchResult<Pattern> {
        match value {
            Value::Undefined => Ok(Pattern::any()),
            Value::Number(n) if n.is_nan() => {
                Err(MatchError::unsupported("NaN literal can never match"))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(Pattern::new(Node::Literal(value)))
            }
            Value::Array(items) => {
                self.compile_sequence(items.into_iter().map(RawPattern::Value).collect(), depth)
            }
            Value::Object(object) => self.compile_object(object, depth),
            Value::Regex(regex) => Ok(Pattern::new(Node::Regex(RegexPattern::new(
                regex,
                self.config.coerce_regex_subjects,
            )))),
            Value::Class(class) => Ok(Pattern::any().with_tag(TypeTag::Instance(class))),
        }
    }

    /// An instance used as a pattern also requires the subject's class
    fn compile_object(&self, object: Object, depth: usize) -> MatchResult<Pattern> {
        let class = object.class().cloned();
        let entries = object
            .iter()
            .map(|(key, value)| (key.to_string(), RawPattern::Value(value.clone())))
            .collect();
        let mapping = self.compile_mapping(entries, None, depth)?;
        Ok(match class {
            Some(class) => mapping.with_tag(TypeTag::Instance(class)),
            None => mapping,
        })
    }

    #[cfg_attr(feature = "minimal-logging", allow(unused_variables))]
    fn compile_sequence(&self, items: Vec<RawPattern>, depth: usize) -> MatchResult<Pattern> {
        let total = items.len();
        let mut compiled = Vec::with_capacity(total);
        let mut open = false;
        for item in items {
            if matches!(item, RawPattern::Rest) {
                open = true;
                break;
            }
            compiled.push(self.compile_at(item, depth + 1)?);
        }

        let ignored = total - compiled.len() - usize::from(open);
        if ignored > 0 {
            pm_log_warn!(ignored, "sequence elements after the rest marker are ignored");
        }
        Ok(Pattern::new(Node::Sequence(SequencePattern::new(compiled, open))))
    }

    fn compile_mapping(
        &self,
        entries: Vec<(String, RawPattern)>,
        extra_keys: Option<ExtraKeys>,
        depth: usize,
    ) -> MatchResult<Pattern> {
        let mut compiled: Vec<(String, Pattern)> = Vec::with_capacity(entries.len());
        for (key, raw) in entries {
            if compiled.iter().any(|(existing, _)| *existing == key) {
                return Err(MatchError::unsupported(format!(
                    "duplicate key '{key}' in mapping pattern"
                )));
            }
            let pattern = self.compile_at(raw, depth + 1)?;
            compiled.push((key, pattern));
        }
        let policy = extra_keys.unwrap_or(self.config.extra_keys);
        Ok(Pattern::new(Node::Mapping(MappingPattern::new(compiled, policy))))
    }

    fn compile_alternatives(
        &self,
        which: &'static str,
        alternatives: Vec<RawPattern>,
        depth: usize,
    ) -> MatchResult<Vec<Pattern>> {
        if alternatives.is_empty() {
            return Err(MatchError::EmptyAlternatives(which));
        }
        alternatives
            .into_iter()
            .map(|alternative| self.compile_at(alternative, depth + 1))
            .collect()
    }
}

impl From<Value> for RawPattern {
    fn from(value: Value) -> Self {
        RawPattern::Value(value)
    }
}

impl From<Pattern> for RawPattern {
    fn from(pattern: Pattern) -> Self {
        RawPattern::Compiled(pattern)
    }
}

impl From<Vec<RawPattern>> for RawPattern {
    fn from(items: Vec<RawPattern>) -> Self {
        RawPattern::Seq(items)
    }
}

impl From<Regex> for RawPattern {
    fn from(regex: Regex) -> Self {
        RawPattern::Value(Value::Regex(regex))
    }
}

impl From<Object> for RawPattern {
    fn from(object: Object) -> Self {
        RawPattern::Value(Value::Object(object))
    }
}

impl From<Arc<Class>> for RawPattern {
    fn from(class: Arc<Class>) -> Self {
        RawPattern::Value(Value::Class(class))
    }
}

impl From<&Arc<Class>> for RawPattern {
    fn from(class: &Arc<Class>) -> Self {
        RawPattern::Value(Value::Class(Arc::clone(class)))
    }
}

macro_rules! raw_pattern_from_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RawPattern {
                fn from(value: $ty) -> Self {
                    RawPattern::Value(Value::from(value))
                }
            }
        )*
    };
}

raw_pattern_from_primitive!(bool, i32, u32, i64, f64, &str, String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Node;

    #[test]
    fn compiling_a_compiled_pattern_is_identity() {
        let compiled = pattern(seq([RawPattern::from(1), any()])).unwrap();
        let again = pattern(compiled.clone()).unwrap();
        assert_eq!(again.kind_name(), "sequence");
        assert!(again.matches(&Value::from(vec![1, 5])));
    }

    #[test]
    fn primitives_compile_to_literals_and_undefined_to_wildcard() {
        assert!(matches!(pattern("a").unwrap().node(), Node::Literal(_)));
        assert!(matches!(pattern(Value::Null).unwrap().node(), Node::Literal(_)));
        assert!(pattern(Value::Undefined).unwrap().is_wildcard());
        assert!(pattern(any()).unwrap().is_wildcard());
    }

    #[test]
    fn rest_marks_an_open_sequence() {
        let compiled = pattern(seq([RawPattern::from(1), RawPattern::from(2), rest()])).unwrap();
        match compiled.node() {
            Node::Sequence(sequence) => {
                assert!(sequence.is_open());
                assert_eq!(sequence.min_len(), 2);
            }
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn elements_after_rest_are_ignored() {
        let compiled = pattern(seq([RawPattern::from(1), rest(), RawPattern::from(9)])).unwrap();
        assert!(compiled.matches(&Value::from(vec![1, 2, 3])));
        assert!(compiled.matches(&Value::from(vec![1])));
    }

    #[test]
    fn rest_outside_a_sequence_is_unsupported() {
        assert!(matches!(pattern(rest()), Err(MatchError::UnsupportedPattern(_))));
        assert!(matches!(
            pattern(map([("x", rest())])),
            Err(MatchError::UnsupportedPattern(_))
        ));
    }

    #[test]
    fn nan_literals_and_empty_alternatives_are_rejected() {
        assert!(matches!(pattern(f64::NAN), Err(MatchError::UnsupportedPattern(_))));
        assert!(matches!(
            pattern(or(Vec::<RawPattern>::new())),
            Err(MatchError::EmptyAlternatives("or"))
        ));
        assert!(matches!(
            pattern(and(Vec::<RawPattern>::new())),
            Err(MatchError::EmptyAlternatives("and"))
        ));
    }

    #[test]
    fn duplicate_mapping_keys_are_rejected() {
        assert!(matches!(
            pattern(map([("x", 1), ("x", 2)])),
            Err(MatchError::UnsupportedPattern(_))
        ));
    }

    #[test]
    fn mapping_policy_defaults_from_config() {
        let strict = Compiler::new(MatchConfig {
            extra_keys: ExtraKeys::Reject,
            ..MatchConfig::default()
        });
        let subject = Value::from(Object::new().with("x", 1).with("y", 2));

        assert!(!strict.compile(map([("x", any())])).unwrap().matches(&subject));
        assert!(strict.compile(loose_map([("x", any())])).unwrap().matches(&subject));
        assert!(!pattern(strict_map([("x", any())])).unwrap().matches(&subject));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let shallow = Compiler::new(MatchConfig {
            max_pattern_depth: 2,
            ..MatchConfig::default()
        });
        assert!(shallow.compile(seq([1])).is_ok());
        assert!(matches!(
            shallow.compile(seq([seq([1])])),
            Err(MatchError::PatternTooDeep { limit: 2 })
        ));
    }

    #[test]
    fn element_guard_stays_on_its_element() {
        let compiled = pattern(seq([any().when(|v| *v == Value::from(1)), any()])).unwrap();
        assert!(compiled.guards().is_empty());
        assert!(compiled.matches(&Value::from(vec![1, 2])));
        assert!(!compiled.matches(&Value::from(vec![2, 2])));
    }

    #[test]
    fn guards_can_be_disabled() {
        let raw = || any().when(|_| false);
        assert!(!pattern(raw()).unwrap().matches(&Value::from(1)));

        let unguarded = Compiler::new(MatchConfig {
            enable_guards: false,
            ..MatchConfig::default()
        });
        assert!(unguarded.compile(raw()).unwrap().matches(&Value::from(1)));
    }

    #[test]
    fn class_instances_as_patterns_carry_a_tag() {
        let foo = Class::new("Foo");
        let compiled = pattern(Object::instance(&foo).with("x", 1)).unwrap();
        assert!(compiled.matches(&Value::from(Object::instance(&foo).with("x", 1))));
        assert!(!compiled.matches(&Value::from(Object::new().with("x", 1))));
    }

    #[test]
    fn registered_kinds_compile_through_the_registry() {
        let argument = Value::from_json(r#"{"keys": ["x", "y"], "pattern": 1}"#).unwrap();
        let compiled = pattern(registered("path", argument)).unwrap();
        assert_eq!(compiled.kind_name(), "path");
        assert!(compiled.matches(&Value::from_json(r#"{"x": {"y": 1}}"#).unwrap()));
        assert!(matches!(
            pattern(registered("missing", Value::Null)),
            Err(MatchError::UnknownMatcherKind(_))
        ));
    }
}
