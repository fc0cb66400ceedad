//! Compiled matcher nodes
//!
//! A [`Pattern`] answers one question for a subject: does it match, and if so
//! what destructured value flows to the handler. Evaluation order is fixed:
//! type tags first (they may substitute the subject), then the structural
//! test of the node, then the guards attached at this level.

use crate::config::ExtraKeys;
use crate::registry::Matcher;
use crate::value::{Class, Value};
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type GuardFn = dyn Fn(&Value) -> bool + Send + Sync;
type ExtractFn = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// Post-match predicate that can still reject a structurally matching value
#[derive(Clone)]
pub struct Guard(Arc<GuardFn>);

impl Guard {
    pub fn new(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Guard(Arc::new(predicate))
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// Up-front transform run before the main pattern
///
/// Returning `None` rejects the subject; returning a value replaces the
/// subject seen by the rest of the pattern.
#[derive(Clone)]
pub struct Extractor {
    name: String,
    extract: Arc<ExtractFn>,
}

impl Extractor {
    pub fn new(
        name: impl Into<String>,
        extract: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            extract: Arc::new(extract),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, subject: &Value) -> Option<Value> {
        (self.extract)(subject)
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Extractor").field(&self.name).finish()
    }
}

/// Precondition attached to a pattern
#[derive(Debug, Clone)]
pub enum TypeTag {
    /// Subject must be an instance of the class or one of its subclasses
    Instance(Arc<Class>),
    /// Subject is passed through a custom extractor
    Extract(Extractor),
}

/// Ordered sequence pattern with an optional open tail
#[derive(Debug, Clone)]
pub struct SequencePattern {
    items: Vec<Pattern>,
    open: bool,
}

impl SequencePattern {
    pub fn new(items: Vec<Pattern>, open: bool) -> Self {
        Self { items, open }
    }

    /// Minimum subject length; the exact length when the tail is closed
    pub fn min_len(&self) -> usize {
        self.items.len()
    }

    /// Whether trailing elements past `min_len` are captured as a tail
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn items(&self) -> &[Pattern] {
        &self.items
    }

    fn match_value(&self, subject: &Value) -> Option<Value> {
        let elements = subject.as_array()?;
        let length_ok = if self.open {
            elements.len() >= self.items.len()
        } else {
            elements.len() == self.items.len()
        };
        if !length_ok {
            pm_log_trace!(
                expected = self.items.len(),
                actual = elements.len(),
                open = self.open,
                "sequence length mismatch"
            );
            return None;
        }

        let mut destructured = Vec::with_capacity(elements.len());
        for (pattern, element) in self.items.iter().zip(elements) {
            destructured.push(pattern.match_value(element)?);
        }
        destructured.extend_from_slice(&elements[self.items.len()..]);
        Some(Value::Array(destructured))
    }
}

/// Keyed mapping pattern
#[derive(Debug, Clone)]
pub struct MappingPattern {
    entries: Vec<(String, Pattern)>,
    extra_keys: ExtraKeys,
}

impl MappingPattern {
    pub fn new(entries: Vec<(String, Pattern)>, extra_keys: ExtraKeys) -> Self {
        Self {
            entries,
            extra_keys,
        }
    }

    pub fn extra_keys(&self) -> ExtraKeys {
        self.extra_keys
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    fn declares(&self, key: &str) -> bool {
        self.entries.iter().any(|(declared, _)| declared == key)
    }

    fn match_value(&self, subject: &Value) -> Option<Value> {
        let object = subject.as_object()?;

        let mut destructured = object.empty_like();
        for (key, pattern) in &self.entries {
            let field = object.get(key)?;
            destructured.insert(key.clone(), pattern.match_value(field)?);
        }

        for (key, value) in object.iter() {
            if self.declares(key) {
                continue;
            }
            if self.extra_keys == ExtraKeys::Reject {
                pm_log_trace!(key, "mapping rejects unlisted key");
                return None;
            }
            destructured.insert(key, value.clone());
        }
        Some(Value::Object(destructured))
    }
}

/// Regular expression pattern
#[derive(Debug, Clone)]
pub struct RegexPattern {
    regex: Regex,
    coerce: bool,
}

impl RegexPattern {
    /// `coerce` controls whether non-string subjects are converted to strings
    /// before matching or rejected outright
    pub fn new(regex: Regex, coerce: bool) -> Self {
        Self { regex, coerce }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    fn match_value(&self, subject: &Value) -> Option<Value> {
        let text: Cow<'_, str> = match subject {
            Value::String(s) => Cow::Borrowed(s),
            other if self.coerce => Cow::Owned(other.coerce_to_string()),
            _ => return None,
        };
        let captures = self.regex.captures(&text)?;
        let groups = captures
            .iter()
            .map(|group| group.map_or(Value::Undefined, |m| Value::from(m.as_str())))
            .collect();
        Some(Value::Array(groups))
    }
}

/// Structural test carried by a [`Pattern`]
#[derive(Debug, Clone)]
pub enum Node {
    Any,
    Literal(Value),
    Sequence(SequencePattern),
    Mapping(MappingPattern),
    Regex(RegexPattern),
    /// First alternative that matches and passes this node's guards wins;
    /// yields that alternative's destructured value, not the first listed one
    Or(Vec<Pattern>),
    /// Yields the first conjunct's value; guards see the last conjunct's value
    And(Vec<Pattern>),
    Custom(Arc<dyn Matcher>),
}

impl Node {
    /// Short name of the node kind, used in diagnostics
    pub fn kind_name(&self) -> &str {
        match self {
            Node::Any => "any",
            Node::Literal(_) => "literal",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Regex(_) => "regex",
            Node::Or(_) => "or",
            Node::And(_) => "and",
            Node::Custom(matcher) => matcher.kind(),
        }
    }
}

/// A compiled matcher
#[derive(Debug, Clone)]
pub struct Pattern {
    tags: Vec<TypeTag>,
    node: Node,
    guards: Vec<Guard>,
}

impl Pattern {
    pub fn new(node: Node) -> Self {
        Self {
            tags: Vec::new(),
            node,
            guards: Vec::new(),
        }
    }

    /// The wildcard pattern
    pub fn any() -> Self {
        Self::new(Node::Any)
    }

    /// Attach a type tag checked before every tag already present
    pub fn with_tag(mut self, tag: TypeTag) -> Self {
        self.tags.insert(0, tag);
        self
    }

    /// Attach a guard checked after every guard already present
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.tags
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    pub fn kind_name(&self) -> &str {
        self.node.kind_name()
    }

    /// An untagged, unguarded wildcard
    pub fn is_wildcard(&self) -> bool {
        matches!(self.node, Node::Any) && self.tags.is_empty() && self.guards.is_empty()
    }

    /// Check whether `subject` satisfies this pattern
    pub fn matches(&self, subject: &Value) -> bool {
        self.match_value(subject).is_some()
    }

    /// Match `subject`, returning the destructured value on success
    pub fn match_value(&self, subject: &Value) -> Option<Value> {
        let mut current = Cow::Borrowed(subject);
        for tag in &self.tags {
            match tag {
                TypeTag::Instance(class) => {
                    if !current.instance_of(class) {
                        return None;
                    }
                }
                TypeTag::Extract(extractor) => {
                    current = Cow::Owned(extractor.apply(&current)?);
                }
            }
        }
        let subject = current.as_ref();

        match &self.node {
            Node::Any => self.guarded(subject.clone()),
            Node::Literal(literal) => {
                if subject.strict_eq(literal) {
                    self.guarded(subject.clone())
                } else {
                    None
                }
            }
            Node::Sequence(sequence) => sequence.match_value(subject).and_then(|v| self.guarded(v)),
            Node::Mapping(mapping) => mapping.match_value(subject).and_then(|v| self.guarded(v)),
            Node::Regex(regex) => regex.match_value(subject).and_then(|v| self.guarded(v)),
            Node::Custom(matcher) => matcher.match_value(subject).and_then(|v| self.guarded(v)),
            // Guards filter each candidate alternative, so a rejected
            // alternative lets later ones be tried.
            Node::Or(alternatives) => alternatives
                .iter()
                .find_map(|alternative| alternative.match_value(subject).and_then(|v| self.guarded(v))),
            Node::And(conjuncts) => self.match_conjunction(conjuncts, subject),
        }
    }

    /// Every conjunct must match; guards see the final conjunct's value and
    /// the first conjunct's value is the result.
    fn match_conjunction(&self, conjuncts: &[Pattern], subject: &Value) -> Option<Value> {
        let (head, tail) = conjuncts.split_first()?;
        let first = head.match_value(subject)?;
        let mut last = None;
        for conjunct in tail {
            last = Some(conjunct.match_value(subject)?);
        }
        let guard_input = last.as_ref().unwrap_or(&first);
        if self.passes_guards(guard_input) {
            Some(first)
        } else {
            None
        }
    }

    fn passes_guards(&self, value: &Value) -> bool {
        self.guards.iter().all(|guard| guard.check(value))
    }

    fn guarded(&self, value: Value) -> Option<Value> {
        if self.passes_guards(&value) {
            Some(value)
        } else {
            None
        }
    }
}
