//! Clause tables and dispatch
//!
//! A clause list is a flat, alternating sequence of patterns and handlers.
//! It is validated and compiled in full before any clause is tried, then
//! clauses are evaluated top-down and the first match wins.

use crate::compile::{Compiler, RawPattern};
use crate::error::{MatchError, MatchResult};
use crate::pattern::Pattern;
use crate::value::Value;
use std::fmt;

/// Callable invoked with the destructured value of a matching clause
pub type Handler<'a, R> = Box<dyn Fn(Value) -> R + 'a>;

/// One element of a flat clause list
pub enum ClausePart<'a, R> {
    Pattern(RawPattern),
    Handler(Handler<'a, R>),
}

impl<'a, R> ClausePart<'a, R> {
    pub fn pattern(pattern: impl Into<RawPattern>) -> Self {
        ClausePart::Pattern(pattern.into())
    }

    pub fn handler(handler: impl Fn(Value) -> R + 'a) -> Self {
        ClausePart::Handler(Box::new(handler))
    }
}

impl<R> fmt::Debug for ClausePart<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClausePart::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            ClausePart::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// A compiled pattern paired with its handler
pub struct Clause<'a, R> {
    pattern: Pattern,
    handler: Handler<'a, R>,
}

impl<'a, R> Clause<'a, R> {
    pub fn new(pattern: Pattern, handler: impl Fn(Value) -> R + 'a) -> Self {
        Self {
            pattern,
            handler: Box::new(handler),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Run the handler if the pattern matches `subject`
    pub fn try_apply(&self, subject: &Value) -> Option<R> {
        self.pattern
            .match_value(subject)
            .map(|destructured| (self.handler)(destructured))
    }
}

impl<R> fmt::Debug for Clause<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Ordered clauses ready for repeated dispatch
pub struct ClauseTable<'a, R> {
    clauses: Vec<Clause<'a, R>>,
}

impl<'a, R> ClauseTable<'a, R> {
    /// Build from a flat clause list with the default compiler
    pub fn from_parts(parts: Vec<ClausePart<'a, R>>) -> MatchResult<Self> {
        Self::from_parts_with(&Compiler::default(), parts)
    }

    /// Build from a flat clause list
    ///
    /// The whole list is checked before anything is compiled: a handler in
    /// pattern position, a pattern in handler position, or a trailing
    /// pattern is rejected even when an earlier clause would match.
    pub fn from_parts_with(compiler: &Compiler, parts: Vec<ClausePart<'a, R>>) -> MatchResult<Self> {
        for (position, part) in parts.iter().enumerate() {
            let expects_pattern = position % 2 == 0;
            match part {
                ClausePart::Handler(_) if expects_pattern => {
                    return Err(MatchError::UnexpectedHandler { position });
                }
                ClausePart::Pattern(_) if !expects_pattern => {
                    return Err(MatchError::MissingHandler {
                        index: position / 2,
                    });
                }
                _ => {}
            }
        }
        if parts.len() % 2 == 1 {
            return Err(MatchError::MissingHandler {
                index: parts.len() / 2,
            });
        }

        let mut clauses = Vec::with_capacity(parts.len() / 2);
        let mut parts = parts.into_iter();
        while let (Some(ClausePart::Pattern(raw)), Some(ClausePart::Handler(handler))) =
            (parts.next(), parts.next())
        {
            clauses.push(Clause {
                pattern: compiler.compile(raw)?,
                handler,
            });
        }
        Ok(Self { clauses })
    }

    pub fn builder() -> ClauseTableBuilder<'a, R> {
        ClauseTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause<'a, R>] {
        &self.clauses
    }

    /// Try each clause in order and return the first handler's result
    #[cfg_attr(feature = "minimal-logging", allow(unused_variables))]
    pub fn dispatch(&self, subject: &Value) -> MatchResult<R> {
        pm_log_debug!(
            clauses = self.clauses.len(),
            subject = subject.kind().type_name(),
            "dispatching"
        );
        for (index, clause) in self.clauses.iter().enumerate() {
            pm_log_trace!(index, kind = clause.pattern.kind_name(), "trying clause");
            if let Some(result) = clause.try_apply(subject) {
                pm_log_debug!(index, "clause matched");
                return Ok(result);
            }
        }
        pm_log_debug!(clauses = self.clauses.len(), "no clause matched");
        Err(MatchError::NoMatchingClause)
    }
}

impl<R> fmt::Debug for ClauseTable<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClauseTable")
            .field("clauses", &self.clauses)
            .finish()
    }
}

/// Incremental construction of a [`ClauseTable`]
pub struct ClauseTableBuilder<'a, R> {
    parts: Vec<ClausePart<'a, R>>,
}

impl<R> Default for ClauseTableBuilder<'_, R> {
    fn default() -> Self {
        Self { parts: Vec::new() }
    }
}

impl<'a, R> ClauseTableBuilder<'a, R> {
    pub fn clause(
        mut self,
        pattern: impl Into<RawPattern>,
        handler: impl Fn(Value) -> R + 'a,
    ) -> Self {
        self.parts.push(ClausePart::pattern(pattern));
        self.parts.push(ClausePart::handler(handler));
        self
    }

    pub fn build(self) -> MatchResult<ClauseTable<'a, R>> {
        ClauseTable::from_parts(self.parts)
    }

    pub fn build_with(self, compiler: &Compiler) -> MatchResult<ClauseTable<'a, R>> {
        ClauseTable::from_parts_with(compiler, self.parts)
    }
}

/// Match `subject` against a flat clause list
pub fn dispatch<'a, R>(subject: &Value, parts: Vec<ClausePart<'a, R>>) -> MatchResult<R> {
    ClauseTable::from_parts(parts)?.dispatch(subject)
}

/// Like [`dispatch`], compiling patterns with `compiler`
pub fn dispatch_with<'a, R>(
    compiler: &Compiler,
    subject: &Value,
    parts: Vec<ClausePart<'a, R>>,
) -> MatchResult<R> {
    ClauseTable::from_parts_with(compiler, parts)?.dispatch(subject)
}

/// Curried form: fix the subject now, supply clauses later
pub fn match_on(subject: impl Into<Value>) -> PendingMatch {
    PendingMatch {
        subject: subject.into(),
        compiler: Compiler::default(),
    }
}

/// A subject waiting for its clauses
#[derive(Debug, Clone)]
pub struct PendingMatch {
    subject: Value,
    compiler: Compiler,
}

impl PendingMatch {
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn subject(&self) -> &Value {
        &self.subject
    }

    pub fn clauses<'a, R>(&self, parts: Vec<ClausePart<'a, R>>) -> MatchResult<R> {
        dispatch_with(&self.compiler, &self.subject, parts)
    }

    pub fn with<R>(&self, table: &ClauseTable<'_, R>) -> MatchResult<R> {
        table.dispatch(&self.subject)
    }
}

/// Dispatch a subject over `pattern => handler` clauses
///
/// ```
/// use patmatch_core::{any, match_value, seq};
///
/// let sum = match_value!(vec![1, 2],
///     seq([1, 2]) => |_| 3.0,
///     any() => |_| 0.0,
/// );
/// assert_eq!(sum.unwrap(), 3.0);
/// ```
#[macro_export]
macro_rules! match_value {
    ($subject:expr, $($pattern:expr => $handler:expr),+ $(,)?) => {
        $crate::dispatch(
            &::std::convert::Into::<$crate::Value>::into($subject),
            vec![$($crate::ClausePart::pattern($pattern), $crate::ClausePart::handler($handler)),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{any, rest, seq};
    use crate::config::MatchConfig;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn parts<'a>(items: Vec<(RawPattern, &'a str)>) -> Vec<ClausePart<'a, &'a str>> {
        items
            .into_iter()
            .flat_map(|(pattern, label)| {
                [
                    ClausePart::pattern(pattern),
                    ClausePart::handler(move |_| label),
                ]
            })
            .collect()
    }

    #[test]
    fn first_matching_clause_wins() {
        let clauses = parts(vec![
            (RawPattern::from(1), "one"),
            (any(), "first any"),
            (any(), "second any"),
        ]);
        let table = ClauseTable::from_parts(clauses).unwrap();
        assert_eq!(table.dispatch(&Value::from(1)).unwrap(), "one");
        assert_eq!(table.dispatch(&Value::from(2)).unwrap(), "first any");
    }

    #[test]
    fn no_match_is_badarg() {
        let err = dispatch(&Value::from("foo"), parts(vec![(RawPattern::from(1), "one")])).unwrap_err();
        assert!(err.is_no_match(), "expected NoMatchingClause, got {err:?}");
        assert_eq!(err.to_string(), "no matching clause (badarg)");
    }

    #[test]
    fn only_the_winning_handler_runs() {
        let calls = Cell::new(0);
        let result = dispatch(
            &Value::from(vec![1, 2, 3]),
            vec![
                ClausePart::pattern(seq([RawPattern::from(1), rest()])),
                ClausePart::handler(|v: Value| {
                    calls.set(calls.get() + 1);
                    v.as_array().map_or(0, <[Value]>::len)
                }),
                ClausePart::pattern(any()),
                ClausePart::handler(|_| {
                    calls.set(calls.get() + 100);
                    0
                }),
            ],
        )
        .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn malformed_lists_fail_before_matching() {
        let handler_first: Vec<ClausePart<'_, ()>> =
            vec![ClausePart::handler(|_| ()), ClausePart::pattern(any())];
        assert!(matches!(
            dispatch(&Value::Null, handler_first),
            Err(MatchError::UnexpectedHandler { position: 0 })
        ));

        let trailing: Vec<ClausePart<'_, ()>> = vec![
            ClausePart::pattern(any()),
            ClausePart::handler(|_| ()),
            ClausePart::pattern(any()),
        ];
        assert!(matches!(
            dispatch(&Value::Null, trailing),
            Err(MatchError::MissingHandler { index: 1 })
        ));

        let two_patterns: Vec<ClausePart<'_, ()>> = vec![
            ClausePart::pattern(any()),
            ClausePart::pattern(any()),
            ClausePart::handler(|_| ()),
        ];
        assert!(matches!(
            dispatch(&Value::Null, two_patterns),
            Err(MatchError::MissingHandler { index: 0 })
        ));
    }

    #[test]
    fn builder_tables_dispatch_repeatedly() {
        let table = ClauseTable::builder()
            .clause(seq([any(), any()]), |v: Value| v[1].clone())
            .clause(any(), |_| Value::Null)
            .build()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dispatch(&Value::from(vec![1, 2])).unwrap(), Value::from(2));
        assert_eq!(table.dispatch(&Value::from(vec![3, 4])).unwrap(), Value::from(4));
        assert_eq!(table.dispatch(&Value::from(5)).unwrap(), Value::Null);
    }

    #[test]
    fn curried_form_dispatches_later() {
        let pending = match_on(vec![1, 2]);
        assert_eq!(pending.subject(), &Value::from(vec![1, 2]));
        let label = pending
            .clauses(parts(vec![(seq([1]), "short"), (seq([1, 2]), "pair")]))
            .unwrap();
        assert_eq!(label, "pair");

        let table = ClauseTable::builder().clause(any(), |_| true).build().unwrap();
        assert!(match_on("x").with(&table).unwrap());
    }

    #[test]
    fn compiler_configuration_reaches_clauses() {
        let compiler = Compiler::new(MatchConfig {
            max_pattern_depth: 1,
            ..MatchConfig::default()
        });
        let result = dispatch_with(&compiler, &Value::Null, parts(vec![(seq([1]), "deep")]));
        assert!(matches!(result, Err(MatchError::PatternTooDeep { limit: 1 })));
    }

    #[test]
    fn macro_builds_the_clause_list() {
        let result = match_value!(vec![1, 2, 3],
            seq([RawPattern::from(2), rest()]) => |_| "starts with two",
            seq([RawPattern::from(1), rest()]) => |_| "starts with one",
        );
        assert_eq!(result.unwrap(), "starts with one");
    }

    #[test]
    fn handlers_may_dispatch_recursively() {
        fn length(subject: &Value) -> usize {
            dispatch(
                subject,
                vec![
                    ClausePart::pattern(seq(Vec::<RawPattern>::new())),
                    ClausePart::handler(|_| 0),
                    ClausePart::pattern(seq([any(), rest()])),
                    ClausePart::handler(|v: Value| {
                        let tail = v.as_array().map(|items| items[1..].to_vec()).unwrap_or_default();
                        1 + length(&Value::Array(tail))
                    }),
                ],
            )
            .unwrap()
        }
        assert_eq!(length(&Value::from(vec![5, 6, 7])), 3);
    }

    #[cfg(not(feature = "minimal-logging"))]
    #[traced_test]
    #[test]
    fn dispatch_logs_the_winning_clause() {
        let table = ClauseTable::from_parts(parts(vec![(RawPattern::from(1), "one"), (any(), "other")])).unwrap();
        table.dispatch(&Value::from(2)).unwrap();
        assert!(logs_contain("dispatching"));
        assert!(logs_contain("clause matched"));

        let _ = dispatch(&Value::from(2), parts(vec![(RawPattern::from(1), "one")]));
        assert!(logs_contain("no clause matched"));
    }
}
