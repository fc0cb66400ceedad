//! Runtime clause matching with destructuring
//!
//! A subject [`Value`] is matched against an ordered list of clauses, each a
//! pattern paired with a handler. The first clause whose type tags, structure
//! and guards all accept the subject runs its handler with the destructured
//! value; if none does, dispatch fails with [`MatchError::NoMatchingClause`].
//!
//! ```
//! use patmatch_core::{any, dispatch, rest, seq, ClausePart, RawPattern, Value};
//!
//! let subject = Value::from(vec![1, 2, 3]);
//! let tail = dispatch(&subject, vec![
//!     ClausePart::pattern(seq([RawPattern::from(1), rest()])),
//!     ClausePart::handler(|v: Value| v.as_array().map_or(0, |items| items.len() - 1)),
//!     ClausePart::pattern(any()),
//!     ClausePart::handler(|_| 0),
//! ]).unwrap();
//! assert_eq!(tail, 2);
//! ```

// Logging facade macros; defined before the modules that use them.
#[cfg(feature = "minimal-logging")]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_debug { ($($tt:tt)*) => { /* stripped in minimal build */ }; }
#[cfg(not(feature = "minimal-logging"))]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_debug { ($($tt:tt)*) => { tracing::debug!($($tt)*); }; }

#[cfg(feature = "minimal-logging")]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_trace { ($($tt:tt)*) => { /* stripped */ }; }
#[cfg(not(feature = "minimal-logging"))]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_trace { ($($tt:tt)*) => { tracing::trace!($($tt)*); }; }

#[cfg(feature = "minimal-logging")]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_warn { ($($tt:tt)*) => { /* stripped */ }; }
#[cfg(not(feature = "minimal-logging"))]
#[macro_export]
#[doc(hidden)]
macro_rules! pm_log_warn { ($($tt:tt)*) => { tracing::warn!($($tt)*); }; }

pub mod compile;
pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod value;

pub use compile::{
    and, any, custom, extract, instance_of, loose_map, map, or, path, pattern, registered, rest,
    seq, strict_map, Compiler, RawPattern,
};
pub use config::{ExtraKeys, MatchConfig};
pub use dispatch::{
    dispatch, dispatch_with, match_on, Clause, ClausePart, ClauseTable, ClauseTableBuilder,
    Handler, PendingMatch,
};
pub use error::{ErrorCategory, MatchError, MatchResult};
#[cfg(feature = "logging")]
pub use logging::{LogFormat, LoggingConfig};
pub use pattern::{
    Extractor, Guard, MappingPattern, Node, Pattern, RegexPattern, SequencePattern, TypeTag,
};
pub use registry::{Matcher, MatcherFactory, MatcherRegistry, PathKey, PathMatcher};
pub use value::{Class, Object, Value, ValueKind};
