//! ReDoS-shape-validating pattern cache: a textual validator rejects
//! catastrophic-backtracking-shaped patterns before anything is ever
//! compiled, and an LRU cache of compiled matchers backs the rule engine's
//! address-pattern matching.

mod cache;
mod compiled;
mod stats;
mod validator;

pub use cache::{CachedPattern, PatternCache, PatternCacheConfig};
pub use compiled::CompiledPattern;
pub use stats::PatternCacheStats;
pub use validator::{PatternValidationResult, PatternValidator, ValidatorConfig};
