//! Keyword rules: definitions, the rule-file loader and per-frame matching.

mod descriptor;
mod loader;
mod matcher;
mod set;

pub use descriptor::{Descriptor, Required, RuleKind};
pub use loader::{load_rules, parse_rules};
pub use matcher::{MIN_CONFIDENCE, RuleMatcher, TermMatch, match_term};
pub use set::{RuleBook, RuleSet};
