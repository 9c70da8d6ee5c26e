use std::fmt;

/// How many distinct keywords a rule needs before it is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    /// Every keyword of the rule.
    All,
    /// At least this many keywords, always within `1..=words`.
    Count(usize),
}

impl Required {
    /// Builds the threshold from a raw rule-file integer.
    ///
    /// `-1` selects [`Required::All`]; anything else below one is raised to
    /// one and the result is clamped to the keyword count. A single-keyword
    /// rule always needs exactly one match.
    pub fn from_raw(raw: Option<i64>, words: usize) -> Self {
        let words = words.max(1);
        if words == 1 {
            return Required::Count(1);
        }
        match raw {
            None | Some(-1) => Required::All,
            Some(value) => {
                let value = usize::try_from(value.max(1)).unwrap_or(usize::MAX);
                Required::Count(value.min(words))
            }
        }
    }

    /// Concrete keyword count this threshold stands for.
    pub fn resolve(self, words: usize) -> usize {
        match self {
            Required::All => words,
            Required::Count(count) => count,
        }
    }
}

impl fmt::Display for Required {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Required::All => f.write_str("all"),
            Required::Count(count) => write!(f, "{count}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleKind {
    /// Satisfying the rule counts against the match budget.
    #[default]
    Hard,
    /// Reported but never consumes budget.
    Soft,
    /// Disqualifies any single text block it fully matches.
    Blacklist,
}

impl RuleKind {
    pub fn marker(self) -> &'static str {
        match self {
            RuleKind::Hard => "",
            RuleKind::Soft => "~",
            RuleKind::Blacklist => "-",
        }
    }
}

/// Immutable rule definition shared by every matcher built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    words: Vec<String>,
    required: Required,
    kind: RuleKind,
}

impl Descriptor {
    /// Returns `None` when `words` is empty.
    pub fn new(
        name: impl Into<String>,
        words: Vec<String>,
        required: Option<i64>,
        kind: RuleKind,
    ) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let required = Required::from_raw(required, words.len());
        Some(Self {
            name: name.into(),
            words,
            required,
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn required(&self) -> Required {
        self.required
    }

    /// Number of keywords that must be present for the rule to hold.
    pub fn required_count(&self) -> usize {
        self.required.resolve(self.words.len())
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_soft(&self) -> bool {
        self.kind == RuleKind::Soft
    }

    pub fn is_blacklist(&self) -> bool {
        self.kind == RuleKind::Blacklist
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher[{}{}]: ", self.kind.marker(), self.name)?;
        for word in &self.words {
            write!(f, "{word} ")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn required_defaults_to_all_words() {
        let descriptor =
            Descriptor::new("login", words(&["sign", "in"]), None, RuleKind::Hard).unwrap();
        assert_eq!(descriptor.required(), Required::All);
        assert_eq!(descriptor.required_count(), 2);
    }

    #[test]
    fn required_is_clamped_into_range() {
        let many = Descriptor::new("a", words(&["x", "y"]), Some(9), RuleKind::Hard).unwrap();
        let zero = Descriptor::new("b", words(&["x", "y"]), Some(0), RuleKind::Hard).unwrap();
        let negative = Descriptor::new("c", words(&["x", "y"]), Some(-7), RuleKind::Hard).unwrap();
        assert_eq!(many.required(), Required::Count(2));
        assert_eq!(zero.required(), Required::Count(1));
        assert_eq!(negative.required(), Required::Count(1));
    }

    #[test]
    fn single_keyword_needs_exactly_one() {
        let descriptor = Descriptor::new("one", words(&["play"]), Some(-1), RuleKind::Soft).unwrap();
        assert_eq!(descriptor.required(), Required::Count(1));
        assert!(descriptor.is_soft());
    }

    #[test]
    fn empty_keyword_list_is_rejected() {
        assert!(Descriptor::new("none", Vec::new(), None, RuleKind::Hard).is_none());
    }

    #[test]
    fn display_matches_rule_table_format() {
        let descriptor =
            Descriptor::new("ads", words(&["sponsored", "ad"]), None, RuleKind::Blacklist).unwrap();
        assert_eq!(descriptor.to_string(), "Matcher[-ads]: sponsored ad ");
    }
}
