use std::fmt;
use std::sync::Arc;

use vidgrep_types::BoundingBox;

use super::descriptor::Descriptor;
use super::matcher::RuleMatcher;

/// Blacklist and whitelist matchers owned by a single worker.
///
/// Built once from a [`RuleBook`] and cleared, not rebuilt, between frames.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    blacklist: Vec<RuleMatcher>,
    whitelist: Vec<RuleMatcher>,
}

impl RuleSet {
    /// Feeds one lower-cased text block to the rules.
    ///
    /// Returns `false` when a blacklist rule disqualified the block, in which
    /// case no whitelist matcher saw it.
    pub fn add_block(&mut self, text: &str, bbox: BoundingBox) -> bool {
        if let Some(rule) = self
            .blacklist
            .iter()
            .find(|matcher| matcher.is_full_match(text))
        {
            tracing::trace!(rule = rule.descriptor().name(), text, "block blacklisted");
            return false;
        }
        for matcher in &mut self.whitelist {
            matcher.add_block(text, bbox);
        }
        true
    }

    /// Resets accumulated whitelist state; blacklist matchers hold none.
    pub fn clear(&mut self) {
        for matcher in &mut self.whitelist {
            matcher.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty()
    }

    pub fn whitelist(&self) -> &[RuleMatcher] {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &[RuleMatcher] {
        &self.blacklist
    }

    /// Whitelist matchers currently satisfied, with their whitelist index.
    pub fn satisfied(&self) -> impl Iterator<Item = (usize, &RuleMatcher)> {
        self.whitelist
            .iter()
            .enumerate()
            .filter(|(_, matcher)| matcher.is_match_found())
    }
}

/// Every loaded rule, shared read-only by all workers.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    descriptors: Vec<Arc<Descriptor>>,
}

impl RuleBook {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn descriptors(&self) -> &[Arc<Descriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Builds a fresh, independent rule set for one worker.
    pub fn create(&self) -> RuleSet {
        let mut set = RuleSet::default();
        for descriptor in &self.descriptors {
            let matcher = RuleMatcher::new(Arc::clone(descriptor));
            if descriptor.is_blacklist() {
                set.blacklist.push(matcher);
            } else {
                set.whitelist.push(matcher);
            }
        }
        set
    }
}

impl fmt::Display for RuleBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for descriptor in &self.descriptors {
            writeln!(f, "{descriptor}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::descriptor::RuleKind;

    fn descriptor(name: &str, words: &[&str], required: Option<i64>, kind: RuleKind) -> Descriptor {
        let words = words.iter().map(|word| word.to_string()).collect();
        Descriptor::new(name, words, required, kind).unwrap()
    }

    fn book() -> RuleBook {
        RuleBook::new(vec![
            descriptor("menu", &["start", "options"], None, RuleKind::Hard),
            descriptor("ad", &["sponsored", "start"], Some(2), RuleKind::Blacklist),
            descriptor("hint", &["tip"], None, RuleKind::Soft),
        ])
    }

    #[test]
    fn create_splits_rules_by_kind() {
        let set = book().create();
        assert_eq!(set.whitelist().len(), 2);
        assert_eq!(set.blacklist().len(), 1);
        assert_eq!(set.whitelist()[0].descriptor().name(), "menu");
        assert_eq!(set.whitelist()[1].descriptor().name(), "hint");
    }

    #[test]
    fn blacklisted_block_never_reaches_whitelist() {
        let mut set = book().create();
        assert!(!set.add_block("sponsored start", BoundingBox::default()));
        assert_eq!(set.whitelist()[0].found(), 0);

        assert!(set.add_block("start", BoundingBox::default()));
        assert!(set.add_block("sponsored options", BoundingBox::default()));
        assert_eq!(set.whitelist()[0].found(), 2);
        let satisfied: Vec<usize> = set.satisfied().map(|(index, _)| index).collect();
        assert_eq!(satisfied, vec![0]);
    }

    #[test]
    fn blacklist_keywords_split_across_blocks_do_not_disqualify() {
        let mut set = book().create();
        assert!(set.add_block("sponsored", BoundingBox::default()));
        assert!(set.add_block("start", BoundingBox::default()));
    }

    #[test]
    fn clear_resets_whitelist_only() {
        let mut set = book().create();
        set.add_block("tip", BoundingBox::default());
        assert_eq!(set.satisfied().count(), 1);
        set.clear();
        assert_eq!(set.satisfied().count(), 0);
        assert!(!set.add_block("sponsored start", BoundingBox::default()));
    }

    #[test]
    fn sets_are_independent_per_worker() {
        let book = book();
        let mut first = book.create();
        let second = book.create();
        first.add_block("tip", BoundingBox::default());
        assert_eq!(first.satisfied().count(), 1);
        assert_eq!(second.satisfied().count(), 0);
    }

    #[test]
    fn table_lists_every_rule_with_modifier() {
        let table = book().to_string();
        assert_eq!(
            table,
            "Matcher[menu]: start options \nMatcher[-ad]: sponsored start \nMatcher[~hint]: tip \n"
        );
    }
}
