use std::sync::Arc;

use serde::Serialize;
use vidgrep_types::BoundingBox;

use super::descriptor::{Descriptor, Required};

/// Confidence at or above which a rule counts as matched.
pub const MIN_CONFIDENCE: f32 = 0.3;

/// Keywords at least this many characters long tolerate a missing edge character.
const EDGE_TOLERANT_CHARS: usize = 5;

/// One keyword occurrence found in a text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMatch {
    pub keyword: String,
    /// The substring of the block that satisfied the keyword.
    pub actual: String,
    pub distance: u8,
    pub bbox: BoundingBox,
}

/// Searches `text` for `keyword`, returning the matched text and its edit distance.
///
/// Short keywords must appear verbatim. Longer ones may also match with
/// either their first or their last character missing, which reports a
/// distance of one. Interior edits are never tolerated.
pub fn match_term(text: &str, keyword: &str) -> Option<(String, u8)> {
    if keyword.is_empty() {
        return None;
    }
    if text.contains(keyword) {
        return Some((keyword.to_string(), 0));
    }
    if keyword.chars().count() < EDGE_TOLERANT_CHARS {
        return None;
    }

    let first = keyword.chars().next()?.len_utf8();
    let without_first = &keyword[first..];
    if text.contains(without_first) {
        return Some((without_first.to_string(), 1));
    }

    let last = keyword.chars().next_back()?.len_utf8();
    let without_last = &keyword[..keyword.len() - last];
    if text.contains(without_last) {
        return Some((without_last.to_string(), 1));
    }
    None
}

/// Per-frame matching state for one rule.
///
/// Each keyword contributes at most once between two calls to [`clear`].
///
/// [`clear`]: RuleMatcher::clear
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    descriptor: Arc<Descriptor>,
    found: usize,
    used: Vec<bool>,
    matches: Vec<TermMatch>,
}

impl RuleMatcher {
    pub fn new(descriptor: Arc<Descriptor>) -> Self {
        let used = vec![false; descriptor.words().len()];
        Self {
            descriptor,
            found: 0,
            used,
            matches: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn found(&self) -> usize {
        self.found
    }

    pub fn matches(&self) -> &[TermMatch] {
        &self.matches
    }

    /// Accumulates every not-yet-used keyword that appears in `text`.
    pub fn add_block(&mut self, text: &str, bbox: BoundingBox) {
        for (keyword, used) in self.descriptor.words().iter().zip(self.used.iter_mut()) {
            if *used {
                continue;
            }
            if let Some((actual, distance)) = match_term(text, keyword) {
                self.matches.push(TermMatch {
                    keyword: keyword.clone(),
                    actual,
                    distance,
                    bbox,
                });
                *used = true;
                self.found += 1;
            }
        }
    }

    /// True when exactly the required number of keywords appear in this single block.
    ///
    /// Accumulated state is neither consulted nor changed, so blocks seen
    /// earlier in the frame never help a later block qualify.
    pub fn is_full_match(&self, text: &str) -> bool {
        let count = self
            .descriptor
            .words()
            .iter()
            .filter(|keyword| match_term(text, keyword).is_some())
            .count();
        count == self.descriptor.required_count()
    }

    /// Binary confidence: 1.0 once the threshold is met, 0.0 before.
    pub fn confidence(&self) -> f32 {
        let satisfied = match self.descriptor.required() {
            Required::All => self.found == self.descriptor.words().len(),
            Required::Count(required) => self.found >= required,
        };
        if satisfied { 1.0 } else { 0.0 }
    }

    pub fn is_match_found(&self) -> bool {
        self.confidence() >= MIN_CONFIDENCE
    }

    pub fn clear(&mut self) {
        self.found = 0;
        self.used.fill(false);
        self.matches.clear();
    }
}
