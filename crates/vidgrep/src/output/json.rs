use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::output::error::OutputError;
use crate::output::util::duration_millis;
use crate::rules::TermMatch;
use crate::scan::{MatchResult, ScanOutcome};

#[derive(Debug, Serialize)]
pub struct ScanJsonReport<'a> {
    pub video: &'a Path,
    pub frame_count: u64,
    pub found_any_matches: bool,
    pub budget_satisfied: bool,
    pub matches: Vec<MatchJsonRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub struct MatchJsonRecord<'a> {
    pub frame_index: u64,
    pub timestamp_ms: Option<u64>,
    pub kind: &'static str,
    pub hard_sequence: Option<u64>,
    pub saved_path: Option<&'a PathBuf>,
    pub rules: Vec<RuleJsonRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RuleJsonRecord<'a> {
    pub name: &'a str,
    pub soft: bool,
    pub terms: &'a [TermMatch],
}

impl<'a> ScanJsonReport<'a> {
    pub fn new(video: &'a Path, outcome: &'a ScanOutcome) -> Self {
        Self {
            video,
            frame_count: outcome.frame_count,
            found_any_matches: outcome.found_any_matches(),
            budget_satisfied: outcome.budget_satisfied(),
            matches: outcome.results.iter().map(MatchJsonRecord::from).collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), OutputError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_vec_pretty(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }
}

impl<'a> From<&'a MatchResult> for MatchJsonRecord<'a> {
    fn from(result: &'a MatchResult) -> Self {
        Self {
            frame_index: result.frame_index,
            timestamp_ms: result.timestamp.map(duration_millis),
            kind: result.match_type.as_str(),
            hard_sequence: result.hard_sequence,
            saved_path: result.saved_path.as_ref(),
            rules: result
                .matched_rules()
                .map(|rule| RuleJsonRecord {
                    name: rule.descriptor().name(),
                    soft: rule.descriptor().is_soft(),
                    terms: rule.matches(),
                })
                .collect(),
        }
    }
}
