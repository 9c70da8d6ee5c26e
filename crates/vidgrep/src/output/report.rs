use std::path::Path;
use std::time::Duration;

use crate::output::util::format_clock;
use crate::scan::{MatchResult, ScanOutcome};

/// Console summary of a finished scan.
pub struct ConsoleReport<'a> {
    video: &'a Path,
    outcome: &'a ScanOutcome,
    verbose: bool,
}

impl<'a> ConsoleReport<'a> {
    pub fn new(video: &'a Path, outcome: &'a ScanOutcome) -> Self {
        Self {
            video,
            outcome,
            verbose: true,
        }
    }

    /// Limits the report to the first-match line.
    pub fn brief(mut self) -> Self {
        self.verbose = false;
        self
    }

    pub fn render(&self) -> String {
        let mut out = match self.outcome.first_match() {
            Some(first) => format!(
                "First match found in [{}] at time {}, frame {}\n",
                self.video.display(),
                format_clock(first.timestamp.unwrap_or_default()),
                first.frame_index
            ),
            None => format!("No match found in [{}]\n", self.video.display()),
        };
        if self.verbose {
            for result in &self.outcome.results {
                out.push_str(&render_result(result));
            }
        }
        out
    }
}

/// One `Matches for frame [N] { ... }` block.
pub fn render_result(result: &MatchResult) -> String {
    let mut out = format!("Matches for frame [{}] {{\n", result.frame_index);
    for rule in result.matched_rules() {
        let descriptor = rule.descriptor();
        let marker = if descriptor.is_soft() { "~" } else { "" };
        let terms: String = rule
            .matches()
            .iter()
            .map(|term| format!(" ({})", term.actual))
            .collect();
        out.push_str(&format!("\t{marker}{}:{terms}\n", descriptor.name()));
    }
    if let Some(path) = &result.saved_path {
        out.push_str(&format!("\tsaved: {}\n", path.display()));
    }
    out.push_str("}\n");
    out
}

pub fn render_elapsed(elapsed: Duration) -> String {
    format!("Processing took {:.3}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleBook, parse_rules};
    use crate::scan::MatchType;
    use vidgrep_types::BoundingBox;

    #[test]
    fn result_block_lists_actual_terms() {
        let book = RuleBook::new(parse_rules("welcome back #greeting\n~ tip\n"));
        let mut rules = book.create();
        rules.add_block("elcome", BoundingBox::default());
        rules.add_block("back tip", BoundingBox::default());
        let result = MatchResult {
            frame_index: 48,
            timestamp: None,
            match_type: MatchType::HARD | MatchType::SOFT,
            matched: rules.satisfied().map(|(index, _)| index).collect(),
            rules,
            snapshot: None,
            hard_sequence: Some(1),
            saved_path: None,
        };
        assert_eq!(
            render_result(&result),
            "Matches for frame [48] {\n\tgreeting: (elcome) (back)\n\t~#1: (tip)\n}\n"
        );
    }

    #[test]
    fn saved_frames_are_listed_inside_the_block() {
        let book = RuleBook::new(parse_rules("~ tip\n"));
        let mut rules = book.create();
        rules.add_block("tip", BoundingBox::default());
        let result = MatchResult {
            frame_index: 7,
            timestamp: None,
            match_type: MatchType::SOFT,
            matched: vec![0],
            rules,
            snapshot: None,
            hard_sequence: None,
            saved_path: Some("out/frame-7.jpg".into()),
        };
        assert_eq!(
            render_result(&result),
            "Matches for frame [7] {\n\t~#0: (tip)\n\tsaved: out/frame-7.jpg\n}\n"
        );
    }

    #[test]
    fn elapsed_uses_millisecond_precision() {
        assert_eq!(
            render_elapsed(Duration::from_millis(1500)),
            "Processing took 1.500s"
        );
    }
}
