use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use image::RgbImage;
use vidgrep_decoder::VideoFrame;
use vidgrep_ocr::{LumaPlane, OcrRequest, OcrResponse, TextRecognizer};
use vidgrep_types::BoundingBox;

use crate::output::annotate;
use crate::rules::{RuleMatcher, RuleSet};

use super::preprocess::{self, UPSCALE};

/// Set of match kinds observed on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MatchType(u8);

impl MatchType {
    pub const NONE: MatchType = MatchType(0);
    pub const SOFT: MatchType = MatchType(1);
    pub const HARD: MatchType = MatchType(2);

    pub fn contains(self, other: MatchType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_hard(self) -> bool {
        self.contains(Self::HARD)
    }

    pub fn is_soft(self) -> bool {
        self.contains(Self::SOFT)
    }

    pub fn as_str(self) -> &'static str {
        match (self.is_hard(), self.is_soft()) {
            (true, true) => "hard+soft",
            (true, false) => "hard",
            (false, true) => "soft",
            (false, false) => "none",
        }
    }
}

impl BitOr for MatchType {
    type Output = MatchType;

    fn bitor(self, rhs: Self) -> Self::Output {
        MatchType(self.0 | rhs.0)
    }
}

impl BitOrAssign for MatchType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a frame on which at least one whitelist rule held.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub frame_index: u64,
    pub timestamp: Option<Duration>,
    pub match_type: MatchType,
    /// Whitelist indices of the satisfied rules.
    pub matched: Vec<usize>,
    /// Rule state as it stood after the frame, for reporting matched terms.
    pub rules: RuleSet,
    /// Annotated frame, kept only for the first hard match of the run.
    pub snapshot: Option<Arc<RgbImage>>,
    /// 1-based order in which admitted hard matches were recorded across workers.
    pub hard_sequence: Option<u64>,
    pub saved_path: Option<PathBuf>,
}

impl MatchResult {
    pub fn matched_rules(&self) -> impl Iterator<Item = &RuleMatcher> {
        self.matched
            .iter()
            .filter_map(|index| self.rules.whitelist().get(*index))
    }
}

/// A processed frame together with its annotated image.
///
/// The image is present for hard frames and, on request, for soft ones.
#[derive(Debug)]
pub struct FrameOutcome {
    pub result: MatchResult,
    pub annotated: Option<RgbImage>,
}

/// Run-wide bookkeeping for retained hard matches.
///
/// Only results the scheduler has already admitted are stamped, so the
/// snapshot always lands on a result that is kept.
#[derive(Debug, Default)]
pub struct MatchLedger {
    snapshot_taken: AtomicBool,
    hard_matches: AtomicU64,
}

impl MatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per run, for whichever caller gets there first.
    fn claim_snapshot(&self) -> bool {
        !self.snapshot_taken.swap(true, Ordering::AcqRel)
    }

    fn next_hard_sequence(&self) -> u64 {
        self.hard_matches.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn hard_matches(&self) -> u64 {
        self.hard_matches.load(Ordering::Acquire)
    }

    /// Numbers an admitted hard result and hands it the snapshot if no
    /// other result has it yet. Soft-only results are left untouched.
    pub fn stamp(&self, result: &mut MatchResult, annotated: Option<&RgbImage>) {
        if !result.match_type.is_hard() {
            return;
        }
        result.hard_sequence = Some(self.next_hard_sequence());
        if let Some(image) = annotated {
            if self.claim_snapshot() {
                result.snapshot = Some(Arc::new(image.clone()));
            }
        }
    }
}

/// Per-worker pipeline: preprocess, recognize, feed rules, classify.
pub struct FrameProcessor {
    recognizer: Box<dyn TextRecognizer>,
    rules: RuleSet,
    crop: bool,
    keep_annotated: bool,
}

impl FrameProcessor {
    pub fn new(recognizer: Box<dyn TextRecognizer>, rules: RuleSet, crop: bool) -> Self {
        Self {
            recognizer,
            rules,
            crop,
            keep_annotated: false,
        }
    }

    /// Also return the annotated image for soft-only frames.
    pub fn keep_annotated(mut self, keep: bool) -> Self {
        self.keep_annotated = keep;
        self
    }

    /// Returns `None` when no whitelist rule held on this frame.
    ///
    /// Hard frames always carry their annotated image so a snapshot can be
    /// taken once the result is admitted. Unusable frames and recognizer
    /// failures count as frames without text.
    pub fn process(
        &mut self,
        index: u64,
        timestamp: Option<Duration>,
        frame: &VideoFrame,
    ) -> Option<FrameOutcome> {
        self.rules.clear();
        let source = preprocess::frame_to_rgb(frame)?;
        let prepared = preprocess::prepare(&source, self.crop)?;

        let response = match LumaPlane::from_parts(
            prepared.width(),
            prepared.height(),
            prepared.width() as usize,
            prepared.as_raw(),
        ) {
            Ok(plane) => {
                let request = OcrRequest::new(plane).with_frame_index(index);
                self.recognizer.recognize(&request).unwrap_or_else(|err| {
                    tracing::warn!(
                        frame = index,
                        engine = self.recognizer.name(),
                        error = %err,
                        "text recognition failed"
                    );
                    OcrResponse::empty()
                })
            }
            Err(err) => {
                tracing::warn!(frame = index, error = %err, "preprocessed frame rejected");
                OcrResponse::empty()
            }
        };

        let mut blocks = Vec::with_capacity(response.texts.len());
        for block in &response.texts {
            let text = block.text.to_lowercase();
            let bbox = block.bbox.downscaled(UPSCALE);
            self.rules.add_block(&text, bbox);
            blocks.push(bbox);
        }

        let mut match_type = MatchType::NONE;
        let mut matched = Vec::new();
        let mut terms: Vec<BoundingBox> = Vec::new();
        for (position, matcher) in self.rules.satisfied() {
            match_type |= if matcher.descriptor().is_soft() {
                MatchType::SOFT
            } else {
                MatchType::HARD
            };
            matched.push(position);
            terms.extend(matcher.matches().iter().map(|term| term.bbox));
        }
        if match_type.is_none() {
            return None;
        }

        let annotated = (match_type.is_hard() || self.keep_annotated)
            .then(|| annotate(&source, &blocks, &terms));
        tracing::debug!(frame = index, kind = %match_type, rules = matched.len(), "frame matched");

        Some(FrameOutcome {
            result: MatchResult {
                frame_index: index,
                timestamp,
                match_type,
                matched,
                rules: self.rules.clone(),
                snapshot: None,
                hard_sequence: None,
                saved_path: None,
            },
            annotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleBook, parse_rules};
    use vidgrep_ocr::{OcrText, RecognizerFactory, ScriptedFactory};

    fn frame(index: u64) -> VideoFrame {
        let data = vec![90u8; 16 * 12 * 3];
        VideoFrame::from_rgb_owned(16, 12, 16 * 3, Some(Duration::from_millis(index * 40)), data)
            .unwrap()
            .with_frame_index(Some(index))
    }

    fn processor(factory: &ScriptedFactory, rules: &str) -> FrameProcessor {
        let book = RuleBook::new(parse_rules(rules));
        FrameProcessor::new(factory.create(0).unwrap(), book.create(), false)
    }

    fn text(value: &str) -> OcrText {
        OcrText::new(BoundingBox::new(4, 4, 20, 8), value)
    }

    #[test]
    fn match_type_combines_flags() {
        let both = MatchType::SOFT | MatchType::HARD;
        assert!(both.is_hard() && both.is_soft());
        assert_eq!(both.to_string(), "hard+soft");
        assert!(MatchType::default().is_none());
    }

    #[test]
    fn blocks_are_lowercased_and_mapped_back() {
        let factory = ScriptedFactory::new().with_frame(3, vec![text("GAME OVER")]);
        let mut processor = processor(&factory, "game over #end\n");
        let outcome = processor.process(3, None, &frame(3)).unwrap();
        let result = outcome.result;
        assert!(result.match_type.is_hard());
        assert_eq!(result.matched, vec![0]);
        let rule = result.matched_rules().next().unwrap();
        assert_eq!(rule.descriptor().name(), "end");
        assert_eq!(rule.matches()[0].bbox, BoundingBox::new(2, 2, 10, 4));
    }

    #[test]
    fn frames_without_matches_yield_nothing() {
        let factory = ScriptedFactory::new().with_frame(1, vec![text("paused")]);
        let mut processor = processor(&factory, "game over\n");
        assert!(processor.process(1, None, &frame(1)).is_none());
        assert!(processor.process(2, None, &frame(2)).is_none());
    }

    #[test]
    fn hard_frames_carry_an_unclaimed_annotated_image() {
        let factory = ScriptedFactory::new().with_frame(0, vec![text("victory")]);
        let mut processor = processor(&factory, "victory\n");
        let outcome = processor.process(0, None, &frame(0)).unwrap();
        assert!(outcome.annotated.is_some());
        assert!(outcome.result.snapshot.is_none());
        assert!(outcome.result.hard_sequence.is_none());
    }

    #[test]
    fn ledger_stamps_snapshot_once_and_numbers_every_hard_result() {
        let ledger = MatchLedger::new();
        let factory = ScriptedFactory::new()
            .with_frame(0, vec![text("victory")])
            .with_frame(1, vec![text("victory")]);
        let mut first = processor(&factory, "victory\n~ tip\n");
        let mut second = processor(&factory, "victory\n~ tip\n");

        let a = first.process(0, None, &frame(0)).unwrap();
        let b = second.process(1, None, &frame(1)).unwrap();
        let (mut a_result, mut b_result) = (a.result, b.result);
        ledger.stamp(&mut b_result, b.annotated.as_ref());
        ledger.stamp(&mut a_result, a.annotated.as_ref());

        assert!(b_result.snapshot.is_some());
        assert!(a_result.snapshot.is_none());
        assert_eq!(b_result.hard_sequence, Some(1));
        assert_eq!(a_result.hard_sequence, Some(2));
        assert_eq!(ledger.hard_matches(), 2);
    }

    #[test]
    fn soft_matches_take_no_snapshot_or_sequence() {
        let ledger = MatchLedger::new();
        let factory = ScriptedFactory::new().with_frame(0, vec![text("tip: jump")]);
        let mut processor = processor(&factory, "victory\n~ tip\n");
        let outcome = processor.process(0, None, &frame(0)).unwrap();
        let mut result = outcome.result;
        assert_eq!(result.match_type, MatchType::SOFT);
        assert_eq!(result.matched, vec![1]);
        assert!(outcome.annotated.is_none());

        ledger.stamp(&mut result, None);
        assert!(result.snapshot.is_none());
        assert!(result.hard_sequence.is_none());
        assert_eq!(ledger.hard_matches(), 0);
    }

    #[test]
    fn state_does_not_leak_between_frames() {
        let factory = ScriptedFactory::new()
            .with_frame(0, vec![text("sign")])
            .with_frame(1, vec![text("in")]);
        let mut processor = processor(&factory, "sign in\n");
        assert!(processor.process(0, None, &frame(0)).is_none());
        assert!(processor.process(1, None, &frame(1)).is_none());
    }

    #[test]
    fn soft_frames_are_annotated_on_request() {
        let factory = ScriptedFactory::new().with_frame(5, vec![text("tip")]);
        let mut processor = processor(&factory, "victory\n~ tip\n").keep_annotated(true);
        let outcome = processor.process(5, None, &frame(5)).unwrap();
        let annotated = outcome.annotated.unwrap();
        assert_eq!(annotated.dimensions(), (16, 12));
    }
}
