use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use vidgrep_decoder::{DecoderResult, DynFrameSource, VideoFrame, VideoMetadata};
use vidgrep_ocr::{OcrError, RecognizerFactory, TextRecognizer};

use crate::error::ScanError;
use crate::output::write_result_frame;
use crate::rules::RuleBook;

use super::processor::{FrameOutcome, FrameProcessor, MatchLedger, MatchResult};
use super::progress::ScanProgress;

pub const DEFAULT_FRAME_SKIP: u64 = 24;
pub const DEFAULT_MATCH_LIMIT: usize = 1;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Worker threads; `None` uses the available hardware parallelism.
    pub thread_count: Option<usize>,
    /// Hard matches to collect before stopping early.
    pub match_limit: usize,
    pub frame_skip: u64,
    pub crop: bool,
    /// Directory receiving an annotated JPEG per retained match.
    pub result_dir: Option<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            thread_count: None,
            match_limit: DEFAULT_MATCH_LIMIT,
            frame_skip: DEFAULT_FRAME_SKIP,
            crop: false,
            result_dir: None,
        }
    }
}

impl ScanOptions {
    pub fn resolved_thread_count(&self) -> usize {
        self.thread_count
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, usize::from))
            .max(1)
    }
}

#[derive(Debug)]
enum WorkerEvent {
    Matched(Box<MatchResult>),
    Exited { worker: usize },
}

/// State every worker reads and the coordinator inspects.
struct Shared {
    source: Mutex<DynFrameSource>,
    frame_count: u64,
    metadata: VideoMetadata,
    frame_skip: u64,
    cursor: AtomicU64,
    budget: i64,
    remaining: AtomicI64,
    stop: AtomicBool,
    running: AtomicUsize,
    crop: bool,
    result_dir: Option<PathBuf>,
    ledger: MatchLedger,
    progress: ScanProgress,
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Claims the next frame index, or `None` once the video is exhausted.
    fn claim_frame(&self) -> Option<u64> {
        let index = self.cursor.fetch_add(self.frame_skip, Ordering::AcqRel);
        (index < self.frame_count).then_some(index)
    }

    fn read_frame(&self, index: u64) -> DecoderResult<VideoFrame> {
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        source.frame(index)
    }

    /// Charges hard matches against the budget; soft matches are free.
    ///
    /// Returns whether the result should be kept.
    fn admit(&self, result: &MatchResult) -> bool {
        if !result.match_type.is_hard() {
            return true;
        }
        let before = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if before == 1 {
            self.request_stop();
        }
        before >= 1
    }
}

/// Decrements the running count and notifies the coordinator on any exit path.
struct RunningGuard {
    worker: usize,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.shared.running.fetch_sub(1, Ordering::AcqRel);
        let _ = self.events.send(WorkerEvent::Exited {
            worker: self.worker,
        });
    }
}

/// Pool of scanning workers plus the coordinator collecting their results.
pub struct FrameScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    results: Vec<MatchResult>,
    hard_results: usize,
    match_limit: usize,
}

impl FrameScheduler {
    /// Spawns and initializes every worker, one after another.
    ///
    /// Each worker builds its own recognizer and reports back before the next
    /// one is launched. If any of them fails, the already running workers
    /// are stopped and joined and no scan takes place.
    pub fn start(
        source: DynFrameSource,
        rules: &RuleBook,
        factory: Arc<dyn RecognizerFactory>,
        options: &ScanOptions,
        progress: ScanProgress,
    ) -> Result<Self, ScanError> {
        let thread_count = options.resolved_thread_count();
        let match_limit = options.match_limit.max(1);
        let budget = i64::try_from(match_limit).unwrap_or(i64::MAX);
        let shared = Arc::new(Shared {
            frame_count: source.frame_count(),
            metadata: source.metadata(),
            source: Mutex::new(source),
            frame_skip: options.frame_skip.max(1),
            cursor: AtomicU64::new(0),
            budget,
            remaining: AtomicI64::new(budget),
            stop: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            crop: options.crop,
            result_dir: options.result_dir.clone(),
            ledger: MatchLedger::new(),
            progress,
        });
        tracing::info!(
            workers = thread_count,
            frames = shared.frame_count,
            frame_skip = shared.frame_skip,
            match_limit,
            "starting scan"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut workers = Vec::with_capacity(thread_count);
        for worker in 0..thread_count {
            let (ready_tx, ready_rx) = oneshot::channel::<Result<(), OcrError>>();
            let context = WorkerContext {
                worker,
                shared: Arc::clone(&shared),
                factory: Arc::clone(&factory),
                rules: rules.clone(),
                events: events_tx.clone(),
            };
            shared.running.fetch_add(1, Ordering::AcqRel);
            let spawned = thread::Builder::new()
                .name(format!("vidgrep-worker-{worker}"))
                .spawn(move || context.run(ready_tx));
            let handle = match spawned {
                Ok(handle) => handle,
                Err(source) => {
                    shared.running.fetch_sub(1, Ordering::AcqRel);
                    abort_workers(&shared, workers);
                    return Err(ScanError::Spawn { worker, source });
                }
            };
            workers.push(handle);

            match ready_rx.blocking_recv() {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    abort_workers(&shared, workers);
                    return Err(ScanError::WorkerInit { worker, source });
                }
                Err(_) => {
                    abort_workers(&shared, workers);
                    return Err(ScanError::WorkerLost { worker });
                }
            }
        }

        Ok(Self {
            shared,
            workers,
            events: events_rx,
            results: Vec::new(),
            hard_results: 0,
            match_limit,
        })
    }

    /// True once at least one hard match was charged against the budget.
    pub fn found_any_matches(&self) -> bool {
        self.shared.remaining.load(Ordering::Acquire) < self.shared.budget
    }

    /// Blocks until the budget is met, a stop is requested, or every worker
    /// has exited; then joins the workers and collects their results.
    pub fn wait_finish(mut self) -> ScanOutcome {
        while self.hard_results < self.match_limit
            && !self.shared.should_stop()
            && self.shared.running.load(Ordering::Acquire) > 0
        {
            match self.events.blocking_recv() {
                Some(event) => self.handle(event),
                None => break,
            }
        }

        self.shared.request_stop();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("scan worker panicked");
            }
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
        }

        let remaining = self.shared.remaining.load(Ordering::Acquire);
        self.shared.progress.finish(remaining <= 0);
        ScanOutcome {
            results: self.results,
            frame_count: self.shared.frame_count,
            metadata: self.shared.metadata,
            budget: self.shared.budget,
            remaining,
        }
    }

    fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Matched(result) => {
                if result.match_type.is_hard() {
                    self.hard_results += 1;
                }
                self.results.push(*result);
            }
            WorkerEvent::Exited { worker } => {
                tracing::debug!(worker, "worker exited");
            }
        }
    }
}

fn abort_workers(shared: &Shared, workers: Vec<JoinHandle<()>>) {
    shared.request_stop();
    for handle in workers {
        let _ = handle.join();
    }
}

struct WorkerContext {
    worker: usize,
    shared: Arc<Shared>,
    factory: Arc<dyn RecognizerFactory>,
    rules: RuleBook,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerContext {
    fn run(self, ready: oneshot::Sender<Result<(), OcrError>>) {
        let _guard = RunningGuard {
            worker: self.worker,
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        };
        let recognizer = match self.factory.create(self.worker) {
            Ok(recognizer) => recognizer,
            Err(err) => {
                tracing::error!(worker = self.worker, error = %err, "recognizer initialization failed");
                let _ = ready.send(Err(err));
                return;
            }
        };
        if ready.send(Ok(())).is_err() {
            return;
        }
        self.scan(recognizer);
    }

    fn scan(&self, recognizer: Box<dyn TextRecognizer>) {
        let shared = &self.shared;
        let mut processor = FrameProcessor::new(recognizer, self.rules.create(), shared.crop)
            .keep_annotated(shared.result_dir.is_some());

        while !shared.should_stop() {
            let Some(index) = shared.claim_frame() else {
                break;
            };
            let percent = (index as f64 * 1000.0 / shared.frame_count as f64).round() / 10.0;
            tracing::debug!(
                worker = self.worker,
                frame = index,
                total = shared.frame_count,
                percent,
                "processing frame"
            );

            let outcome = match shared.read_frame(index) {
                Ok(frame) => {
                    let timestamp = frame
                        .timestamp()
                        .or_else(|| shared.metadata.timestamp_for(index));
                    processor.process(index, timestamp, &frame)
                }
                Err(err) => {
                    tracing::warn!(frame = index, error = %err, "failed to read frame");
                    None
                }
            };
            shared.progress.frame_done();

            let Some(FrameOutcome {
                mut result,
                annotated,
            }) = outcome
            else {
                continue;
            };
            if !shared.admit(&result) {
                tracing::debug!(frame = index, "match limit already reached, result dropped");
                continue;
            }
            shared.ledger.stamp(&mut result, annotated.as_ref());
            if let (Some(dir), Some(image)) = (shared.result_dir.as_deref(), annotated.as_ref()) {
                match write_result_frame(dir, image, result.timestamp, index) {
                    Ok(path) => result.saved_path = Some(path),
                    Err(err) => {
                        tracing::warn!(frame = index, error = %err, "failed to save result frame")
                    }
                }
            }
            if self.events.send(WorkerEvent::Matched(Box::new(result))).is_err() {
                break;
            }
        }
    }
}

/// Everything a finished scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Retained results in completion order.
    pub results: Vec<MatchResult>,
    pub frame_count: u64,
    pub metadata: VideoMetadata,
    budget: i64,
    remaining: i64,
}

impl ScanOutcome {
    pub fn found_any_matches(&self) -> bool {
        self.remaining < self.budget
    }

    /// True when the full match limit was reached.
    pub fn budget_satisfied(&self) -> bool {
        self.remaining <= 0
    }

    /// Retained hard results.
    pub fn hard_results(&self) -> impl Iterator<Item = &MatchResult> {
        self.results
            .iter()
            .filter(|result| result.match_type.is_hard())
    }

    /// The earliest-observed retained hard match.
    pub fn first_match(&self) -> Option<&MatchResult> {
        self.hard_results()
            .min_by_key(|result| result.hard_sequence.unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use crate::scan::MatchType;
    use vidgrep_decoder::backends::mock::MockSource;

    fn shared(budget: i64) -> Shared {
        let source: DynFrameSource = Box::new(MockSource::new(10, 4, 4, 25.0));
        Shared {
            frame_count: source.frame_count(),
            metadata: source.metadata(),
            source: Mutex::new(source),
            frame_skip: 3,
            cursor: AtomicU64::new(0),
            budget,
            remaining: AtomicI64::new(budget),
            stop: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            crop: false,
            result_dir: None,
            ledger: MatchLedger::new(),
            progress: ScanProgress::hidden(),
        }
    }

    fn result(match_type: MatchType) -> MatchResult {
        MatchResult {
            frame_index: 0,
            timestamp: None,
            match_type,
            matched: vec![0],
            rules: RuleSet::default(),
            snapshot: None,
            hard_sequence: None,
            saved_path: None,
        }
    }

    #[test]
    fn admitting_the_last_hard_result_requests_stop() {
        let shared = shared(2);

        assert!(shared.admit(&result(MatchType::HARD)));
        assert!(!shared.should_stop());
        assert!(shared.admit(&result(MatchType::HARD | MatchType::SOFT)));
        assert!(shared.should_stop());
        assert!(!shared.admit(&result(MatchType::HARD)));
        assert_eq!(shared.remaining.load(Ordering::Acquire), -1);
    }

    #[test]
    fn soft_results_are_free() {
        let shared = shared(1);
        for _ in 0..5 {
            assert!(shared.admit(&result(MatchType::SOFT)));
        }
        assert!(!shared.should_stop());
        assert_eq!(shared.remaining.load(Ordering::Acquire), 1);
    }

    #[test]
    fn claims_follow_the_stride_until_exhausted() {
        let shared = shared(1);
        let claims: Vec<u64> = std::iter::from_fn(|| shared.claim_frame()).collect();
        assert_eq!(claims, vec![0, 3, 6, 9]);
        assert_eq!(shared.claim_frame(), None);
    }
}
