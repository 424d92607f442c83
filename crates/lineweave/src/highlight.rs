//! Per-line syntax highlighting.
//!
//! Highlighting is the only work that may leave the owner thread. A [`HighlightWorker`] owns a
//! background thread fed through a job channel; results come back over a second channel and
//! are applied by
//! [`TextEditor::process_highlight_results`](crate::text_editor::TextEditor::process_highlight_results).
//!
//! ```text
//! owner thread                         worker thread
//! ------------                         -------------
//! LineController --HighlightJob------> highlighter.highlight(text, token)
//!       ^                                      |
//!       '------ HighlightResult  <-------------'
//!        (dropped if the generation is stale)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::trace;

use crate::error::HighlightError;
use crate::line_manager::LineId;
use crate::text_range::TextRange;
use crate::theme::{TextStyle, Theme};

/// A capture produced by a highlighter, in line-local UTF-16 units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    /// Line-local range.
    pub range: TextRange,
    /// Capture name such as `keyword` or `string.special`.
    pub capture: String,
}

impl HighlightSpan {
    /// Create a span.
    pub fn new(range: TextRange, capture: impl Into<String>) -> Self {
        Self {
            range,
            capture: capture.into(),
        }
    }
}

/// A highlight span resolved against the theme.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    /// Line-local range.
    pub range: TextRange,
    /// Capture the style was resolved from.
    pub capture: String,
    /// Resolved style.
    pub style: TextStyle,
}

/// Resolve highlighter output against a theme. Captures without a style are dropped.
pub fn resolve_styled_runs(spans: &[HighlightSpan], theme: &dyn Theme) -> Vec<StyledRun> {
    spans
        .iter()
        .filter_map(|span| {
            theme.style_for_capture(&span.capture).map(|style| StyledRun {
                range: span.range,
                capture: span.capture.clone(),
                style,
            })
        })
        .collect()
}

/// A cancellation flag shared between a line controller and an in-flight highlight job.
///
/// Cancelling is idempotent and never blocks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Highlights the plain text of one line.
///
/// Implementations run on the highlight worker thread and must only look at the text they are
/// given. Long-running implementations should poll `cancellation` and return
/// [`HighlightError::Cancelled`].
pub trait LineSyntaxHighlighter: fmt::Debug + Send + Sync {
    /// Produce highlight spans for `text` (the line content without its delimiter).
    fn highlight(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<Vec<HighlightSpan>, HighlightError>;
}

/// Highlighter that produces no spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSyntaxHighlighter;

impl LineSyntaxHighlighter for PlainTextSyntaxHighlighter {
    fn highlight(
        &self,
        _text: &str,
        cancellation: &CancellationToken,
    ) -> Result<Vec<HighlightSpan>, HighlightError> {
        if cancellation.is_cancelled() {
            return Err(HighlightError::Cancelled);
        }
        Ok(Vec::new())
    }
}

pub(crate) struct HighlightJob {
    pub(crate) line_id: LineId,
    pub(crate) generation: u64,
    pub(crate) text: String,
    pub(crate) highlighter: Arc<dyn LineSyntaxHighlighter>,
    pub(crate) cancellation: CancellationToken,
}

/// The outcome of one highlight job.
#[derive(Debug)]
pub struct HighlightResult {
    /// Line the job was dispatched for.
    pub line_id: LineId,
    /// Generation the job was dispatched with.
    pub generation: u64,
    /// Spans, or why there are none.
    pub outcome: Result<Vec<HighlightSpan>, HighlightError>,
}

/// Sends highlight jobs to a worker.
///
/// Generations are unique for the lifetime of the worker, so a controller created again for
/// the same line never accepts a result meant for the one it replaced.
#[derive(Debug, Clone)]
pub(crate) struct HighlightDispatcher {
    jobs: Sender<HighlightJob>,
    generations: Arc<AtomicU64>,
}

impl HighlightDispatcher {
    /// A generation no earlier job has carried.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Queue a job. Returns `false` if the worker is gone.
    pub(crate) fn submit(&self, job: HighlightJob) -> bool {
        trace!(line = %job.line_id, generation = job.generation, "dispatching highlight job");
        self.jobs.send(job).is_ok()
    }
}

/// Background thread that runs highlight jobs.
///
/// Dropping the worker closes the job channel; the thread finishes its current job and exits
/// on its own. The owner never joins it.
#[derive(Debug)]
pub struct HighlightWorker {
    dispatcher: HighlightDispatcher,
    results: Receiver<HighlightResult>,
}

impl HighlightWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (job_sender, job_receiver) = unbounded::<HighlightJob>();
        let (result_sender, result_receiver) = unbounded::<HighlightResult>();
        thread::Builder::new()
            .name("lineweave-highlight".to_string())
            .spawn(move || run_worker(job_receiver, result_sender))?;
        Ok(Self {
            dispatcher: HighlightDispatcher {
                jobs: job_sender,
                generations: Arc::new(AtomicU64::new(0)),
            },
            results: result_receiver,
        })
    }

    pub(crate) fn dispatcher(&self) -> &HighlightDispatcher {
        &self.dispatcher
    }

    /// Results that arrived since the last call, without blocking.
    pub(crate) fn drain_results(&self) -> Vec<HighlightResult> {
        self.results.try_iter().collect()
    }

    /// Block until one result arrives, the worker is gone or `timeout` passes.
    pub(crate) fn wait_for_result(&self, timeout: Duration) -> Option<HighlightResult> {
        self.results.recv_timeout(timeout).ok()
    }
}

fn run_worker(jobs: Receiver<HighlightJob>, results: Sender<HighlightResult>) {
    for job in jobs.iter() {
        if job.cancellation.is_cancelled() {
            trace!(
                line = %job.line_id,
                generation = job.generation,
                "skipping cancelled highlight job"
            );
            continue;
        }
        let outcome = match job.highlighter.highlight(&job.text, &job.cancellation) {
            Ok(_) if job.cancellation.is_cancelled() => Err(HighlightError::Cancelled),
            outcome => outcome,
        };
        let result = HighlightResult {
            line_id: job.line_id,
            generation: job.generation,
            outcome,
        };
        if results.send(result).is_err() {
            break;
        }
    }
    trace!("highlight worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DigitHighlighter;

    impl LineSyntaxHighlighter for DigitHighlighter {
        fn highlight(
            &self,
            text: &str,
            _: &CancellationToken,
        ) -> Result<Vec<HighlightSpan>, HighlightError> {
            Ok(text
                .encode_utf16()
                .enumerate()
                .filter(|(_, unit)| (b'0' as u16..=b'9' as u16).contains(unit))
                .map(|(index, _)| HighlightSpan::new(TextRange::new(index, 1), "number"))
                .collect())
        }
    }

    fn job(generation: u64, text: &str, cancellation: CancellationToken) -> HighlightJob {
        HighlightJob {
            line_id: LineId::from_raw(3),
            generation,
            text: text.to_string(),
            highlighter: Arc::new(DigitHighlighter),
            cancellation,
        }
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = HighlightWorker::spawn().unwrap();
        assert!(worker.dispatcher().submit(job(1, "a1b2", CancellationToken::new())));
        let result = worker.results.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.generation, 1);
        assert_eq!(
            result.outcome.unwrap(),
            vec![
                HighlightSpan::new(TextRange::new(1, 1), "number"),
                HighlightSpan::new(TextRange::new(3, 1), "number"),
            ]
        );
    }

    #[test]
    fn test_cancelled_jobs_are_skipped() {
        let worker = HighlightWorker::spawn().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(worker.dispatcher().submit(job(1, "1", token)));
        assert!(worker.dispatcher().submit(job(2, "2", CancellationToken::new())));
        let result = worker.results.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.generation, 2);
    }

    #[test]
    fn test_generations_are_never_reused() {
        let worker = HighlightWorker::spawn().unwrap();
        let dispatcher = worker.dispatcher().clone();
        let first = worker.dispatcher().next_generation();
        let second = dispatcher.next_generation();
        assert!(second > first);
        assert!(worker.dispatcher().next_generation() > second);
    }

    #[test]
    fn test_resolve_drops_unstyled_captures() {
        let theme = crate::theme::DefaultTheme::default();
        let spans = vec![
            HighlightSpan::new(TextRange::new(0, 2), "keyword.control"),
            HighlightSpan::new(TextRange::new(3, 1), "no-such-capture"),
        ];
        let runs = resolve_styled_runs(&spans, &theme);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].style.bold);
    }
}
