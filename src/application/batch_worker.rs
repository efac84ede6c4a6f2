use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use log::warn;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::{BatchJob, BatchResult, ItemFailure};
use crate::engine::{DownloadOptions, MediaEngine, ProgressPhase, ProgressSink};

/// Callbacks the worker drives while a batch runs. `item_started` positions
/// the batch ("downloading item idx of total", 1-indexed); `item_progress`
/// carries the current item's percentage.
pub trait BatchSink {
    fn item_started(&self, index: usize, total: usize);
    fn item_progress(&self, percent: u8);
}

/// Events flowing from the worker thread to whoever is rendering the batch.
/// Events for item k are fully ordered before those for item k+1; `Finished`
/// arrives exactly once, strictly last.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    ItemStarted { index: usize, total: usize },
    ItemProgress { percent: u8 },
    Finished(BatchResult),
}

/// Run a whole batch to completion: every item is attempted exactly once, in
/// list order, and a single item's failure never aborts the loop. Blocks the
/// calling thread for the duration; see [`spawn_batch`] for the threaded
/// variant.
///
/// Items run sequentially: the engine already parallelizes segment fetches
/// within one item, and a single active item keeps the one progress bar
/// unambiguous.
pub fn run_batch(engine: &dyn MediaEngine, job: &BatchJob, sink: &dyn BatchSink) -> BatchResult {
    let total = job.items.len();
    let options = DownloadOptions {
        format: job.format,
        destination: job.destination.clone(),
    };

    let mut failures = Vec::new();
    for (position, item) in job.items.iter().enumerate() {
        sink.item_started(position + 1, total);

        let meter = PercentMeter::new(sink);
        if let Err(err) = engine.download(item, &options, &meter) {
            warn!("download failed for {}: {}", item.url, err);
            failures.push(ItemFailure {
                item: item.clone(),
                message: err.to_string(),
            });
        }
    }

    BatchResult {
        succeeded: total - failures.len(),
        failures,
    }
}

/// Run the batch on a dedicated worker thread, reporting through a channel.
/// The receiver yields per-item events followed by `Finished`, then closes.
pub fn spawn_batch(engine: Arc<dyn MediaEngine>, job: BatchJob) -> UnboundedReceiver<WorkerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || {
        let sink = ChannelSink { tx: tx.clone() };
        let result = run_batch(engine.as_ref(), &job, &sink);
        let _ = tx.send(WorkerEvent::Finished(result));
    });

    rx
}

struct ChannelSink {
    tx: UnboundedSender<WorkerEvent>,
}

impl BatchSink for ChannelSink {
    fn item_started(&self, index: usize, total: usize) {
        let _ = self.tx.send(WorkerEvent::ItemStarted { index, total });
    }

    fn item_progress(&self, percent: u8) {
        let _ = self.tx.send(WorkerEvent::ItemProgress { percent });
    }
}

/// Per-item translation of the engine's byte counters into the 0..=100 scale.
///
/// `floor(downloaded / total * 100)`, clamped. While no total is known
/// nothing is emitted; the `finished` phase emits 100 unconditionally. A
/// shrinking size estimate would make the percentage step backwards, so such
/// updates are dropped.
struct PercentMeter<'a> {
    sink: &'a dyn BatchSink,
    last: Cell<Option<u8>>,
}

impl<'a> PercentMeter<'a> {
    fn new(sink: &'a dyn BatchSink) -> Self {
        Self {
            sink,
            last: Cell::new(None),
        }
    }
}

impl ProgressSink for PercentMeter<'_> {
    fn on_progress(&self, downloaded: u64, total: Option<u64>, phase: ProgressPhase) {
        match phase {
            ProgressPhase::Finished => {
                self.last.set(Some(100));
                self.sink.item_progress(100);
            }
            ProgressPhase::Downloading => {
                let Some(total) = total.filter(|t| *t > 0) else {
                    return;
                };
                let percent = (downloaded.saturating_mul(100) / total).min(100) as u8;
                if self.last.get().is_some_and(|last| percent < last) {
                    return;
                }
                self.last.set(Some(percent));
                self.sink.item_progress(percent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{DownloadItem, FormatChoice, PlaylistInfo};
    use crate::engine::EngineError;

    /// A scripted engine: per-item outcomes plus a progress script replayed
    /// into the sink on every download call.
    struct FakeEngine {
        outcomes: Vec<Result<(), EngineError>>,
        progress_script: Vec<(u64, Option<u64>, ProgressPhase)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeEngine {
        fn new(outcomes: Vec<Result<(), EngineError>>) -> Self {
            Self {
                outcomes,
                progress_script: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_progress(mut self, script: Vec<(u64, Option<u64>, ProgressPhase)>) -> Self {
            self.progress_script = script;
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl MediaEngine for FakeEngine {
        fn resolve(&self, _url: &str) -> Result<PlaylistInfo, EngineError> {
            unimplemented!("not exercised by the worker")
        }

        fn download(
            &self,
            item: &DownloadItem,
            _options: &DownloadOptions,
            progress: &dyn ProgressSink,
        ) -> Result<(), EngineError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(item.url.clone());
            drop(calls);

            for (downloaded, total, phase) in &self.progress_script {
                progress.on_progress(*downloaded, *total, *phase);
            }
            self.outcomes[index].clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        started: Mutex<Vec<(usize, usize)>>,
        percents: Mutex<Vec<u8>>,
    }

    impl BatchSink for RecordingSink {
        fn item_started(&self, index: usize, total: usize) {
            self.started.lock().unwrap().push((index, total));
        }

        fn item_progress(&self, percent: u8) {
            self.percents.lock().unwrap().push(percent);
        }
    }

    fn job_of(n: usize) -> BatchJob {
        let items = (1..=n)
            .map(|i| DownloadItem {
                id: format!("id{}", i),
                title: format!("Video {}", i),
                url: format!("https://www.youtube.com/watch?v=id{}", i),
            })
            .collect();
        BatchJob::new(items, FormatChoice::Mp3, PathBuf::from("/tmp")).unwrap()
    }

    #[test]
    fn all_items_succeeding_yields_a_clean_result() {
        let engine = FakeEngine::new(vec![Ok(()), Ok(()), Ok(())]);
        let sink = RecordingSink::default();

        let result = run_batch(&engine, &job_of(3), &sink);

        assert!(result.is_success());
        assert_eq!(result.succeeded, 3);
        assert_eq!(
            *sink.started.lock().unwrap(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
    }

    #[test]
    fn one_failure_never_aborts_the_batch() {
        let engine = FakeEngine::new(vec![
            Ok(()),
            Err(EngineError::Download("Video unavailable".to_string())),
            Ok(()),
        ]);
        let sink = RecordingSink::default();

        let result = run_batch(&engine, &job_of(3), &sink);

        assert_eq!(engine.call_count(), 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].item.title, "Video 2");
        assert_eq!(result.failures[0].message, "Video unavailable");
    }

    #[test]
    fn byte_counters_translate_to_floored_percentages() {
        let engine = FakeEngine::new(vec![Ok(())]).with_progress(vec![
            (0, Some(1000), ProgressPhase::Downloading),
            (333, Some(1000), ProgressPhase::Downloading),
            (999, Some(1000), ProgressPhase::Downloading),
            (1000, Some(1000), ProgressPhase::Downloading),
            (1000, Some(1000), ProgressPhase::Finished),
        ]);
        let sink = RecordingSink::default();

        run_batch(&engine, &job_of(1), &sink);

        assert_eq!(*sink.percents.lock().unwrap(), vec![0, 33, 99, 100, 100]);
    }

    #[test]
    fn unknown_total_stays_silent_until_finished() {
        let engine = FakeEngine::new(vec![Ok(())]).with_progress(vec![
            (100, None, ProgressPhase::Downloading),
            (5000, None, ProgressPhase::Downloading),
            (9000, None, ProgressPhase::Finished),
        ]);
        let sink = RecordingSink::default();

        run_batch(&engine, &job_of(1), &sink);

        assert_eq!(*sink.percents.lock().unwrap(), vec![100]);
    }

    #[test]
    fn shrinking_estimates_never_step_the_bar_backwards() {
        let engine = FakeEngine::new(vec![Ok(())]).with_progress(vec![
            (500, Some(1000), ProgressPhase::Downloading),
            (500, Some(2000), ProgressPhase::Downloading),
            (1500, Some(2000), ProgressPhase::Downloading),
        ]);
        let sink = RecordingSink::default();

        run_batch(&engine, &job_of(1), &sink);

        let percents = sink.percents.lock().unwrap();
        assert_eq!(*percents, vec![50, 75]);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn percentages_are_clamped_to_one_hundred() {
        let engine = FakeEngine::new(vec![Ok(())]).with_progress(vec![(
            3000,
            Some(2000),
            ProgressPhase::Downloading,
        )]);
        let sink = RecordingSink::default();

        run_batch(&engine, &job_of(1), &sink);

        assert_eq!(*sink.percents.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn spawned_batch_reports_over_the_channel_and_finishes_last() {
        let engine: Arc<dyn MediaEngine> = Arc::new(
            FakeEngine::new(vec![Ok(()), Ok(())])
                .with_progress(vec![(10, Some(10), ProgressPhase::Finished)]),
        );
        let mut rx = spawn_batch(engine, job_of(2));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(
            events.first(),
            Some(WorkerEvent::ItemStarted { index: 1, total: 2 })
        ));
        assert!(matches!(
            events.last(),
            Some(WorkerEvent::Finished(result)) if result.succeeded == 2
        ));
        let finishes = events
            .iter()
            .filter(|e| matches!(e, WorkerEvent::Finished(_)))
            .count();
        assert_eq!(finishes, 1);
    }
}
