// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel geometry iterator
//!
//! A fixed pool of `thread_count` rayon workers claims elements from a shared
//! queue through an atomic cursor, so every element is processed at most once.
//! Results flow back over a bounded channel in completion order; with a single
//! worker that is the filtered input order. Workers block while the channel is
//! full, so they never run more than `thread_count` results ahead of the
//! consumer and a cancel takes effect after at most that many more results.

use crate::error::{ElementError, ElementErrorKind, FatalError, RunError};
use crate::mapping::MappedElement;
use crate::output::ElementShape;
use crate::params::RunParameters;
use crate::pipeline::Pipeline;
use ifcgeom_core::{keys, ContextSelector, Model, ObjectRef, SettingsSnapshot};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Constructed,
    Running,
    Done,
    Cancelled,
}

/// Counts reported when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Elements queued after filtering
    pub queued: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Elements without geometry in the selected contexts or dimensionality
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Cloneable handle that stops a run from another thread
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Stop dequeuing further elements; in-flight elements still complete
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct Outcome {
    result: Result<ElementShape, ElementError>,
}

/// Batch driver over the elements of one model
pub struct GeometryIterator {
    model: Arc<Model>,
    params: RunParameters,
    state: RunState,
    cancel: CancelHandle,
    receiver: Option<Receiver<Outcome>>,
    pool: Option<rayon::ThreadPool>,
    current: Option<ElementShape>,
    failures: Vec<ElementError>,
    summary: RunSummary,
    started: Option<Instant>,
}

impl GeometryIterator {
    /// Validate the run against the model; no work starts until [`initialize`](Self::initialize)
    pub fn new(model: Arc<Model>, params: RunParameters) -> Result<Self, RunError> {
        Pipeline::new(&model, &params.settings, &params.context)?;

        Ok(Self {
            model,
            params,
            state: RunState::Constructed,
            cancel: CancelHandle(Arc::new(AtomicBool::new(false))),
            receiver: None,
            pool: None,
            current: None,
            failures: Vec::new(),
            summary: RunSummary::default(),
            started: None,
        })
    }

    /// Load a JSON model from disk and construct a run over it
    pub fn open(path: impl AsRef<Path>, params: RunParameters) -> Result<Self, RunError> {
        let model = Model::open(path).map_err(FatalError::from)?;
        Self::new(Arc::new(model), params)
    }

    /// Filter the model, run the optional mapping pre-pass and start the
    /// workers. Returns whether any element was queued.
    pub fn initialize(&mut self) -> Result<bool, RunError> {
        if self.state != RunState::Constructed {
            return Ok(self.summary.queued > 0);
        }
        self.started = Some(Instant::now());

        let filter = self.params.filter.resolve(&self.model);
        let queue: Vec<ObjectRef> = self
            .model
            .elements
            .iter()
            .map(|e| ObjectRef(e.id))
            .filter(|id| filter.admits(*id))
            .collect();
        self.summary.queued = queue.len();

        let threads = self.params.thread_count;
        tracing::info!(
            elements = self.model.len(),
            queued = queue.len(),
            threads,
            "Starting geometry iteration"
        );

        let premapped = if self.params.settings.value(keys::NO_PARALLEL_MAPPING) {
            Some(Arc::new(self.map_all(&queue)?))
        } else {
            None
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ifcgeom-worker-{}", i))
            .build()
            .map_err(FatalError::from)?;

        let (sender, receiver) = mpsc::sync_channel(threads);
        let queue = Arc::new(queue);
        let cursor = Arc::new(AtomicUsize::new(0));

        for _ in 0..threads {
            let worker = Worker {
                model: Arc::clone(&self.model),
                settings: self.params.settings.clone(),
                selector: self.params.context.clone(),
                queue: Arc::clone(&queue),
                cursor: Arc::clone(&cursor),
                cancel: self.cancel.clone(),
                premapped: premapped.clone(),
                sender: sender.clone(),
            };
            pool.spawn(move || worker.run());
        }

        self.pool = Some(pool);
        self.receiver = Some(receiver);
        self.state = RunState::Running;
        Ok(!queue.is_empty())
    }

    /// Single-threaded mapping pass over the queue
    fn map_all(&self, queue: &[ObjectRef]) -> Result<Vec<Result<MappedElement, ElementError>>, RunError> {
        let start = Instant::now();
        let pipeline = Pipeline::new(&self.model, &self.params.settings, &self.params.context)?;
        let mapped: Vec<_> = queue
            .iter()
            .map(|id| match self.model.get(*id) {
                Some(element) => pipeline.mapper().map(element, None),
                None => Err(ElementError::new(id.0, "", ElementErrorKind::NotFound)),
            })
            .collect();

        tracing::debug!(
            elements = mapped.len(),
            time_ms = start.elapsed().as_millis(),
            "Mapping pre-pass complete"
        );
        Ok(mapped)
    }

    /// Move to the next result, making it available through [`get`](Self::get)
    pub fn advance(&mut self) -> bool {
        self.current = Iterator::next(self);
        self.current.is_some()
    }

    /// Result of the last [`advance`](Self::advance)
    pub fn get(&self) -> Option<&ElementShape> {
        self.current.as_ref()
    }

    /// Stop dequeuing further elements
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Percentage of queued elements processed so far
    pub fn progress(&self) -> u8 {
        match self.summary.queued {
            0 if self.state == RunState::Constructed => 0,
            0 => 100,
            queued => (self.summary.processed * 100 / queued).min(100) as u8,
        }
    }

    /// Per-element failures collected so far
    pub fn failures(&self) -> &[ElementError] {
        &self.failures
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    fn record(&mut self, outcome: Outcome) -> Option<ElementShape> {
        self.summary.processed += 1;
        match outcome.result {
            Ok(shape) => {
                self.summary.succeeded += 1;
                Some(shape)
            }
            Err(e) if e.is_skip() => {
                self.summary.skipped += 1;
                tracing::debug!(element = e.id, entity = %e.entity, reason = %e.kind, "Element skipped");
                None
            }
            Err(e) => {
                self.summary.failed += 1;
                tracing::error!(element = e.id, entity = %e.entity, error = %e.kind, "Element processing failed");
                self.failures.push(e);
                None
            }
        }
    }

    fn finish(&mut self) {
        self.receiver = None;
        self.pool = None;
        self.summary.cancelled = self.cancel.is_cancelled();
        self.summary.elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        self.state = if self.summary.cancelled {
            RunState::Cancelled
        } else {
            RunState::Done
        };

        tracing::info!(
            queued = self.summary.queued,
            processed = self.summary.processed,
            succeeded = self.summary.succeeded,
            failed = self.summary.failed,
            skipped = self.summary.skipped,
            cancelled = self.summary.cancelled,
            time_ms = self.summary.elapsed.as_millis(),
            "Geometry iteration complete"
        );
    }
}

impl Iterator for GeometryIterator {
    type Item = ElementShape;

    fn next(&mut self) -> Option<ElementShape> {
        loop {
            let received = self.receiver.as_ref()?.recv();
            match received {
                Ok(outcome) => {
                    if let Some(shape) = self.record(outcome) {
                        return Some(shape);
                    }
                }
                // All workers exited: queue exhausted or run cancelled
                Err(_) => {
                    self.finish();
                    return None;
                }
            }
        }
    }
}

impl Drop for GeometryIterator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    model: Arc<Model>,
    settings: SettingsSnapshot,
    selector: ContextSelector,
    queue: Arc<Vec<ObjectRef>>,
    cursor: Arc<AtomicUsize>,
    cancel: CancelHandle,
    premapped: Option<Arc<Vec<Result<MappedElement, ElementError>>>>,
    sender: SyncSender<Outcome>,
}

impl Worker {
    fn run(self) {
        let pipeline = match Pipeline::new(&self.model, &self.settings, &self.selector) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!(error = %e, "Worker failed to start");
                return;
            }
        };

        while !self.cancel.is_cancelled() {
            let index = self.cursor.fetch_add(1, Ordering::AcqRel);
            let Some(&id) = self.queue.get(index) else {
                break;
            };

            let result = self.process(&pipeline, index, id);
            if self.sender.send(Outcome { result }).is_err() {
                // Iterator dropped
                break;
            }
        }
    }

    fn process(
        &self,
        pipeline: &Pipeline<'_>,
        index: usize,
        id: ObjectRef,
    ) -> Result<ElementShape, ElementError> {
        let element = self
            .model
            .get(id)
            .ok_or_else(|| ElementError::new(id.0, "", ElementErrorKind::NotFound))?;

        match self.premapped.as_ref().and_then(|m| m.get(index)) {
            Some(Ok(mapped)) => pipeline.build(element, mapped),
            Some(Err(e)) => Err(e.clone()),
            None => pipeline.process(element, None),
        }
    }
}
