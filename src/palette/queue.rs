//! Worker queue for dominant color extraction.
//!
//! - Bounded worker pool; extractions for different assets run in parallel
//! - At most one extraction in flight per asset id (pending set)
//! - Cancelled ids are dropped from the pending set; their results are discarded
//! - Uses flume for communication between workers and the caller

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

use crate::color::rgb_to_hex;
use crate::palette::dominant::{
    try_dominant_from_rgba, try_extract_from_bytes, try_extract_from_path, ExtractError,
    PaletteOptions,
};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 2;

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 8;

/// Maximum number of queued requests.
const MAX_QUEUE_SIZE: usize = 256;

/// How long an idle worker blocks before re-checking for shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Where the pixels for an extraction come from.
#[derive(Debug, Clone)]
pub enum ExtractionSource {
    /// An image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Encoded(Arc<Vec<u8>>),
    /// An already decoded RGBA buffer.
    Rgba(Arc<Vec<u8>>),
}

/// A request to extract the dominant color of one asset.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub id: String,
    pub source: ExtractionSource,
}

impl ExtractionRequest {
    pub fn new(id: impl Into<String>, source: ExtractionSource) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }

    pub fn from_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(id, ExtractionSource::Path(path.into()))
    }
}

/// Outcome of one extraction, delivered back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub id: String,
    /// Lowercase `#rrggbb`, or `None` when no color could be determined.
    pub hex: Option<String>,
    /// Reason for a missing color.
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Work item carrying the ticket issued when the id became pending.
struct Job {
    request: ExtractionRequest,
    ticket: u64,
}

type PendingMap = Arc<RwLock<HashMap<String, u64>>>;

/// Worker queue for dominant color extraction.
pub struct PaletteQueue {
    request_tx: Sender<Job>,
    result_rx: Receiver<ExtractionResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    active_workers: Arc<AtomicUsize>,
    /// Ids currently tracked, each with the ticket of its live request.
    pending: PendingMap,
    next_ticket: AtomicU64,
}

impl PaletteQueue {
    /// Create a queue with the given number of workers.
    pub fn new(workers: usize, options: PaletteOptions) -> std::io::Result<Self> {
        let num_workers = workers.clamp(1, MAX_WORKERS);

        let (request_tx, request_rx) = flume::bounded::<Job>(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let active_workers = Arc::new(AtomicUsize::new(0));
        let pending: PendingMap = Arc::new(RwLock::new(HashMap::new()));

        let mut worker_handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let active = Arc::clone(&active_workers);
            let pending = Arc::clone(&pending);

            let handle = thread::Builder::new()
                .name(format!("palette-worker-{}", worker_id))
                .spawn(move || {
                    worker_loop(worker_id, rx, tx, shutdown, active, pending, options);
                })?;

            worker_handles.push(handle);
        }

        debug!(num_workers, "Started palette worker queue");

        Ok(Self {
            request_tx,
            result_rx,
            workers: worker_handles,
            shutdown,
            active_workers,
            pending,
            next_ticket: AtomicU64::new(0),
        })
    }

    /// Submit an extraction request.
    ///
    /// Returns false if the id is already pending or the queue is full.
    pub fn request(&self, req: ExtractionRequest) -> bool {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        {
            let mut pending = self.pending.write();
            if pending.contains_key(&req.id) {
                trace!(id = %req.id, "Extraction already pending");
                return false;
            }
            pending.insert(req.id.clone(), ticket);
        }

        match self.request_tx.try_send(Job {
            request: req,
            ticket,
        }) {
            Ok(_) => true,
            Err(flume::TrySendError::Full(job)) => {
                warn!(id = %job.request.id, "Palette queue full, dropping request");
                self.release(&job.request.id, ticket);
                false
            }
            Err(flume::TrySendError::Disconnected(job)) => {
                error!("Palette queue disconnected");
                self.release(&job.request.id, ticket);
                false
            }
        }
    }

    /// Drops `id` from the pending set only if it still holds `ticket`.
    fn release(&self, id: &str, ticket: u64) {
        let mut pending = self.pending.write();
        if pending.get(id) == Some(&ticket) {
            pending.remove(id);
        }
    }

    /// Submit several requests; returns how many were accepted.
    pub fn request_batch(&self, requests: Vec<ExtractionRequest>) -> usize {
        requests
            .into_iter()
            .filter(|req| self.request(req.clone()))
            .count()
    }

    /// Collect completed results without blocking.
    pub fn poll_results(&self) -> Vec<ExtractionResult> {
        self.result_rx.try_iter().collect()
    }

    /// Block for the next completed result, up to `timeout`.
    pub fn wait_result(&self, timeout: Duration) -> Option<ExtractionResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.read().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    pub fn active_worker_count(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.read().is_empty() || self.active_worker_count() > 0
    }

    /// Stop tracking `id`. A running extraction still completes, but its
    /// result is discarded. Returns whether the id was pending.
    pub fn cancel(&self, id: &str) -> bool {
        let removed = self.pending.write().remove(id).is_some();
        if removed {
            debug!(%id, "Cancelled pending extraction");
        }
        removed
    }

    /// Stop tracking every pending id.
    pub fn cancel_all(&self) {
        self.pending.write().clear();
        debug!("Cancelled all pending extractions");
    }

    /// Signal workers to stop and wait for them.
    pub fn shutdown(&mut self) {
        debug!("Shutting down palette queue");
        self.shutdown.store(true, Ordering::SeqCst);

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        debug!("Palette queue shutdown complete");
    }
}

impl Drop for PaletteQueue {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<Job>,
    tx: Sender<ExtractionResult>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    pending: PendingMap,
    options: PaletteOptions,
) {
    debug!(worker_id, "Palette worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(IDLE_POLL) {
            Ok(job) => {
                let still_wanted = pending.read().get(&job.request.id) == Some(&job.ticket);
                if !still_wanted {
                    trace!(id = %job.request.id, "Skipping cancelled extraction");
                    continue;
                }

                active.fetch_add(1, Ordering::Relaxed);
                let result = process_request(&job.request, &options);

                // Only the request that still owns the id may report.
                let owned = {
                    let mut pending = pending.write();
                    if pending.get(&job.request.id) == Some(&job.ticket) {
                        pending.remove(&job.request.id);
                        true
                    } else {
                        false
                    }
                };

                if owned {
                    if let Err(e) = tx.send(result) {
                        warn!(worker_id, error = ?e, "Failed to send extraction result");
                    }
                } else {
                    debug!(id = %job.request.id, "Discarding result for cancelled extraction");
                }

                active.fetch_sub(1, Ordering::Relaxed);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Palette worker stopped");
}

fn process_request(req: &ExtractionRequest, options: &PaletteOptions) -> ExtractionResult {
    trace!(id = %req.id, "Processing extraction request");
    let started = Instant::now();

    let outcome: Result<_, ExtractError> = match &req.source {
        ExtractionSource::Path(path) => try_extract_from_path(path, options),
        ExtractionSource::Encoded(bytes) => try_extract_from_bytes(bytes, options),
        ExtractionSource::Rgba(pixels) => try_dominant_from_rgba(pixels, options.alpha_threshold),
    };

    match outcome {
        Ok(rgb) => ExtractionResult {
            id: req.id.clone(),
            hex: Some(rgb_to_hex(rgb)),
            error: None,
            elapsed: started.elapsed(),
        },
        Err(e) => {
            warn!(id = %req.id, error = %e, "Dominant color extraction failed");
            ExtractionResult {
                id: req.id.clone(),
                hex: None,
                error: Some(e.to_string()),
                elapsed: started.elapsed(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::collections::HashSet;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(10);

    fn solid_rgba(color: [u8; 4], n: usize) -> ExtractionSource {
        ExtractionSource::Rgba(Arc::new(color.repeat(n)))
    }

    fn drain(queue: &PaletteQueue, expected: usize) -> Vec<ExtractionResult> {
        let mut results = Vec::new();
        while results.len() < expected {
            match queue.wait_result(WAIT) {
                Some(r) => results.push(r),
                None => break,
            }
        }
        results
    }

    #[test]
    fn test_duplicate_id_rejected_while_pending() {
        let queue = PaletteQueue::new(1, PaletteOptions::default()).unwrap();
        let blocker = ExtractionSource::Rgba(Arc::new([0u8, 0, 0, 255].repeat(500_000)));

        assert!(queue.request(ExtractionRequest::new("blocker", blocker)));
        assert!(queue.request(ExtractionRequest::new("a", solid_rgba([10, 20, 30, 255], 16))));
        assert!(queue.is_pending("a"));
        assert!(!queue.request(ExtractionRequest::new("a", solid_rgba([250, 250, 250, 255], 16))));

        let results = drain(&queue, 2);
        assert_eq!(results.len(), 2);
        let a = results.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.hex.as_deref(), Some("#001111"));
        assert!(!queue.is_pending("a"));
        assert!(queue.wait_result(Duration::from_millis(300)).is_none());
    }

    #[test]
    fn test_parallel_ids_all_complete() {
        let queue = PaletteQueue::new(3, PaletteOptions::default()).unwrap();
        let colors = [
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [0x88, 0x88, 0x88, 255],
        ];

        let requests: Vec<_> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| ExtractionRequest::new(format!("asset-{}", i), solid_rgba(*c, 64)))
            .collect();
        assert_eq!(queue.request_batch(requests), 4);

        let results = drain(&queue, 4);
        assert_eq!(results.len(), 4);
        let ids: HashSet<_> = results.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 4);

        let blue = results.iter().find(|r| r.id == "asset-2").unwrap();
        assert_eq!(blue.hex.as_deref(), Some("#0000ff"));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_failures_are_independent() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbaImage::from_pixel(32, 32, Rgba([0xff, 0x00, 0x6e, 255]))
            .save(&good)
            .unwrap();

        let queue = PaletteQueue::new(2, PaletteOptions::default()).unwrap();
        assert!(queue.request(ExtractionRequest::from_path("good", &good)));
        let missing = dir.path().join("nope.png");
        assert!(queue.request(ExtractionRequest::from_path("missing", missing)));
        assert!(queue.request(ExtractionRequest::new("clear", solid_rgba([1, 2, 3, 0], 16))));

        let results = drain(&queue, 3);
        assert_eq!(results.len(), 3);
        for r in &results {
            match r.id.as_str() {
                "good" => assert_eq!(r.hex.as_deref(), Some("#ff0066")),
                _ => {
                    assert!(r.hex.is_none());
                    assert!(r.error.is_some());
                }
            }
        }
    }

    #[test]
    fn test_cancelled_result_discarded() {
        let queue = PaletteQueue::new(1, PaletteOptions::default()).unwrap();
        let big = ExtractionSource::Rgba(Arc::new([200u8, 200, 200, 255].repeat(500_000)));

        assert!(queue.request(ExtractionRequest::new("slow", big)));
        assert!(queue.request(ExtractionRequest::new("gone", solid_rgba([9, 9, 9, 255], 4))));
        assert!(queue.cancel("gone"));
        assert!(!queue.cancel("gone"));

        let results = drain(&queue, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "slow");
        assert!(queue.wait_result(Duration::from_millis(300)).is_none());
    }

    #[test]
    fn test_resubmit_after_cancel_reports_once() {
        let queue = PaletteQueue::new(2, PaletteOptions::default()).unwrap();
        assert!(queue.request(ExtractionRequest::new("x", solid_rgba([255, 255, 255, 255], 8))));
        queue.cancel_all();
        assert!(queue.request(ExtractionRequest::new("x", solid_rgba([0, 0, 0, 255], 8))));

        let results = drain(&queue, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hex.as_deref(), Some("#000000"));
        assert!(queue.wait_result(Duration::from_millis(300)).is_none());
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut queue = PaletteQueue::new(2, PaletteOptions::default()).unwrap();
        queue.shutdown();
        assert_eq!(queue.active_worker_count(), 0);
        assert!(!queue.is_busy());
    }
}
