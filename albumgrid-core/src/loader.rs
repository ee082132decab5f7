//! Background thumbnail loading.
//!
//! Decoding can block on disk and codec work, so it runs on a small pool of worker
//! threads. Workers insert results straight into the shared cache and report back to
//! the UI thread over a channel; the UI thread applies completions by key only.
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
};

use albumgrid_state::GroupKey;

use crate::{
    thumbnail::{ThumbnailError, ThumbnailProvider, ThumbnailRequest},
    thumbnail_cache::{PutError, ThumbnailCache},
};

/// Identifies the snapshot a load was requested for.
#[derive(Debug, Clone)]
pub struct LoadToken {
    generation: u64,
    current: Arc<AtomicU64>,
}
impl LoadToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the snapshot this load was requested for is still the current one.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }
}

struct LoadJob {
    request: ThumbnailRequest,
    token: LoadToken,
}

#[derive(Debug)]
pub enum LoadOutcome {
    /// The thumbnail is now in the cache.
    Loaded { byte_size: usize },
    /// No thumbnail could be produced.
    Failed(ThumbnailError),
    /// The thumbnail was produced but could not fit in the cache.
    Rejected(PutError),
    /// The group disappeared before the load started, so it was skipped.
    Abandoned,
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub key: GroupKey,
    pub generation: u64,
    pub outcome: LoadOutcome,
}

pub struct Loader {
    job_tx: Option<mpsc::Sender<LoadJob>>,
    completion_rx: mpsc::Receiver<LoadCompletion>,
    workers: Vec<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
    live_keys: Arc<RwLock<HashSet<GroupKey>>>,
}
impl Loader {
    pub fn new(
        provider: Arc<dyn ThumbnailProvider>,
        cache: Arc<ThumbnailCache>,
        threads: usize,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<LoadJob>();
        let (completion_tx, completion_rx) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let live_keys = Arc::new(RwLock::new(HashSet::new()));

        let workers = (0..threads.max(1))
            .filter_map(|i| {
                let job_rx = job_rx.clone();
                let completion_tx = completion_tx.clone();
                let provider = provider.clone();
                let cache = cache.clone();
                let live_keys = live_keys.clone();
                std::thread::Builder::new()
                    .name(format!("albumgrid-loader-{i}"))
                    .spawn(move || {
                        worker_loop(&job_rx, &completion_tx, provider.as_ref(), &cache, &live_keys)
                    })
                    .map_err(|e| tracing::warn!("Failed to spawn thumbnail loader thread: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        tracing::debug!("Started {} thumbnail loader threads", workers.len());

        Self {
            job_tx: Some(job_tx),
            completion_rx,
            workers,
            generation: Arc::new(AtomicU64::new(0)),
            live_keys,
        }
    }

    /// Starts a new generation: loads requested before this point become stale, and are
    /// abandoned if their key is not in `live_keys`. Returns the new generation.
    pub fn begin_generation(&self, live_keys: HashSet<GroupKey>) -> u64 {
        *self
            .live_keys
            .write()
            .unwrap_or_else(PoisonError::into_inner) = live_keys;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Queues a load for the current generation. Returns false if no worker can take it.
    pub fn request(&self, request: ThumbnailRequest) -> bool {
        if self.workers.is_empty() {
            return false;
        }
        let token = LoadToken {
            generation: self.generation(),
            current: self.generation.clone(),
        };
        tracing::debug!(
            "Requesting thumbnail for {} (generation {})",
            request.key,
            token.generation
        );
        self.job_tx
            .as_ref()
            .is_some_and(|tx| tx.send(LoadJob { request, token }).is_ok())
    }

    /// Completions that have arrived since the last call, without blocking.
    pub fn completions(&self) -> impl Iterator<Item = LoadCompletion> + '_ {
        self.completion_rx.try_iter()
    }

    #[cfg(test)]
    pub(crate) fn wait_for_completion(&self) -> Option<LoadCompletion> {
        self.completion_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .ok()
    }
}
impl Drop for Loader {
    fn drop(&mut self) {
        // Closing the job channel lets every worker finish its current job and exit.
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Thumbnail loader thread panicked");
            }
        }
    }
}

fn worker_loop(
    job_rx: &Mutex<mpsc::Receiver<LoadJob>>,
    completion_tx: &mpsc::Sender<LoadCompletion>,
    provider: &dyn ThumbnailProvider,
    cache: &ThumbnailCache,
    live_keys: &RwLock<HashSet<GroupKey>>,
) {
    loop {
        let job = {
            let job_rx = job_rx.lock().unwrap_or_else(PoisonError::into_inner);
            match job_rx.recv() {
                Ok(job) => job,
                Err(_) => break,
            }
        };

        let key = job.request.key.clone();
        let is_live = || {
            live_keys
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&key)
        };

        let outcome = if !job.token.is_current() && !is_live() {
            tracing::debug!(
                "Abandoning stale thumbnail load for {key} (generation {})",
                job.token.generation()
            );
            LoadOutcome::Abandoned
        } else {
            match provider.load(&job.request) {
                Ok(thumbnail) => {
                    let byte_size = thumbnail.byte_size();
                    match cache.put(key.clone(), thumbnail, byte_size) {
                        Ok(_) => LoadOutcome::Loaded { byte_size },
                        Err(e) => LoadOutcome::Rejected(e),
                    }
                }
                Err(e) => LoadOutcome::Failed(e),
            }
        };

        let completion = LoadCompletion {
            key,
            generation: job.token.generation(),
            outcome,
        };
        if completion_tx.send(completion).is_err() {
            break;
        }
    }
}
