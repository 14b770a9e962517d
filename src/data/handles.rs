// ============================================================
// Layer 4 — Archive Handle Pool
// ============================================================
// A ZipArchive needs &mut access to read, so one handle cannot
// serve several loader workers at once. Each burn loader worker
// is a thread; every thread gets its own ShardPair, opened the
// first time that thread asks for features and reused for the
// rest of its life.
//
// Worker pairs live in thread-local storage, keyed by the id of
// the ArchiveHandles that opened them. Burn spawns fresh worker
// threads for every epoch and joins them at the end, so a pair
// is closed when its worker exits:
//
//   epoch 0:  worker A opens pair → reads … → exits, pair closed
//   epoch 1:  worker B opens pair → reads … → exits, pair closed
//
// With num_workers == 0 everything runs on the caller's thread,
// so a single pair is opened up front and owned by the pool.

use std::{
    cell::RefCell,
    collections::{hash_map::Entry, HashMap},
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::data::archive::{FallbackPolicy, ShardPair};
use crate::error::Result;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static WORKER_PAIRS: RefCell<HashMap<u64, WorkerPair>> = RefCell::new(HashMap::new());
}

/// A worker's shard pair; keeps the pool's open count honest
struct WorkerPair {
    pair: ShardPair,
    live: Arc<AtomicUsize>,
}

impl Drop for WorkerPair {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

enum Handles {
    /// Opened eagerly, used from one thread
    Shared(Mutex<ShardPair>),
    /// Opened lazily in each worker thread's local storage
    PerWorker { live: Arc<AtomicUsize> },
}

pub struct ArchiveHandles {
    id:      u64,
    dir:     PathBuf,
    policy:  FallbackPolicy,
    handles: Handles,
}

impl ArchiveHandles {
    pub fn new(dir: impl Into<PathBuf>, policy: FallbackPolicy, num_workers: usize) -> Result<Self> {
        let dir = dir.into();
        let handles = if num_workers > 0 {
            Handles::PerWorker { live: Arc::new(AtomicUsize::new(0)) }
        } else {
            Handles::Shared(Mutex::new(ShardPair::open(&dir, policy)?))
        };
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        Ok(Self { id, dir, policy, handles })
    }

    /// Run `f` with this thread's shard pair
    pub fn with_pair<T>(&self, f: impl FnOnce(&mut ShardPair) -> Result<T>) -> Result<T> {
        match &self.handles {
            Handles::Shared(pair) => f(&mut pair.lock()),
            Handles::PerWorker { live } => WORKER_PAIRS.with(|cell| {
                let mut pairs = cell.borrow_mut();
                let worker = match pairs.entry(self.id) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => {
                        let pair = ShardPair::open(&self.dir, self.policy)?;
                        live.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(
                            "Opened feature shards for worker {:?}",
                            std::thread::current().id()
                        );
                        slot.insert(WorkerPair { pair, live: Arc::clone(live) })
                    }
                };
                f(&mut worker.pair)
            }),
        }
    }

    /// Number of shard pairs currently open
    pub fn open_pairs(&self) -> usize {
        match &self.handles {
            Handles::Shared(_) => 1,
            Handles::PerWorker { live } => live.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ArchiveHandles {
    fn drop(&mut self) {
        // Other threads release theirs on exit; release ours now
        if let Handles::PerWorker { .. } = self.handles {
            let _ = WORKER_PAIRS.try_with(|cell| {
                if let Ok(mut pairs) = cell.try_borrow_mut() {
                    pairs.remove(&self.id);
                }
            });
        }
    }
}
