use crate::payload;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sos_store::ObjectStore;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{debug, error, warn};

/// Shape of one stress run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Workload {
    pub(crate) keys: u32,
    pub(crate) writers: u32,
    pub(crate) readers: u32,
    pub(crate) deleters: u32,
    pub(crate) iterations: u32,
    pub(crate) value_size: usize,
}

impl Workload {
    /// Without deleters every key always holds a value, so a miss is a failure.
    pub(crate) const fn tolerates_misses(&self) -> bool {
        self.deleters > 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Writer,
    Reader,
    Deleter,
}

/// Totals over all threads of a run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct Report {
    pub(crate) stores: u64,
    pub(crate) reads: u64,
    pub(crate) deletes: u64,
    /// Gets and deletes that found no object while deleters were running.
    pub(crate) misses: u64,
    /// Gets that returned something other than one whole value.
    pub(crate) torn: u64,
    /// Operations that failed for any other reason.
    pub(crate) errors: u64,
}

impl Report {
    pub(crate) const fn is_clean(&self) -> bool {
        self.torn == 0 && self.errors == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stores={} reads={} deletes={} misses={} torn={} errors={}",
            self.stores, self.reads, self.deletes, self.misses, self.torn, self.errors
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    stores: AtomicU64,
    reads: AtomicU64,
    deletes: AtomicU64,
    misses: AtomicU64,
    torn: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Report {
        Report {
            stores: self.stores.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            torn: self.torn.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Seeds every key that has no value yet, then runs every role on its own thread
/// against `store` and waits for all of them.
pub(crate) fn run(store: &ObjectStore, workload: &Workload) -> Report {
    let counters = Counters::default();
    seed_keys(store, workload, &counters);

    let roles = std::iter::repeat_n(Role::Writer, workload.writers as usize)
        .chain(std::iter::repeat_n(Role::Reader, workload.readers as usize))
        .chain(std::iter::repeat_n(Role::Deleter, workload.deleters as usize));

    thread::scope(|scope| {
        for (id, role) in roles.enumerate() {
            let counters = &counters;
            scope.spawn(move || worker(store, workload, role, id as u64, counters));
        }
    });

    counters.snapshot()
}

fn seed_keys(store: &ObjectStore, workload: &Workload, counters: &Counters) {
    let len = workload.value_size;

    for (index, key) in (0..workload.keys).map(|k| (k, format!("stress-{k}"))) {
        match store.open_object(&key) {
            Ok(_) => continue,
            Err(err) if err.is_not_found() => {},
            Err(err) => {
                warn!(%key, error = %err, "Seed lookup failed");
                Counters::bump(&counters.errors);
                continue;
            },
        }
        if let Err(err) = store.store_bytes(&key, &payload::seal(u64::from(index), len)) {
            warn!(%key, error = %err, "Seed store failed");
            Counters::bump(&counters.errors);
        }
    }
}

fn record_miss(workload: &Workload, counters: &Counters, key: &str) {
    if workload.tolerates_misses() {
        Counters::bump(&counters.misses);
    } else {
        error!(%key, "Seeded key reported missing");
        Counters::bump(&counters.errors);
    }
}

fn worker(store: &ObjectStore, workload: &Workload, role: Role, id: u64, counters: &Counters) {
    let mut rng = SmallRng::seed_from_u64(id);
    debug!(worker = id, ?role, "Worker started");

    for _ in 0..workload.iterations {
        let key = format!("stress-{}", rng.random_range(0..workload.keys));

        match role {
            Role::Writer => {
                let len = rng.random_range(workload.value_size / 2..=workload.value_size);
                match store.store_bytes(&key, &payload::seal(rng.random(), len)) {
                    Ok(()) => Counters::bump(&counters.stores),
                    Err(err) => {
                        warn!(%key, error = %err, "Store failed");
                        Counters::bump(&counters.errors);
                    },
                }
            },
            Role::Reader => match store.get_bytes(&key) {
                Ok(value) if payload::verify(&value) => Counters::bump(&counters.reads),
                Ok(value) => {
                    error!(%key, bytes = value.len(), "Torn read");
                    Counters::bump(&counters.torn);
                },
                Err(err) if err.is_not_found() => record_miss(workload, counters, &key),
                Err(err) => {
                    warn!(%key, error = %err, "Get failed");
                    Counters::bump(&counters.errors);
                },
            },
            Role::Deleter => match store.delete(&key) {
                Ok(()) => Counters::bump(&counters.deletes),
                Err(err) if err.is_not_found() => Counters::bump(&counters.misses),
                Err(err) => {
                    warn!(%key, error = %err, "Delete failed");
                    Counters::bump(&counters.errors);
                },
            },
        }
    }
}
