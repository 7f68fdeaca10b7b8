use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use kv_common::{DocumentStore, GetOptions, GetResult, KvError};
use parking_lot::Mutex;
use tracing::debug;

/// Default limit on gets in flight at the same time
pub const DEFAULT_MAX_CONCURRENCY: usize = 128;

/// Gets many documents at the same time.
///
/// At most `max_concurrency` gets are in flight at once (a limit of 0 is
/// treated as 1). Every id gets its own result, a failed get does not stop
/// the others.
pub fn bulk_get<S, I>(
    store: &S,
    ids: I,
    max_concurrency: usize,
) -> HashMap<String, Result<GetResult, KvError>>
where
    S: DocumentStore + ?Sized,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let queue: VecDeque<String> = ids.into_iter().map(Into::into).collect();
    let workers = max_concurrency.max(1).min(queue.len());
    debug!("Getting {} documents with {} workers", queue.len(), workers);

    let queue = Mutex::new(queue);
    let results = DashMap::with_capacity(queue.lock().len());
    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let Some(id) = queue.lock().pop_front() else {
                    break;
                };
                let result = store.get(&id, &GetOptions::default());
                results.insert(id, result);
            });
        }
    });
    results.into_iter().collect()
}
