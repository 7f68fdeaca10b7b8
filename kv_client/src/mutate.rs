use kv_common::{
    Content, DocumentStore, Durability, Expiry, GetOptions, GetResult, KvError, MutationResult,
    ReplaceOptions,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::retry::{check_cancelled, RetryStrategy};

/// What expiry the mutated document ends up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// The document no longer expires
    #[default]
    None,
    /// Keep whatever expiry the document had when it was read
    Preserve,
    /// Replace the expiry
    Set(Expiry),
}

#[derive(Debug, Clone, Default)]
pub struct MutateOptions {
    pub expiry: ExpiryPolicy,
    pub durability: Durability,
    pub retry: RetryStrategy,
    /// Aborts the loop before the next attempt or during a backoff
    pub cancellation: Option<CancellationToken>,
}

impl MutateOptions {
    pub fn expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Read a document, transform it and write it back, starting over whenever
/// somebody else modified the document in between.
///
/// The write is a replace guarded by the cas of the read, so it only lands
/// if the document is still exactly what `transform` saw. On a cas mismatch
/// the read is repeated and `transform` runs again on the fresh document, so
/// it must not have side effects. Every other error, including one returned
/// by `transform`, ends the call.
///
/// When the expiry is preserved it is fetched by the same read as the
/// content, and the cas covers both. A store that does not report the expiry
/// is asked to keep its own instead.
pub fn mutate<S, T, F>(
    store: &S,
    id: &str,
    options: &MutateOptions,
    mut transform: F,
) -> Result<MutationResult, KvError>
where
    S: DocumentStore + ?Sized,
    T: Serialize,
    F: FnMut(&GetResult) -> Result<T, KvError>,
{
    if id.is_empty() {
        return Err(KvError::InvalidArgument("document id is empty".to_string()));
    }
    let cancellation = options.cancellation.as_ref();
    let get_options =
        GetOptions::default().with_expiry(options.expiry == ExpiryPolicy::Preserve);

    let mut attempts: u32 = 0;
    loop {
        check_cancelled(id, cancellation)?;
        attempts = attempts.saturating_add(1);

        let old = store.get(id, &get_options)?;
        let content = Content::json(&transform(&old)?)?;
        let replace_options = ReplaceOptions::default()
            .cas(old.cas)
            .durability(options.durability);
        let replace_options = match (options.expiry, old.expiry) {
            (ExpiryPolicy::None, _) => replace_options,
            (ExpiryPolicy::Preserve, Some(expiry)) => replace_options.expiry(expiry),
            // Expiry unknown, the store keeps whatever it has
            (ExpiryPolicy::Preserve, None) => replace_options.preserve_expiry(true),
            (ExpiryPolicy::Set(expiry), _) => replace_options.expiry(expiry),
        };

        match store.replace(id, content, &replace_options) {
            Ok(result) => {
                if attempts > 1 {
                    debug!("Mutated {} after {} attempts", id, attempts);
                }
                return Ok(result);
            }
            Err(e) if e.is_cas_mismatch() => {
                if options.retry.is_exhausted(attempts) {
                    warn!("Giving up on {} after {} conflicting attempts", id, attempts);
                    return Err(KvError::RetriesExhausted {
                        id: id.to_string(),
                        attempts,
                    });
                }
                debug!("Cas mismatch on {} (attempt {}), starting again", id, attempts);
                options.retry.wait(id, attempts, cancellation)?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// [mutate] with the old content decoded into `D` before it is handed to `transform`
pub fn mutate_as<S, D, T, F>(
    store: &S,
    id: &str,
    options: &MutateOptions,
    mut transform: F,
) -> Result<MutationResult, KvError>
where
    S: DocumentStore + ?Sized,
    D: DeserializeOwned,
    T: Serialize,
    F: FnMut(D) -> T,
{
    mutate(store, id, options, |old| Ok(transform(old.content_as::<D>()?)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        retry::Backoff,
        testing::{bucket, ConflictingStore},
    };
    use kv_common::{Cas, UpsertOptions};
    use maplit::hashmap;
    use serde_json::{json, Map, Value};
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU32, Ordering},
            Barrier,
        },
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    type Doc = HashMap<String, Value>;

    fn add_field(name: &'static str, value: &'static str) -> impl Fn(Doc) -> Doc {
        move |mut doc| {
            doc.insert(name.to_string(), Value::from(value));
            doc
        }
    }

    fn seed(store: &impl DocumentStore, id: &str, value: Value, expiry: Expiry) -> Cas {
        store
            .upsert(
                id,
                Content::json(&value).unwrap(),
                &UpsertOptions::default().expiry(expiry),
            )
            .unwrap()
            .cas
    }

    fn content(store: &impl DocumentStore, id: &str) -> Value {
        store
            .get(id, &GetOptions::default())
            .unwrap()
            .content_as()
            .unwrap()
    }

    #[test]
    fn test_adds_field_without_contention() {
        let store = ConflictingStore::new(bucket(), 0);
        let original = seed(&store, "alice", json!({"favoriteColor": "blue"}), Expiry::None);

        let result = mutate_as(
            &store,
            "alice",
            &MutateOptions::default(),
            add_field("favoriteFood", "hamburger"),
        )
        .unwrap();

        assert_ne!(result.cas, original);
        assert_eq!(
            content(&store, "alice"),
            json!({"favoriteColor": "blue", "favoriteFood": "hamburger"})
        );
        assert_eq!(store.gets(), 1);
        assert_eq!(store.replaces(), 1);
    }

    #[test]
    fn test_result_is_transform_of_old_content() {
        let store = bucket();
        seed(&*store, "counter", json!({"n": 41}), Expiry::None);

        mutate(&*store, "counter", &MutateOptions::default(), |old| {
            let mut doc: Map<String, Value> = old.content_as()?;
            let n = doc["n"].as_i64().unwrap_or_default();
            doc.insert("n".to_string(), Value::from(n + 1));
            Ok(doc)
        })
        .unwrap();

        assert_eq!(content(&*store, "counter"), json!({"n": 42}));
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let store = ConflictingStore::new(bucket(), 0);
        let error = mutate_as(
            &store,
            "nobody",
            &MutateOptions::default(),
            add_field("favoriteFood", "hamburger"),
        )
        .unwrap_err();

        assert!(error.is_not_found());
        assert_eq!(store.gets(), 1);
        assert_eq!(store.replaces(), 0);
    }

    #[test]
    fn test_n_conflicts_take_n_plus_one_attempts() {
        for conflicts in [1, 3, 10] {
            let store = ConflictingStore::new(bucket(), conflicts);
            seed(&store, "alice", json!({"favoriteColor": "blue"}), Expiry::None);

            let calls = AtomicU32::new(0);
            mutate_as(&store, "alice", &MutateOptions::default(), |doc: Doc| {
                calls.fetch_add(1, Ordering::SeqCst);
                add_field("favoriteFood", "hamburger")(doc)
            })
            .unwrap();

            assert_eq!(store.gets(), conflicts + 1);
            assert_eq!(store.replaces(), conflicts + 1);
            assert_eq!(calls.load(Ordering::SeqCst), conflicts + 1);
            assert_eq!(
                content(&store, "alice"),
                json!({"favoriteColor": "blue", "favoriteFood": "hamburger"})
            );
        }
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let store = ConflictingStore::new(bucket(), 5);
        seed(&store, "alice", json!({}), Expiry::None);

        let options = MutateOptions::default().retry(RetryStrategy::default().max_attempts(3));
        let error = mutate_as(&store, "alice", &options, add_field("a", "b")).unwrap_err();

        assert!(matches!(
            error,
            KvError::RetriesExhausted { ref id, attempts: 3 } if id == "alice"
        ));
        assert_eq!(store.replaces(), 3);
        assert_eq!(content(&store, "alice"), json!({}));
    }

    #[test]
    fn test_backoff_between_attempts() {
        let store = ConflictingStore::new(bucket(), 2);
        seed(&store, "alice", json!({}), Expiry::None);

        let options = MutateOptions::default().retry(RetryStrategy::default().backoff(
            Backoff::Exponential {
                initial: Duration::from_millis(5),
                max: Duration::from_millis(50),
                jitter: false,
            },
        ));
        let started = std::time::Instant::now();
        mutate_as(&store, "alice", &options, add_field("a", "b")).unwrap();

        assert!(started.elapsed() >= Duration::from_millis(15));
        assert_eq!(store.replaces(), 3);
    }

    #[test]
    fn test_cancelled_before_first_attempt() {
        let store = ConflictingStore::new(bucket(), 0);
        seed(&store, "alice", json!({}), Expiry::None);
        let token = CancellationToken::new();
        token.cancel();

        let options = MutateOptions::default().cancellation(token);
        let error = mutate_as(&store, "alice", &options, add_field("a", "b")).unwrap_err();

        assert!(matches!(error, KvError::Cancelled(_)));
        assert_eq!(store.gets(), 0);
    }

    #[test]
    fn test_cancelled_mid_retry() {
        let store = ConflictingStore::new(bucket(), u32::MAX);
        seed(&store, "alice", json!({}), Expiry::None);
        let token = CancellationToken::new();

        let options = MutateOptions::default().cancellation(token.clone());
        let error = mutate_as(&store, "alice", &options, |doc: Doc| {
            if store.gets() == 3 {
                token.cancel();
            }
            doc
        })
        .unwrap_err();

        assert!(matches!(error, KvError::Cancelled(_)));
        assert_eq!(store.gets(), 3);
        assert_eq!(store.replaces(), 3);
    }

    #[test]
    fn test_transform_error_is_propagated() {
        let store = ConflictingStore::new(bucket(), 0);
        store
            .upsert(
                "alice",
                Content::binary(vec![0xde, 0xad]),
                &UpsertOptions::default(),
            )
            .unwrap();

        let error = mutate_as(
            &store,
            "alice",
            &MutateOptions::default(),
            add_field("a", "b"),
        )
        .unwrap_err();

        assert!(matches!(error, KvError::Encoding { .. }));
        assert_eq!(store.replaces(), 0);
    }

    #[test]
    fn test_empty_id() {
        let store = bucket();
        let error = mutate_as(&*store, "", &MutateOptions::default(), add_field("a", "b"))
            .unwrap_err();
        assert!(matches!(error, KvError::InvalidArgument(_)));
    }

    #[test]
    fn test_expiry_policies() {
        let at = UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX - 10));
        let store = ConflictingStore::new(bucket(), 1);
        seed(&store, "alice", json!({}), Expiry::at(at));

        let with_expiry = GetOptions::default().with_expiry(true);
        let preserve = MutateOptions::default().expiry(ExpiryPolicy::Preserve);
        mutate_as(&store, "alice", &preserve, add_field("a", "b")).unwrap();
        let get = store.get("alice", &with_expiry).unwrap();
        assert_eq!(get.expiry, Some(Expiry::Absolute(at)));

        let later = SystemTime::now() + Duration::from_secs(3 * 60 * 60);
        let set = MutateOptions::default().expiry(ExpiryPolicy::Set(Expiry::at(later)));
        mutate_as(&store, "alice", &set, add_field("c", "d")).unwrap();
        let get = store.get("alice", &with_expiry).unwrap();
        assert_ne!(get.expiry, Some(Expiry::Absolute(at)));
        assert!(matches!(get.expiry, Some(Expiry::Absolute(_))));

        mutate_as(&store, "alice", &MutateOptions::default(), add_field("e", "f")).unwrap();
        let get = store.get("alice", &with_expiry).unwrap();
        assert_eq!(get.expiry, Some(Expiry::None));
    }

    #[test]
    fn test_preserve_without_reported_expiry() {
        let at = UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX - 10));
        let store = ConflictingStore::new(bucket(), 1).without_expiry();
        seed(&store, "alice", json!({}), Expiry::at(at));

        let preserve = MutateOptions::default().expiry(ExpiryPolicy::Preserve);
        mutate_as(&store, "alice", &preserve, add_field("a", "b")).unwrap();

        assert!(store
            .replace_options()
            .iter()
            .all(|options| options.preserve_expiry));
        let get = store
            .inner
            .get("alice", &GetOptions::default().with_expiry(true))
            .unwrap();
        assert_eq!(get.expiry, Some(Expiry::Absolute(at)));
        assert_eq!(content(&store, "alice"), json!({"a": "b"}));
    }

    #[test]
    fn test_durability_reaches_every_replace() {
        let store = ConflictingStore::new(bucket(), 2);
        seed(&store, "alice", json!({}), Expiry::None);

        let options = MutateOptions::default().durability(Durability::PersistToMajority);
        mutate_as(&store, "alice", &options, add_field("a", "b")).unwrap();

        let replaces = store.replace_options();
        assert_eq!(replaces.len(), 3);
        for options in replaces {
            assert_eq!(options.durability, Durability::PersistToMajority);
            assert!(!options.cas.is_empty());
        }
    }

    #[test]
    fn test_two_concurrent_mutates_keep_both_fields() {
        let store = bucket();
        seed(&*store, "alice", json!({"favoriteColor": "blue"}), Expiry::None);

        // Both callers read the same cas before either writes
        let barrier = Barrier::new(2);
        let transforms = AtomicU32::new(0);
        std::thread::scope(|s| {
            for (field, value) in [("favoriteFood", "hamburger"), ("favoriteDrink", "tea")] {
                let store = &store;
                let barrier = &barrier;
                let transforms = &transforms;
                s.spawn(move || {
                    let mut first = true;
                    mutate_as(&**store, "alice", &MutateOptions::default(), |doc: Doc| {
                        transforms.fetch_add(1, Ordering::SeqCst);
                        if std::mem::take(&mut first) {
                            barrier.wait();
                        }
                        add_field(field, value)(doc)
                    })
                    .unwrap();
                });
            }
        });

        assert_eq!(transforms.load(Ordering::SeqCst), 3);
        assert_eq!(
            content(&*store, "alice"),
            json!({
                "favoriteColor": "blue",
                "favoriteFood": "hamburger",
                "favoriteDrink": "tea",
            })
        );
    }

    #[test]
    fn test_no_lost_updates_under_contention() {
        const THREADS: u64 = 8;
        const INCREMENTS: u64 = 50;

        let store = bucket();
        seed(&*store, "counter", json!({"n": 0}), Expiry::None);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..INCREMENTS {
                        mutate_as(
                            &*store,
                            "counter",
                            &MutateOptions::default(),
                            |mut doc: HashMap<String, u64>| {
                                *doc.entry("n".to_string()).or_default() += 1;
                                doc
                            },
                        )
                        .unwrap();
                    }
                });
            }
        });

        assert_eq!(content(&*store, "counter"), json!({"n": THREADS * INCREMENTS}));
    }

    #[test]
    fn test_concurrent_writer_deletes_document() {
        let store = bucket();
        seed(&*store, "alice", json!({}), Expiry::None);

        let error = mutate(&*store, "alice", &MutateOptions::default(), |old| {
            store.remove("alice", &Default::default())?;
            Ok(hashmap! {"seen" => old.cas.raw()})
        })
        .unwrap_err();

        assert!(error.is_not_found());
    }
}
