/// Failure statuses returned by the engine, named after their memcached
/// binary protocol counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum Status {
    /// The key does not exist
    KeyNotFound,

    /// The key exists in the cluster (with another CAS value)
    KeyExists,

    /// Invalid request
    InvalidArguments,

    /// The server is not responsible for the requested vbucket
    NotMyVBucket,

    /// The document is locked by another client
    Locked,

    /// The document was not locked when an unlock was attempted
    NotLocked,
}
