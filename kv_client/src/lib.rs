pub mod bulk;
pub mod collection;
pub mod config;
pub mod mutate;
pub mod retry;

#[cfg(test)]
mod testing;

pub use collection::Collection;
pub use config::Config;
pub use mutate::{mutate, mutate_as, ExpiryPolicy, MutateOptions};
pub use retry::{Backoff, RetryStrategy};
