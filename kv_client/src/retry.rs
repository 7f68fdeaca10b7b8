use std::time::{Duration, Instant};

use kv_common::KvError;
use rand::Rng;
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

/// Longest single sleep between cancellation checks
const CANCELLATION_POLL: Duration = Duration::from_millis(10);

/// How long to wait before the next attempt after a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry straight away
    #[default]
    None,
    /// Double the delay after every conflict, up to `max`. With jitter the
    /// actual delay is drawn uniformly from zero to the computed delay.
    Exponential {
        #[serde(deserialize_with = "deserialize_millis")]
        initial: Duration,
        #[serde(deserialize_with = "deserialize_millis")]
        max: Duration,
        #[serde(default)]
        jitter: bool,
    },
}

impl Backoff {
    /// Delay before attempt `attempt + 1`, `attempt` being 1 based
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                let delay = initial.saturating_mul(factor).min(max);
                if jitter && !delay.is_zero() {
                    rand::thread_rng().gen_range(Duration::ZERO..=delay)
                } else {
                    delay
                }
            }
        }
    }
}

/// Bounds the compare and swap retry loop. The default retries forever
/// without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RetryStrategy {
    /// Total attempts including the first, `None` for no limit
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl RetryStrategy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempts >= max)
    }

    /// Sleep out the backoff for `attempt`, waking early if `cancellation` fires
    pub fn wait(
        &self,
        id: &str,
        attempt: u32,
        cancellation: Option<&CancellationToken>,
    ) -> Result<(), KvError> {
        let deadline = Instant::now().checked_add(self.backoff.delay(attempt));
        loop {
            check_cancelled(id, cancellation)?;
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                // Too far out for an Instant, only cancellation ends the wait
                None => CANCELLATION_POLL,
            };
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(remaining.min(CANCELLATION_POLL));
        }
    }
}

pub(crate) fn check_cancelled(
    id: &str,
    cancellation: Option<&CancellationToken>,
) -> Result<(), KvError> {
    match cancellation {
        Some(token) if token.is_cancelled() => Err(KvError::Cancelled(id.to_string())),
        _ => Ok(()),
    }
}

fn deserialize_millis<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Duration::from_millis(u64::deserialize(d)?))
}
