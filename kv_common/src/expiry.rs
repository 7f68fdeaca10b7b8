use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::KvError;

/// When a document expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The document never expires
    #[default]
    None,
    /// Expires this long after the mutation is applied
    Relative(Duration),
    /// Expires at a fixed point in time
    Absolute(SystemTime),
}

impl Expiry {
    pub fn of(duration: Duration) -> Self {
        Expiry::Relative(duration)
    }

    pub fn at(instant: SystemTime) -> Self {
        Expiry::Absolute(instant)
    }

    /// Resolve to whole seconds since the Unix epoch, 0 meaning no expiry.
    /// Relative expiries are rounded up so a sub-second duration still expires.
    pub fn to_epoch_secs(&self, now: SystemTime) -> Result<u32, KvError> {
        let at = match *self {
            Expiry::None => return Ok(0),
            Expiry::Relative(duration) => duration
                .as_secs()
                .checked_add(u64::from(duration.subsec_nanos() > 0))
                .and_then(|secs| now.checked_add(Duration::from_secs(secs.max(1))))
                .ok_or_else(|| {
                    KvError::InvalidArgument(format!("expiry {duration:?} is too far in the future"))
                })?,
            Expiry::Absolute(instant) => instant,
        };
        let secs = at
            .duration_since(UNIX_EPOCH)
            .map_err(|_| KvError::InvalidArgument("expiry before the unix epoch".to_string()))?
            .as_secs();
        match u32::try_from(secs) {
            Ok(0) => Ok(1),
            Ok(secs) => Ok(secs),
            Err(_) => Err(KvError::InvalidArgument(format!(
                "expiry {secs}s is too far in the future"
            ))),
        }
    }

    pub fn from_epoch_secs(secs: u32) -> Self {
        if secs == 0 {
            Expiry::None
        } else {
            Expiry::Absolute(UNIX_EPOCH + Duration::from_secs(u64::from(secs)))
        }
    }
}
