use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use kv_common::Cas;

/// Hybrid logical clock used to mint cas values.
///
/// The physical part is wall clock nanoseconds with the low 16 bits cleared,
/// the logical part takes over whenever the wall clock has not moved on (or
/// went backwards), so every value handed out is strictly greater than the
/// previous one.
#[derive(Debug, Default)]
pub struct HlcClock {
    max_cas: AtomicU64,
}

const LOGICAL_MASK: u64 = 0xffff;

impl HlcClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_cas(&self) -> Cas {
        let physical = physical_now() & !LOGICAL_MASK;
        let mut current = self.max_cas.load(Ordering::Relaxed);
        loop {
            let next = if physical > current {
                physical
            } else {
                current + 1
            };
            match self.max_cas.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Cas::from_raw(next),
                Err(actual) => current = actual,
            }
        }
    }
}

fn physical_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
