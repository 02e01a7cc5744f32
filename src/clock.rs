use std::sync::{Mutex, PoisonError};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::error::{StoreError, StoreResult};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Source of the current time for entity timestamps and cache expiry.
pub trait Clock: Send + Sync {
    /// Current UTC time, truncated to whole seconds.
    fn now(&self) -> PrimitiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc()
            .replace_nanosecond(0)
            .expect("zero nanoseconds is always in range");
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<PrimitiveDateTime>,
}

impl FixedClock {
    pub fn new(start: PrimitiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, value: PrimitiveDateTime) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn format_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(TIMESTAMP_FORMAT)
        .expect("a primitive datetime always carries every formatted component")
}

pub fn parse_timestamp(raw: &str) -> StoreResult<PrimitiveDateTime> {
    PrimitiveDateTime::parse(raw.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        StoreError::invalid_argument(format!(
            "invalid timestamp '{raw}', expected YYYY-MM-DD HH:MM:SS"
        ))
    })
}
