// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so command timestamps are testable.

use chrono::{DateTime, Local, TimeZone};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Real system clock for production use.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Fixed clock for testing.
#[derive(Clone)]
pub struct FakeClock {
    now: DateTime<Local>,
}

impl FakeClock {
    /// Clock pinned to the given local calendar time.
    ///
    /// Panics on out-of-range input, which is acceptable in tests.
    #[allow(clippy::unwrap_used)]
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Self {
            now: Local
                .with_ymd_and_hms(year, month, day, hour, min, sec)
                .single()
                .unwrap(),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        self.now
    }
}
