//! services/app/src/adapters/clock.rs
//!
//! The wall clock. Calendar days follow the machine's local time zone.

use chrono::{DateTime, Local, NaiveDate, Utc};
use litloom_core::ports::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
