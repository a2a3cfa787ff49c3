use std::time::Duration;

use chrono::Utc;
use log::*;

use super::{Disposition, ErrorCatalogue, OracleError, RandomSource, StatusOracle, ThreadRandom};
use crate::db_types::FileId;

pub const DEFAULT_MIN_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_millis(2000);

/// Percentage of lookups that report the refund as processed.
const PROCESSED_PERCENT: u32 = 10;
/// Percentage of lookups that report the refund as processed or in progress.
const IN_PROGRESS_CEILING: u32 = 80;

/// A stand-in for the external authority.
///
/// Each lookup waits for a random delay in `min_latency..max_latency` and then reports, over a uniform roll of
/// 0..100: processed for rolls below 10, in progress for rolls below 80, and an error drawn from the
/// [`ErrorCatalogue`] otherwise.
///
/// Draw order per lookup: latency (skipped when the latency range is empty), outcome, then the message index for
/// error outcomes.
pub struct SimulatedOracle<R = ThreadRandom> {
    catalogue: ErrorCatalogue,
    random: R,
    min_latency: Duration,
    max_latency: Duration,
}

impl SimulatedOracle<ThreadRandom> {
    pub fn new(catalogue: ErrorCatalogue) -> Self {
        Self::with_random(catalogue, ThreadRandom)
    }
}

impl<R: RandomSource> SimulatedOracle<R> {
    pub fn with_random(catalogue: ErrorCatalogue, random: R) -> Self {
        Self { catalogue, random, min_latency: DEFAULT_MIN_LATENCY, max_latency: DEFAULT_MAX_LATENCY }
    }

    /// Sets the simulated response delay range. `min == max` gives a fixed delay, and zero disables it.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    pub fn catalogue(&self) -> &ErrorCatalogue {
        &self.catalogue
    }

    fn next_latency(&self) -> Duration {
        let spread = self.max_latency.saturating_sub(self.min_latency).as_millis();
        if spread == 0 {
            return self.min_latency;
        }
        let spread = u32::try_from(spread).unwrap_or(u32::MAX);
        self.min_latency + Duration::from_millis(u64::from(self.random.below(spread)))
    }

    fn roll_disposition(&self) -> Disposition {
        let roll = self.random.below(100);
        if roll < PROCESSED_PERCENT {
            Disposition::Processed { processed_at: Utc::now() }
        } else if roll < IN_PROGRESS_CEILING {
            Disposition::InProgress
        } else {
            Disposition::Error { message: Some(self.catalogue.pick(&self.random)) }
        }
    }
}

impl<R: RandomSource + 'static> StatusOracle for SimulatedOracle<R> {
    async fn get_status(&self, file_id: &FileId) -> Result<Disposition, OracleError> {
        let delay = self.next_latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let disposition = self.roll_disposition();
        trace!("🔮️ {file_id} -> {disposition:?} after {}ms", delay.as_millis());
        Ok(disposition)
    }

    async fn health_check(&self) -> Result<(), OracleError> {
        Ok(())
    }
}
