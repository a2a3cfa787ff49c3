use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use refund_engine::{
    db_types::FileId,
    oracle::{Disposition, OracleError, StatusOracle},
};

#[derive(Debug, Clone)]
enum Answer {
    Processed,
    InProgress,
    Error(String),
    Unavailable,
}

/// An oracle that gives the same answer every time and counts how often it was asked.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    answer: Answer,
    healthy: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FixedOracle {
    fn new(answer: Answer) -> Self {
        Self { answer, healthy: true, delay: Duration::ZERO, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn processed() -> Self {
        Self::new(Answer::Processed)
    }

    pub fn in_progress() -> Self {
        Self::new(Answer::InProgress)
    }

    pub fn error(message: &str) -> Self {
        Self::new(Answer::Error(message.to_string()))
    }

    pub fn unavailable() -> Self {
        Self::new(Answer::Unavailable)
    }

    /// Every lookup takes `delay` to answer. The call is counted as soon as it starts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// A handle on the call counter that stays valid after the oracle has been moved into a processor.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl StatusOracle for FixedOracle {
    async fn get_status(&self, _file_id: &FileId) -> Result<Disposition, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.answer {
            Answer::Processed => Ok(Disposition::Processed { processed_at: Utc::now() }),
            Answer::InProgress => Ok(Disposition::InProgress),
            Answer::Error(message) => Ok(Disposition::Error { message: Some(message.clone()) }),
            Answer::Unavailable => Err(OracleError::Unavailable("connection refused".into())),
        }
    }

    async fn health_check(&self) -> Result<(), OracleError> {
        if self.healthy {
            Ok(())
        } else {
            Err(OracleError::Unavailable("health endpoint returned 503".into()))
        }
    }
}
