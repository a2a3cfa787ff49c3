use cucumber::World;
use log::*;
use refund_engine::{
    ingest::{IngestConfig, LocalSubscription},
    PassSummary,
    SqliteDatabase,
};

use crate::support::{oracles::FixedOracle, prepare_env::prepare_test_env};

#[derive(Default, Debug, World)]
pub struct RefundWorld {
    pub system: Option<RefundSystem>,
}

#[derive(Debug)]
pub struct RefundSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub oracle: FixedOracle,
    pub subscription: LocalSubscription,
    pub ingest_config: IngestConfig,
    pub last_pass: Option<Result<PassSummary, String>>,
}

impl RefundWorld {
    pub fn system(&self) -> &RefundSystem {
        self.system.as_ref().expect("Refund system not initialised")
    }

    pub fn system_mut(&mut self) -> &mut RefundSystem {
        self.system.as_mut().expect("Refund system not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }
}

impl RefundSystem {
    pub async fn new() -> Self {
        let db = prepare_test_env().await;
        let db_path = refund_engine::RefundStore::url(&db).to_string();
        debug!("Created database: {db_path}");
        let ingest_config = IngestConfig {
            receive_window: std::time::Duration::from_millis(150),
            poll_interval: std::time::Duration::from_millis(10),
            max_messages: 50,
        };
        Self {
            db_path,
            db,
            oracle: FixedOracle::processed(),
            subscription: LocalSubscription::new(std::time::Duration::ZERO),
            ingest_config,
            last_pass: None,
        }
    }
}
