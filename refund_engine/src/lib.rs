//! Refund Engine
//!
//! The refund engine reconciles the status of filed tax refunds against an external authority. New work arrives on
//! a message queue, is stored as pending refunds, and is then resolved in bounded batches by a pool of workers.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`] and [`db_types`]). The [`RefundStore`] trait is the contract the rest of the engine relies
//!    on. [`SqliteDatabase`] is the shipped backend.
//! 2. The status oracle ([`oracle`]). An abstraction over the external authority, with a simulated implementation.
//! 3. Queue ingestion ([`ingest`]). Turns inbound messages into pending refunds, at least once and without
//!    duplicates.
//! 4. Batch processing ([`processor`]). Drains pending refunds and persists terminal outcomes.
//! 5. Scheduling ([`scheduler`]). Runs ingestion and processing once, or on a fixed interval until cancelled.
//!
//! The engine also emits events that you can hook into, e.g. a `RefundResolvedEvent` every time a refund reaches a
//! terminal status. See [`events`].
pub mod db;
pub mod db_types;
pub mod events;
pub mod health;
pub mod ingest;
pub mod oracle;
pub mod processor;
pub mod scheduler;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{RefundStore, StoreError};
pub use health::{health_check, HealthError};
pub use processor::{BatchProcessor, PassSummary, ProcessorConfig, ProcessorError};
pub use scheduler::{ScheduleMode, Scheduler};
