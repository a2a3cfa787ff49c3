//! # Refund batch
//! This crate hosts the process wiring for the refund engine. It is responsible for:
//! * Reading the configuration from the environment.
//! * Connecting to the database and bringing the schema up to date.
//! * Refusing to start if the database or the status service is unhealthy.
//! * Running the scheduler until it completes or the process is asked to shut down.
//!
//! ## Configuration
//! The service is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod runner;
