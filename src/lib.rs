//! Moneta - storefront money-state reconciliation core
//!
//! This library tracks the pieces of an e-commerce backend whose
//! failure mode is "money is lost, duplicated, or inconsistently
//! recorded":
//! - refund ledger and derived payment status
//! - affiliate click attribution with a cookie-carried window
//! - limited-use invite redemption under concurrency
//! - commission accrual and the affiliate balance counters
//! - payout batches against an external transfer provider
//!
//! # Architecture
//! - `ledger`: pure money-state functions, zero I/O
//! - `storage`: SeaORM backends and the transactional write paths
//! - `services`: orchestration (validation, provider calls, outcomes)
//! - `api`: HTTP endpoints and middleware
//! - `config`: configuration management
//! - `system`: process-level setup (logging)

pub mod api;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
