//! LedgerDesk core: payment records, client risk scoring and
//! payment-to-invoice reconciliation over a SQLite ledger.

pub mod analytics;
pub mod client;
pub mod clock;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod instrument;
pub mod invoice;
pub mod job;
pub mod name_generator;
pub mod notify;
pub mod ocr;
pub mod reconciliation;
pub mod reminder_job;
pub mod rng;
pub mod risk;
pub mod risk_sweep_job;
pub mod store;
pub mod types;
