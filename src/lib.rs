//! Account balances with an append-only ledger.
//!
//! Deposits, withdrawals and transfers run as isolated units of work that
//! lock the affected account rows, validate and update balances, and append
//! one ledger entry, all committed together. Ledger history is read without
//! locks.
//!
//! # Layout
//!
//! - [`store`]: storage contract plus Postgres and in-memory implementations
//! - [`services`]: transaction engine, query service, account opening
//! - [`handlers`] / [`routes`]: thin HTTP adapter over the services

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

pub use error::{LedgerError, Result};
