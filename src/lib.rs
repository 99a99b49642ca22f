//! # Recipe Pantry
//!
//! The persistence, search, and session core of a recipe-summarizing
//! service.
//!
//! Recipe summaries are stored keyed by source URL in SQLite and exposed
//! through recency- and popularity-ranked views and FTS5 full-text search,
//! alongside an append-only ledger of per-request model-usage cost and a
//! one-nonce-per-identity session registry feeding an authentication
//! fallback chain.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────────┐
//! │ Handler layer │──▶│       Store       │
//! │  (external)   │   │ insert/get/rank/  │
//! └───────────────┘   │ search/sessions   │
//!                     └────┬─────────┬────┘
//!                          │         │
//!                          ▼         ▼
//!                    ┌─────────┐ ┌─────────┐
//!                    │ SQLite  │ │  FTS5   │
//!                    │ tables  │ │  index  │
//!                    └─────────┘ └─────────┘
//! ```
//!
//! A document write and its derived search-index write always share one
//! transaction; the index is derived state and never authoritative. Schema
//! migrations run once at open time, before any other operation can reach
//! the pool.
//!
//! HTTP routing, page fetching, and the summarization pipeline live outside
//! this crate; they drive the store through its narrow async surface.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Versioned schema migrations |
//! | [`store`] | Document store, ranked views, search, ledger, sessions |
//! | [`auth`] | Authentication fallback chain |
//! | [`error`] | Error taxonomy |
//! | [`stats`] | Database statistics overview |

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod stats;
pub mod store;
