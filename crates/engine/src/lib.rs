//! Stockbridge engine library.
//!
//! Reconciles stock levels between a Sellmate warehouse account and a
//! Shopify store. The engine owns the two API clients, the correlation and
//! filtering layer that joins their paginated feeds, the settings store,
//! and the bulk jobs the CLI drives.
//!
//! # Data flow
//!
//! ```text
//! warehouse client ─┐
//!                   ├─> correlation ─> decision policy ─> executor ─> Shopify
//! variant feed ─────┘
//! ```
//!
//! Everything network-facing runs sequentially: both APIs meter call cost,
//! and uncoordinated parallel requests get whole runs throttled.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod correlate;
pub mod db;
pub mod executor;
pub mod filtering;
pub mod jobs;
pub mod settings;
pub mod shopify;
pub mod warehouse;
