//! Stockbridge Core - Shared domain types.
//!
//! This crate provides the domain model shared by all Stockbridge components:
//! - `engine` - Warehouse/Shopify clients, correlation, and sync jobs
//! - `cli` - Command-line tools driving the sync engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure policy - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`warehouse`] - Warehouse stock records and the shop-code linkage table
//! - [`variant`] - Shopify variant records, inventory levels, and sync flags
//! - [`decision`] - The threshold-based reconciliation policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod decision;
pub mod variant;
pub mod warehouse;

pub use decision::{SyncAction, SyncDecision};
pub use variant::{InventoryLevelEntry, ShopifyVariantRecord, SyncFlag};
pub use warehouse::{ShopCode, WarehouseRecordError, WarehouseStockRecord, shop};
