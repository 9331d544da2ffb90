//! Long-running orchestrations driven from the CLI.
//!
//! Each job walks one or both external feeds sequentially; there is no
//! parallel fan-out. Both APIs meter call cost, and uncoordinated parallel
//! requests get whole runs throttled. Per-item failures are counted and
//! reported, never retried; an operator re-runs the job instead.

pub mod stock_sync;
pub mod tag_update;
pub mod warehouse_sync;
