//! pingstore - a durable, capacity-bounded JSON file store for telemetry pings
//!
//! One file per ping in a single directory, keyed by a caller-assigned
//! integer ID. Survives restarts, bounds its disk footprint by evicting the
//! oldest unacknowledged pings, and supports partial acknowledgment of
//! delivered pings.

pub mod cli;
pub mod store;
