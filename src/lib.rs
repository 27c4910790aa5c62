//! `speedcan`: `no_std` SLCAN (Lawicel) protocol engine for USB-to-CAN
//! adapter firmware. The crate exposes the infrastructure modules (hex and
//! frame codecs, bounded rings), the CAN controller layer with its software
//! transmit queue, the host link, the SLCAN engine, and the dispatcher that
//! ties them together.
#![cfg_attr(not(test), no_std)]
//==================================================================================
/// Adapter context driven by the outer polling loop.
pub mod adapter;
/// CAN controller contract, hardware collaborator, and queued controller.
pub mod backend;
/// Compile-time capacities and runtime settings.
pub mod config;
/// Shared value types: fixed-capacity lines, protocol bytes, replies.
pub mod core;
/// Error types of every layer.
pub mod error;
/// Codecs and bounded storage.
pub mod infra;
/// Transport, SLCAN engine, and dispatcher.
pub mod protocol;
//==================================================================================
pub use adapter::Adapter;
pub use backend::{CanController, CanPeripheral, QueuedController};
pub use protocol::slcan::SlcanEngine;
