//! OPS Cost Tracker core: shared types and logic.
//!
//! This crate is used by both front ends:
//! - `tracker` - the web table served to the accounts team
//! - `cli` - command-line access to the same data
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no HTTP clients, no
//! document store access. I/O lives in the tracker crate; the unlock flag is
//! reached through the [`gate::UnlockFlag`] trait so each front end can choose
//! where it is kept.
//!
//! # Modules
//!
//! - [`types`] - Orders, cost fields, overlays and lenient amount decoding
//! - [`reconcile`] - Merging orders with overlays into an editable sheet
//! - [`format`] - Currency, number and date formatting
//! - [`gate`] - The PIN access gate

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod format;
pub mod gate;
pub mod reconcile;
pub mod types;

pub use reconcile::{CategoryShare, CostRow, CostSheet, CostStats, DocumentSet};
pub use types::*;
