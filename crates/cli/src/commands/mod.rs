//! CLI command implementations.

pub mod costs;
pub mod flag;
pub mod gate;

use ops_cost_core::UnknownCostField;
use ops_cost_core::gate::PinError;
use ops_cost_tracker::config::ConfigError;
use ops_cost_tracker::store::StoreError;
use thiserror::Error;

use flag::FlagError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Locked: run `ops-cli unlock` first")]
    Locked,

    #[error("Incorrect PIN")]
    Rejected,

    #[error("PIN must be 4 digits")]
    IncompletePin,

    #[error("Invalid TRACKER_PIN: {0}")]
    Pin(PinError),

    #[error("Could not load the cost sheet (see log)")]
    LoadFailed,

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Saving {0} failed; the change was not stored")]
    SaveFailed(String),

    #[error(transparent)]
    Field(#[from] UnknownCostField),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
