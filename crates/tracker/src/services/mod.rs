//! Business logic services.

pub mod costs;
pub mod save_queue;

pub use costs::{CostService, LoadStatus, SaveStatus};
pub use save_queue::{Queued, SaveQueue};
