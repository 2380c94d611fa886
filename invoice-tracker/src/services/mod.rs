//! Services module for invoice-tracker.

pub mod billing;
pub mod dashboard;
pub mod database;
pub mod mailer;
pub mod memory;
pub mod metrics;
pub mod renderer;
pub mod store;
pub mod totals;

pub use billing::BillingService;
pub use database::Database;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use store::EntityStore;
