// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod change_detector;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod record;
pub mod shutdown;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::change_detector::{compare, ChangeSummary};
pub use crate::config::MonitorConfig;
pub use crate::monitor::{CycleOutcome, CyclePhase, Monitor};
pub use crate::notify::{Notification, Notifier, NotifierMux};
pub use crate::record::ContentRecord;
