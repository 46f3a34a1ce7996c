//! API Module
//!
//! Control surface for the host: enable, disable and status.
//!
//! - commands.rs: `Guardian`, wiring the pipeline to the platform services
//! - guardian_status.rs: serializable status reports

pub mod commands;
pub mod guardian_status;

pub use commands::*;
pub use guardian_status::{GuardianStatus, StatusReport};
