//! Service layer for OS-backed features
//!
//! Network, time and status reporting talk to the OS through
//! [`CommandRunner`](crate::system::command::CommandRunner); the settings
//! service composes them with the peer façades.

pub mod network;
pub mod settings;
pub mod status;
pub mod time;

pub use network::{NetworkService, NetworkUpdate};
pub use settings::SettingsService;
pub use status::{StatusReport, StatusService};
pub use time::{TimeInfo, TimeService, TimeUpdate};
