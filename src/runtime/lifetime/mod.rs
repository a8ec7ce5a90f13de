//! Application lifetime
//!
//! - **startup.rs**: storage, default user and service assembly
//! - **shutdown.rs**: signal handling and resource cleanup

pub mod shutdown;
pub mod startup;
