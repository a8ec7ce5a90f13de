//! System-level modules
//!
//! This module contains system-level functionality:
//! - Request/reply IPC with the sibling services
//! - OS command execution and service supervision
//! - Logging setup

pub mod command;
pub mod ipc;
pub mod logging;
pub mod supervisor;
