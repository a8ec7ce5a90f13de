//! G-Node - device-management REST backend for an IoT gateway
//!
//! Serves a JSON REST API for users, API tokens, authentication bundles,
//! CA files, devices, channels and device settings. Channel and settings
//! changes are brokered to the sibling services of the gateway over a
//! request/reply IPC; network, time and service status come from the OS.
//!
//! # Architecture
//! - `api`: HTTP services, JWT and the authentication middleware
//! - `gateway`: façades over the sibling services (broker, bridge, tunnel)
//! - `services`: OS-backed network, time, status and the settings aggregate
//! - `storage`: SeaORM persistence
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: IPC, command execution, service supervision and logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
