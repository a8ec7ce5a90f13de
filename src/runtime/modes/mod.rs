//! Mode routing
//!
//! The only execution mode is the HTTP server; `config-gen` is handled in
//! `main` before any runtime state is created.

pub mod server;

pub use server::run_server;
