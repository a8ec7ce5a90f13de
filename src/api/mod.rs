//! HTTP API
//!
//! - `jwt`: access token issuing and validation
//! - `middleware`: bearer authentication
//! - `services`: route handlers and the response envelope

pub mod jwt;
pub mod middleware;
pub mod services;
