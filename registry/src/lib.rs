//! HTTP registry for IoT sensor metadata and readings, backed by SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod rest;
pub mod seed;
pub mod validate;

pub use errors::{Error, Result};
pub use rest::create_router;
