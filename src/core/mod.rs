//! Shared primitives: storage handle, schema, config, errors, audit broker.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod schemas;
pub mod store;
pub mod time;
