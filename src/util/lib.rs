//! Utility crate for the Shock content-addressed object store
#[macro_use]
extern crate tracing;

pub mod config;
pub mod data;
pub mod error;
pub mod time;
