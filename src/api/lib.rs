//! HTTP API server for the Shock content-addressed object store: request
//! parsing, authentication, and the router that dispatches onto
//! `shock_model`'s node-mutation engine.
#[macro_use]
extern crate tracing;

pub mod auth;
pub mod error;
pub mod helpers;
pub mod multipart;
pub mod routes;
pub mod server;

pub use error::Error;
