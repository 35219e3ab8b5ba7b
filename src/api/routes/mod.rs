//! HTTP route handlers. Each function takes the pieces the
//! router has already extracted (store, config, authenticated user, path
//! parameters, parsed body) and returns a `Response`.

pub mod download;
pub mod node;
