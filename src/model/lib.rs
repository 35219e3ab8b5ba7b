//! Core data model and mutation engine for the Shock content-addressed
//! object store: node lifecycle, versioning, multi-part ingestion, and the
//! ACL-gated persistence façade.
#[macro_use]
extern crate tracing;

pub mod acl;
pub mod engine;
pub mod error;
pub mod file_ref;
pub mod node;
pub mod parts;
pub mod store;
pub mod streamer;
pub mod user;
pub mod version;

pub use acl::Acl;
pub use engine::NodeEngine;
pub use error::Error;
pub use file_ref::{FileRef, UploadHandle};
pub use node::{Linkage, Node};
pub use parts::{PartCount, PartSlot, PartsState};
pub use store::NodeStore;
pub use user::User;
