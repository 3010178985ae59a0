//! Access Audit Trail

pub mod data;
pub mod errors;
pub mod records;
mod repository;
pub mod service;
mod trail;

pub use errors::AuditServiceError;
pub use service::*;
pub(crate) use trail::AuditTrail;
