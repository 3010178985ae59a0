//! Medical Records
//!
//! Read-only from the access subsystem's perspective: records are uploaded
//! and processed elsewhere, and only the sharing projection is exposed here.

pub mod records;
mod repository;

pub(crate) use repository::PgRecordsRepository;
