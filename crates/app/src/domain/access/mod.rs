//! Access Sessions
//!
//! Patients issue time-boxed grants to doctors over an OTP or QR channel.
//! Doctors redeem the one-time secret, then read records with the session
//! token and ephemeral key.

pub mod data;
pub mod errors;
pub mod qr;
pub mod records;
mod repository;
pub mod secrets;
pub mod service;
pub mod settings;

pub use errors::AccessServiceError;
pub use service::*;
pub use settings::{AccessSettings, AccessSettingsError};
