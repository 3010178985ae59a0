//! Domain Modules

pub mod access;
pub mod audit;
pub mod patients;
pub mod records;
pub mod tenants;
