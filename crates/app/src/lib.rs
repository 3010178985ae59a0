//! Scan Sehat access sessions: domain, persistence, and secrets.

pub mod auth;
pub mod context;
pub mod database;
pub mod domain;

#[cfg(test)]
mod test;

mod uuids;
