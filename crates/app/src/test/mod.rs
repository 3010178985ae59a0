//! Shared test infrastructure.

mod db;
mod helpers;

pub use context::TestContext;
