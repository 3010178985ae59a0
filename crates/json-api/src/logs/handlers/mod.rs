//! Access Log Handlers

pub(crate) mod index;
