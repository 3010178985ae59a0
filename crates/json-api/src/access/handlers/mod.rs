//! Access Session Handlers

pub(crate) mod generate;
pub(crate) mod redeem;
pub(crate) mod revoke;
pub(crate) mod session;
pub(crate) mod sessions;
