//! Access Logs

mod handlers;

pub(crate) use handlers::*;
