//! App Router

use salvo::Router;

use crate::{access, auth, healthcheck, logs, observability};

/// Doctor-facing routes authenticate with the session secret itself, so only
/// the patient routes sit behind bearer auth.
pub(crate) fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(observability::metrics_handler))
        .push(
            Router::with_path("access")
                .push(Router::with_path("redeem").post(access::redeem::handler))
                .push(Router::with_path("session/{token}").get(access::session::handler)),
        )
        .push(
            Router::new()
                .hoop(auth::middleware::handler)
                .push(Router::with_path("access/generate").post(access::generate::handler))
                .push(
                    Router::with_path("access/sessions")
                        .get(access::sessions::handler)
                        .push(Router::with_path("{token}/revoke").post(access::revoke::handler)),
                )
                .push(Router::with_path("logs").get(logs::index::handler)),
        )
}
