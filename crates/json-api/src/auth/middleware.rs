//! Patient bearer authentication middleware.

use std::sync::Arc;

use salvo::{http::header::AUTHORIZATION, prelude::*};
use scansehat_app::auth::AuthServiceError;
use tracing::{debug, error};

use crate::{extensions::*, state::State};

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(token) = extract_bearer_token(req) else {
        res.render(StatusError::unauthorized().brief("Missing or invalid Authorization header"));
        ctrl.skip_rest();

        return;
    };

    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => state,
        Err(_error) => {
            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    let patient = match state.app.auth.authenticate_bearer(token).await {
        Ok(patient) => patient,
        Err(
            AuthServiceError::NotFound
            | AuthServiceError::UnknownPatient
            | AuthServiceError::Token(_),
        ) => {
            debug!("rejected bearer token");

            res.render(StatusError::unauthorized().brief("Invalid API token"));
            ctrl.skip_rest();

            return;
        }
        Err(AuthServiceError::Sql(source)) => {
            error!("failed to validate api token: {source}");

            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    depot.insert_patient(patient);

    ctrl.call_next(req, depot, res).await;
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use scansehat_app::{auth::MockAuthService, domain::patients::records::PatientIdentity};
    use testresult::TestResult;

    use crate::test_helpers::{TEST_PATIENT, state_with_auth};

    use super::*;

    #[salvo::handler]
    async fn echo_patient(depot: &mut Depot, res: &mut Response) {
        let patient = depot.patient_or_401().ok().map_or_else(
            || "missing".to_string(),
            |identity: PatientIdentity| format!("{}/{}", identity.tenant, identity.patient),
        );

        res.render(patient);
    }

    fn make_service(auth: MockAuthService) -> Service {
        Service::new(
            Router::new()
                .hoop(salvo::affix_state::inject(state_with_auth(auth)))
                .hoop(handler)
                .push(Router::new().get(echo_patient)),
        )
    }

    #[tokio::test]
    async fn missing_authorization_header_returns_401() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer().never();

        let res = TestClient::get("http://example.com")
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn non_bearer_scheme_returns_401() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer().never();

        let res = TestClient::get("http://example.com")
            .add_header(AUTHORIZATION, "Basic abc123", true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_returns_401() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer()
            .once()
            .withf(|token| token == "ss_v1_abc")
            .return_once(|_| Err(AuthServiceError::NotFound));

        let res = TestClient::get("http://example.com")
            .add_header(AUTHORIZATION, "Bearer ss_v1_abc", true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_returns_500() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer()
            .once()
            .return_once(|_| Err(AuthServiceError::Sql(sqlx::Error::PoolTimedOut)));

        let res = TestClient::get("http://example.com")
            .add_header(AUTHORIZATION, "Bearer ss_v1_abc", true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }

    #[tokio::test]
    async fn valid_token_injects_patient_identity() -> TestResult {
        let mut auth = MockAuthService::new();

        auth.expect_authenticate_bearer()
            .once()
            .withf(|token| token == "ss_v1_abc")
            .return_once(|_| Ok(TEST_PATIENT));

        let mut res = TestClient::get("http://example.com")
            .add_header(AUTHORIZATION, "bearer ss_v1_abc", true)
            .send(&make_service(auth))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(
            res.take_string().await?,
            format!("{}/{}", TEST_PATIENT.tenant, TEST_PATIENT.patient)
        );

        Ok(())
    }
}
