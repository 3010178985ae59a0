//! Test helpers.

use std::sync::Arc;

use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use scansehat_app::{
    auth::MockAuthService,
    context::AppContext,
    domain::{
        access::MockAccessService,
        audit::MockAuditService,
        patients::records::{PatientIdentity, PatientUuid},
        tenants::records::TenantUuid,
    },
};

use crate::{extensions::*, state::State};

pub(crate) const TEST_PATIENT: PatientIdentity = PatientIdentity {
    tenant: TenantUuid::from_uuid(Uuid::nil()),
    patient: PatientUuid::from_uuid(Uuid::from_u128(1)),
};

#[salvo::handler]
pub(crate) async fn inject_patient(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_patient(TEST_PATIENT);
    ctrl.call_next(req, depot, res).await;
}

fn state(
    access: MockAccessService,
    audit: MockAuditService,
    auth: MockAuthService,
) -> Arc<State> {
    State::from_app_context(AppContext {
        access: Arc::new(access),
        audit: Arc::new(audit),
        auth: Arc::new(auth),
    })
}

// Mocks without expectations fail any call they receive.
pub(crate) fn state_with_access(access: MockAccessService) -> Arc<State> {
    state(access, MockAuditService::new(), MockAuthService::new())
}

pub(crate) fn state_with_audit(audit: MockAuditService) -> Arc<State> {
    state(MockAccessService::new(), audit, MockAuthService::new())
}

pub(crate) fn state_with_auth(auth: MockAuthService) -> Arc<State> {
    state(MockAccessService::new(), MockAuditService::new(), auth)
}

/// Route as an authenticated patient, skipping bearer verification.
pub(crate) fn patient_service(state: Arc<State>, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state))
            .hoop(inject_patient)
            .push(route),
    )
}

pub(crate) fn anonymous_service(state: Arc<State>, route: Router) -> Service {
    Service::new(Router::new().hoop(inject(state)).push(route))
}
