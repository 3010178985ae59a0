//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};
use scansehat_app::domain::patients::records::PatientIdentity;

const PATIENT_DEPOT_KEY: &str = "patient_identity";

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    /// Store the authenticated patient for downstream handlers.
    fn insert_patient(&mut self, patient: PatientIdentity);

    fn patient_or_401(&self) -> Result<PatientIdentity, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_patient(&mut self, patient: PatientIdentity) {
        self.insert(PATIENT_DEPOT_KEY, patient);
    }

    fn patient_or_401(&self) -> Result<PatientIdentity, StatusError> {
        self.get::<PatientIdentity>(PATIENT_DEPOT_KEY)
            .copied()
            .map_err(|_ignored| StatusError::unauthorized().brief("Authentication required"))
    }
}
