use clap::Args;
use scansehat_app::domain::{
    patients::{
        PatientsService, PgPatientsService,
        data::NewPatient,
        records::PatientUuid,
    },
    tenants::records::TenantUuid,
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CreatePatientArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Tenant the patient belongs to
    #[arg(long)]
    tenant_uuid: Uuid,

    /// Patient email, unique within the tenant
    #[arg(long)]
    email: String,

    /// Patient display name
    #[arg(long, default_value = "")]
    name: String,
}

pub(crate) async fn run(args: CreatePatientArgs) -> Result<(), String> {
    let db = super::super::connect(&args.database_url).await?;

    let patient = PgPatientsService::new(db)
        .create_patient(
            TenantUuid::from_uuid(args.tenant_uuid),
            NewPatient {
                uuid: PatientUuid::new(),
                email: args.email,
                name: args.name,
            },
        )
        .await
        .map_err(|error| format!("failed to create patient: {error}"))?;

    println!("patient_uuid: {}", patient.uuid);
    println!("tenant_uuid: {}", patient.tenant_uuid);
    println!("email: {}", patient.email);

    Ok(())
}
