use clap::{Args, Subcommand};

mod create;

#[derive(Debug, Args)]
pub(crate) struct PatientCommand {
    #[command(subcommand)]
    command: PatientSubcommand,
}

#[derive(Debug, Subcommand)]
enum PatientSubcommand {
    Create(create::CreatePatientArgs),
}

pub(crate) async fn run(command: PatientCommand) -> Result<(), String> {
    match command.command {
        PatientSubcommand::Create(args) => create::run(args).await,
    }
}
