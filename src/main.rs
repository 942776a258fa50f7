use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use golf_registration::{
    init_telemetry, FieldUpdate, HandPreference, JsonLinesRecordStore, RegistrationConfig,
    RegistrationFlow, SubmitError,
};

#[derive(Parser)]
#[command(name = "golf-register")]
#[command(about = "Register a player for the golf event")]
#[command(long_about = "Validates a player registration, checks that the username is not taken \
                       and appends the record to the local registration store.")]
struct Cli {
    /// Configuration file (defaults to golf-registration.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store one registration
    Register {
        /// Username to remember for the event
        #[arg(long, default_value = "")]
        username: String,
        /// Display name (1-20 characters)
        #[arg(long, default_value = "")]
        name: String,
        /// E-mail address
        #[arg(long, default_value = "")]
        email: String,
        /// Contact number (at least 8 characters)
        #[arg(long, default_value = "")]
        contact: String,
        /// Preferred swing hand
        #[arg(long, default_value = "right", help = "Preferred hand swing: left or right")]
        hand: HandPreference,
        /// Owned product tag; repeat for several, use "None" if you own none
        #[arg(long = "product")]
        products: Vec<String>,
        /// Agree to the Consent & Acknowledgment
        #[arg(long)]
        consent: bool,
        /// Override the registration store file
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Print the effective registration policy as TOML
    Policy,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    RegistrationConfig::load_env_file()?;
    let config = match &cli.config {
        Some(path) => RegistrationConfig::load_from(path)?,
        None => RegistrationConfig::load()?,
    };
    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Register {
            username,
            name,
            email,
            contact,
            hand,
            products,
            consent,
            store,
        } => {
            let store_path = store.unwrap_or_else(|| PathBuf::from(&config.store.path));
            let flow = RegistrationFlow::new(JsonLinesRecordStore::new(store_path), config.policy);

            flow.update_field(FieldUpdate::Identifier(username));
            flow.update_field(FieldUpdate::DisplayName(name));
            flow.update_field(FieldUpdate::Email(email));
            flow.update_field(FieldUpdate::ContactNumber(contact));
            flow.update_field(FieldUpdate::Hand(hand));
            for tag in &products {
                flow.toggle_product(tag);
            }
            flow.update_field(FieldUpdate::Consent(consent));

            tokio::runtime::Runtime::new()?.block_on(async { register_command(&flow).await })
        }
        Commands::Policy => {
            print!("{}", toml::to_string_pretty(&config.policy)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn register_command(flow: &RegistrationFlow<JsonLinesRecordStore>) -> Result<ExitCode> {
    match flow.submit().await {
        Ok(receipt) => {
            println!("✅ {}", receipt.confirmation_message());
            println!("   Record id: {}", receipt.record_id);
            Ok(ExitCode::SUCCESS)
        }
        Err(SubmitError::Invalid(state)) => {
            println!("❌ Please fix the following fields:");
            for (field, error) in state.errors() {
                println!("{field}: {}", error.message);
            }
            Ok(ExitCode::from(2))
        }
        Err(SubmitError::Conflict { field, value }) => {
            let message = flow
                .validation()
                .message(field)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{value} is already taken"));
            println!("❌ Please fix the following fields:");
            println!("{field}: {message}");
            Ok(ExitCode::from(3))
        }
        Err(e @ SubmitError::Store(_)) => {
            println!("⚠️  Error submitting form. Please try again.");
            println!("   {e}");
            Ok(ExitCode::from(4))
        }
        Err(SubmitError::InFlight) => Ok(ExitCode::FAILURE),
    }
}
