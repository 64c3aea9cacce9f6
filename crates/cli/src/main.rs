//! Hearth CLI - administrator tools for forms and settings.
//!
//! # Usage
//!
//! ```bash
//! # Check a custom field definition file without touching the backend
//! hearth fields lint fields/profile.yaml
//!
//! # Validate and publish custom fields for the profile form
//! hearth fields publish fields/profile.yaml --category profile
//!
//! # Show the effective settings of a category
//! hearth settings show login
//!
//! # Show the validation schema a form will use
//! hearth schema show registration
//!
//! # Validate a set of profile values against the live profile schema
//! hearth profile check profile.json
//! ```
//!
//! # Environment Variables
//!
//! - `HEARTH_API_BASE_URL` - Backend base URL (all commands but `fields lint`)
//! - `HEARTH_API_TOKEN` - Bearer token (optional)
//! - `HEARTH_LOG_JSON` - Emit JSON logs when set
//! - `RUST_LOG` - Log filter (default: `hearth=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth_core::SettingCategory;

mod commands;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about = "Hearth administrator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Author custom form fields
    Fields {
        #[command(subcommand)]
        action: FieldsAction,
    },
    /// Inspect settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Inspect form schemas
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Check profile data
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum FieldsAction {
    /// Validate a YAML or JSON field definition file
    Lint {
        /// Path to the definition file
        file: String,
    },
    /// Validate a definition file and store it in the backend
    Publish {
        /// Path to the definition file
        file: String,

        /// Category whose custom field list is replaced
        #[arg(short, long, value_enum)]
        category: FieldCategory,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective (parsed) settings of a category
    Show {
        #[arg(value_enum)]
        category: FormKind,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Print the fields and rules of a form
    Show {
        #[arg(value_enum)]
        form: FormKind,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Validate a JSON object of profile form values
    Check {
        /// Path to the JSON file
        file: String,
    },
}

/// Categories that carry a custom field list.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FieldCategory {
    Profile,
    Registration,
}

impl From<FieldCategory> for SettingCategory {
    fn from(category: FieldCategory) -> Self {
        match category {
            FieldCategory::Profile => Self::Profile,
            FieldCategory::Registration => Self::Registration,
        }
    }
}

/// Forms driven by a settings category.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormKind {
    Profile,
    Login,
    Registration,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hearth=info,hearth_cli=info,hearth_forms=info".into());

    // JSON for log shippers, text for terminals
    let json = std::env::var("HEARTH_LOG_JSON").is_ok();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Fields { action } => match action {
            FieldsAction::Lint { file } => {
                commands::fields::lint(&file).await?;
            }
            FieldsAction::Publish { file, category } => {
                commands::fields::publish(&file, category.into()).await?;
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Show { category } => commands::settings::show(category).await?,
        },
        Commands::Schema { action } => match action {
            SchemaAction::Show { form } => commands::settings::show_schema(form).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Check { file } => commands::profile::check(&file).await?,
        },
    }
    Ok(())
}
