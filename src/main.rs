use clap::{Parser, Subcommand};
use gatehouse::policy::hooks;
use gatehouse::policy::persist::JsonFileStore;
use gatehouse::policy::types::DecideRequest;
use gatehouse::settings::Settings;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "gatehouse",
    version,
    about = "Role-based admin bar and admin area access control"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the policy HTTP API (default)
    Serve,
    /// Print the decision for a hypothetical user
    Check {
        /// Comma separated roles, e.g. editor,author
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
        /// Evaluate as a logged-out visitor
        #[arg(long)]
        anonymous: bool,
        /// Request path, used to recognise background API calls
        #[arg(long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => gatehouse::web::serve(settings).await?,
        Command::Check {
            roles,
            anonymous,
            path,
        } => {
            let store = JsonFileStore::new(&settings.store.path, &settings.store.option_key);
            let request = DecideRequest {
                roles,
                authenticated: !anonymous,
                path,
            };
            let response = hooks::decide(
                &store,
                &request,
                &settings.site.url,
                &settings.site.async_prefixes,
            )?;
            println!(
                "{}",
                serde_json::to_string_pretty(&response).into_diagnostic()?
            );
        }
    }
    Ok(())
}
