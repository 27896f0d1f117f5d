use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use str_review_core::cli::{self, CaseCommands, Cli, Commands};
use str_review_core::clients::{HttpAccountLookup, HttpCaseServer, HttpPartyLookup, LookupSettings};
use str_review_core::config::Config;
use str_review_core::identity::IdentityResolver;
use str_review_core::normalize::Normalizer;
use str_review_core::session::SessionStateManager;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays machine-readable.
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let settings = LookupSettings::from(&config);

    match cli.command {
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Normalize { input, output } => {
            let accounts = Arc::new(HttpAccountLookup::with_settings(
                config.account_lookup_url.clone(),
                settings.clone(),
            ));
            let parties = Arc::new(HttpPartyLookup::with_settings(
                config.party_lookup_url.clone(),
                settings,
            ));
            let normalizer = Normalizer::new(accounts, IdentityResolver::new(parties))
                .with_concurrency(config.normalize_concurrency);
            tracing::info!("Normalizer initialized");

            cli::handle_normalize(&normalizer, &input, output.as_deref()).await?;
            Ok(())
        }
        Commands::Case(command) => {
            let server = Arc::new(HttpCaseServer::with_timeout(
                config.case_server_url.clone(),
                settings.timeout,
            ));
            let session = SessionStateManager::new(server);
            tracing::info!("Case server client initialized with URL: {}", config.case_server_url);

            match command {
                CaseCommands::Show { aml_id } => cli::handle_case_show(&session, &aml_id).await,
                CaseCommands::Export {
                    aml_id,
                    format,
                    output,
                } => cli::handle_case_export(&session, &aml_id, &format, output.as_deref()).await,
            }
        }
    }
}
