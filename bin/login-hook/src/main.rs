use rolegate_access::{ClaimMapper, MappingSource, RoleMappingHandler};
use rolegate_login_hook::{
    command::{self, Command, LoginRequest},
    config::HookConfig,
    db::{self, PgAccessStore},
    error::HookError,
};
use rootcause::Report;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let config = match HookConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let auth = &config.auth;
    let secret_state = if auth.client_secret().is_empty() {
        "NOT SET"
    } else {
        "SET"
    };
    let mapping_file = match auth.mapping_source() {
        MappingSource::Embedded => None,
        MappingSource::File(path) => Some(path.display().to_string()),
    };
    tracing::info!(
        client_id = %auth.client_id(),
        client_secret = secret_state,
        tenant_id = %auth.tenant_id(),
        provider = %auth.provider_name(),
        mapping_mode = %auth.mapping_mode(),
        mapping_file = ?mapping_file,
        "Loaded configuration"
    );

    match run(command, config).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "login hook failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cmd: Command, config: HookConfig) -> Result<String, Report<HookError>> {
    let mapper = ClaimMapper::new(config.auth);

    match cmd {
        Command::Settings { reveal_secret } => command::settings_json(&mapper, reveal_secret),
        Command::Login { input } => {
            let request = LoginRequest::read(input.as_deref()).await?;

            let report = match config.database_url {
                Some(url) => {
                    let pool = db::connect(&url).await?;
                    let handler = RoleMappingHandler::from_mapper(mapper, PgAccessStore::new(pool));
                    command::complete_login(&handler, &request).await?
                }
                None => {
                    tracing::warn!("DATABASE_URL is not set, the user will not be persisted");
                    command::map_login(&mapper, &request)?
                }
            };

            command::to_json(&report)
        }
    }
}
