use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use image_publisher::ai::OpenAiCompatibleAdapter;
use image_publisher::api::{RouterDeps, create_router};
use image_publisher::config::ApplicationConfig;
use image_publisher::config::schema::LogFormat;
use image_publisher::observability::RedactingJsonLayer;
use image_publisher::storage::dropbox::{DropboxAdapter, DropboxCredentials};
use image_publisher::tenant::credentials::EnvCredentialResolver;
use image_publisher::tenant::TenantResolver;
use image_publisher::utils::log_cleanup;

#[derive(Parser)]
#[command(name = "image-publisher")]
#[command(version)]
#[command(about = "Multi-tenant image publishing runtime")]
#[command(long_about = "\
image-publisher selects images from a tenant's object store, runs multimodal
AI analysis and captioning, publishes to the tenant's configured channels,
and archives the source asset.

Per-tenant configuration (storage root, enabled publishers, feature flags) is
resolved by Host header from an external runtime orchestrator on every
request and cached with a TTL.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service.
    Serve,
    /// Configuration subcommands.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Load and validate the process configuration without starting the
    /// server. Exits non-zero and prints the failing field on error.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Guard must outlive `main` so panics/errors during shutdown still flush.
    let _sentry_guard = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty()).map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: Some(env!("CARGO_PKG_VERSION").into()),
                environment: Some(if cfg!(debug_assertions) { "development" } else { "production" }.into()),
                ..Default::default()
            },
        ))
    });

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await,
        Commands::Config(ConfigCommand::Check) => config_check(),
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ApplicationConfig::load()?;
    initialize_logging(config.log_format)?;

    tracing::info!(bind_addr = %config.bind_addr, orchestrator_base_url = %config.orchestrator_base_url, "starting image-publisher");

    let config = Arc::new(config);

    let storage = Arc::new(DropboxAdapter::new(DropboxCredentials {
        app_key: config.dropbox_app_key.clone(),
        app_secret: config.dropbox_app_secret.clone(),
        refresh_token: config.dropbox_refresh_token.clone(),
    }));

    let ai = Arc::new(OpenAiCompatibleAdapter::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.openai_qps,
    ));

    let tenant_resolver = Arc::new(TenantResolver::new(
        config.orchestrator_base_url.clone(),
        config.tenant_cache_max_size,
        Box::new(EnvCredentialResolver),
    ));

    let router = create_router(RouterDeps {
        storage,
        ai,
        tenant_resolver,
        credential_resolver: Arc::new(EnvCredentialResolver),
        http_client: reqwest::Client::new(),
        config: config.clone(),
        cors_origins: std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn config_check() -> anyhow::Result<()> {
    match ApplicationConfig::load() {
        Ok(config) => {
            println!("configuration OK");
            println!("  bind_addr:              {}", config.bind_addr);
            println!("  orchestrator_base_url:  {}", config.orchestrator_base_url);
            println!("  log_format:             {:?}", config.log_format);
            println!("  tenant_cache_max_size:  {}", config.tenant_cache_max_size);
            println!("  admin_cookie_ttl_secs:  {}", config.admin_cookie_ttl_seconds);
            println!("  web_admin_password:     {}", if config.web_admin_password.is_some() { "set" } else { "unset (password login disabled)" });
            println!("  auth0_client_secret:    {}", if config.auth0_client_secret.is_some() { "set" } else { "unset" });
            Ok(())
        }
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    }
}

/// Set up structured logging: stdout plus a rotating file sink under the
/// platform's local data directory, with old files swept on startup. JSON
/// format redacts sensitive fields via `RedactingJsonLayer`; pretty format is
/// for local development.
fn initialize_logging(format: LogFormat) -> anyhow::Result<()> {
    let logs_dir = logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    let cleanup_result = log_cleanup::cleanup_old_logs(&logs_dir, None)?;

    let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
    let file_appender = tracing_appender::rolling::never(&logs_dir, format!("image-publisher.{timestamp}.log"));

    let env_filter = || tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "image_publisher=info".into()));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(RedactingJsonLayer::new(std::io::stdout).with_filter(env_filter()))
                .with(RedactingJsonLayer::new(file_appender).with_filter(env_filter()))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).with_filter(env_filter()))
                .with(tracing_subscriber::fmt::layer().with_writer(file_appender).with_ansi(false).with_filter(env_filter()))
                .init();
        }
    }

    tracing::info!(removed = cleanup_result.removed, failed = cleanup_result.failed.len(), "log_cleanup_completed");
    Ok(())
}

fn logs_dir() -> std::path::PathBuf {
    dirs::data_local_dir().unwrap_or_else(std::env::temp_dir).join("image-publisher").join("logs")
}
