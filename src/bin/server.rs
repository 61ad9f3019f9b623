use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use clap::{Parser, Subcommand};
use credential_store::db::schema::ensure_schema;
use credential_store::server::config::ServerConfig;
use credential_store::services::auth_service::issue_token;
use credential_store::web::create_axum_router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a signed access token for a user
    IssueToken {
        #[arg(long)]
        user_id: i32,
        #[arg(long, default_value = "operator")]
        subject: String,
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "credential-store.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn connect_database(config: &ServerConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opt = ConnectOptions::new(config.database_url.to_owned());
    opt.max_connections(config.db_max_connections)
        .sqlx_logging(false);
    Database::connect(opt).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);

    if let Some(Command::IssueToken {
        user_id,
        subject,
        hours,
    }) = args.command
    {
        let token = issue_token(
            user_id,
            &subject,
            &server_config.jwt_secret,
            Duration::hours(hours),
        )?;
        println!("{token}");
        return Ok(());
    }

    init_logging(&server_config.log_dir);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        require_authentication = server_config.require_authentication,
        "Starting credential store."
    );
    if !server_config.require_authentication {
        info!("Anonymous requests may assert a user_id on the generic credential endpoints.");
    }

    let db_pool = connect_database(&server_config).await.map_err(|e| {
        error!(error = %e, "Failed to create database connection.");
        e
    })?;

    if server_config.bootstrap_schema {
        ensure_schema(&db_pool).await?;
    }

    let addr: SocketAddr = server_config.listen_addr.parse()?;
    let app = create_axum_router(db_pool, server_config.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
    }
}
