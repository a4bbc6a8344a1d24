use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storefront::adapters::PostgresOrderRepository;
use storefront::cli::{Cli, Commands, DbCommands, OrderCommands};
use storefront::config::Config;
use storefront::gateway::HostedCheckoutClient;
use storefront::health::{GatewayChecker, PostgresChecker};
use storefront::services::{CheckoutService, OrderService};
use storefront::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve) | None => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => {
            storefront::cli::handle_db_migrate(&config).await
        }
        Some(Commands::Order(OrderCommands::Show { reference })) => {
            let pool = db::create_pool(&config).await?;
            storefront::cli::handle_order_show(&pool, &reference).await
        }
        Some(Commands::Config) => storefront::cli::handle_config_validate(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool, db::MIGRATIONS_DIR).await?;

    let gateway = HostedCheckoutClient::new(config.gateway_settings());
    tracing::info!(
        environment = %config.psp_environment,
        base_url = %gateway.base_url(),
        "Payment gateway client initialized"
    );

    let orders = OrderService::new(Arc::new(PostgresOrderRepository::new(pool.clone())));
    let checkout = CheckoutService::new(
        orders,
        Arc::new(gateway.clone()),
        config.psp_client_key.clone(),
    )
    .with_tax_rate(config.tax_rate_bps);

    let state = AppState::new(checkout, config.return_url())
        .with_health_checker(Arc::new(PostgresChecker::new(pool.clone())))
        .with_health_checker(Arc::new(GatewayChecker::new(gateway)));

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
