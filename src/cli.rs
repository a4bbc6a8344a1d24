use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::adapters::PostgresOrderRepository;
use crate::config::{mask_password, mask_secret, Config};
use crate::ports::OrderRepository;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront - single product checkout backed by a hosted payment page", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Order inspection commands
    #[command(subcommand)]
    Order(OrderCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Print an order by its merchant reference
    Show {
        #[arg(value_name = "REFERENCE")]
        reference: String,
    },
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, crate::db::MIGRATIONS_DIR).await?;

    println!("✓ Database migrations completed");

    Ok(())
}

pub async fn handle_order_show(pool: &PgPool, reference: &str) -> anyhow::Result<()> {
    let repository = PostgresOrderRepository::new(pool.clone());
    let order = repository.get_by_reference(reference).await?;

    println!("Order {}", order.reference);
    println!("  Id: {}", order.id);
    println!("  Product: {}", order.product_name);
    println!("  Amount: {}", order.formatted_amount());
    println!("  Status: {}", order.status);
    println!(
        "  PSP Reference: {}",
        order.psp_reference.as_deref().unwrap_or("-")
    );
    println!("  Created: {}", order.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated: {}", order.updated_at.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    config.validate()?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  PSP Environment: {}", config.psp_environment);
    println!("  PSP API URL: {}", config.psp_api_url);
    println!("  PSP API Key: {}", mask_secret(&config.psp_api_key));
    println!("  PSP Client Key: {}", mask_secret(&config.psp_client_key));
    println!("  PSP Merchant Account: {}", config.psp_merchant_account);
    println!("  Return URL: {}", config.return_url());
    println!("  Tax Rate: {} bps", config.tax_rate_bps);

    println!("✓ Configuration is valid");

    Ok(())
}
