//! Till CLI - operate the till from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the local database
//! till migrate
//!
//! # Browse the catalog
//! till catalog --search pizza
//!
//! # Build an order
//! till cart add 7 --size L --qty 2
//! till cart show
//!
//! # Send it to the kitchen, then check out
//! till kot --type dine-in
//! till checkout --type delivery --phone 9876543210 --gst
//!
//! # Replay orders captured while offline
//! till queue
//! till sync
//!
//! # Day report
//! till history --day yesterday
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use till_core::OrderType;
use till_pos::history::DaySelector;
use till_pos::{LogFormat, TillConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "till")]
#[command(author, version, about = "Till order capture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the local database
    Migrate,
    /// List catalog products grouped by category
    Catalog {
        /// Only products whose name contains this text
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Work with the in-progress order
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Send the cart to the kitchen and clear it
    Kot {
        /// `delivery` or `dine-in`
        #[arg(short = 't', long = "type", default_value = "delivery")]
        order_type: OrderType,
    },
    /// Freeze the cart into an order and submit it
    Checkout(CheckoutArgs),
    /// List orders waiting to be synced
    Queue,
    /// Replay queued orders to the order service
    Sync,
    /// Orders and total for one day
    History {
        /// `today`, `yesterday` or `<n> days ago`
        #[arg(short, long, default_value = "today")]
        day: DaySelector,
        /// Also list totals for this many recent days
        #[arg(long)]
        recent: Option<u32>,
    },
    /// Delete an order from the order log (advanced feature)
    RemoveOrder {
        /// Order id
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and total
    Show,
    /// Add a catalog product
    Add {
        /// Catalog product id
        product_id: i64,
        /// Size to add, for multi-size products
        #[arg(short, long)]
        size: Option<String>,
        /// Quantity of the size
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Change the quantity of every line with this name and price
    Change {
        name: String,
        price: Decimal,
        /// Signed change, e.g. 1 or -1
        #[arg(allow_hyphen_values = true)]
        delta: i32,
    },
    /// Remove every line with this name and price
    Remove { name: String, price: Decimal },
    /// Empty the cart
    Clear,
}

#[derive(clap::Args)]
struct CheckoutArgs {
    /// `delivery` or `dine-in`
    #[arg(short = 't', long = "type", default_value = "delivery")]
    order_type: OrderType,
    /// Customer name
    #[arg(long)]
    name: Option<String>,
    /// Customer phone number
    #[arg(long)]
    phone: Option<String>,
    /// Delivery address
    #[arg(long)]
    address: Option<String>,
    /// Add GST at the configured rate
    #[arg(long)]
    gst: bool,
    /// Delivery or service charge
    #[arg(long, default_value_t = Decimal::ZERO)]
    charge: Decimal,
    /// Discount off the total
    #[arg(long, default_value_t = Decimal::ZERO)]
    discount: Decimal,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &TillConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "till_pos=info,till_cli=info".into());

    let json = format == LogFormat::Json;
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match TillConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &TillConfig) -> Result<(), commands::CommandError> {
    if matches!(cli.command, Commands::Migrate) {
        return commands::migrate::run(&config.database_url).await;
    }

    let till = commands::open(config).await?;
    match cli.command {
        Commands::Migrate => {}
        Commands::Catalog { search } => commands::catalog::list(&till, &search).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&till).await,
            CartAction::Add {
                product_id,
                size,
                qty,
            } => commands::cart::add(&till, product_id, size.as_deref(), qty).await?,
            CartAction::Change { name, price, delta } => {
                commands::cart::change(&till, &name, price, delta).await?;
            }
            CartAction::Remove { name, price } => {
                commands::cart::remove(&till, &name, price).await?;
            }
            CartAction::Clear => till.cart().clear().await?,
        },
        Commands::Kot { order_type } => commands::orders::kot(&till, order_type).await?,
        Commands::Checkout(args) => {
            let details = commands::orders::CheckoutDetails {
                order_type: args.order_type,
                name: args.name,
                phone: args.phone,
                address: args.address,
                include_gst: args.gst,
                charge: args.charge,
                discount: args.discount,
            };
            commands::orders::checkout(&till, details).await?;
        }
        Commands::Queue => commands::orders::queue(&till).await?,
        Commands::Sync => commands::orders::sync(&till).await?,
        Commands::History { day, recent } => commands::history::show(&till, day, recent).await,
        Commands::RemoveOrder { id } => commands::history::remove(&till, &id).await?,
    }
    Ok(())
}
