use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nearbite_db::{Page, ProximityFinder};

#[derive(Debug, Parser)]
#[command(name = "nearbite-cli")]
#[command(about = "Nearbite operational command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate,
    /// Upsert merchants from the seed YAML file into the database.
    Seed {
        /// Path to the merchants YAML file; defaults to NEARBITE_MERCHANTS_PATH.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Query active merchants within a search radius of a point.
    Nearby {
        #[arg(long)]
        latitude: f64,
        #[arg(long)]
        longitude: f64,
        /// Search radius in meters.
        #[arg(long, default_value_t = 5000.0)]
        radius: f64,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Query merchants that can deliver to a point.
    Deliverable {
        #[arg(long)]
        latitude: f64,
        #[arg(long)]
        longitude: f64,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate => {
            let pool = nearbite_db::connect_pool_from_env().await?;
            let applied = nearbite_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed { file } => {
            let path = match file {
                Some(path) => path,
                None => nearbite_core::load_app_config()?.merchants_path,
            };
            let merchants = nearbite_core::load_merchant_config(&path)?;

            let pool = nearbite_db::connect_pool_from_env().await?;
            nearbite_db::run_migrations(&pool).await?;
            let count = nearbite_db::seed_merchants(&pool, &merchants).await?;
            println!("seeded {count} merchant(s) from {}", path.display());
        }
        Commands::Nearby {
            latitude,
            longitude,
            radius,
            limit,
        } => {
            let pool = nearbite_db::connect_pool_from_env().await?;
            let finder = ProximityFinder::new(pool);
            let rows = finder
                .find_within_radius(latitude, longitude, radius, Page::new(limit, 0))
                .await?;
            print_hits(&rows);
        }
        Commands::Deliverable {
            latitude,
            longitude,
            limit,
        } => {
            let pool = nearbite_db::connect_pool_from_env().await?;
            let finder = ProximityFinder::new(pool);
            let rows = finder
                .find_in_delivery_radius(latitude, longitude, Page::new(limit, 0))
                .await?;
            print_hits(&rows);
        }
    }

    Ok(())
}

fn print_hits(rows: &[nearbite_db::MerchantDistanceRow]) {
    if rows.is_empty() {
        println!("no merchants in range");
        return;
    }
    for row in rows {
        println!(
            "{:>8.0}m  #{:<6} {}  (radius {}m, accepting: {})",
            row.distance_meters,
            row.id,
            row.outlet_name,
            row.delivery_radius_meters,
            row.is_accepting_orders,
        );
    }
}
