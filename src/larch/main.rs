mod synthesizer;

use anyhow::Result;
use clap::Parser;
use taiga::city_directory::CityDirectory;
use taiga::postgres_tools::make_async_pool;

use crate::synthesizer::SynthesisConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the static city directory CSV (city,lat,lon).
    #[arg(long, env = "CITY_DIRECTORY_PATH")]
    city_directory: String,

    /// City whose stop anchors the hub-star topology.
    #[arg(long, env = "HUB_CITY", default_value = "Якутск")]
    hub_city: String,

    /// Rolling horizon for synthesized trips, in days.
    #[arg(long, env = "HORIZON_DAYS", default_value_t = 365)]
    horizon_days: u32,

    /// Hard cap on mesh-fallback route records.
    #[arg(long, env = "MESH_ROUTE_CAP", default_value_t = 20_000)]
    mesh_route_cap: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    println!("Loading city directory from {}", args.city_directory);
    let directory = CityDirectory::from_csv_path(&args.city_directory)?;

    println!("Initializing database connection");
    let pool = make_async_pool().await.map_err(|e| anyhow::anyhow!(e))?;
    let mut conn = pool.get().await?;

    let config = SynthesisConfig {
        hub_city: args.hub_city,
        horizon_days: args.horizon_days,
        mesh_route_cap: args.mesh_route_cap,
    };

    let result = synthesizer::run_synthesis(&mut conn, &directory, &config).await?;

    // machine-readable result line for the scheduler
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
