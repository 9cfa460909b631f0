mod builder;
mod edges;
mod publish;
mod validation;


use anyhow::Result;
use clap::Parser;
use taiga::graph_store::GraphStore;
use taiga::postgres_tools::make_async_pool;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding versioned graph artifacts and the active pointer.
    #[arg(long, env = "GRAPH_STORE_PATH", default_value = "graph_store")]
    graph_store: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let graph_store = GraphStore::new(&args.graph_store);

    println!("Initializing database connection");
    let pool = make_async_pool().await.map_err(|e| anyhow::anyhow!(e))?;
    let mut conn = pool.get().await?;

    let result = builder::run_graph_build(&mut conn, &graph_store).await?;

    // machine-readable result line for the scheduler
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
