use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use promo_watcher::config;
use promo_watcher::store::{self, SqliteStorage, StoredState, TaskStorage};

#[derive(Parser, Debug)]
#[command(about = "Print or reset the stored watcher cursor")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Clear the cursor so the next run starts from the latest page
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = store::init_pool(&cfg.database_url()).await?;
    store::run_migrations(&pool).await?;
    let storage = SqliteStorage::new(pool, cfg.app.task_name.clone());

    if args.reset {
        storage.set(&StoredState::default()).await?;
        println!("Cursor for task '{}' cleared", storage.task());
        return Ok(());
    }

    println!("Task: {}", storage.task());
    match storage.raw().await? {
        Some((data, updated_at)) => {
            let state = storage.get().await?;
            println!("Document: {}", data);
            println!("Updated at: {}", updated_at);
            println!(
                "Last item: {}",
                state.last_item_id.as_deref().unwrap_or("none")
            );
        }
        None => println!("No stored document"),
    }
    Ok(())
}
