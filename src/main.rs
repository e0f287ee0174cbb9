use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use promo_watcher::config;
use promo_watcher::mail::SendgridMailer;
use promo_watcher::store::{self, SqliteStorage};
use promo_watcher::timeline::TwitterTimeline;
use promo_watcher::watcher::{self, WatchSettings};

#[derive(Debug, Parser)]
#[command(author, version, about = "Email the newest promotional tweet of a watched account")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Keep running, one invocation every `app.interval_seconds`
    #[arg(long)]
    watch: bool,
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
    let timeline = TwitterTimeline::from_config(&cfg)?;
    let mailer = SendgridMailer::from_config(&cfg)?;
    let settings = WatchSettings::from_config(&cfg)?;

    if !args.watch {
        return match watcher::run(&storage, &timeline, &mailer, &settings).await {
            Ok(outcome) => {
                info!(%outcome, "invocation finished");
                println!("{}", outcome);
                Ok(())
            }
            Err(err) => {
                error!(?err, "invocation failed");
                Err(err)
            }
        };
    }

    let interval = Duration::from_secs(cfg.app.interval_seconds);
    info!(
        screen_name = %cfg.timeline.screen_name,
        interval_seconds = cfg.app.interval_seconds,
        "starting promo watcher"
    );
    loop {
        match watcher::run(&storage, &timeline, &mailer, &settings).await {
            Ok(outcome) => info!(%outcome, "invocation finished"),
            Err(err) => error!(?err, "invocation failed"),
        }
        tokio::time::sleep(interval).await;
    }
}
