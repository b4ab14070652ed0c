use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dealwatch::bot::TelegramBot;
use dealwatch::config::{AppConfig, LoggingConfig};
use dealwatch::plugins::notifiers::TelegramNotifier;
use dealwatch::scraper::WebScraper;
use dealwatch::{PriceCheckScheduler, ProductManager, ProductStore};

#[derive(Debug, Parser)]
#[command(name = "dealwatch", version, about = "Telegram price-drop tracker")]
struct Cli {
    /// Extra configuration file layered over config/default
    #[arg(short, long)]
    config: Option<String>,

    /// Override the JSON file holding every watchlist
    #[arg(long)]
    data_file: Option<String>,

    /// Run a single price check over every tracked product, then exit
    #[arg(long)]
    check_once: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("dealwatch={}", logging.level).parse()?);

    let Some(directory) = &logging.directory else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let appender = tracing_appender::rolling::daily(directory, "dealwatch.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env(cli.config.as_deref());
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    let _log_guard = init_tracing(&logging)?;

    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {}", e);
            return Err(e.into());
        }
    };
    if let Some(data_file) = cli.data_file {
        config.storage.data_file = data_file;
    }

    info!("Starting dealwatch...");

    let store = ProductStore::load(&config.storage.data_file).into_shared();
    let fetcher = Arc::new(WebScraper::new(&config.scraper)?);
    let telegram = Arc::new(TelegramNotifier::new(&config.telegram)?);
    let product_manager = Arc::new(ProductManager::new(
        Arc::clone(&store),
        fetcher,
        telegram.clone(),
        &config,
    ));
    let mut scheduler =
        PriceCheckScheduler::new(Arc::clone(&product_manager), config.scheduler.clone()).await?;

    if cli.check_once {
        if let Some(report) = scheduler.run_cycle_now().await {
            info!("{}", serde_json::to_string(&report)?);
        }
        return Ok(());
    }

    let me = match telegram.get_me().await {
        Ok(me) => me,
        Err(e) => {
            error!("FATAL: could not authenticate with Telegram: {}", e);
            return Err(e.into());
        }
    };
    info!("Authenticated as @{}", me.username.as_deref().unwrap_or("unknown"));

    scheduler.start().await?;

    let bot = TelegramBot::new(
        telegram,
        product_manager,
        config.telegram.poll_timeout,
        me.username,
    );
    bot.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await;

    info!("Shutting down...");
    scheduler.shutdown().await?;
    store.lock().await.save()?;

    Ok(())
}
