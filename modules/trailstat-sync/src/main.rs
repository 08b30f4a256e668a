use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use trailstat_sync::browser::ChromeLauncher;
use trailstat_sync::config::Config;
use trailstat_sync::logging;
use trailstat_sync::notify::Notifier;
use trailstat_sync::runner::SyncRun;
use trailstat_sync::store::CrmRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging: stdout, plus daily files when LOG_DIRECTORY is set
    let filter = EnvFilter::from_default_env()
        .add_directive("trailstat_sync=info".parse()?)
        .add_directive("crm_client=info".parse()?)
        .add_directive("browser_client=info".parse()?);
    let file_layer = match &config.log_directory {
        Some(dir) => {
            let appender = logging::file_appender(dir, config.log_max_files)?;
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    info!("Trailstat sync starting...");
    config.log_keys();

    let store = CrmRecordStore::new(&config.crm);
    let launcher = ChromeLauncher::new(config.chrome_bin.clone());
    let notifier = Notifier::from_config(&config);

    let run = SyncRun::new(config, Box::new(store), Box::new(launcher), notifier);
    match run.run().await {
        Ok(stats) => info!("Trailstat sync finished. {stats}"),
        // Already notified; the run ends without a failing exit status
        Err(e) if !e.is_fatal() => error!(error = %e, "Trailstat sync aborted"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
