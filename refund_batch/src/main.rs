use dotenvy::dotenv;
use log::*;
use refund_batch::{
    cli::print_usage_if_requested,
    config::BatchConfig,
    runner::{run_batch, shutdown_on_signal},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if print_usage_if_requested() {
        return;
    }
    let config = BatchConfig::from_env_or_default();

    info!(
        "🚀️ Starting refund batch. Database: {}, {} workers, batches of {}, interval {}s",
        config.database_url,
        config.processor.max_workers(),
        config.processor.batch_size(),
        config.processing_interval.as_secs()
    );
    let cancel = CancellationToken::new();
    let _signals = shutdown_on_signal(cancel.clone());
    match run_batch(config, cancel).await {
        Ok(()) => info!("🚀️ Refund batch completed successfully"),
        Err(e) => {
            error!("🚀️ {e}");
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
