use std::sync::Arc;

use anyhow::Context;
use log::info;

use chat_poll::api::RestHost;
use chat_poll::config::Config;
use chat_poll::handlers::PollApp;
use chat_poll::scheduler::{NextPollProcessor, TokioScheduler};
use chat_poll::sequencer::LivePollSequencer;
use chat_poll::store::MemoryStore;
use chat_poll::websocket::run_websocket;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    info!("Starting {} against {}", config.bot_name, config.server_url);

    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(RestHost::new(&config));
    let scheduler = Arc::new(TokioScheduler::new());
    let sequencer = Arc::new(LivePollSequencer::new(
        store.clone(),
        host.clone(),
        scheduler.clone(),
    ));
    scheduler.register_processors(vec![Arc::new(NextPollProcessor::new(
        sequencer.clone(),
        host.clone(),
    ))])?;

    let app = Arc::new(PollApp::new(store, host, sequencer));
    let mut handle = run_websocket(&config.websocket_url(), &config.bot_name, &config.bot_token, app)
        .await
        .context("failed to connect to the chat host")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = handle.closed() => {
            info!("Connection closed");
            return Ok(());
        }
    }
    handle.shutdown();
    Ok(())
}
