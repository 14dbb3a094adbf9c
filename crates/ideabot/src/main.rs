use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use ideabot_core::{config::Config, dispatch::Dispatcher, flood::FloodControl, poll::Poller};
use ideabot_telegram::TelegramApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ideabot_core::logging::init("ideabot")?;

    let cfg = Config::load().context("configuration")?;

    let api = Arc::new(TelegramApi::new(&cfg.bot_token, cfg.api.clone()));

    match api.get_me().await {
        Ok(me) => println!(
            "ideabot started: @{}",
            me.username.as_deref().unwrap_or("<unknown>")
        ),
        Err(e) => eprintln!("[main] getMe failed (continuing): {e}"),
    }
    println!("Admin chat: {}", cfg.admin_chat_id.0);

    let dispatcher = Dispatcher::new(
        cfg.admin_chat_id,
        api.clone(),
        FloodControl::new(cfg.flood),
    );
    let poller = Poller::new(api, dispatcher, cfg.poll);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("[main] shutdown requested");
                cancel.cancel();
            }
        });
    }

    poller.run(cancel).await;

    Ok(())
}
