use anyhow::Context;

use ideabot_github::{
    client::IssuesClient,
    config::BridgeConfig,
    cursor::CursorStore,
    ingest::{self, PagedSource},
};
use ideabot_telegram::TelegramApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ideabot_core::logging::init("ideabot-issues")?;

    let cfg = BridgeConfig::load().context("configuration")?;

    let api = TelegramApi::new(&cfg.bot_token, cfg.api.clone());
    let source = PagedSource::new(api.clone(), cfg.page_limit);
    let tracker = IssuesClient::new(
        &cfg.github_token,
        &cfg.github_repository,
        &cfg.github_api_base,
    )?;
    let store = CursorStore::new(cfg.cursor_file.clone());

    let report = ingest::run_once(&source, &api, &tracker, &store, &cfg.issue_label)
        .await
        .context("ingest run")?;

    println!(
        "[bridge] done: created={} skipped={}",
        report.created, report.skipped
    );

    Ok(())
}
