use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qr_bot::bot;
use qr_bot::config::BotConfig;
use qr_bot::localization::init_localization;
use qr_bot::transport::TelegramTransport;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qr_bot=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BotConfig::from_env()?;

    // Initialize logging
    init_tracing(config.json_logs);

    info!("Starting QR Telegram Bot");

    init_localization()?;

    let bot = Bot::new(&config.telegram_bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone(), &config.qr)?);
    let qr_config = Arc::new(config.qr.clone());

    let handler = dptree::entry().branch(Update::filter_message().endpoint(bot::message_handler));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![transport, qr_config])
        .enable_ctrlc_handler()
        .build();

    match &config.webhook_url {
        Some(url) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            let url = reqwest::Url::parse(url)?;
            info!(%addr, %url, "Bot initialized, receiving updates via webhook");

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            info!("Bot initialized, starting dispatcher with long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
