use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_gate_bot::bot::schema;
use catalog_gate_bot::config::{BotConfig, LogFormat};
use catalog_gate_bot::gate::{SubscriptionGate, TelegramOracle};
use catalog_gate_bot::store::Store;
use catalog_gate_bot::wizard::WizardState;

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting catalog gate bot");

    let store = Arc::new(Store::load(&config.store_path, &config.admin_ids)?);
    info!(
        path = %store.path().display(),
        content = store.content_count(),
        admins = store.admin_count(),
        "Store loaded"
    );

    let bot = Bot::new(&config.bot_token);
    let oracle = Arc::new(TelegramOracle::new(bot.clone()));
    let gate = Arc::new(SubscriptionGate::new(oracle, config.failure_policy));
    info!(policy = ?gate.policy(), "Subscription gate ready");

    let bot = bot.parse_mode(ParseMode::Html);

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![store, gate, InMemStorage::<WizardState>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
