use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::InMemStorage,
    dptree::deps,
    prelude::*,
    update_listeners::webhooks,
};

use crate::{
    broadcast::prune_deliveries_spinloop,
    config::Config,
    dashboard,
    database::Database,
    dialogue::State,
    handlers::{generate_bot_commands, schema, App},
    llm::ChatClient,
};

pub async fn entry() {
    log::info!("Starting up...");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Bad configuration: {e}");
            return;
        }
    };

    let bot = Bot::new(&config.bot_token);

    if let Err(e) = bot.set_my_commands(generate_bot_commands()).await {
        log::warn!("Failed to set bot commands: {e}");
    }

    let database = match Database::new(&config.database_url).await {
        Ok(database) => database,
        Err(e) => {
            log::error!("Failed to open the database at {}: {e}", config.database_url);
            return;
        }
    };

    tokio::spawn(prune_deliveries_spinloop(Arc::downgrade(&database)));

    if let Some(addr) = config.dashboard_addr {
        let database = database.clone();
        tokio::spawn(async move {
            if let Err(e) = dashboard::serve(addr, database).await {
                log::error!("Dashboard died: {e}");
            }
        });
    }

    if config.llm.api_key.is_none() {
        log::info!("No chat completion API key, interviews are off.");
    }

    let webhook = config.webhook.clone();
    let app = Arc::new(App {
        database,
        llm: ChatClient::new(config.llm.clone()),
        config,
    });

    log::info!("Dispatching the dispatcher!");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .default_handler(|_| async {})
        .dependencies(deps![app, InMemStorage::<State>::new()])
        .enable_ctrlc_handler()
        .build();

    match webhook {
        Some(webhook) => {
            log::info!("Listening for webhook updates on {}", webhook.addr);
            let options = webhooks::Options::new(webhook.addr, webhook.url);
            let listener = match webhooks::axum(bot, options).await {
                Ok(listener) => listener,
                Err(e) => {
                    log::error!("Failed to set up the webhook: {e}");
                    return;
                }
            };
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => dispatcher.dispatch().await,
    }

    log::info!("it appears we have been bonked.");
}
