use std::sync::Arc;

use chat_relay::auth::TokenCodec;
use chat_relay::config::AppConfig;
use chat_relay::llm::{GeminiClient, OpenAiClient, Responder, ResponderConfig};
use chat_relay::message_db::{MessageDbClient, MessageDbConfig};
use chat_relay::routes::configure_routes;
use chat_relay::state::AppState;
use chat_relay::store::{InMemoryStore, MessageDbStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let codec = TokenCodec::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.jwt_expiration_hours),
    );

    let state = match &config.database_url {
        Some(url) => {
            let client = MessageDbClient::new(MessageDbConfig::from_connection_string(url)?).await?;
            let store = Arc::new(MessageDbStore::new(client));
            let responder = build_responder(&config, store.clone())?;
            AppState::new(codec, store.clone(), store, responder, "message_db")
        }
        None => {
            warn!("DATABASE_URL is not set; history will not survive a restart");
            let store = Arc::new(InMemoryStore::new());
            let responder = build_responder(&config, store.clone())?;
            AppState::new(codec, store.clone(), store, responder, "memory")
        }
    };

    let addr = config.bind_addr();
    info!(%addr, store = state.backend, "starting chat relay");
    warp::serve(configure_routes(state)).run(addr).await;

    Ok(())
}

fn build_responder(
    config: &AppConfig,
    store: Arc<dyn chat_relay::store::MessageStore>,
) -> Result<Responder, Box<dyn std::error::Error>> {
    let mut responder = Responder::new(store, ResponderConfig::default());

    if let Some(openai) = &config.openai {
        let client = OpenAiClient::new(&openai.api_key, &openai.model, &openai.base_url)?;
        info!(model = %openai.model, "primary provider: openai");
        responder = responder.with_primary(Arc::new(client));
    }
    if let Some(gemini) = &config.gemini {
        let client = GeminiClient::new(&gemini.api_key, &gemini.model, &gemini.base_url)?;
        info!(model = %gemini.model, "fallback provider: gemini");
        responder = responder.with_fallback(Arc::new(client));
    }
    if config.openai.is_none() && config.gemini.is_none() {
        warn!("no AI provider configured; replies will ask for API keys");
    }

    Ok(responder)
}
