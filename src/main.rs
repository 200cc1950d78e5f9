//! Gemini Chat - minimal chat page backed by the Gemini API
//!
//! Serves a single chat page, keeps one persisted conversation, and relays
//! every turn to the Generative Language `generateContent` endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod routes;
mod storage;

use config::Config;
use conversation::ConversationStore;
use crate::core::ChatEngine;
use providers::Provider;
use storage::{InMemoryStore, KeyValueStore, SqliteStore, StorageKind};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chat_engine: Arc<ChatEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; requests will be rejected by the API");
    }

    let storage: Arc<dyn KeyValueStore> = match config.storage {
        StorageKind::Sqlite => {
            let db_path = config.data_dir.join("chat.db");
            tracing::info!("Using SQLite storage at {}", db_path.display());
            Arc::new(SqliteStore::new(&db_path).await?)
        }
        StorageKind::Memory => {
            tracing::info!("Using in-memory storage; history is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };
    let store = ConversationStore::open(
        storage,
        config.instruction.clone(),
        config.instruction_policy,
    )
    .await;
    tracing::info!(
        messages = store.history().len(),
        policy = %store.policy(),
        "Conversation loaded"
    );

    let provider = Provider::from_config(&config)?;
    let chat_engine = Arc::new(ChatEngine::new(store, provider));

    let state = AppState {
        config,
        chat_engine,
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Chat server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
