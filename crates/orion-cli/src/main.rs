use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orion_cli::{app::App, config::Config};
use orion_client::{AuthClient, ConversationSync, SendOrchestrator};
use orion_persist::{
    ConversationStore, FileStore, LocalSnapshot, RemoteRepository, SnapshotWriter, StoreHandle,
};
use orion_stream::HttpChatTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let client_config = config.client_config();
    tracing::info!("Starting Orion against {}", client_config.api_base_url);

    let kv = Arc::new(FileStore::open(&config.storage.path).await?);
    let snapshot = LocalSnapshot::new(kv);
    let session = snapshot.restore_session().await?;
    tracing::info!(authenticated = session.is_authenticated(), "Session restored");

    let store = StoreHandle::new(
        ConversationStore::with_welcome().with_title_max_chars(client_config.title_max_chars),
    );

    let transport = Arc::new(HttpChatTransport::new(client_config.clone())?);
    let repository = Arc::new(RemoteRepository::new(client_config.clone(), session.clone()));

    let sync = ConversationSync::new(
        store.clone(),
        session.clone(),
        snapshot.clone(),
        repository,
        client_config.page_size,
    );
    let auth = AuthClient::new(client_config.clone(), session.clone(), snapshot.clone());
    let orchestrator = SendOrchestrator::new(transport, store.clone(), session.clone(), client_config);

    if let Err(e) = sync.load_initial().await {
        tracing::warn!("Failed to load conversations: {}", e);
    }

    // Started after the initial load so the first write reflects loaded state
    let writer = SnapshotWriter::spawn(store, snapshot, session.clone());

    App::new(orchestrator, sync, auth, session).run().await?;

    writer.abort();
    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout belongs to the conversation
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
