use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use cardcrafter_core::{
    config::{generation_config_from_env_values, GenerationEnvValues},
    constants::{DEFAULT_DATA_DIR, DEFAULT_IDENTITY_BASE_URL},
    CoreConfig, FileFlashcardStore, FileUserProfileStore, FlashcardGenerationService,
    IdentityConfig, IdentityToolkitClient, OpenAiCompletionClient,
};

/// Main entry point for the CardCrafter server
///
/// Serves the REST API (with OpenAPI/Swagger UI) until Ctrl+C or SIGTERM.
///
/// # Environment Variables
/// - `CARDCRAFTER_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `FLASHCARD_DATA_DIR`: Directory for flashcard and profile storage (default: "flashcard_data")
/// - `OPENAI_API_KEY`: Completion API key (required)
/// - `OPENAI_MODEL`, `OPENAI_BASE_URL`, `OPENAI_JSON_MODE`, `OPENAI_TIMEOUT_SECS`: completion settings
/// - `FLASHCARD_CATEGORY_POLICY`: `drop` (default) or `reject`
/// - `IDENTITY_API_KEY`: Identity Toolkit web API key (required)
/// - `IDENTITY_BASE_URL`: Identity Toolkit endpoint
/// - `BILLING_PORTAL_URL`: Customer portal link for `/subscription` (optional)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is missing or invalid,
/// - the data directory does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cardcrafter=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("CARDCRAFTER_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let data_dir = std::env::var("FLASHCARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let data_path = Path::new(&data_dir);
    if !data_path.exists() {
        anyhow::bail!("Flashcard data directory does not exist: {}", data_path.display());
    }

    let generation = generation_config_from_env_values(GenerationEnvValues {
        api_key: std::env::var("OPENAI_API_KEY").ok(),
        model: std::env::var("OPENAI_MODEL").ok(),
        base_url: std::env::var("OPENAI_BASE_URL").ok(),
        json_mode: std::env::var("OPENAI_JSON_MODE").ok(),
        timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS").ok(),
        category_policy: std::env::var("FLASHCARD_CATEGORY_POLICY").ok(),
    })?;

    let cfg = CoreConfig::new(
        data_path.to_path_buf(),
        generation,
        std::env::var("BILLING_PORTAL_URL").ok(),
    )?;

    let identity_cfg = IdentityConfig::new(
        std::env::var("IDENTITY_API_KEY")
            .map_err(|_| anyhow::anyhow!("IDENTITY_API_KEY is not set"))?,
        std::env::var("IDENTITY_BASE_URL").unwrap_or_else(|_| DEFAULT_IDENTITY_BASE_URL.into()),
    )?;

    tracing::info!(
        model = cfg.generation().model(),
        category_policy = ?cfg.generation().category_policy(),
        "++ Loaded configuration"
    );

    let completion = Arc::new(OpenAiCompletionClient::new(cfg.generation())?);
    let state = AppState {
        generation: Arc::new(FlashcardGenerationService::new(completion, cfg.generation())),
        identity: Arc::new(IdentityToolkitClient::new(&identity_cfg)?),
        flashcards: Arc::new(FileFlashcardStore::new(&cfg)),
        profiles: Arc::new(FileUserProfileStore::new(&cfg)),
        billing_portal_url: cfg.billing_portal_url().map(Arc::from),
    };

    tracing::info!("++ Starting CardCrafter REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- CardCrafter REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
