//! Main Entrypoint for the Grammar Quiz Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Loading prompt templates and building the content provider.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use gemini_content::GeminiBackend;
use secrecy::ExposeSecret;
use std::{net::SocketAddr, sync::Arc};
use thereis_api::{
    config::{Config, Provider},
    prompts::load_prompts,
    router::create_router,
    state::AppState,
};
use thereis_core::{
    GenerativeBackend, SceneContentProvider, content::GENERATE_SENTENCES_PROMPT,
    openai::OpenAIBackend, scene::RandomScene,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Content Provider ---
    let prompts = load_prompts(&config.prompts_path)?;
    let instructions = prompts
        .get(GENERATE_SENTENCES_PROMPT)
        .context("generate_sentences.md not found in prompts directory")?
        .clone();

    let backend: Arc<dyn GenerativeBackend> = match config.provider {
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .take()
                .context("GEMINI_API_KEY is not set")?;
            Arc::new(GeminiBackend::new(
                api_key,
                config.image_model.clone(),
                config.text_model.clone(),
            ))
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .take()
                .context("OPENAI_API_KEY is not set")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key.expose_secret())
                .with_api_base("https://api.openai.com/v1");
            Arc::new(OpenAIBackend::new(
                openai_config,
                config.image_model.clone(),
                config.text_model.clone(),
            ))
        }
    };

    let content_provider = Arc::new(SceneContentProvider::new(
        Arc::new(RandomScene),
        backend,
        instructions,
    ));

    let app_state = Arc::new(AppState {
        content_provider,
        round_timeout: config.generation_timeout,
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        image_model = %config.image_model,
        text_model = %config.text_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
