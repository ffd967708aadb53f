pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod reference;
pub mod upload_guard;

use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::analyzer::ReportAnalyzer;
use crate::pipeline::extraction::DocumentTextExtractor;
use crate::pipeline::narrative::{GeminiClient, NarrativeError, NarrativeProvider};
use crate::reference::ReferenceRegistry;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Narrative provider setup failed: {0}")]
    Provider(#[from] NarrativeError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire the standard registry and document extractor to `provider`.
pub fn build_analyzer(provider: Arc<dyn NarrativeProvider>) -> ReportAnalyzer {
    ReportAnalyzer::new(
        Arc::new(ReferenceRegistry::standard().clone()),
        Arc::new(DocumentTextExtractor),
        provider,
    )
}

/// Serve the API on `config.bind_addr` until Ctrl-C.
pub async fn serve(ctx: ApiContext, config: &AppConfig) -> Result<(), ServerError> {
    let mut server = api::start_server(ctx, config, config.bind_addr).await?;
    tracing::info!(addr = %server.local_addr(), "Listening for blood reports");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    server.shutdown();
    server.wait().await;
    Ok(())
}

pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn start() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    // The blocking HTTP client is built, and finally dropped, outside the runtime.
    let provider = GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.gemini_api_key,
        config.gemini_timeout_secs,
    )?;
    tracing::info!(model = %config.gemini_model, "Narrative provider ready");

    let ctx = ApiContext::new(build_analyzer(Arc::new(provider)), &config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    runtime.block_on(serve(ctx.clone(), &config))?;
    drop(runtime);
    drop(ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::narrative::MockNarrativeProvider;

    #[test]
    fn analyzer_uses_standard_registry() {
        let analyzer = build_analyzer(Arc::new(MockNarrativeProvider::new("")));
        assert_eq!(analyzer.registry().len(), ReferenceRegistry::standard().len());
        assert!(analyzer.registry().contains("Glucose"));
    }

    #[test]
    fn startup_errors_render_cause() {
        let err = StartupError::from(ConfigError::MissingVar("GEMINI_API_KEY"));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
