mod config;
mod docx;
mod errors;
mod extract;
mod pipeline;
mod redact;
mod render;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::docx::DocxConverter;
use crate::extract::{ExtractorConfig, FieldExtractor};
use crate::render::{MarkupRenderer, RasterRenderer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HealthFront API v{}", env!("CARGO_PKG_VERSION"));

    // The renderer probes fonts at startup so a missing font surfaces in the
    // logs immediately, not on the first upload.
    let renderer: Arc<dyn MarkupRenderer> =
        match RasterRenderer::from_system_fonts(config.font_path.as_deref()) {
            Ok(renderer) => Arc::new(renderer),
            Err(e) => {
                warn!("redacted previews unavailable: {e}");
                Arc::new(UnavailableRenderer)
            }
        };

    let state = AppState {
        config: config.clone(),
        extractor: Arc::new(FieldExtractor::new(ExtractorConfig::default())),
        converter: Arc::new(DocxConverter),
        renderer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Stand-in when no usable font exists; every render reports the failure so
/// uploads still return their extracted fields.
struct UnavailableRenderer;

impl MarkupRenderer for UnavailableRenderer {
    fn render_png(&self, _markup: &str) -> Result<Vec<u8>, render::RenderError> {
        Err(render::RenderError::FontUnavailable)
    }
}
