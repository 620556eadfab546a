use std::sync::Arc;

use crate::config::Config;
use crate::docx::DocumentConverter;
use crate::extract::FieldExtractor;
use crate::render::MarkupRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Extractor with its compiled patterns and heading table.
    pub extractor: Arc<FieldExtractor>,
    /// Pluggable converter seam. Default: DocxConverter. Tests swap in stubs.
    pub converter: Arc<dyn DocumentConverter>,
    /// Pluggable renderer seam. Default: RasterRenderer over a system font.
    pub renderer: Arc<dyn MarkupRenderer>,
}
