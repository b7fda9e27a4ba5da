//! Cleaning entry points.
//!
//! One call is one model round-trip:
//!
//! ```text
//! resolve input ─▶ resolve gateway ─▶ encode ─▶ compose ─▶ invoke ─▶ map
//! ```
//!
//! The gateway is resolved before the document is read so a missing API key
//! is reported instantly, not after buffering a 50 MB PDF. Each call owns its
//! document, instruction and result; nothing is shared between calls, so
//! callers may run several concurrently on one config.

use crate::config::{CleaningConfig, CleaningOptions, SplitStrategy};
use crate::error::Doc2TtsError;
use crate::output::{CleanedDocument, CleaningStats};
use crate::pipeline::contract::ResponseContract;
use crate::pipeline::encode::{self, EncodedDocument};
use crate::pipeline::gateway::{GeminiGateway, ModelGateway};
use crate::pipeline::{input, mapper};
use crate::prompts::{compose_with_preamble, DEFAULT_PREAMBLE};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Clean a document file and split it into chapters.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `path`    : local PDF, DOCX, TXT, RTF, MD or HTML file
/// * `options` : cleaning directives and page range
/// * `strategy`: chapter splitting strategy
/// * `config`  : model, credential, timeout
///
/// # Errors
/// Any [`Doc2TtsError`]; on error no chapters are returned.
pub async fn clean_document(
    path: impl AsRef<Path>,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
) -> Result<CleanedDocument, Doc2TtsError> {
    let total_start = Instant::now();
    let path = path.as_ref();
    info!("Starting cleaning: {}", path.display());

    let result = clean_path(path, options, strategy, config, total_start).await;
    report_error(config, result)
}

/// Clean an in-memory document.
///
/// Useful when the bytes come from an upload or a database rather than the
/// file system. `media_type` must be the document's MIME type, e.g.
/// `application/pdf`.
pub async fn clean_bytes(
    bytes: Vec<u8>,
    media_type: &str,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
) -> Result<CleanedDocument, Doc2TtsError> {
    let total_start = Instant::now();
    info!("Starting cleaning: {} bytes of {}", bytes.len(), media_type);

    let result = clean_in_memory(bytes, media_type, options, strategy, config, total_start).await;
    report_error(config, result)
}

/// Synchronous wrapper around [`clean_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn clean_sync(
    path: impl AsRef<Path>,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
) -> Result<CleanedDocument, Doc2TtsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2TtsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(clean_document(path, options, strategy, config))
}

/// The instruction a call with these settings would send.
///
/// Needs no credential and performs no I/O.
pub fn preview_instructions(
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
) -> String {
    let preamble = config.system_prompt.as_deref().unwrap_or(DEFAULT_PREAMBLE);
    compose_with_preamble(preamble, options, strategy)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Injected gateway first; otherwise a Gemini gateway from the configured
/// credential. Fails with `AuthError` when neither is usable.
fn resolve_gateway(config: &CleaningConfig) -> Result<Arc<dyn ModelGateway>, Doc2TtsError> {
    if let Some(ref gateway) = config.gateway {
        return Ok(Arc::clone(gateway));
    }

    match config.credential {
        Some(ref c) if !c.is_blank() => {}
        _ => {
            return Err(Doc2TtsError::AuthError {
                detail: "no API key configured. Set GEMINI_API_KEY or pass --api-key.".into(),
            })
        }
    }

    Ok(Arc::new(GeminiGateway::from_config(config)?))
}

async fn clean_path(
    path: &Path,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
    total_start: Instant,
) -> Result<CleanedDocument, Doc2TtsError> {
    let resolved = input::resolve_input(path)?;
    let gateway = resolve_gateway(config)?;
    let document = encode::encode_file(&resolved).await?;
    run(gateway.as_ref(), document, options, strategy, config, total_start).await
}

async fn clean_in_memory(
    bytes: Vec<u8>,
    media_type: &str,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
    total_start: Instant,
) -> Result<CleanedDocument, Doc2TtsError> {
    let gateway = resolve_gateway(config)?;
    let document = encode::encode_bytes(bytes, media_type)?;
    run(gateway.as_ref(), document, options, strategy, config, total_start).await
}

async fn run(
    gateway: &dyn ModelGateway,
    document: EncodedDocument,
    options: &CleaningOptions,
    strategy: SplitStrategy,
    config: &CleaningConfig,
    total_start: Instant,
) -> Result<CleanedDocument, Doc2TtsError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_encoded(document.len(), &document.media_type);
    }

    let instruction = preview_instructions(options, strategy, config);
    let contract = ResponseContract::chapters();
    debug!("Instruction: {} chars, strategy {:?}", instruction.len(), strategy);

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(gateway.model());
    }

    let request_start = Instant::now();
    let raw = gateway.invoke(&instruction, &document, &contract).await?;
    let request_duration_ms = request_start.elapsed().as_millis() as u64;

    let mapped = mapper::map_chapters(&raw.text)?;
    if mapped.chapters.is_empty() {
        return Err(Doc2TtsError::EmptyResult);
    }

    let stats = CleaningStats {
        source: document.file_name.clone(),
        media_type: document.media_type.clone(),
        input_bytes: document.len(),
        model: gateway.model().to_string(),
        chapter_count: mapped.chapters.len(),
        prompt_tokens: raw.prompt_tokens,
        output_tokens: raw.output_tokens,
        request_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Cleaning complete: {} chapters in {}ms",
        stats.chapter_count, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(mapped.chapters.len());
    }

    Ok(CleanedDocument {
        chapters: mapped.chapters,
        warnings: mapped.warnings,
        stats,
    })
}

fn report_error(
    config: &CleaningConfig,
    result: Result<CleanedDocument, Doc2TtsError>,
) -> Result<CleanedDocument, Doc2TtsError> {
    if let (Err(e), Some(cb)) = (&result, &config.progress_callback) {
        cb.on_error(&e.to_string());
    }
    result
}
