//! # edgequake-doc2tts
//!
//! Prepare documents for Text-to-Speech narration using Gemini.
//!
//! ## Why this crate?
//!
//! Narrating a PDF straight out of a text extractor reads out running
//! headers, page numbers, footnote markers, table grids and digits the TTS
//! voice mispronounces. Instead this crate sends the whole document to a
//! large multimodal model with a precise cleaning instruction and a strict
//! JSON schema, and gets back an ordered list of titled chapters ready to be
//! spoken.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX / TXT / RTF / MD / HTML
//!  │
//!  ├─ 1. Input     validate path and format
//!  ├─ 2. Encode    whole document → bytes + MIME (base64 on the wire)
//!  ├─ 3. Compose   CleaningOptions + SplitStrategy → instruction text
//!  ├─ 4. Gateway   one schema-constrained Gemini request
//!  ├─ 5. Map       validate {chapters:[{title,content}]} → Vec<Chapter>
//!  └─ 6. Export    optional: 01_title.txt files or a zip archive
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2tts::{clean_document, CleaningConfig, CleaningOptions, Credential, SplitStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CleaningConfig::builder()
//!         .credential(Credential::new(std::env::var("GEMINI_API_KEY")?))
//!         .build()?;
//!     let options = CleaningOptions::default().with_pages(Some(1), Some(40));
//!     let doc = clean_document("book.pdf", &options, SplitStrategy::Auto, &config).await?;
//!     for chapter in &doc.chapters {
//!         println!("{}: {} chars", chapter.title, chapter.content.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2tts` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Testing without a model
//!
//! Inject any [`ModelGateway`] through [`CleaningConfig::gateway`]; the
//! library never reads the process environment, so tests need neither an
//! API key nor network access.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clean;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clean::{clean_bytes, clean_document, clean_sync, preview_instructions};
pub use config::{CleaningConfig, CleaningConfigBuilder, CleaningOptions, PageRange, SplitStrategy};
pub use error::{ChapterWarning, Doc2TtsError, ErrorKind};
pub use export::{chapter_file_name, write_chapters, write_zip, zip_chapters};
pub use output::{Chapter, CleanedDocument, CleaningStats};
pub use pipeline::contract::ResponseContract;
pub use pipeline::encode::EncodedDocument;
pub use pipeline::gateway::{
    Credential, GeminiGateway, HttpReply, ModelGateway, RawOutput, ReqwestTransport, Transport,
};
pub use progress::{CleaningProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::compose_instructions;
