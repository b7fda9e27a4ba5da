//! Pipeline stages for document cleaning.
//!
//! Each submodule implements exactly one step. Only [`gateway`] performs
//! network I/O; everything else is testable offline.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ gateway ──▶ mapper
//! (path)    (bytes +   (Gemini,    (contract
//!            MIME)      1 call)     validation)
//!                          ▲
//!                       contract
//! ```
//!
//! 1. [`input`]   : validate the path, extension and readability
//! 2. [`encode`]  : buffer the whole document and declare its media type
//! 3. [`contract`]: the `{chapters: [{title, content}]}` response schema
//! 4. [`gateway`] : one schema-constrained `generateContent` request
//! 5. [`mapper`]  : parse, validate and order the returned chapters

pub mod contract;
pub mod encode;
pub mod gateway;
pub mod input;
pub mod mapper;
