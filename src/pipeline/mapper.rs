//! Result mapping: raw model text → validated, ordered [`Chapter`]s.
//!
//! This is the only place where "the model followed instructions" turns into
//! "the document model is well-formed". Checks are structural: valid JSON,
//! a non-empty `chapters` array, a string `title` and `content` in every
//! entry, a non-blank title. Text is never rewritten; titles and content
//! come out byte-for-byte as the model produced them.
//!
//! Schema-constrained generation should return bare JSON, but one outer
//! ```` ```json ```` fence is unwrapped if present since it carries no
//! content.

use crate::error::{ChapterWarning, Doc2TtsError};
use crate::output::Chapter;
use crate::pipeline::contract::ContractPayload;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Chapters in document order plus non-fatal findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedChapters {
    pub chapters: Vec<Chapter>,
    pub warnings: Vec<ChapterWarning>,
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*)\r?\n```$").unwrap());

/// Parse and validate raw model output.
///
/// # Errors
/// [`Doc2TtsError::SchemaViolation`] for malformed JSON, a missing or
/// non-array `chapters`, an empty array, an entry missing `title` or
/// `content` (or with non-string values), or a blank title.
pub fn map_chapters(raw: &str) -> Result<MappedChapters, Doc2TtsError> {
    let json = unwrap_fence(raw.trim());

    let payload: ContractPayload = serde_json::from_str(json).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            Doc2TtsError::schema(format!("output is not valid JSON: {e}"))
        } else {
            Doc2TtsError::schema(e.to_string())
        }
    })?;

    if payload.chapters.is_empty() {
        return Err(Doc2TtsError::schema("`chapters` must contain at least one entry"));
    }

    let mut chapters = Vec::with_capacity(payload.chapters.len());
    let mut warnings = Vec::new();

    for (index, entry) in payload.chapters.into_iter().enumerate() {
        if entry.title.trim().is_empty() {
            return Err(Doc2TtsError::schema(format!(
                "chapter {} has an empty `title`",
                index + 1
            )));
        }
        if entry.content.trim().is_empty() {
            warn!("Chapter {} ('{}') has no content", index + 1, entry.title);
            warnings.push(ChapterWarning::EmptyContent {
                index: index + 1,
                title: entry.title.clone(),
            });
        }
        chapters.push(Chapter {
            title: entry.title,
            content: entry.content,
        });
    }

    debug!("Mapped {} chapters ({} warnings)", chapters.len(), warnings.len());
    Ok(MappedChapters { chapters, warnings })
}

fn unwrap_fence(input: &str) -> &str {
    match RE_OUTER_FENCE.captures(input).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(raw: &str) -> String {
        match map_chapters(raw) {
            Err(Doc2TtsError::SchemaViolation { detail }) => detail,
            other => panic!("expected SchemaViolation for {raw:?}, got {other:?}"),
        }
    }

    #[test]
    fn preserves_order_and_text_verbatim() {
        let raw = r#"{"chapters":[
            {"title":"  Intro ","content":"Hello world.\n\nSecond paragraph.  "},
            {"title":"Middle","content":"Body."},
            {"title":"Conclusion","content":"The end."}
        ]}"#;
        let mapped = map_chapters(raw).unwrap();
        let titles: Vec<&str> = mapped.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["  Intro ", "Middle", "Conclusion"]);
        assert_eq!(mapped.chapters[0].content, "Hello world.\n\nSecond paragraph.  ");
        assert!(mapped.warnings.is_empty());
    }

    #[test]
    fn single_chapter_is_accepted() {
        let mapped =
            map_chapters(r#"{"chapters":[{"title":"Full Document","content":"All of it."}]}"#)
                .unwrap();
        assert_eq!(mapped.chapters.len(), 1);
        assert_eq!(mapped.chapters[0].title, "Full Document");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{"chapters":[{"title":"A","content":"x","page":3}],"language":"en"}"#;
        assert_eq!(map_chapters(raw).unwrap().chapters.len(), 1);
    }

    #[test]
    fn outer_json_fence_is_unwrapped() {
        let raw = "```json\n{\"chapters\":[{\"title\":\"A\",\"content\":\"b\"}]}\n```";
        let mapped = map_chapters(raw).unwrap();
        assert_eq!(mapped.chapters[0].content, "b");
    }

    #[test]
    fn empty_content_is_a_warning() {
        let raw = r#"{"chapters":[{"title":"A","content":"text"},{"title":"Blank","content":""}]}"#;
        let mapped = map_chapters(raw).unwrap();
        assert_eq!(mapped.chapters.len(), 2);
        assert_eq!(
            mapped.warnings,
            vec![ChapterWarning::EmptyContent {
                index: 2,
                title: "Blank".into()
            }]
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(violation("not json at all").contains("not valid JSON"));
        let truncated = r#"{"chapters":[{"title":"A","content":"b"}"#;
        assert!(violation(truncated).contains("not valid JSON"));
        violation("");
    }

    #[test]
    fn missing_chapters_key_is_rejected() {
        assert!(violation(r#"{"sections":[]}"#).contains("chapters"));
    }

    #[test]
    fn non_array_chapters_is_rejected() {
        violation(r#"{"chapters":"Intro"}"#);
        violation(r#"{"chapters":null}"#);
    }

    #[test]
    fn empty_chapters_array_is_rejected() {
        assert!(violation(r#"{"chapters":[]}"#).contains("at least one"));
    }

    #[test]
    fn entry_missing_title_or_content_is_rejected() {
        assert!(violation(r#"{"chapters":[{"content":"b"}]}"#).contains("title"));
        assert!(violation(r#"{"chapters":[{"title":"A"}]}"#).contains("content"));
        violation(r#"{"chapters":[{"title":"A","content":"b"},{"title":"B"}]}"#);
    }

    #[test]
    fn non_string_fields_are_rejected() {
        violation(r#"{"chapters":[{"title":1,"content":"b"}]}"#);
        violation(r#"{"chapters":[{"title":"A","content":null}]}"#);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(violation(r#"{"chapters":[{"title":"  ","content":"b"}]}"#).contains("title"));
    }
}
