//! Instruction composition for the TTS cleaning call.
//!
//! Every sentence the model ever sees is assembled here from
//! [`CleaningOptions`] and [`SplitStrategy`] by plain string building:
//! no I/O, no clock, no randomness. The same inputs always produce the same
//! instruction, so unit tests can pin each clause without a model.
//!
//! The composed instruction has a fixed layout:
//!
//! ```text
//! preamble (role)
//! range clause         (only when a page bound is set)
//! 1. cleaning clause   (4 toggled rules + fixed normalisation rules)
//! 2. splitting clause  (auto-detect chapters | single "Full Document")
//! output requirement   (pure JSON matching the schema)
//! ```

use crate::config::{CleaningOptions, PageRange, SplitStrategy};

/// Title of the only chapter requested under [`SplitStrategy::None`].
pub const FULL_DOCUMENT_TITLE: &str = "Full Document";

/// Role description placed before every instruction.
///
/// Replaced by [`crate::config::CleaningConfig::system_prompt`] when set.
pub const DEFAULT_PREAMBLE: &str = "You are an expert text processing engine designed to prepare document content for Text-to-Speech (TTS) applications. Your goal is to create clean, structured, and easily narratable text.\n\nI have provided a file. Please perform the following tasks:";

/// Closing requirement; the response schema is attached separately.
pub const OUTPUT_REQUIREMENT: &str = "Your final output MUST be a valid JSON object matching the provided schema. Do not include any text or markdown formatting outside of the JSON object.";

pub const REMOVE_HEADERS_FOOTERS: &str = "Identify and remove any repeating headers and footers.";
pub const KEEP_HEADERS_FOOTERS: &str = "Keep headers and footers.";
pub const REMOVE_PAGE_NUMBERS: &str = "Remove all page numbering.";
pub const KEEP_PAGE_NUMBERS: &str = "Keep page numbering.";
pub const NORMALIZE_WHITESPACE: &str = "Normalize all whitespace. This means removing extra spaces, tabs, and line breaks to create a smooth, continuous text flow. Paragraphs should be separated by a single newline.";
pub const KEEP_WHITESPACE: &str = "Preserve original whitespace as much as possible.";
pub const LINEARIZE_TABLES: &str = "Convert any tables into a linear, readable paragraph format. For example, a row with 'Name: John, Age: 30' should become 'Name: John, Age: 30.'.";
pub const KEEP_TABLES: &str = "Attempt to preserve table structure or represent it clearly.";

/// Rules applied on every call regardless of options.
pub const FIXED_RULES: [&str; 6] = [
    "Remove superfluous artifacts like standalone URLs or footnote markers from the main body text.",
    "Remove all parentheses ().",
    "Remove all quotation marks (\"\").",
    "Remove all hyphens (-). If a hyphen breaks a word at the end of a line, the word should be rejoined.",
    "Convert all numerical digits into their full-text word equivalents in the document's language. For example, '1,645' should become 'one thousand six hundred forty-five' and 'Chapter 10' should become 'Chapter ten'.",
    "Correct any obvious OCR errors if the source is an image-based document.",
];

pub const SPLIT_AUTO: &str = "Analyze the document's structure (e.g., chapters, sections with clear headings) and split the cleaned text into logical chapters. Provide a concise, descriptive title for each chapter.";

/// Compose the full instruction with the built-in preamble.
pub fn compose_instructions(options: &CleaningOptions, strategy: SplitStrategy) -> String {
    compose_with_preamble(DEFAULT_PREAMBLE, options, strategy)
}

/// Compose the full instruction with a caller-supplied preamble.
pub fn compose_with_preamble(
    preamble: &str,
    options: &CleaningOptions,
    strategy: SplitStrategy,
) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(preamble.trim_end());
    out.push_str("\n\n");

    if let Some(range) = range_clause(options.page_range()) {
        out.push_str(&range);
        out.push_str("\n\n");
    }

    out.push_str("1. **Analyze and Clean the Text:** Apply the following cleaning rules to the specified page range:\n");
    out.push_str(&cleaning_clause(options));
    out.push('\n');

    out.push_str("2. **Structure the Output:** Based on this instruction: ");
    out.push_str(&splitting_clause(strategy));
    out.push_str("\n\n");

    out.push_str(OUTPUT_REQUIREMENT);
    out
}

/// Bullet list of cleaning rules: the four toggled rules in fixed order,
/// then [`FIXED_RULES`].
pub fn cleaning_clause(options: &CleaningOptions) -> String {
    let toggled = [
        pick(options.remove_headers_footers, REMOVE_HEADERS_FOOTERS, KEEP_HEADERS_FOOTERS),
        pick(options.remove_page_numbers, REMOVE_PAGE_NUMBERS, KEEP_PAGE_NUMBERS),
        pick(options.normalize_whitespace, NORMALIZE_WHITESPACE, KEEP_WHITESPACE),
        pick(options.linearize_tables, LINEARIZE_TABLES, KEEP_TABLES),
    ];

    toggled
        .iter()
        .chain(FIXED_RULES.iter())
        .map(|rule| format!("   - {rule}\n"))
        .collect()
}

/// Chapter partitioning instruction.
pub fn splitting_clause(strategy: SplitStrategy) -> String {
    match strategy {
        SplitStrategy::Auto => SPLIT_AUTO.to_string(),
        SplitStrategy::None => format!(
            "Process the entire document as a single, unified text block. Return exactly one chapter. The title for this single chapter should be '{FULL_DOCUMENT_TITLE}'."
        ),
    }
}

/// Page-range instruction, or `None` when the whole document is processed.
pub fn range_clause(range: PageRange) -> Option<String> {
    match range {
        PageRange::All => None,
        PageRange::Between(start, end) => Some(format!(
            "IMPORTANT: Focus your processing ONLY on the content of pages {start} to {end} of the provided document. Ignore all content outside this page range."
        )),
        PageRange::From(start) => Some(format!(
            "IMPORTANT: Focus your processing ONLY on the content from page {start} onward, to the end of the provided document. Ignore all content before this page."
        )),
        PageRange::UpTo(end) => Some(format!(
            "IMPORTANT: Focus your processing ONLY on the content from the beginning of the document up to page {end}. Ignore all content after this page."
        )),
    }
}

fn pick(flag: bool, on: &'static str, off: &'static str) -> &'static str {
    if flag {
        on
    } else {
        off
    }
}
