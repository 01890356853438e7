//! Deterministic Sectioning
//!
//! Pure structural splitting of a post body: heading lines open new
//! sections, then each block re-splits on blank-line pairs. No NLP, no
//! semantics, no persistence. Spans are byte offsets into the post text
//! and never overlap.

use std::sync::OnceLock;

use regex::Regex;

use crate::lss::types::LssSection;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional bullet or hash run, then a capitalized phrase of at
        // least three characters, optionally ending with a colon.
        Regex::new(r"^(?:[-•*]+|#{1,6})?\s*\p{Lu}[^:\n]{2,}:?\s*$")
            .unwrap_or_else(|e| unreachable!("static heading regex: {e}"))
    })
}

/// Deterministically split a post into ordered structural sections.
pub fn split_into_sections(post_text: &str) -> Vec<LssSection> {
    let mut blocks: Vec<(usize, usize)> = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut cursor = 0usize;

    // Pass 1: heading-based splitting
    for line in post_text.split_inclusive('\n') {
        let stripped = line.trim();

        if !stripped.is_empty() && heading_re().is_match(stripped) {
            if let Some(start) = current_start.take() {
                if cursor > start {
                    blocks.push((start, cursor));
                }
            }
            current_start = Some(cursor);
        } else if current_start.is_none() {
            current_start = Some(cursor);
        }

        cursor += line.len();
    }
    if let Some(start) = current_start {
        if cursor > start {
            blocks.push((start, cursor));
        }
    }

    // Pass 2: paragraph-based splitting on blank-line pairs
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for (start, end) in blocks {
        let block_text = &post_text[start..end];

        if block_text.contains("\n\n") {
            let mut rel_cursor = 0usize;
            for para in block_text.split("\n\n") {
                let para = para.trim();
                if para.is_empty() {
                    continue;
                }

                let Some(found) = block_text[rel_cursor..].find(para) else {
                    continue;
                };
                let para_start = rel_cursor + found;

                spans.push((start + para_start, start + para_start + para.len()));
                rel_cursor = para_start + para.len();
            }
        } else {
            spans.push((start, end));
        }
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(ordinal, (start, end))| LssSection {
            ordinal,
            text: post_text[start..end].trim().to_string(),
            start_char: start,
            end_char: end,
        })
        .collect()
}
