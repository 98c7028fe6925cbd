//! HTML chunking for the size-constrained translation engine.
//!
//! Documents are cut only right after a closing block tag, so every chunk the
//! engine sees is a run of complete blocks. Lengths are byte lengths, the same
//! unit the engine budget is expressed in.

use regex::Regex;
use std::sync::OnceLock;

/// Separator placed between translated chunks when merging
pub const CHUNK_SEPARATOR: &str = "\n";

fn block_end() -> &'static Regex {
    static BLOCK_END: OnceLock<Regex> = OnceLock::new();
    BLOCK_END.get_or_init(|| {
        Regex::new(r"(?i)</(?:p|div|li|h[1-6]|section|article)>").expect("valid block-end regex")
    })
}

/// Split `html` into ordered chunks of at most `max_len` bytes.
///
/// Small documents come back as a single untouched chunk. Larger ones are cut
/// after closing `p`, `div`, `li`, `h1`-`h6`, `section` and `article` tags and
/// the fragments are packed greedily. A fragment that alone exceeds `max_len`
/// becomes its own oversized chunk rather than being cut mid-markup.
///
/// Concatenating the result always yields `html` again.
pub fn split_chunks(html: &str, max_len: usize) -> Vec<&str> {
    if html.len() <= max_len {
        return vec![html];
    }

    let mut chunks = Vec::new();
    // Current chunk is always the contiguous range html[start..end]
    let mut start = 0;
    let mut end = 0;

    for fragment_end in fragment_ends(html) {
        let fragment_len = fragment_end - end;
        if end > start && (end - start) + fragment_len > max_len {
            chunks.push(&html[start..end]);
            start = end;
        }
        end = fragment_end;
    }

    if end > start {
        chunks.push(&html[start..end]);
    }

    chunks
}

/// End offsets of all boundary-delimited fragments, the last one being `html.len()`
fn fragment_ends(html: &str) -> Vec<usize> {
    let mut ends: Vec<usize> = block_end().find_iter(html).map(|m| m.end()).collect();
    if ends.last() != Some(&html.len()) {
        ends.push(html.len());
    }
    ends
}

/// Join translated chunks in document order
pub fn merge_chunks<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
