use std::collections::HashSet;

use crate::links::{is_valid_video_url, normalize_url};
use crate::queue::Queue;

/// Why a submitted line produced no job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not recognizable as a single-video link.
    Invalid,
    /// Same normalized URL already seen earlier in the batch.
    Duplicate,
}

/// One skipped line, reported back to the caller without aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// 1-based line number in the submitted text.
    pub line_no: usize,
    /// The line as submitted, trimmed.
    pub input: String,
    pub reason: SkipReason,
}

/// Result of one batch submission. `NoInput` (nothing but whitespace) is a
/// distinct outcome from a built-but-empty queue, which callers detect via
/// an empty `queue` alongside non-empty `diagnostics`.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    NoInput,
    Built {
        queue: Queue,
        diagnostics: Vec<LineDiagnostic>,
    },
}

/// Splits raw multi-line input into an ordered queue of unique, valid jobs.
///
/// Lines are trimmed; empty lines are dropped before anything else, so they
/// produce no diagnostic. Each candidate is normalized, then validated, then
/// deduplicated by its normalized form, keeping first-seen order. Invalid
/// and duplicate lines are collected individually and never abort the batch.
pub fn build_queue(raw_text: &str) -> BatchOutcome {
    if raw_text.trim().is_empty() {
        return BatchOutcome::NoInput;
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();
    let mut diagnostics = Vec::new();

    for (line_no, line) in raw_text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }
        let normalized = normalize_url(line);
        if !is_valid_video_url(&normalized) {
            diagnostics.push(LineDiagnostic {
                line_no,
                input: line.to_string(),
                reason: SkipReason::Invalid,
            });
            continue;
        }
        if !seen.insert(normalized.clone()) {
            diagnostics.push(LineDiagnostic {
                line_no,
                input: line.to_string(),
                reason: SkipReason::Duplicate,
            });
            continue;
        }
        urls.push(normalized);
    }

    BatchOutcome::Built {
        queue: Queue::from_urls(urls),
        diagnostics,
    }
}
