// src/change_detector.rs
//! Compares two observations of the page and summarises what is new.

use std::collections::HashSet;
use std::fmt;

use crate::record::ContentRecord;

/// Lines this short (in chars) or shorter are labels/punctuation noise.
pub const MIN_LINE_CHARS: usize = 10;
/// Upper bound on bullet points in one summary.
pub const MAX_DIFF_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSummary {
    /// No prior state existed.
    FirstObservation,
    /// Fingerprint changed but no qualifying new line was found.
    Updated,
    /// New lines (at most [`MAX_DIFF_LINES`], each longer than [`MIN_LINE_CHARS`]).
    NewLines(Vec<String>),
}

impl ChangeSummary {
    pub fn is_first_observation(&self) -> bool {
        matches!(self, ChangeSummary::FirstObservation)
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSummary::FirstObservation => f.write_str("First observation of page content"),
            ChangeSummary::Updated => f.write_str("Content updated"),
            ChangeSummary::NewLines(lines) => {
                f.write_str("Key changes:")?;
                for l in lines {
                    write!(f, "\n• {l}")?;
                }
                Ok(())
            }
        }
    }
}

/// `None` means nothing to report: fingerprints match.
///
/// Lines are compared as a set, so a line that only moved is not reported,
/// while a line that moved *and* exists nowhere in the previous body is.
pub fn compare(previous: Option<&ContentRecord>, current: &ContentRecord) -> Option<ChangeSummary> {
    let Some(prev) = previous else {
        return Some(ChangeSummary::FirstObservation);
    };
    if prev.fingerprint == current.fingerprint {
        return None;
    }

    let old: HashSet<&str> = prev.lines().collect();
    let fresh: Vec<String> = current
        .lines()
        .filter(|l| !old.contains(l) && l.chars().count() > MIN_LINE_CHARS)
        .take(MAX_DIFF_LINES)
        .map(str::to_string)
        .collect();

    if fresh.is_empty() {
        Some(ChangeSummary::Updated)
    } else {
        Some(ChangeSummary::NewLines(fresh))
    }
}
