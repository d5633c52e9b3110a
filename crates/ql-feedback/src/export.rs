//! Filtered export of the feedback ledger as JSON Lines.
//!
//! Each exported line is one [`FeedbackEntry`] in its ledger wire format, so
//! an export can be fed to offline analysis or used to seed another ledger.

use std::io::Write;

use chrono::{DateTime, Utc};
use ql_core::core::Style;

use crate::models::FeedbackEntry;
use crate::store::LedgerError;

#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub style: Option<Style>,
    /// Inclusive lower bound on the entry timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the entry timestamp.
    pub until: Option<DateTime<Utc>>,
    pub min_rating: Option<f64>,
}

impl ExportFilter {
    pub fn matches(&self, entry: &FeedbackEntry) -> bool {
        if let Some(style) = &self.style {
            if &entry.style != style {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp >= until {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if entry.human_rating < min {
                return false;
            }
        }
        true
    }
}

/// Entries passing `filter`, in ledger order.
pub fn export_entries<'a>(
    entries: &'a [FeedbackEntry],
    filter: &ExportFilter,
) -> Vec<&'a FeedbackEntry> {
    entries.iter().filter(|e| filter.matches(e)).collect()
}

/// Writes matching entries as one JSON object per line. Returns the number
/// of lines written.
pub fn export_to_jsonl<W: Write>(
    entries: &[FeedbackEntry],
    filter: &ExportFilter,
    mut out: W,
) -> Result<usize, LedgerError> {
    let mut written = 0;
    for entry in export_entries(entries, filter) {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use ql_core::core::VersionId;

    use super::*;

    fn entry(id: &str, style: &str, day: u32, rating: f64) -> FeedbackEntry {
        FeedbackEntry {
            version_id: VersionId::new(id),
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap(),
            content_length: 10,
            style: Style::new(style),
            ai_scores: BTreeMap::new(),
            human_rating: rating,
            human_feedback: None,
            iteration_count: 1,
        }
    }

    fn ledger() -> Vec<FeedbackEntry> {
        vec![
            entry("a", "engaging", 1, 0.2),
            entry("b", "concise", 2, 0.9),
            entry("c", "engaging", 3, 0.8),
            entry("d", "engaging", 4, 0.6),
        ]
    }

    fn ids(entries: &[&FeedbackEntry]) -> Vec<String> {
        entries.iter().map(|e| e.version_id.to_string()).collect()
    }

    #[test]
    fn test_default_filter_exports_everything() {
        let entries = ledger();
        let exported = export_entries(&entries, &ExportFilter::default());
        assert_eq!(ids(&exported), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_filters_combine() {
        let entries = ledger();
        let filter = ExportFilter {
            style: Some(Style::new("engaging")),
            since: Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()),
            until: Some(Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()),
            min_rating: Some(0.5),
        };

        let exported = export_entries(&entries, &filter);
        assert_eq!(ids(&exported), vec!["c"]);
    }

    #[test]
    fn test_jsonl_lines_parse_back() {
        let entries = ledger();
        let filter = ExportFilter {
            min_rating: Some(0.6),
            ..ExportFilter::default()
        };
        let mut buf = Vec::new();

        let written = export_to_jsonl(&entries, &filter, &mut buf).expect("export");

        assert_eq!(written, 3);
        let text = String::from_utf8(buf).expect("utf-8");
        let parsed: Vec<FeedbackEntry> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid line"))
            .collect();
        assert_eq!(parsed, vec![entries[1].clone(), entries[2].clone(), entries[3].clone()]);
    }
}
