//! Column-level type inference and hyperlink conversion.

use std::collections::BTreeMap;

use tracing::debug;

use crate::classify::{classify, hyperlink_target, ContentType};
use crate::utils::ProgressSink;
use crate::workbook::{column_letter, HyperlinkStyle, Worksheet};

/// Leading rows inspected when profiling a column.
pub const DEFAULT_SAMPLE_SIZE: u32 = 100;

/// Outcome of sampling one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    /// 1-based column index.
    pub column: u32,
    /// Most frequent type among non-empty samples.
    pub majority: Option<ContentType>,
    /// How many samples voted for the majority.
    pub votes: usize,
    /// Rows inspected.
    pub sampled: u32,
}

impl ColumnProfile {
    /// Majority type name, or `unknown` when the sample was empty.
    pub fn label(&self) -> &'static str {
        self.majority.map(ContentType::as_str).unwrap_or("unknown")
    }
}

/// Majority vote over the classification of `values`.
///
/// Empty values do not vote. On equal counts the type declared first in
/// [`ContentType`] wins.
pub fn tally<I, S>(values: I) -> (Option<ContentType>, usize)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<ContentType, usize> = BTreeMap::new();
    for value in values {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        *counts.entry(classify(value)).or_default() += 1;
    }

    let mut best: Option<(ContentType, usize)> = None;
    for (content_type, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((content_type, count));
        }
    }

    match best {
        Some((content_type, count)) => (Some(content_type), count),
        None => (None, 0),
    }
}

/// Profiles the leading `sample_limit` rows of a column, header included.
pub fn analyze_column(sheet: &Worksheet, column: u32, sample_limit: u32) -> ColumnProfile {
    let sampled = sample_limit.min(sheet.max_row());
    let (majority, votes) = tally((1..=sampled).map(|row| sheet.text(row, column)));
    ColumnProfile {
        column,
        majority,
        votes,
        sampled,
    }
}

/// Annotates every linkable cell in the first `max_rows` rows of a column.
///
/// Returns the number of cells converted. The sink is told about every row.
pub fn convert_column(
    sheet: &mut Worksheet,
    column: u32,
    max_rows: u32,
    style: &HyperlinkStyle,
    progress: &mut dyn ProgressSink,
) -> usize {
    let total = sheet.max_row().min(max_rows);
    let mut converted = 0;

    progress.start(&column_letter(column), total);
    for row in 1..=total {
        let value = sheet.text(row, column);
        if !value.is_empty() {
            if let Some(target) = hyperlink_target(&value, classify(&value)) {
                if sheet.set_hyperlink(row, column, target, style) {
                    converted += 1;
                }
            }
        }
        progress.notify(row, total);
    }
    progress.finish();

    debug!(column = %column_letter(column), rows = total, converted, "Column converted");
    converted
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::utils::NoProgress;
    use crate::workbook::{Cell, CellValue};

    fn sheet_with_column(values: &[&str]) -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        for (i, value) in values.iter().enumerate() {
            if !value.is_empty() {
                sheet.insert(Cell::new(
                    i as u32 + 1,
                    1,
                    CellValue::Text(value.to_string()),
                ));
            }
        }
        sheet
    }

    #[derive(Default)]
    struct Recorder {
        started: Option<(String, u32)>,
        seen: Vec<(u32, u32)>,
        finished: bool,
    }

    impl ProgressSink for Recorder {
        fn start(&mut self, label: &str, total: u32) {
            self.started = Some((label.to_string(), total));
        }

        fn notify(&mut self, done: u32, total: u32) {
            self.seen.push((done, total));
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn majority_wins() {
        let (majority, votes) = tally(["a@b.com", "c@d.org", "hello", ""]);
        assert_eq!(majority, Some(ContentType::Email));
        assert_eq!(votes, 2);
    }

    #[test]
    fn ties_follow_declaration_order() {
        assert_eq!(
            tally(["notes", "example.com"]),
            (Some(ContentType::Website), 1)
        );
        assert_eq!(
            tally(["example.com", "a@b.com"]),
            (Some(ContentType::Email), 1)
        );
        assert_eq!(
            tally(["linkedin.com/in/x", "example.com"]),
            (Some(ContentType::LinkedIn), 1)
        );
    }

    #[test]
    fn empty_sample_is_unknown() {
        assert_eq!(tally(Vec::<String>::new()), (None, 0));
        let profile = analyze_column(&sheet_with_column(&[]), 1, DEFAULT_SAMPLE_SIZE);
        assert_eq!(profile.label(), "unknown");
        assert_eq!(profile.votes, 0);
    }

    #[test]
    fn analysis_samples_leading_rows_with_header() {
        let mut values = vec!["Email"];
        values.extend(std::iter::repeat("person@example.com").take(150));
        let sheet = sheet_with_column(&values);

        let profile = analyze_column(&sheet, 1, DEFAULT_SAMPLE_SIZE);
        assert_eq!(profile.sampled, 100);
        assert_eq!(profile.majority, Some(ContentType::Email));
        assert_eq!(profile.votes, 99);
        assert_eq!(profile.label(), "email");
    }

    #[test]
    fn converts_linkable_cells_only() {
        let mut sheet = sheet_with_column(&[
            "Contact",
            "jane@example.com",
            "",
            "example.com",
            "https://www.linkedin.com/in/jane",
            "just some notes",
        ]);
        let style = HyperlinkStyle::default();
        let mut progress = Recorder::default();

        let converted = convert_column(&mut sheet, 1, 100_000, &style, &mut progress);
        assert_eq!(converted, 3);

        let target = |row| sheet.cell(row, 1).and_then(|c| c.hyperlink.clone());
        assert_eq!(target(1), None);
        assert_eq!(target(2).as_deref(), Some("mailto:jane@example.com"));
        assert_eq!(target(4).as_deref(), Some("https://example.com"));
        assert_eq!(
            target(5).as_deref(),
            Some("https://www.linkedin.com/in/jane")
        );
        assert_eq!(target(6), None);
        assert_eq!(
            sheet.cell(2, 1).unwrap().hyperlink_style.as_ref(),
            Some(&style)
        );
        assert_eq!(sheet.cell(6, 1).unwrap().hyperlink_style, None);

        assert_eq!(progress.started, Some(("A".to_string(), 6)));
        assert_eq!(progress.seen.len(), 6);
        assert_eq!(progress.seen.last(), Some(&(6, 6)));
        assert!(progress.finished);
    }

    #[test]
    fn respects_row_limit() {
        let mut sheet = sheet_with_column(&["a@b.com", "c@d.com", "e@f.com", "g@h.com"]);
        let converted = convert_column(
            &mut sheet,
            1,
            2,
            &HyperlinkStyle::default(),
            &mut NoProgress,
        );
        assert_eq!(converted, 2);
        assert!(sheet.cell(3, 1).unwrap().hyperlink.is_none());
    }

    #[test]
    fn numbers_and_dates_stay_text() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.insert(Cell::new(1, 1, CellValue::Number(0.0)));
        sheet.insert(Cell::new(2, 1, CellValue::Number(3.5)));
        sheet.insert(Cell::new(3, 1, CellValue::Bool(true)));
        let converted = convert_column(
            &mut sheet,
            1,
            100,
            &HyperlinkStyle::default(),
            &mut NoProgress,
        );
        assert_eq!(converted, 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn converted_count_never_exceeds_limit(
                values in proptest::collection::vec("[a-z@.]{0,12}", 0..40),
                limit in 0u32..50,
            ) {
                let refs: Vec<&str> = values.iter().map(String::as_str).collect();
                let mut sheet = sheet_with_column(&refs);
                let converted = convert_column(
                    &mut sheet,
                    1,
                    limit,
                    &HyperlinkStyle::default(),
                    &mut NoProgress,
                );
                prop_assert!(converted as u32 <= limit.min(sheet.max_row()));
                prop_assert_eq!(converted, sheet.pending_count());
            }

            #[test]
            fn majority_votes_bounded_by_non_empty(
                values in proptest::collection::vec("[a-z@.]{0,12}", 0..40),
            ) {
                let non_empty = values.iter().filter(|v| !v.trim().is_empty()).count();
                let (majority, votes) = tally(values.iter().map(|v| v.trim()));
                prop_assert!(votes <= non_empty);
                prop_assert_eq!(majority.is_none(), non_empty == 0);
            }
        }
    }
}
