//! Text output for CLI mode.
//!
//! Builds human-readable lines for the preview table and the send results.

use crate::metrics::ResultsMetrics;
use crate::model::{ContactRecord, SendResult};
use crate::table::{page_numbers, showing_range, TableView};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// One page of the preview table plus the paging caption.
pub(crate) fn build_preview_summary(records: &[ContactRecord], view: &TableView) -> TextSummary {
    let mut lines = Vec::new();
    if !view.search_term().is_empty() {
        lines.push(format!("Search: {}", view.search_term()));
    }
    lines.push(format!(
        "{:<28} {:<18} {:<18} {:<16} {:>8} {:<14} {}",
        "Email", "Name", "Company", "Product", "Quantity", "Port", "Address"
    ));

    let visible = view.visible(records);
    if visible.is_empty() {
        lines.push("No data available.".to_string());
    }
    for r in &visible {
        lines.push(format!(
            "{:<28} {:<18} {:<18} {:<16} {:>8} {:<14} {}",
            clip(r.display_email(), 28),
            clip(&r.name, 18),
            clip(&r.company, 18),
            clip(&r.product, 16),
            r.quantity,
            clip(&r.port, 14),
            clip(&r.address, 40)
        ));
    }

    let filtered = view.filter(records).len();
    let (from, to, of) = showing_range(view.current_page(), filtered);
    lines.push(format!("Showing {from} to {to} of {of} entries"));

    let total = crate::table::total_pages(filtered);
    if total > 1 {
        let links: Vec<String> = page_numbers(view.current_page(), total)
            .into_iter()
            .map(|p| {
                if p == view.current_page() {
                    format!("[{p}]")
                } else {
                    p.to_string()
                }
            })
            .collect();
        lines.push(format!("Pages: {} (of {total})", links.join(" ")));
    }
    TextSummary { lines }
}

/// Counts, per-failure detail and the success rate line.
pub(crate) fn build_results_summary(results: &[SendResult]) -> TextSummary {
    let m = ResultsMetrics::from_results(results);
    let mut lines = vec![
        format!("Total Emails: {}", m.total),
        format!("Successfully Sent: {}", m.success),
        format!("Failed: {}", m.failed),
    ];
    let failures: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    if !failures.is_empty() {
        lines.push("Failures:".to_string());
        for r in failures {
            lines.push(format!(
                "  {} ({}, {}): {}",
                if r.email.is_empty() { "-" } else { r.email.as_str() },
                r.name,
                r.company,
                r.error_reason.as_deref().unwrap_or("no reason given")
            ));
        }
    }
    lines.push(format!(
        "Success rate: {}% ({} of {} emails sent successfully)",
        m.success_rate, m.success, m.total
    ));
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_shows_caption_and_page_links() {
        let records: Vec<_> = (0..23)
            .map(|i| ContactRecord::with_email(format!("u{i}@x.io")))
            .collect();
        let mut view = TableView::default();
        view.go_to(2, 3);
        let lines = build_preview_summary(&records, &view).lines;
        assert!(lines.contains(&"Showing 11 to 20 of 23 entries".to_string()));
        assert_eq!(lines.last().unwrap(), "Pages: 1 [2] 3 (of 3)");
    }

    #[test]
    fn results_summary_lists_failures() {
        let ok = ContactRecord::with_email("ok@x.io");
        let bad = ContactRecord::with_email("bad@x.io");
        let lines =
            build_results_summary(&[SendResult::success(&ok), SendResult::failed(&bad, "bounced")])
                .lines;
        assert_eq!(lines[0], "Total Emails: 2");
        assert!(lines.iter().any(|l| l.contains("bad@x.io") && l.contains("bounced")));
        assert_eq!(
            lines.last().unwrap(),
            "Success rate: 50% (1 of 2 emails sent successfully)"
        );
    }
}
