//! Upload & Preview and Results tabs.

use super::state::{InputMode, UiState};
use super::theme::Palette;
use crate::metrics::ResultsMetrics;
use crate::model::SendStatus;
use crate::table::{page_numbers, showing_range, TableView};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

fn page_footer(view: &TableView, filtered: usize, palette: &Palette) -> Line<'static> {
    let (from, to, of) = showing_range(view.current_page(), filtered);
    let mut spans = vec![Span::styled(
        format!("Showing {from} to {to} of {of} entries"),
        Style::default().fg(palette.muted),
    )];
    let total = crate::table::total_pages(filtered);
    if total > 1 {
        spans.push(Span::raw("   ‹ "));
        for p in page_numbers(view.current_page(), total) {
            if p == view.current_page() {
                spans.push(Span::styled(
                    format!("[{p}]"),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::raw(p.to_string()));
            }
            spans.push(Span::raw(" "));
        }
        spans.push(Span::raw("›"));
    }
    Line::from(spans)
}

fn table_title(label: &str, view: &TableView) -> String {
    if view.search_term().is_empty() {
        label.to_string()
    } else {
        format!("{label} (search: {})", view.search_term())
    }
}

fn empty_row(palette: &Palette) -> Row<'static> {
    Row::new(vec![Cell::from(Span::styled(
        "No data available.",
        Style::default().fg(palette.muted),
    ))])
}

pub fn draw_upload(area: Rect, f: &mut Frame, state: &UiState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    let in_flight = state.upload.as_ref().filter(|u| u.percent < 100);
    if state.input_mode == InputMode::FilePath {
        let p = Paragraph::new(Line::from(vec![
            Span::styled("File: ", Style::default().fg(palette.muted)),
            Span::raw(format!("{}_", state.input)),
        ]))
        .style(palette.base())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Choose an .xlsx file (enter to upload, esc to cancel)"),
        );
        f.render_widget(p, chunks[0]);
    } else if let Some(upload) = in_flight {
        let g = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Processing {} ({} KB)",
                upload.file_name,
                upload.size_kb()
            )))
            .gauge_style(Style::default().fg(palette.accent).bg(palette.bg))
            .percent(upload.percent.min(100) as u16)
            .label(format!("{}%", upload.percent));
        f.render_widget(g, chunks[0]);
    } else {
        let p = Paragraph::new(Line::from(vec![
            Span::raw("Press "),
            Span::styled("o", Style::default().fg(palette.key)),
            Span::raw(" to choose an Excel file (.xlsx, max 5MB)"),
        ]))
        .style(palette.base())
        .block(Block::default().borders(Borders::ALL).title("Upload"));
        f.render_widget(p, chunks[0]);
    }

    let records = &state.session.current_records;
    let visible = state.preview.visible(records);
    let header = Row::new(vec![
        "Email", "Name", "Company", "Product", "Quantity", "Port", "Address",
    ])
    .style(
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = if visible.is_empty() {
        vec![empty_row(palette)]
    } else {
        visible
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(r.display_email().to_string()),
                    Cell::from(r.name.clone()),
                    Cell::from(r.company.clone()),
                    Cell::from(r.product.clone()),
                    Cell::from(r.quantity.to_string()),
                    Cell::from(r.port.clone()),
                    Cell::from(r.address.clone()),
                ])
            })
            .collect()
    };
    let widths = [
        Constraint::Percentage(22),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Length(9),
        Constraint::Percentage(10),
        Constraint::Min(10),
    ];
    let title = table_title(
        &format!("Preview ({} records)", records.len()),
        &state.preview,
    );
    let table = Table::new(rows, widths)
        .header(header)
        .style(palette.base())
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, chunks[1]);

    let mut footer = page_footer(
        &state.preview,
        state.preview.filter(records).len(),
        palette,
    );
    footer.spans.push(Span::raw("   "));
    if state.session.is_sending {
        footer
            .spans
            .push(Span::styled("Sending...", Style::default().fg(palette.muted)));
    } else if !records.is_empty() {
        footer.spans.push(Span::styled(
            format!("[s] Send Emails ({})", records.len()),
            Style::default().fg(palette.key),
        ));
    }
    f.render_widget(Paragraph::new(footer).style(palette.base()), chunks[2]);
}

pub fn draw_results(area: Rect, f: &mut Frame, state: &UiState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    let results = &state.session.current_results;
    let m = ResultsMetrics::from_results(results);
    let summary = Paragraph::new(Line::from(vec![
        Span::styled("Total Emails: ", Style::default().fg(palette.muted)),
        Span::raw(m.total.to_string()),
        Span::raw("   "),
        Span::styled("Successfully Sent: ", Style::default().fg(palette.muted)),
        Span::styled(m.success.to_string(), Style::default().fg(palette.success)),
        Span::raw("   "),
        Span::styled("Failed: ", Style::default().fg(palette.muted)),
        Span::styled(m.failed.to_string(), Style::default().fg(palette.error)),
        Span::raw("   "),
        Span::styled("Success rate: ", Style::default().fg(palette.muted)),
        Span::raw(format!("{}%", m.success_rate)),
    ]))
    .style(palette.base())
    .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(summary, chunks[0]);

    let visible = state.visible_result_indices();
    let mut rows: Vec<Row> = Vec::new();
    let mut selected_row = None;
    for (pos, &idx) in visible.iter().enumerate() {
        let Some(r) = results.get(idx) else {
            continue;
        };
        if pos == state.results_selected {
            selected_row = Some(rows.len());
        }
        let (status_style, marker) = match r.status {
            SendStatus::Success => (Style::default().fg(palette.success), "✓"),
            SendStatus::Failed => (Style::default().fg(palette.error), "✗"),
        };
        let expandable = if r.is_success() {
            ""
        } else if state.expanded.contains(&idx) {
            " ▾"
        } else {
            " ▸"
        };
        rows.push(Row::new(vec![
            Cell::from(if r.email.is_empty() { "-".to_string() } else { r.email.clone() }),
            Cell::from(r.name.clone()),
            Cell::from(r.company.clone()),
            Cell::from(Span::styled(
                format!("{marker} {}{expandable}", r.status.as_str()),
                status_style,
            )),
        ]));
        if state.expanded.contains(&idx) {
            let reason = r.error_reason.as_deref().unwrap_or("no reason given");
            rows.push(Row::new(vec![Cell::from(Span::styled(
                format!("  ↳ Error: {reason}"),
                Style::default().fg(palette.error),
            ))]));
        }
    }
    if rows.is_empty() {
        rows.push(empty_row(palette));
    }

    let header = Row::new(vec!["Email", "Name", "Company", "Status"]).style(
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    );
    let widths = [
        Constraint::Percentage(40),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
        Constraint::Min(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .style(palette.base())
        .row_highlight_style(Style::default().bg(palette.selected_bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(table_title("Results", &state.results)),
        );
    let mut table_state = TableState::default().with_selected(selected_row);
    f.render_stateful_widget(table, chunks[1], &mut table_state);

    let footer = page_footer(
        &state.results,
        state.results.filter(results).len(),
        palette,
    );
    f.render_widget(Paragraph::new(footer).style(palette.base()), chunks[2]);
}
