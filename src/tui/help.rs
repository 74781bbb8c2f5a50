use super::theme::Palette;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn bind(palette: &Palette, key: &str, pad: usize, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(palette.key)),
        Span::raw(format!("{:width$}{what}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, palette: &Palette) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(palette.key)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(palette.key)),
            Span::raw("  Quit"),
        ]),
        bind(palette, "tab", 9, "Switch tabs"),
        bind(palette, "?", 11, "Show this help"),
        bind(palette, "t", 11, "Toggle dark mode"),
        bind(palette, "y", 11, "Copy last exported path to clipboard"),
        Line::from(""),
        Line::from("Upload & Preview:"),
        bind(palette, "o", 11, "Choose an .xlsx file (max 5MB) and upload it"),
        bind(palette, "s", 11, "Send emails to every record"),
        bind(palette, "/", 11, "Search (enter/esc to finish)"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("←/→", Style::default().fg(palette.key)),
            Span::raw(" or "),
            Span::styled("h/l", Style::default().fg(palette.key)),
            Span::raw("  Previous / next page"),
        ]),
        Line::from(""),
        Line::from("Results:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(palette.key)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(palette.key)),
            Span::raw("  Select result"),
        ]),
        bind(palette, "enter", 7, "Show / hide error details"),
        bind(palette, "e", 11, "Export results as JSON"),
        bind(palette, "c", 11, "Export results as CSV"),
        bind(palette, "u", 11, "Upload a new file"),
    ])
    .style(palette.base())
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
