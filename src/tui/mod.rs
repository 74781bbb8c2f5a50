mod export;
mod help;
mod state;
mod theme;
mod views;

use crate::cli::Cli;
use crate::engine::MailEngine;
use crate::model::{AppEvent, NoticeKind};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::ExportFormat;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{InputMode, KeyAction, UiState, TAB_RESULTS, TAB_UPLOAD};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use theme::Palette;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let engine = Arc::new(MailEngine::new(&crate::cli::build_config(&args))?);

    // Unbounded channels keep the controller from ever waiting on the UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&args, engine, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();
    state.preview.set_search_term(args.search.clone());
    if let Some(path) = args.file.as_ref() {
        state.info = format!("Uploading {}...", path.display());
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match state.handle_key(k.modifiers, k.code) {
                    KeyAction::None => {}
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Command(cmd) => {
                        if let UiCommand::Upload(path) = &cmd {
                            state.info = format!("Uploading {}...", path.display());
                        }
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::ExportJson => export_and_show_path(&mut state, ExportFormat::Json),
                    KeyAction::ExportCsv => export_and_show_path(&mut state, ExportFormat::Csv),
                    KeyAction::CopyExportPath => copy_export_path(&mut state),
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn export_and_show_path(state: &mut UiState, format: ExportFormat) {
    match export::export_results(&state.session.current_results, format) {
        Ok(p) => {
            state.last_exported_path = Some(p.to_string_lossy().to_string());
            let label = match format {
                ExportFormat::Json => "JSON",
                ExportFormat::Csv => "CSV",
            };
            state.info = format!("Exported {label}: {} (press 'y' to copy path)", p.display());
        }
        Err(e) => {
            tracing::warn!(error = %e, "export failed");
            state.info = format!("Export failed: {e:#}");
        }
    }
}

fn copy_export_path(state: &mut UiState) {
    let Some(path) = state.last_exported_path.clone() else {
        state.info = "No exported file path to copy. Export results first (e/c)".into();
        return;
    };
    match export::copy_to_clipboard(&path) {
        Ok(_) => {
            let display_path = if path.chars().count() > 60 {
                let head: String = path.chars().take(57).collect();
                format!("{head}...")
            } else {
                path
            };
            state.info = format!("✓ Copied to clipboard: {display_path}");
        }
        Err(e) => {
            state.info = format!("Clipboard copy failed: {e:#}");
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let palette = Palette::for_mode(state.session.is_dark_mode);
    f.render_widget(Block::default().style(palette.base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(area);

    let results_label = if state.session.current_results.is_empty() {
        "Results".to_string()
    } else {
        format!("Results ({})", state.session.current_results.len())
    };
    let tabs = Tabs::new(vec![
        Line::from("Upload & Preview"),
        Line::from(results_label),
        Line::from("Help"),
    ])
    .select(state.tab())
    .style(palette.base())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Email Automation"),
    )
    .highlight_style(
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(tabs, chunks[0]);

    match state.tab() {
        TAB_UPLOAD => views::draw_upload(chunks[1], f, state, &palette),
        TAB_RESULTS => views::draw_results(chunks[1], f, state, &palette),
        _ => help::draw_help(chunks[1], f, &palette),
    }

    draw_status(chunks[2], f, state, &palette);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState, palette: &Palette) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(notice) = state.notice.as_ref() {
        let color = match notice.kind {
            NoticeKind::Info => palette.success,
            NoticeKind::Error => palette.error,
        };
        lines.push(Line::from(vec![
            Span::styled(
                notice.title.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(": "),
            Span::raw(notice.description.clone()),
        ]));
    }
    if state.input_mode == InputMode::Search {
        lines.push(Line::from(vec![
            Span::styled("Search: ", Style::default().fg(palette.key)),
            Span::raw(format!("{}_", state.input)),
        ]));
    } else if !state.info.is_empty() {
        lines.push(Line::from(Span::styled(
            state.info.clone(),
            Style::default().fg(palette.muted),
        )));
    }

    let p = Paragraph::new(lines)
        .style(palette.base())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
