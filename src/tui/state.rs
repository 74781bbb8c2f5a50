use crate::model::{AppEvent, Notice, SendResult};
use crate::orchestrator::UiCommand;
use crate::session::{Effect, Session, SessionEvent, View};
use crate::table::{page_window, Searchable, TableView};
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashSet;
use std::path::PathBuf;

pub const TAB_UPLOAD: usize = 0;
pub const TAB_RESULTS: usize = 1;
pub const TAB_HELP: usize = 2;

const IDLE_PROMPT: &str = "Press 'o' to choose an .xlsx file (max 5MB)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    FilePath,
    Search,
}

/// In-flight upload shown in the progress panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub file_name: String,
    pub size_bytes: u64,
    pub percent: u8,
}

impl UploadStatus {
    pub fn size_kb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0)
    }
}

/// What the render loop must do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    None,
    Command(UiCommand),
    ExportJson,
    ExportCsv,
    CopyExportPath,
    Quit,
}

pub struct UiState {
    pub session: Session,
    pub show_help: bool,
    pub preview: TableView,
    pub results: TableView,
    pub input_mode: InputMode,
    pub input: String,
    pub upload: Option<UploadStatus>,
    pub notice: Option<Notice>,
    pub info: String,
    pub last_exported_path: Option<String>,
    /// Row within the visible results page.
    pub results_selected: usize,
    /// Indices into `session.current_results` whose error detail is open.
    pub expanded: HashSet<usize>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            session: Session::default(),
            show_help: false,
            preview: TableView::default(),
            results: TableView::default(),
            input_mode: InputMode::Normal,
            input: String::new(),
            upload: None,
            notice: None,
            info: IDLE_PROMPT.into(),
            last_exported_path: None,
            results_selected: 0,
            expanded: HashSet::new(),
        }
    }
}

impl UiState {
    pub fn tab(&self) -> usize {
        if self.show_help {
            return TAB_HELP;
        }
        match self.session.active_view {
            View::Upload => TAB_UPLOAD,
            View::Results => TAB_RESULTS,
        }
    }

    fn apply_session(&mut self, event: SessionEvent) -> Option<Effect> {
        let transition = self.session.apply(event);
        if let Some(notice) = transition.notice {
            self.notice = Some(notice);
        }
        transition.effect
    }

    fn navigate(&mut self, view: View) {
        self.show_help = false;
        self.apply_session(SessionEvent::Navigate(view));
    }

    /// Indices into `session.current_results` on the visible results page.
    pub fn visible_result_indices(&self) -> Vec<usize> {
        let needle = self.results.search_term().to_lowercase();
        let filtered: Vec<usize> = self
            .session
            .current_results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&needle))
            .map(|(i, _)| i)
            .collect();
        page_window(&filtered, self.results.current_page()).to_vec()
    }

    pub fn selected_result(&self) -> Option<(usize, &SendResult)> {
        let idx = *self.visible_result_indices().get(self.results_selected)?;
        self.session.current_results.get(idx).map(|r| (idx, r))
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible_result_indices().len();
        self.results_selected = self.results_selected.min(visible.saturating_sub(1));
    }

    /// Fold a controller event into UI state.
    pub fn apply_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::UploadStarted {
                file_name,
                size_bytes,
            } => {
                self.info = format!("Processing {file_name}...");
                self.upload = Some(UploadStatus {
                    file_name,
                    size_bytes,
                    percent: 0,
                });
            }
            AppEvent::UploadProgress { percent } => {
                if let Some(u) = self.upload.as_mut() {
                    u.percent = percent;
                }
            }
            AppEvent::UploadFinished { file_name, outcome } => {
                self.upload = None;
                let parsed = matches!(outcome, Ok(crate::model::UploadOutcome::Parsed(_)));
                self.apply_session(SessionEvent::UploadFinished { file_name, outcome });
                // A fresh record set starts on page 1; the search term is kept.
                if parsed {
                    self.preview.go_to(1, 1);
                    self.info = "Press 's' to send emails to every record".into();
                } else {
                    self.info = IDLE_PROMPT.into();
                }
            }
            AppEvent::SendStarted { count } => {
                self.info = format!("Sending {count} emails...");
            }
            AppEvent::SendFinished { outcome } => {
                let ok = outcome.is_ok();
                self.apply_session(SessionEvent::SendFinished(outcome));
                if ok {
                    self.show_help = false;
                    self.results.reset();
                    self.results_selected = 0;
                    self.expanded.clear();
                    self.info = "Press 'e'/'c' to export results, 'u' to upload a new file".into();
                } else {
                    self.info.clear();
                }
            }
            AppEvent::Info(info) => {
                self.info = info.to_message();
            }
        }
    }

    fn active_table(&mut self) -> &mut TableView {
        match self.tab() {
            TAB_RESULTS => &mut self.results,
            _ => &mut self.preview,
        }
    }

    fn active_total_pages(&self) -> usize {
        match self.tab() {
            TAB_RESULTS => self.results.total_pages(&self.session.current_results),
            _ => self.preview.total_pages(&self.session.current_records),
        }
    }

    fn handle_input_key(&mut self, code: KeyCode) -> KeyAction {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input.clear();
                KeyAction::None
            }
            KeyCode::Enter => {
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                let input = std::mem::take(&mut self.input);
                if mode == InputMode::FilePath {
                    let path = input.trim();
                    if path.is_empty() {
                        return KeyAction::None;
                    }
                    return KeyAction::Command(UiCommand::Upload(PathBuf::from(path)));
                }
                KeyAction::None
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.sync_search();
                KeyAction::None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.sync_search();
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    // Search applies on every keystroke.
    fn sync_search(&mut self) {
        if self.input_mode == InputMode::Search {
            let term = self.input.clone();
            self.active_table().set_search_term(term);
            self.clamp_selection();
        }
    }

    pub fn handle_key(&mut self, modifiers: KeyModifiers, code: KeyCode) -> KeyAction {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }
        if self.input_mode != InputMode::Normal {
            return self.handle_input_key(code);
        }

        match code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Char('o') => {
                self.navigate(View::Upload);
                self.input_mode = InputMode::FilePath;
                self.input.clear();
                KeyAction::None
            }
            KeyCode::Char('u') => {
                self.show_help = false;
                self.apply_session(SessionEvent::UploadNewFile);
                self.input_mode = InputMode::FilePath;
                self.input.clear();
                KeyAction::None
            }
            KeyCode::Char('/') => {
                if self.tab() == TAB_HELP {
                    return KeyAction::None;
                }
                self.input_mode = InputMode::Search;
                self.input = self.active_table().search_term().to_string();
                KeyAction::None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.active_table().prev_page();
                self.results_selected = 0;
                KeyAction::None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let total = self.active_total_pages();
                self.active_table().next_page(total);
                self.results_selected = 0;
                KeyAction::None
            }
            KeyCode::Char('s') => {
                if self.tab() != TAB_UPLOAD {
                    return KeyAction::None;
                }
                if self.session.is_sending {
                    self.info = "Emails are already being sent".into();
                    return KeyAction::None;
                }
                match self.apply_session(SessionEvent::SendRequested) {
                    Some(Effect::StartSend(records)) => {
                        KeyAction::Command(UiCommand::Send(records))
                    }
                    None => KeyAction::None,
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.tab() == TAB_RESULTS {
                    self.results_selected = self.results_selected.saturating_sub(1);
                }
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.tab() == TAB_RESULTS {
                    self.results_selected += 1;
                    self.clamp_selection();
                }
                KeyAction::None
            }
            KeyCode::Enter => {
                if self.tab() == TAB_RESULTS {
                    let failed = self
                        .selected_result()
                        .filter(|(_, r)| !r.is_success())
                        .map(|(idx, _)| idx);
                    if let Some(idx) = failed {
                        if !self.expanded.remove(&idx) {
                            self.expanded.insert(idx);
                        }
                    }
                }
                KeyAction::None
            }
            KeyCode::Char('e') if self.tab() == TAB_RESULTS => KeyAction::ExportJson,
            KeyCode::Char('c') if self.tab() == TAB_RESULTS => KeyAction::ExportCsv,
            KeyCode::Char('y') => KeyAction::CopyExportPath,
            KeyCode::Char('t') => {
                self.apply_session(SessionEvent::ToggleDarkMode);
                KeyAction::None
            }
            KeyCode::Tab => {
                match self.tab() {
                    TAB_UPLOAD => self.navigate(View::Results),
                    TAB_RESULTS => self.show_help = true,
                    _ => self.navigate(View::Upload),
                }
                KeyAction::None
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailerError;
    use crate::model::{ContactRecord, NoticeKind, UploadOutcome};

    fn key(state: &mut UiState, code: KeyCode) -> KeyAction {
        state.handle_key(KeyModifiers::NONE, code)
    }

    fn loaded(n: usize) -> UiState {
        let mut state = UiState::default();
        state.apply_event(AppEvent::UploadFinished {
            file_name: "c.xlsx".into(),
            outcome: Ok(UploadOutcome::Parsed(
                (0..n)
                    .map(|i| ContactRecord::with_email(format!("u{i}@x.io")))
                    .collect(),
            )),
        });
        state
    }

    fn results(n: usize) -> Vec<SendResult> {
        (0..n)
            .map(|i| {
                let rec = ContactRecord::with_email(format!("u{i}@x.io"));
                if i % 2 == 0 {
                    SendResult::success(&rec)
                } else {
                    SendResult::failed(&rec, "mailbox full")
                }
            })
            .collect()
    }

    #[test]
    fn file_prompt_submits_upload_command() {
        let mut state = UiState::default();
        assert_eq!(key(&mut state, KeyCode::Char('o')), KeyAction::None);
        for c in "a.xlsx".chars() {
            key(&mut state, KeyCode::Char(c));
        }
        assert_eq!(
            key(&mut state, KeyCode::Enter),
            KeyAction::Command(UiCommand::Upload(PathBuf::from("a.xlsx")))
        );
        assert_eq!(state.input_mode, InputMode::Normal);
    }

    #[test]
    fn q_is_typed_inside_prompt() {
        let mut state = UiState::default();
        key(&mut state, KeyCode::Char('o'));
        assert_eq!(key(&mut state, KeyCode::Char('q')), KeyAction::None);
        assert_eq!(state.input, "q");
        assert_eq!(
            state.handle_key(KeyModifiers::CONTROL, KeyCode::Char('c')),
            KeyAction::Quit
        );
    }

    #[test]
    fn upload_progress_is_tracked_until_finish() {
        let mut state = UiState::default();
        state.apply_event(AppEvent::UploadStarted {
            file_name: "c.xlsx".into(),
            size_bytes: 2048,
        });
        state.apply_event(AppEvent::UploadProgress { percent: 35 });
        let upload = state.upload.clone().unwrap();
        assert_eq!(upload.percent, 35);
        assert_eq!(upload.size_kb(), "2.00");

        state.apply_event(AppEvent::UploadFinished {
            file_name: "c.xlsx".into(),
            outcome: Err(MailerError::UploadHttpError { status_code: 500 }),
        });
        assert!(state.upload.is_none());
        assert_eq!(state.notice.as_ref().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn failed_or_empty_upload_returns_to_idle_prompt() {
        let outcomes = [
            Ok(UploadOutcome::NoResult),
            Err(MailerError::UploadHttpError { status_code: 500 }),
            Err(MailerError::InvalidFormat),
        ];
        for outcome in outcomes {
            let mut state = UiState::default();
            state.apply_event(AppEvent::UploadStarted {
                file_name: "d.xlsx".into(),
                size_bytes: 10,
            });
            assert!(state.info.starts_with("Processing"));
            state.apply_event(AppEvent::UploadFinished {
                file_name: "d.xlsx".into(),
                outcome,
            });
            assert_eq!(state.info, IDLE_PROMPT);
            assert!(state.upload.is_none());
        }
    }

    #[test]
    fn new_parse_starts_preview_on_first_page() {
        let mut state = loaded(25);
        key(&mut state, KeyCode::Char('/'));
        key(&mut state, KeyCode::Char('u'));
        key(&mut state, KeyCode::Enter);
        key(&mut state, KeyCode::Right);
        key(&mut state, KeyCode::Right);
        assert_eq!(state.preview.current_page(), 3);

        state.apply_event(AppEvent::UploadFinished {
            file_name: "next.xlsx".into(),
            outcome: Ok(UploadOutcome::Parsed(
                (0..30)
                    .map(|i| ContactRecord::with_email(format!("n{i}@x.io")))
                    .collect(),
            )),
        });
        assert_eq!(state.preview.current_page(), 1);
        assert_eq!(state.preview.search_term(), "u");
    }

    #[test]
    fn send_without_records_reports_no_data() {
        let mut state = UiState::default();
        assert_eq!(key(&mut state, KeyCode::Char('s')), KeyAction::None);
        assert_eq!(state.notice.as_ref().unwrap().title, "No data to process");
        assert!(!state.session.is_sending);
    }

    #[test]
    fn send_is_disabled_while_sending() {
        let mut state = loaded(3);
        assert!(matches!(
            key(&mut state, KeyCode::Char('s')),
            KeyAction::Command(UiCommand::Send(ref r)) if r.len() == 3
        ));
        assert_eq!(key(&mut state, KeyCode::Char('s')), KeyAction::None);
    }

    #[test]
    fn finished_send_switches_to_results_tab() {
        let mut state = loaded(3);
        key(&mut state, KeyCode::Char('s'));
        state.apply_event(AppEvent::SendFinished {
            outcome: Ok(results(3)),
        });
        assert_eq!(state.tab(), TAB_RESULTS);
        assert!(!state.session.is_sending);
    }

    #[test]
    fn search_filters_active_table_live() {
        let mut state = loaded(25);
        key(&mut state, KeyCode::Right);
        assert_eq!(state.preview.current_page(), 2);
        key(&mut state, KeyCode::Char('/'));
        for c in "u2".chars() {
            key(&mut state, KeyCode::Char(c));
        }
        assert_eq!(state.preview.search_term(), "u2");
        // Page is kept when the term changes.
        assert_eq!(state.preview.current_page(), 2);
        key(&mut state, KeyCode::Esc);
        assert_eq!(state.preview.search_term(), "u2");
    }

    #[test]
    fn page_navigation_is_clamped() {
        let mut state = loaded(12);
        key(&mut state, KeyCode::Char('l'));
        key(&mut state, KeyCode::Char('l'));
        assert_eq!(state.preview.current_page(), 2);
        key(&mut state, KeyCode::Char('h'));
        key(&mut state, KeyCode::Char('h'));
        assert_eq!(state.preview.current_page(), 1);
    }

    #[test]
    fn enter_expands_failed_result_only() {
        let mut state = loaded(3);
        key(&mut state, KeyCode::Char('s'));
        state.apply_event(AppEvent::SendFinished {
            outcome: Ok(results(3)),
        });
        key(&mut state, KeyCode::Enter);
        assert!(state.expanded.is_empty());
        key(&mut state, KeyCode::Down);
        key(&mut state, KeyCode::Enter);
        assert!(state.expanded.contains(&1));
        key(&mut state, KeyCode::Enter);
        assert!(state.expanded.is_empty());
    }

    #[test]
    fn tab_cycles_views_and_help() {
        let mut state = UiState::default();
        key(&mut state, KeyCode::Tab);
        assert_eq!(state.tab(), TAB_RESULTS);
        key(&mut state, KeyCode::Tab);
        assert_eq!(state.tab(), TAB_HELP);
        key(&mut state, KeyCode::Tab);
        assert_eq!(state.tab(), TAB_UPLOAD);
    }

    #[test]
    fn upload_new_file_keeps_results() {
        let mut state = loaded(2);
        key(&mut state, KeyCode::Char('s'));
        state.apply_event(AppEvent::SendFinished {
            outcome: Ok(results(2)),
        });
        key(&mut state, KeyCode::Char('u'));
        assert_eq!(state.tab(), TAB_UPLOAD);
        assert_eq!(state.input_mode, InputMode::FilePath);
        assert_eq!(state.session.current_results.len(), 2);
        assert_eq!(state.session.current_records.len(), 2);
    }
}
