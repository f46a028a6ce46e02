use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;

use crate::bible::{BibleFetcher, VERSIONS};
use crate::config::Config;
use crate::data;
use crate::error::{AppError, Result};
use crate::models::{BibleChapter, FetchStatus, Journal, JournalEntry, ReadingProgress};
use crate::session::Session;
use crate::store::{keys, LocalStore, RemoteStore, UserStore};
use crate::tracker::ProgressTracker;
use crate::tui::{AppAction, BookFilter, InputMode, Tab, Theme};

// Message for a completed chapter-text fetch
pub struct ChapterResult {
    pub book: String,
    pub chapter: u32,
    pub result: std::result::Result<BibleChapter, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAuth {
    SignIn,
    SignUp,
}

/// Picks the authoritative store for the current session: remote when
/// signed in and configured, the local JSON store otherwise.
fn store_for<'a>(
    local: &'a LocalStore,
    remote: &'a Option<RemoteStore>,
    session: &Session,
) -> &'a dyn UserStore {
    match (remote, session.is_authenticated()) {
        (Some(remote), true) => remote,
        _ => local,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Indices into `data::BOOKS` that pass the Reading-tab list filters.
fn visible_book_indices(
    filter: BookFilter,
    hide_completed: bool,
    progress: &ReadingProgress,
) -> Vec<usize> {
    data::BOOKS
        .iter()
        .enumerate()
        .filter(|(i, _)| match filter {
            BookFilter::All => true,
            BookFilter::OldTestament => *i < data::OLD_TESTAMENT_BOOKS,
            BookFilter::NewTestament => *i >= data::OLD_TESTAMENT_BOOKS,
        })
        .filter(|(_, book)| {
            !hide_completed || (progress.chapters(book.name).len() as u32) < book.chapters
        })
        .map(|(i, _)| i)
        .collect()
}

pub struct App {
    // Data
    pub tracker: ProgressTracker,
    pub journal: Journal,
    pub user_name: String,
    pub theme: Theme,
    pub current_chapter: Option<BibleChapter>,

    // UI state
    pub tab: Tab,
    pub selected_book: usize,
    pub selected_chapter: u32,
    pub focus_chapters: bool,
    pub book_filter: BookFilter,
    pub hide_completed: bool,
    pub journal_selected: usize,
    pub search_term: String,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub journal_draft: String,
    pub journal_draft_date: NaiveDate,
    pub reader_scroll: u16,
    pub version_index: usize,
    pub fetch_status: FetchStatus,
    pub show_help: bool,
    pub status_message: Option<String>,
    pending_email: Option<String>,
    pending_auth: PendingAuth,

    // Async state
    chapter_rx: mpsc::Receiver<ChapterResult>,
    chapter_tx: mpsc::Sender<ChapterResult>,
    pending_fetch: Option<(String, u32)>,

    // Services
    pub session: Session,
    local: LocalStore,
    remote: Option<RemoteStore>,
    fetcher: Option<BibleFetcher>,
    data_dir: PathBuf,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        let local = LocalStore::new(&data_dir);

        let (remote, fetcher) = match config.backend()? {
            Some((url, key)) => (
                Some(RemoteStore::new(url.clone(), key.clone())),
                Some(BibleFetcher::new(url, key)),
            ),
            None => (None, None),
        };

        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        tracker.load(&local, &session).await?;
        let journal = local.load_journal(&session).await?;

        let theme: Theme = local.get(keys::THEME).await;
        let user_name: String = local.get(keys::USER_NAME).await;
        let version_index = VERSIONS
            .iter()
            .position(|v| v.id == config.default_version.to_lowercase())
            .unwrap_or(0);

        let (chapter_tx, chapter_rx) = mpsc::channel(1);

        // First run: ask for a display name before anything else
        let input_mode = if user_name.is_empty() {
            InputMode::Name
        } else {
            InputMode::None
        };

        Ok(Self {
            tracker,
            journal,
            user_name,
            theme,
            current_chapter: None,
            tab: Tab::Dashboard,
            selected_book: 0,
            selected_chapter: 1,
            focus_chapters: false,
            book_filter: BookFilter::default(),
            hide_completed: false,
            journal_selected: 0,
            search_term: String::new(),
            input_mode,
            input_buffer: String::new(),
            journal_draft: String::new(),
            journal_draft_date: today(),
            reader_scroll: 0,
            version_index,
            fetch_status: FetchStatus::NotLoaded,
            show_help: false,
            status_message: None,
            pending_email: None,
            pending_auth: PendingAuth::SignIn,
            chapter_rx,
            chapter_tx,
            pending_fetch: None,
            session,
            local,
            remote,
            fetcher,
            data_dir,
        })
    }

    pub fn selected_book_name(&self) -> &'static str {
        data::BOOKS[self.selected_book].name
    }

    pub fn selected_book_chapters(&self) -> u32 {
        data::BOOKS[self.selected_book].chapters
    }

    pub fn displayed_streak(&self) -> u32 {
        self.tracker.displayed_streak(today())
    }

    /// Book-list rows under the current filters, as indices into
    /// `data::BOOKS`.
    pub fn visible_books(&self) -> Vec<usize> {
        visible_book_indices(self.book_filter, self.hide_completed, self.tracker.progress())
    }

    /// Journal entries visible under the current search filter, newest
    /// first, as owned dates (the entries live in `self.journal`).
    pub fn visible_journal_dates(&self) -> Vec<NaiveDate> {
        self.journal
            .search(&self.search_term)
            .into_iter()
            .map(|(date, _)| date)
            .collect()
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::NextTab => self.tab = self.tab.next(),
            AppAction::SelectTab(tab) => {
                self.tab = tab;
                if tab == Tab::Reader && self.current_chapter.is_none() {
                    self.start_chapter_fetch();
                }
            }

            AppAction::MoveUp => self.move_vertical(-1),
            AppAction::MoveDown => self.move_vertical(1),
            AppAction::MoveLeft => self.move_horizontal(-1),
            AppAction::MoveRight => self.move_horizontal(1),

            AppAction::ToggleChapter => match self.tab {
                Tab::Reading => self.toggle_selected_chapter().await,
                Tab::Journal => self.edit_selected_entry(),
                _ => {}
            },

            AppAction::OpenReader => {
                self.tab = Tab::Reader;
                self.start_chapter_fetch();
            }

            AppAction::PrevChapter => self.step_chapter(-1),
            AppAction::NextChapter => self.step_chapter(1),

            AppAction::CycleBookFilter => {
                if self.tab == Tab::Reading {
                    self.book_filter = self.book_filter.next();
                    self.clamp_book_selection();
                }
            }

            AppAction::ToggleHideCompleted => {
                if self.tab == Tab::Reading {
                    self.hide_completed = !self.hide_completed;
                    self.clamp_book_selection();
                }
            }

            AppAction::CycleVersion => {
                self.version_index = (self.version_index + 1) % VERSIONS.len();
                if self.tab == Tab::Reader {
                    self.start_chapter_fetch();
                }
            }

            AppAction::CycleTheme => {
                self.theme = self.theme.next();
                if let Err(e) = self.local.set(keys::THEME, &self.theme).await {
                    tracing::warn!("Could not persist theme: {e}");
                }
            }

            AppAction::StartNameInput => {
                self.input_mode = InputMode::Name;
                self.input_buffer = self.user_name.clone();
            }

            AppAction::StartSignIn => self.start_auth(PendingAuth::SignIn),
            AppAction::StartSignUp => self.start_auth(PendingAuth::SignUp),

            AppAction::SignOut => {
                if self.session.is_authenticated() {
                    self.session.sign_out();
                    if let Err(e) = self.reload_user_state().await {
                        tracing::error!("Failed to reload guest data: {e}");
                    }
                    self.status_message = Some("Signed out".to_string());
                }
            }

            AppAction::EditJournal => {
                self.tab = Tab::Journal;
                self.begin_journal_edit(today());
            }

            AppAction::DeleteJournalEntry => {
                if self.tab == Tab::Journal {
                    self.delete_selected_entry().await;
                }
            }

            AppAction::StartSearch => {
                if self.tab == Tab::Journal {
                    self.input_mode = InputMode::Search;
                    self.input_buffer = self.search_term.clone();
                }
            }

            AppAction::ExportJournal => self.export_journal(),

            AppAction::ShowHelp => self.show_help = true,
            AppAction::HideHelp => self.show_help = false,

            AppAction::InputChar(c) => self.input_buffer.push(c),
            AppAction::InputBackspace => {
                self.input_buffer.pop();
            }
            AppAction::InputCancel => {
                self.input_mode = InputMode::None;
                self.input_buffer.clear();
                self.pending_email = None;
            }
            AppAction::InputConfirm => self.confirm_input().await,

            AppAction::JournalChar(c) => self.journal_draft.push(c),
            AppAction::JournalNewline => self.journal_draft.push('\n'),
            AppAction::JournalBackspace => {
                self.journal_draft.pop();
            }
            AppAction::JournalDiscard => {
                self.input_mode = InputMode::None;
                self.journal_draft.clear();
            }
            AppAction::JournalSave => self.save_journal_draft().await,
        }

        Ok(false)
    }

    fn move_vertical(&mut self, delta: i64) {
        match self.tab {
            Tab::Reading => {
                if self.focus_chapters {
                    // The chapter grid renders ten per row
                    self.shift_selected_chapter(delta * 10);
                } else {
                    let visible = self.visible_books();
                    if let Some(pos) = visible.iter().position(|&i| i == self.selected_book) {
                        let next = (pos as i64 + delta).clamp(0, visible.len() as i64 - 1);
                        if visible[next as usize] != self.selected_book {
                            self.selected_book = visible[next as usize];
                            self.selected_chapter = 1;
                        }
                    }
                }
            }
            Tab::Journal => {
                let len = self.visible_journal_dates().len() as i64;
                if len > 0 {
                    let next = (self.journal_selected as i64 + delta).clamp(0, len - 1);
                    self.journal_selected = next as usize;
                }
            }
            Tab::Reader => {
                self.reader_scroll = self.reader_scroll.saturating_add_signed((delta * 2) as i16);
            }
            Tab::Dashboard => {}
        }
    }

    fn move_horizontal(&mut self, delta: i64) {
        match self.tab {
            Tab::Reading => {
                if delta < 0 && self.focus_chapters {
                    if self.selected_chapter > 1 {
                        self.shift_selected_chapter(-1);
                    } else {
                        self.focus_chapters = false;
                    }
                } else if delta > 0 {
                    if self.focus_chapters {
                        self.shift_selected_chapter(1);
                    } else {
                        self.focus_chapters = true;
                    }
                }
            }
            Tab::Reader => self.step_chapter(delta),
            _ => {}
        }
    }

    /// After a filter change the selected book may no longer be listed;
    /// snap to the first visible one. An empty list keeps the selection so
    /// the chapter grid still has a subject.
    fn clamp_book_selection(&mut self) {
        let visible = self.visible_books();
        if !visible.contains(&self.selected_book) {
            if let Some(&first) = visible.first() {
                self.selected_book = first;
                self.selected_chapter = 1;
            }
        }
    }

    fn shift_selected_chapter(&mut self, delta: i64) {
        let max = self.selected_book_chapters() as i64;
        let next = (self.selected_chapter as i64 + delta).clamp(1, max);
        self.selected_chapter = next as u32;
    }

    fn step_chapter(&mut self, delta: i64) {
        self.shift_selected_chapter(delta);
        if self.tab == Tab::Reader {
            self.start_chapter_fetch();
        }
    }

    async fn toggle_selected_chapter(&mut self) {
        if !self.focus_chapters {
            self.focus_chapters = true;
            return;
        }
        let book = self.selected_book_name();
        let chapter = self.selected_chapter;
        let store = store_for(&self.local, &self.remote, &self.session);
        let result = self
            .tracker
            .toggle_chapter(store, &self.session, book, chapter, today())
            .await;
        match result {
            Ok(true) => {
                self.status_message = Some(format!(
                    "{book} {chapter} marked read — {} day streak",
                    self.displayed_streak()
                ));
            }
            Ok(false) => {
                self.status_message = Some(format!("{book} {chapter} marked unread"));
            }
            Err(AppError::SaveInFlight) => {
                self.status_message = Some("Still saving, try again".to_string());
            }
            Err(e) => {
                tracing::error!("Failed to save reading progress: {e}");
                self.status_message =
                    Some("Could not save — your change was not applied".to_string());
            }
        }
    }

    fn start_chapter_fetch(&mut self) {
        let Some(fetcher) = &self.fetcher else {
            self.fetch_status = FetchStatus::NoBackend;
            return;
        };

        let book = self.selected_book_name().to_string();
        let chapter = self.selected_chapter;
        let version = VERSIONS[self.version_index].id.to_string();

        self.fetch_status = FetchStatus::Loading;
        self.current_chapter = None;
        self.reader_scroll = 0;
        self.pending_fetch = Some((book.clone(), chapter));

        // Spawn background task for the text fetch
        let fetcher = fetcher.clone();
        let tx = self.chapter_tx.clone();

        tokio::spawn(async move {
            let result = fetcher
                .fetch_chapter(&book, chapter, &version)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(ChapterResult { book, chapter, result }).await;
        });
    }

    /// Poll for a completed chapter fetch (non-blocking)
    pub fn poll_chapter_result(&mut self) {
        if let Ok(result) = self.chapter_rx.try_recv() {
            // Only apply the fetch we are actually waiting for
            if self.pending_fetch.as_ref() == Some(&(result.book.clone(), result.chapter)) {
                match result.result {
                    Ok(chapter) => {
                        self.current_chapter = Some(chapter);
                        self.fetch_status = FetchStatus::Loaded;
                    }
                    Err(e) => {
                        tracing::error!("Failed to fetch chapter text: {e}");
                        self.fetch_status = FetchStatus::Failed;
                    }
                }
                self.pending_fetch = None;
            }
        }
    }

    fn start_auth(&mut self, kind: PendingAuth) {
        if self.remote.is_none() {
            self.status_message = Some("No backend configured — guest mode only".to_string());
            return;
        }
        if self.session.is_authenticated() {
            self.status_message = Some("Already signed in (o to sign out)".to_string());
            return;
        }
        self.pending_auth = kind;
        self.input_mode = InputMode::Email;
        self.input_buffer.clear();
    }

    async fn confirm_input(&mut self) {
        match self.input_mode {
            InputMode::Name => {
                let name = self.input_buffer.trim().to_string();
                self.input_mode = InputMode::None;
                self.input_buffer.clear();
                if !name.is_empty() {
                    self.user_name = name;
                    if let Err(e) = self.local.set(keys::USER_NAME, &self.user_name).await {
                        tracing::warn!("Could not persist display name: {e}");
                    }
                }
            }
            InputMode::Email => {
                self.pending_email = Some(self.input_buffer.trim().to_string());
                self.input_buffer.clear();
                self.input_mode = InputMode::Password;
            }
            InputMode::Password => {
                let email = self.pending_email.take().unwrap_or_default();
                let password = std::mem::take(&mut self.input_buffer);
                self.input_mode = InputMode::None;
                self.authenticate(email, password).await;
            }
            InputMode::Search => {
                self.search_term = self.input_buffer.trim().to_string();
                self.input_buffer.clear();
                self.input_mode = InputMode::None;
                self.journal_selected = 0;
            }
            InputMode::JournalEdit | InputMode::None => {}
        }
    }

    async fn authenticate(&mut self, email: String, password: String) {
        let result = {
            let Some(remote) = &self.remote else {
                return;
            };
            match self.pending_auth {
                PendingAuth::SignIn => remote.sign_in(&email, &password).await,
                PendingAuth::SignUp => remote.sign_up(&email, &password).await,
            }
        };

        match result {
            Ok(auth) => {
                self.session.sign_in(auth.user.id, auth.access_token);
                if let Err(e) = self.reload_user_state().await {
                    // Signed in but the account data is unreachable; going
                    // back to guest beats showing the wrong store's data.
                    tracing::error!("Failed to load account data: {e}");
                    self.session.sign_out();
                    if let Err(e) = self.reload_user_state().await {
                        tracing::error!("Failed to reload guest data: {e}");
                    }
                    self.status_message =
                        Some("Could not load account data — staying signed out".to_string());
                } else {
                    self.status_message = Some(format!("Signed in as {email}"));
                }
            }
            Err(e) => {
                tracing::warn!("Authentication failed: {e}");
                self.status_message = Some(format!("Authentication failed: {e}"));
            }
        }
    }

    /// Re-point the in-memory view at whichever store the session now
    /// selects. Guest and account data are never merged.
    async fn reload_user_state(&mut self) -> Result<()> {
        let store = store_for(&self.local, &self.remote, &self.session);
        self.tracker.load(store, &self.session).await?;
        self.journal = store.load_journal(&self.session).await?;
        self.journal_selected = 0;
        Ok(())
    }

    fn edit_selected_entry(&mut self) {
        let dates = self.visible_journal_dates();
        let date = dates.get(self.journal_selected).copied().unwrap_or_else(today);
        self.begin_journal_edit(date);
    }

    fn begin_journal_edit(&mut self, date: NaiveDate) {
        self.journal_draft_date = date;
        self.journal_draft = self
            .journal
            .get(date)
            .map(|e| e.content.clone())
            .unwrap_or_default();
        self.input_mode = InputMode::JournalEdit;
    }

    async fn save_journal_draft(&mut self) {
        let date = self.journal_draft_date;
        let content = std::mem::take(&mut self.journal_draft);
        self.input_mode = InputMode::None;

        if content.trim().is_empty() {
            self.status_message = Some("Empty entry discarded".to_string());
            return;
        }

        // Title is preserved if the entry already had one
        let entry = JournalEntry {
            title: self.journal.get(date).and_then(|e| e.title.clone()),
            content: content.trim_end().to_string(),
        };

        let store = store_for(&self.local, &self.remote, &self.session);
        match store.save_journal_entry(&self.session, date, &entry).await {
            Ok(()) => {
                self.journal.upsert(date, entry);
                self.status_message = Some(format!("Saved entry for {date}"));
            }
            Err(e) => {
                tracing::error!("Failed to save journal entry: {e}");
                self.status_message = Some("Could not save journal entry".to_string());
            }
        }
    }

    async fn delete_selected_entry(&mut self) {
        let dates = self.visible_journal_dates();
        let Some(date) = dates.get(self.journal_selected).copied() else {
            return;
        };

        let store = store_for(&self.local, &self.remote, &self.session);
        match store.delete_journal_entry(&self.session, date).await {
            Ok(()) => {
                self.journal.delete(date);
                if self.journal_selected > 0 {
                    self.journal_selected -= 1;
                }
                self.status_message = Some(format!("Deleted entry for {date}"));
            }
            Err(e) => {
                tracing::error!("Failed to delete journal entry: {e}");
                self.status_message = Some("Could not delete journal entry".to_string());
            }
        }
    }

    fn export_journal(&mut self) {
        if self.journal.is_empty() {
            self.status_message = Some("Nothing to export".to_string());
            return;
        }
        let path = self
            .data_dir
            .join(format!("journal-export-{}.md", today()));
        match std::fs::write(&path, self.journal.to_markdown()) {
            Ok(()) => {
                self.status_message = Some(format!("Exported journal to {}", path.display()));
            }
            Err(e) => {
                tracing::error!("Journal export failed: {e}");
                self.status_message = Some("Journal export failed".to_string());
            }
        }
    }
}
