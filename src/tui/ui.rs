use chrono::{Local, Timelike};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::bible::VERSIONS;
use crate::data;
use crate::models::FetchStatus;

use super::{BookFilter, InputMode, Tab, Theme};

fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Light => Color::Blue,
        Theme::Dark => Color::Magenta,
        Theme::Sunrise => Color::Yellow,
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header: title + streak
            Constraint::Length(1), // Tab bar
            Constraint::Min(0),    // Active tab body
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);

    match app.tab {
        Tab::Dashboard => render_dashboard(frame, app, chunks[2]),
        Tab::Reading => render_reading(frame, app, chunks[2]),
        Tab::Reader => render_reader(frame, app, chunks[2]),
        Tab::Journal => render_journal(frame, app, chunks[2]),
    }

    render_status(frame, app, chunks[3]);

    match app.input_mode {
        InputMode::Name => render_line_input(frame, app, " What should we call you? ", false),
        InputMode::Email => render_line_input(frame, app, " Email ", false),
        InputMode::Password => render_line_input(frame, app, " Password ", true),
        InputMode::Search => render_line_input(frame, app, " Search journal ", false),
        InputMode::JournalEdit | InputMode::None => {}
    }

    if app.show_help {
        render_help(frame, app);
    }
}

fn greeting() -> &'static str {
    match Local::now().hour() {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Verse Tracker ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(app.theme)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let who = if app.user_name.is_empty() {
        greeting().to_string()
    } else {
        format!("{}, {}", greeting(), app.user_name)
    };
    let account = if app.session.is_authenticated() {
        "signed in"
    } else {
        "guest"
    };

    let line = Line::from(vec![
        Span::styled(who, Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(
            format!("🔥 {} day streak", app.displayed_streak()),
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(account, Style::default().fg(Color::DarkGray)),
        Span::raw("  |  "),
        Span::styled(
            format!("theme: {}", app.theme.label()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for (i, tab) in [Tab::Dashboard, Tab::Reading, Tab::Reader, Tab::Journal]
        .into_iter()
        .enumerate()
    {
        let style = if tab == app.tab {
            Style::default()
                .fg(accent(app.theme))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {}:{} ", i + 1, tab.label()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress gauge
            Constraint::Min(0),    // Stats
        ])
        .split(area);

    let total = data::total_chapters();
    let read = app.tracker.progress().read_count() as u32;
    let percent = (read * 100) / total;

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Bible progress ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent(app.theme))),
        )
        .gauge_style(Style::default().fg(accent(app.theme)))
        .percent(percent as u16)
        .label(format!("{read} / {total} chapters ({percent}%)"));
    frame.render_widget(gauge, chunks[0]);

    let books_started = data::BOOKS
        .iter()
        .filter(|b| !app.tracker.progress().chapters(b.name).is_empty())
        .count();
    let books_finished = data::BOOKS
        .iter()
        .filter(|b| app.tracker.progress().chapters(b.name).len() as u32 == b.chapters)
        .count();
    let streak = app.tracker.streak();

    let mut lines = vec![
        Line::from(""),
        Line::from(format!("  Books started:  {books_started} / 66")),
        Line::from(format!("  Books finished: {books_finished} / 66")),
        Line::from(""),
        Line::from(format!("  Current streak: {} days", app.displayed_streak())),
    ];
    if let Some(last) = streak.last_read {
        lines.push(Line::from(format!("  Last read:      {last}")));
    } else {
        lines.push(Line::from("  Last read:      never — open the Reading tab!"));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "  Journal entries: {}",
        app.journal.len()
    )));

    let block = Block::default()
        .title(" At a glance ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

fn render_reading(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Book list
            Constraint::Ratio(2, 3), // Chapter grid
        ])
        .split(area);

    render_book_list(frame, app, chunks[0]);
    render_chapter_grid(frame, app, chunks[1]);
}

fn render_book_list(frame: &mut Frame, app: &App, area: Rect) {
    let visible = app.visible_books();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|&i| {
            let book = &data::BOOKS[i];
            let read = app.tracker.progress().chapters(book.name).len() as u32;
            let style = if read == book.chapters {
                Style::default().fg(Color::Green)
            } else if read > 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let line = Line::from(vec![
                Span::styled(format!("{:<18}", book.name), style),
                Span::styled(
                    format!("{read:>3}/{}", book.chapters),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let mut title = String::from(" Books");
    if app.book_filter != BookFilter::All {
        title.push_str(&format!(": {}", app.book_filter.label()));
    }
    if app.hide_completed {
        title.push_str(" (unfinished)");
    }
    title.push(' ');

    let border = if app.focus_chapters {
        Color::DarkGray
    } else {
        accent(app.theme)
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(visible.iter().position(|&i| i == app.selected_book));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_chapter_grid(frame: &mut Frame, app: &App, area: Rect) {
    let book = app.selected_book_name();
    let max = app.selected_book_chapters();

    let chapters: Vec<u32> = (1..=max).collect();
    let mut lines = vec![Line::from("")];
    for row in chapters.chunks(10) {
        let mut spans = vec![Span::raw(" ")];
        for &ch in row {
            let read = app.tracker.progress().contains(book, ch);
            let selected = ch == app.selected_chapter;
            let mut style = if read {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            if selected && app.focus_chapters {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(format!(" {ch:>3}"), style));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Enter/Space toggle read   v open in reader",
        Style::default().fg(Color::DarkGray),
    )));

    let border = if app.focus_chapters {
        accent(app.theme)
    } else {
        Color::DarkGray
    };
    let read_count = app.tracker.progress().chapters(book).len();
    let block = Block::default()
        .title(format!(" {book} — {read_count}/{max} read "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_reader(frame: &mut Frame, app: &App, area: Rect) {
    let version = VERSIONS[app.version_index];
    let title = format!(
        " {} {} ({}) ",
        app.selected_book_name(),
        app.selected_chapter,
        version.name
    );

    let width = area.width.saturating_sub(4).max(20) as usize;
    let lines: Vec<Line> = match app.fetch_status {
        FetchStatus::NotLoaded => vec![Line::from("Press v on a chapter to read it.")],
        FetchStatus::Loading => vec![Line::from("Loading chapter text...")],
        FetchStatus::Failed => vec![
            Line::from(Span::styled(
                "Could not fetch chapter text.",
                Style::default().fg(Color::Red),
            )),
            Line::from("Check your connection and press v to retry."),
        ],
        FetchStatus::NoBackend => vec![
            Line::from("No backend configured."),
            Line::from(""),
            Line::from("Add backend_url and backend_api_key to the config"),
            Line::from("file to enable the text reader."),
        ],
        FetchStatus::Loaded => match &app.current_chapter {
            Some(chapter) if chapter.verses.is_empty() => {
                // Valid empty result, not an error
                vec![Line::from("No text available for this chapter.")]
            }
            Some(chapter) => {
                let mut lines = Vec::new();
                for verse in &chapter.verses {
                    let text = format!("{:>3}  {}", verse.verse, verse.text);
                    for (i, wrapped) in textwrap::wrap(&text, width).into_iter().enumerate() {
                        let span = if i == 0 {
                            Span::raw(wrapped.into_owned())
                        } else {
                            Span::raw(format!("     {wrapped}"))
                        };
                        lines.push(Line::from(span));
                    }
                    lines.push(Line::from(""));
                }
                lines
            }
            None => vec![Line::from("No chapter loaded.")],
        },
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(app.theme)));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.reader_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_journal(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Entry list
            Constraint::Ratio(2, 3), // Entry content / editor
        ])
        .split(area);

    render_journal_list(frame, app, chunks[0]);
    if app.input_mode == InputMode::JournalEdit {
        render_journal_editor(frame, app, chunks[1]);
    } else {
        render_journal_entry(frame, app, chunks[1]);
    }
}

fn render_journal_list(frame: &mut Frame, app: &App, area: Rect) {
    let entries = app.journal.search(&app.search_term);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|(date, entry)| {
            let preview: String = entry.content.chars().take(30).collect();
            let line = Line::from(vec![
                Span::styled(date.to_string(), Style::default().fg(Color::White)),
                Span::styled(
                    format!("  {}", preview.replace('\n', " ")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let title = if app.search_term.is_empty() {
        format!(" Entries ({}) ", entries.len())
    } else {
        format!(" Entries matching '{}' ({}) ", app.search_term, entries.len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent(app.theme))),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !entries.is_empty() {
        state.select(Some(app.journal_selected.min(entries.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_journal_entry(frame: &mut Frame, app: &App, area: Rect) {
    let dates = app.visible_journal_dates();
    let (title, content) = match dates.get(app.journal_selected) {
        Some(date) => {
            let entry = app.journal.get(*date);
            let title = match entry.and_then(|e| e.title.as_deref()) {
                Some(t) => format!(" {date} — {t} "),
                None => format!(" {date} "),
            };
            let content = entry.map(|e| e.content.clone()).unwrap_or_default();
            (title, content)
        }
        None => (
            " Journal ".to_string(),
            "No entries yet.\n\nPress e to write today's reflection.".to_string(),
        ),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_journal_editor(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(
            " Editing {} — Esc save, Ctrl-X discard ",
            app.journal_draft_date
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text = format!("{}_", app.journal_draft);
    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(message) = &app.status_message {
        message.clone()
    } else {
        match app.tab {
            Tab::Dashboard => "Tab:switch  t:theme  i:sign in  u:sign up  o:sign out  ?:help  q:quit",
            Tab::Reading => "j/k:books  h/l:chapters  Enter:toggle  f:filter  c:unfinished  v:read  q:quit",
            Tab::Reader => "[/]:chapter  b:version  j/k:scroll  ?:help  q:quit",
            Tab::Journal => "j/k:nav  e:today  Enter:edit  d:delete  /:search  x:export  q:quit",
        }
        .to_string()
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_line_input(frame: &mut Frame, app: &App, title: &str, mask: bool) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let shown = if mask {
        "*".repeat(app.input_buffer.chars().count())
    } else {
        app.input_buffer.clone()
    };
    let paragraph =
        Paragraph::new(format!("> {shown}_")).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 70, frame.area());

    let help_text = vec![
        "",
        " Navigation:",
        "   Tab / 1-4  Switch tab",
        "   j / ↓      Move down",
        "   k / ↑      Move up",
        "   h / l      Books <-> chapters, prev/next",
        "",
        " Reading:",
        "   Enter/Space  Toggle chapter read",
        "   v            Open chapter in reader",
        "   [ / ]        Previous / next chapter",
        "   b            Cycle Bible version",
        "   f            Filter: all / Old / New Testament",
        "   c            Hide finished books",
        "",
        " Journal:",
        "   e        Edit today's entry",
        "   Enter    Edit selected entry",
        "   d        Delete selected entry",
        "   /        Search entries",
        "   x        Export to markdown",
        "",
        " Account:",
        "   i        Sign in",
        "   u        Sign up",
        "   o        Sign out",
        "",
        " General:",
        "   t        Cycle theme",
        "   n        Change display name",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(app.theme)));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
