use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{InputMode, Tab};

#[derive(Debug, Clone)]
pub enum AppAction {
    Quit,
    NextTab,
    SelectTab(Tab),
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ToggleChapter,
    OpenReader,
    PrevChapter,
    NextChapter,
    CycleBookFilter,
    ToggleHideCompleted,
    CycleVersion,
    CycleTheme,
    StartNameInput,
    StartSignIn,
    StartSignUp,
    SignOut,
    EditJournal,
    DeleteJournalEntry,
    StartSearch,
    ExportJournal,
    ShowHelp,
    HideHelp,
    // Single-line input actions (name, email, password, search)
    InputChar(char),
    InputBackspace,
    InputConfirm,
    InputCancel,
    // Journal editor actions
    JournalChar(char),
    JournalNewline,
    JournalBackspace,
    JournalSave,
    JournalDiscard,
}

pub fn handle_key_event(key: KeyEvent, input_mode: InputMode, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    // Journal editor mode: Esc saves (the entry editor auto-saves, like a
    // blur event), Ctrl-X discards.
    if input_mode == InputMode::JournalEdit {
        return match (key.code, key.modifiers) {
            (KeyCode::Char('x'), KeyModifiers::CONTROL) => Some(AppAction::JournalDiscard),
            (KeyCode::Esc, _) => Some(AppAction::JournalSave),
            (KeyCode::Enter, _) => Some(AppAction::JournalNewline),
            (KeyCode::Backspace, _) => Some(AppAction::JournalBackspace),
            (KeyCode::Char(c), _) => Some(AppAction::JournalChar(c)),
            _ => None,
        };
    }

    // Single-line input modes
    if input_mode != InputMode::None {
        return match key.code {
            KeyCode::Enter => Some(AppAction::InputConfirm),
            KeyCode::Esc => Some(AppAction::InputCancel),
            KeyCode::Backspace => Some(AppAction::InputBackspace),
            KeyCode::Char(c) => Some(AppAction::InputChar(c)),
            _ => None,
        };
    }

    // Normal mode
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Tab, _) => Some(AppAction::NextTab),
        (KeyCode::Char('1'), _) => Some(AppAction::SelectTab(Tab::Dashboard)),
        (KeyCode::Char('2'), _) => Some(AppAction::SelectTab(Tab::Reading)),
        (KeyCode::Char('3'), _) => Some(AppAction::SelectTab(Tab::Reader)),
        (KeyCode::Char('4'), _) => Some(AppAction::SelectTab(Tab::Journal)),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(AppAction::MoveLeft),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(AppAction::MoveRight),

        (KeyCode::Enter, _) | (KeyCode::Char(' '), _) => Some(AppAction::ToggleChapter),
        (KeyCode::Char('v'), _) => Some(AppAction::OpenReader),
        (KeyCode::Char('['), _) => Some(AppAction::PrevChapter),
        (KeyCode::Char(']'), _) => Some(AppAction::NextChapter),
        (KeyCode::Char('b'), _) => Some(AppAction::CycleVersion),
        (KeyCode::Char('f'), _) => Some(AppAction::CycleBookFilter),
        (KeyCode::Char('c'), KeyModifiers::NONE) => Some(AppAction::ToggleHideCompleted),

        (KeyCode::Char('t'), _) => Some(AppAction::CycleTheme),
        (KeyCode::Char('n'), _) => Some(AppAction::StartNameInput),
        (KeyCode::Char('i'), _) => Some(AppAction::StartSignIn),
        (KeyCode::Char('u'), _) => Some(AppAction::StartSignUp),
        (KeyCode::Char('o'), _) => Some(AppAction::SignOut),

        (KeyCode::Char('e'), _) => Some(AppAction::EditJournal),
        (KeyCode::Char('d'), _) => Some(AppAction::DeleteJournalEntry),
        (KeyCode::Char('/'), _) => Some(AppAction::StartSearch),
        (KeyCode::Char('x'), _) => Some(AppAction::ExportJournal),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn any_key_closes_help() {
        let action = handle_key_event(key(KeyCode::Char('z')), InputMode::None, true);
        assert!(matches!(action, Some(AppAction::HideHelp)));
    }

    #[test]
    fn input_mode_captures_characters() {
        let action = handle_key_event(key(KeyCode::Char('q')), InputMode::Email, false);
        assert!(matches!(action, Some(AppAction::InputChar('q'))));
    }

    #[test]
    fn journal_editor_saves_on_escape() {
        let action = handle_key_event(key(KeyCode::Esc), InputMode::JournalEdit, false);
        assert!(matches!(action, Some(AppAction::JournalSave)));
        let action = handle_key_event(key(KeyCode::Enter), InputMode::JournalEdit, false);
        assert!(matches!(action, Some(AppAction::JournalNewline)));
    }

    #[test]
    fn book_list_filter_keys() {
        let action = handle_key_event(key(KeyCode::Char('f')), InputMode::None, false);
        assert!(matches!(action, Some(AppAction::CycleBookFilter)));
        let action = handle_key_event(key(KeyCode::Char('c')), InputMode::None, false);
        assert!(matches!(action, Some(AppAction::ToggleHideCompleted)));
    }

    #[test]
    fn space_toggles_in_normal_mode() {
        let action = handle_key_event(key(KeyCode::Char(' ')), InputMode::None, false);
        assert!(matches!(action, Some(AppAction::ToggleChapter)));
    }
}
