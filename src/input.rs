//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] mutations and to an [`Action`] the
//! main loop forwards to the pager.  Adding a new keybinding is a single
//! match arm in [`handle_key_event`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use wp_reader::pager::ScrollWindow;

use crate::app::App;

/// Work the key asks of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// The selection moved; run the scroll-proximity check.
    Scrolled(ScrollWindow),
    Refresh,
    NextLocation,
    AllPosts,
}

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    let scrolled = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit = true;
            return Action::None;
        }
        KeyCode::Char('r') => return Action::Refresh,
        KeyCode::Char('l') | KeyCode::Tab => return Action::NextLocation,
        KeyCode::Char('a') => return Action::AllPosts,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        _ => None,
    };
    scrolled.map_or(Action::None, Action::Scrolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::loaded_app;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys() {
        let mut app = App::new();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('q'))), Action::None);
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = loaded_app(3);
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press(KeyCode::Down)
        };
        assert_eq!(handle_key_event(&mut app, release), Action::None);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn down_reports_a_scroll() {
        let mut app = loaded_app(3);
        match handle_key_event(&mut app, press(KeyCode::Char('j'))) {
            Action::Scrolled(w) => assert_eq!(w.dy, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn engine_actions() {
        let mut app = App::new();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('r'))), Action::Refresh);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Tab)), Action::NextLocation);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('a'))), Action::AllPosts);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Down)), Action::None, "empty list");
    }
}
