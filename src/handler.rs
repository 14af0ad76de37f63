use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Overlay};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { request_id, result } => app.on_reply(request_id, result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any overlay
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('n') => {
                app.overlay = Overlay::None;
                app.new_chat();
                return;
            }
            _ => {}
        }
    }

    app.notice = None;
    match app.overlay {
        Overlay::None => handle_input(app, key),
        Overlay::Menu => handle_menu(app, key),
        Overlay::Settings => handle_settings(app, key),
    }
}

fn handle_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Down | KeyCode::Char('j') => app.menu_nav_down(),
        KeyCode::Up | KeyCode::Char('k') => app.menu_nav_up(),
        KeyCode::Enter => app.select_menu_item(),
        _ => {}
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Down | KeyCode::Char('j') => app.theme_nav_down(),
        KeyCode::Up | KeyCode::Char('k') => app.theme_nav_up(),
        KeyCode::Enter => app.select_theme(),
        _ => {}
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.toggle_menu(),
        KeyCode::Enter => app.submit(),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat || app.overlay != Overlay::None {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdee_core::{ChatSession, Config, ThemeStore};
    use crossterm::event::KeyEventKind;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn app(dir: &TempDir) -> App {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.webhook_url = "http://127.0.0.1:9/webhook".to_string();
        let session = ChatSession::create(&config, ThemeStore::at(dir.path().join("settings.json")));
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(session, tx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("één", 1), 2);
        assert_eq!(char_to_byte_index("één", 3), "één".len());
    }

    #[test]
    fn test_typing_and_editing() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        type_text(&mut app, "héllo");
        assert_eq!(app.input, "héllo");
        assert_eq!(app.cursor, 5);

        handle_event(&mut app, key(KeyCode::Left)).unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input, "hélo");

        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Delete)).unwrap();
        assert_eq!(app.input, "élo");
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_escape_opens_and_closes_menu() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.overlay, Overlay::Menu);
        type_text(&mut app, "x");
        assert!(app.input.is_empty());

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn test_menu_settings_then_theme() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, key(KeyCode::Down)).unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.overlay, Overlay::Settings);

        handle_event(&mut app, key(KeyCode::Down)).unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.session.theme().as_str(), "light");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let mut event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        event.kind = KeyEventKind::Press;

        handle_event(&mut app, AppEvent::Key(event)).unwrap();
        assert!(app.should_quit);
    }
}
