use airdee_core::theme::THEME_CHOICES;
use airdee_core::{AirdeeResult, ChatSession, ConversationEvent, Effect, Theme, WebhookReply};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Menu,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    NewChat,
    Settings,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::NewChat, MenuItem::Settings, MenuItem::Quit];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::NewChat => "Nieuwe chat",
            MenuItem::Settings => "Instellingen",
            MenuItem::Quit => "Afsluiten",
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Chat log
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Overlays
    pub overlay: Overlay,
    pub menu_state: ListState,
    pub theme_state: ListState,

    /// One-line message shown in the footer until the next key press.
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(session: ChatSession, events: UnboundedSender<AppEvent>) -> Self {
        let mut menu_state = ListState::default();
        menu_state.select(Some(0));

        Self {
            should_quit: false,
            session,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            follow_bottom: true,
            chat_area: None,
            overlay: Overlay::None,
            menu_state,
            theme_state: ListState::default(),
            notice: None,
            animation_frame: 0,
            events,
        }
    }

    pub fn into_session(self) -> ChatSession {
        self.session
    }

    pub fn is_sending(&self) -> bool {
        self.session.conversation().is_sending()
    }

    /// Submit the input line. While a request is in flight the input is kept.
    pub fn submit(&mut self) {
        let effect = self
            .session
            .conversation_mut()
            .dispatch(ConversationEvent::Submit(self.input.clone()));

        match effect {
            Effect::Send {
                request_id,
                question,
            } => {
                self.input.clear();
                self.cursor = 0;
                self.follow_bottom = true;
                self.spawn_request(request_id, question);
            }
            Effect::Busy => {
                self.notice = Some("Even geduld, het vorige antwoord komt nog.".to_string());
            }
            _ => {}
        }
    }

    fn spawn_request(&self, request_id: u64, question: String) {
        let webhook = self.session.webhook().clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = webhook.send(&question).await;
            // The receiver is gone once the app has quit.
            let _ = events.send(AppEvent::Reply { request_id, result });
        });
    }

    pub fn on_reply(&mut self, request_id: u64, result: AirdeeResult<WebhookReply>) {
        let effect = self
            .session
            .conversation_mut()
            .dispatch(ConversationEvent::from_reply(request_id, result));
        if matches!(effect, Effect::Settled(_)) {
            self.follow_bottom = true;
        }
    }

    pub fn new_chat(&mut self) {
        self.session.reset();
        self.input.clear();
        self.cursor = 0;
        self.chat_scroll = 0;
        self.follow_bottom = true;
        self.notice = None;
    }

    pub fn tick_animation(&mut self) {
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    // Menu

    pub fn toggle_menu(&mut self) {
        self.overlay = match self.overlay {
            Overlay::None => Overlay::Menu,
            _ => Overlay::None,
        };
    }

    pub fn menu_nav_down(&mut self) {
        let i = self.menu_state.selected().unwrap_or(0);
        self.menu_state
            .select(Some((i + 1).min(MenuItem::ALL.len() - 1)));
    }

    pub fn menu_nav_up(&mut self) {
        let i = self.menu_state.selected().unwrap_or(0);
        self.menu_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_menu_item(&mut self) {
        let Some(item) = self.menu_state.selected().and_then(|i| MenuItem::ALL.get(i).copied()) else {
            return;
        };

        self.overlay = Overlay::None;
        match item {
            MenuItem::NewChat => self.new_chat(),
            MenuItem::Settings => self.open_settings(),
            MenuItem::Quit => self.should_quit = true,
        }
    }

    // Settings

    pub fn open_settings(&mut self) {
        let current = self.session.theme().as_str().to_string();
        let selected = THEME_CHOICES
            .iter()
            .position(|name| *name == current)
            .unwrap_or(0);
        self.theme_state.select(Some(selected));
        self.overlay = Overlay::Settings;
    }

    pub fn theme_nav_down(&mut self) {
        let i = self.theme_state.selected().unwrap_or(0);
        self.theme_state
            .select(Some((i + 1).min(THEME_CHOICES.len() - 1)));
    }

    pub fn theme_nav_up(&mut self) {
        let i = self.theme_state.selected().unwrap_or(0);
        self.theme_state.select(Some(i.saturating_sub(1)));
    }

    /// Apply and persist the highlighted theme.
    pub fn select_theme(&mut self) {
        let Some(name) = self.theme_state.selected().and_then(|i| THEME_CHOICES.get(i).copied()) else {
            return;
        };

        if let Err(e) = self.session.set_theme(Theme::parse(name)) {
            tracing::warn!(error = %e, "could not save theme");
            self.notice = Some(format!("Thema niet opgeslagen: {e}"));
        }
        self.overlay = Overlay::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdee_core::{ChatRole, Config, ConversationState, ThemeStore};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn app(dir: &TempDir) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let mut config = Config::from_lookup(|_| None).unwrap();
        // Nothing listens on the discard port.
        config.webhook_url = "http://127.0.0.1:9/webhook".to_string();
        let session = ChatSession::create(&config, ThemeStore::at(dir.path().join("settings.json")));
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(session, tx), rx)
    }

    #[tokio::test]
    async fn test_submit_sends_and_reply_settles() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = app(&dir);

        app.input = "  Hallo ".to_string();
        app.cursor = 8;
        app.submit();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_sending());

        // Skip anything but the reply from the spawned request.
        let (request_id, result) = loop {
            if let Some(AppEvent::Reply { request_id, result }) = rx.recv().await {
                break (request_id, result);
            }
        };
        app.on_reply(request_id, result);

        assert!(!app.is_sending());
        let messages = app.session.conversation().transcript().all();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].raw_text, "Hallo");
        assert_eq!(messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_submit_while_sending_keeps_input() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);

        app.input = "eerste".to_string();
        app.submit();
        app.input = "tweede".to_string();
        app.submit();

        assert_eq!(app.input, "tweede");
        assert!(app.notice.is_some());
        assert_eq!(app.session.conversation().transcript().len(), 1);
    }

    #[test]
    fn test_empty_submit_does_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);

        app.input = "   ".to_string();
        app.submit();
        assert_eq!(app.session.conversation().state(), ConversationState::Idle);
        assert!(app.session.conversation().transcript().is_empty());
    }

    #[tokio::test]
    async fn test_menu_new_chat_clears_conversation() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);
        app.input = "vraag".to_string();
        app.submit();

        app.toggle_menu();
        assert_eq!(app.overlay, Overlay::Menu);
        app.select_menu_item();

        assert_eq!(app.overlay, Overlay::None);
        assert!(!app.is_sending());
        assert!(app.session.conversation().transcript().is_empty());
    }

    #[test]
    fn test_menu_navigation_is_clamped() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);

        app.menu_nav_up();
        assert_eq!(app.menu_state.selected(), Some(0));
        for _ in 0..5 {
            app.menu_nav_down();
        }
        assert_eq!(app.menu_state.selected(), Some(2));

        app.select_menu_item();
        assert!(app.should_quit);
    }

    #[test]
    fn test_settings_select_persists_theme() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);

        app.open_settings();
        assert_eq!(app.overlay, Overlay::Settings);
        assert_eq!(app.theme_state.selected(), Some(0));

        app.theme_nav_down();
        app.theme_nav_down();
        app.select_theme();

        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.session.theme(), &Theme::parse("dark"));
        let stored = ThemeStore::at(dir.path().join("settings.json")).load();
        assert_eq!(stored, Theme::parse("dark"));

        app.open_settings();
        assert_eq!(app.theme_state.selected(), Some(2));
    }

    #[test]
    fn test_scroll_up_stops_following() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app(&dir);
        app.chat_scroll = 3;

        app.scroll_up(5);
        assert_eq!(app.chat_scroll, 0);
        assert!(!app.follow_bottom);
    }
}
