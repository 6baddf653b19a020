use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Settled { request_id, outcome } => {
            app.session.settle(request_id, outcome);
            app.scroll_to_bottom();
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global keys that work in any state
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => submit(app, tx),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Record the question and send it on a background task. The answer comes
/// back through the event loop as `AppEvent::Settled`.
fn submit(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    if !app.input_enabled() {
        return;
    }

    let text = app.session.input.clone();
    let Some(pending) = app.session.submit(&text) else {
        return;
    };
    app.cursor = 0;

    // Scroll to bottom so "Thinking..." is visible
    app.scroll_to_bottom();

    let dispatcher = app.session.dispatcher().clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = dispatcher.dispatch(&pending).await;
        if tx.send(AppEvent::Settled { request_id: pending.id, outcome }).is_err() {
            tracing::debug!(request_id = pending.id, "event loop gone, dropping outcome");
        }
    });
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::session::{GREETING, PLACEHOLDER};
    use advisor_core::{ChatMessage, ConfigError, Dispatcher, RequestConfig};
    use crossterm::event::KeyEventKind;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str, tx: &UnboundedSender<AppEvent>) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)), tx);
        }
    }

    #[tokio::test]
    async fn test_enter_round_trip_through_event_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Dispatcher::unconfigured(
            ConfigError::DirectCallsDisabled,
            RequestConfig::default(),
        ));

        type_text(&mut app, "  night cream?  ", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx);

        assert!(!app.input_enabled());
        assert!(app.session.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.session.messages().last().unwrap().content, PLACEHOLDER);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Settled { .. }));
        handle_event(&mut app, event, &tx);

        assert!(app.input_enabled());
        assert_eq!(
            app.session.messages(),
            &[
                ChatMessage::assistant(GREETING),
                ChatMessage::user("night cream?"),
                ChatMessage::assistant(format!(
                    "Request failed: {}",
                    ConfigError::DirectCallsDisabled
                )),
            ]
        );
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Dispatcher::unconfigured(
            ConfigError::MissingApiKey,
            RequestConfig::default(),
        ));

        type_text(&mut app, "   ", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx);

        assert_eq!(app.session.messages().len(), 1);
        assert!(app.input_enabled());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Dispatcher::unconfigured(
            ConfigError::MissingApiKey,
            RequestConfig::default(),
        ));
        let mut event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        event.kind = KeyEventKind::Press;
        handle_event(&mut app, AppEvent::Key(event), &tx);
        assert!(app.should_quit);
        assert!(app.session.input.is_empty());
    }
}
