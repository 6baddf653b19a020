use advisor_core::{Dispatcher, Session};
use ratatui::layout::Rect;

pub struct App {
    pub should_quit: bool,
    pub session: Session,

    // Input line
    pub cursor: usize, // cursor position in session.input, in chars

    // Chat log viewport
    pub scroll: u16,
    pub follow_bottom: bool, // Re-pin to the newest line whenever the log grows
    pub chat_lines: u16,  // Wrapped height of the log, measured during render
    pub chat_height: u16, // Inner height of the log pane for scroll calculations
    pub chat_width: u16,  // Inner width of the log pane for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub model: String,
}

impl App {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let model = dispatcher.request_config().model.clone();
        Self {
            should_quit: false,
            session: Session::new(dispatcher),
            cursor: 0,
            scroll: 0,
            follow_bottom: true,
            chat_lines: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            model,
        }
    }

    /// Whether the input line and submit key currently accept anything.
    pub fn input_enabled(&self) -> bool {
        !self.session.is_busy()
    }

    pub fn tick_animation(&mut self) {
        if self.session.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.scroll == self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_bottom = self.scroll == self.max_scroll();
    }

    /// Keep the newest message on the bottom line of the log pane, including
    /// after the next render re-measures the log.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll = self.max_scroll();
    }

    /// Record the wrapped height of the log as measured by `ui::render`.
    pub fn update_chat_lines(&mut self, lines: u16) {
        self.chat_lines = lines;
        if self.follow_bottom {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }

    // Input line editing, all positions in chars

    pub fn insert_char(&mut self, c: char) {
        if !self.input_enabled() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.session.input, self.cursor);
        self.session.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if !self.input_enabled() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.session.input, self.cursor);
        self.session.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if !self.input_enabled() {
            return;
        }
        let char_count = self.session.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.session.input, self.cursor);
            self.session.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.session.input.chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{ConfigError, RequestConfig};

    fn app() -> App {
        App::new(Dispatcher::unconfigured(
            ConfigError::MissingApiKey,
            RequestConfig::default(),
        ))
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("Oréal", 2), 2);
        assert_eq!(char_to_byte_index("Oréal", 3), 4);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_with_multibyte_chars() {
        let mut app = app();
        for c in "Orl".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.insert_char('é');
        app.insert_char('a');
        assert_eq!(app.session.input, "Oréal");

        app.cursor_end();
        app.backspace();
        assert_eq!(app.session.input, "Oréa");

        app.cursor_home();
        app.delete();
        assert_eq!(app.session.input, "réa");
    }

    #[test]
    fn test_input_rejected_while_busy() {
        let mut app = app();
        app.session.submit("hello");
        assert!(!app.input_enabled());

        app.insert_char('x');
        assert!(app.session.input.is_empty());
    }

    #[test]
    fn test_follow_bottom_tracks_log_growth() {
        let mut app = app();
        app.chat_height = 4;

        app.update_chat_lines(30);
        assert_eq!(app.scroll, 26);

        app.scroll_up(5);
        assert_eq!(app.scroll, 21);
        assert!(!app.follow_bottom);
        app.update_chat_lines(40);
        assert_eq!(app.scroll, 21);

        app.scroll_down(100);
        assert_eq!(app.scroll, 36);
        assert!(app.follow_bottom);
        app.update_chat_lines(50);
        assert_eq!(app.scroll, 46);
    }

    #[test]
    fn test_scroll_to_bottom_repins_after_scrolling_up() {
        let mut app = app();
        app.chat_height = 10;
        app.update_chat_lines(25);
        app.scroll_up(100);
        assert_eq!(app.scroll, 0);

        app.scroll_to_bottom();
        app.update_chat_lines(31);
        assert_eq!(app.scroll, 21);
    }

    #[test]
    fn test_animation_only_ticks_while_busy() {
        let mut app = app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.session.submit("hello");
        app.tick_animation();
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
