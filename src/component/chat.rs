use std::collections::LinkedList;

use crossterm::event::{
    Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Position;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::llm::im_channel::Token;
use crate::session::START_SENTINEL;
use crate::sys::llm::{Content, Role};

pub const EXAMPLE_ACTIONS: [&str; 2] = ["Look around", "Continue the story"];

const THOUGHT_MARK: &str = "***";

/// Splits `***thought***` spans out of a reply. `true` marks a thought;
/// an unclosed marker is left as plain text.
pub fn split_thoughts(text: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(THOUGHT_MARK) {
        let after = &rest[start + THOUGHT_MARK.len()..];
        let Some(end) = after.find(THOUGHT_MARK) else {
            break;
        };
        if start > 0 {
            segments.push((false, &rest[..start]));
        }
        if end > 0 {
            segments.push((true, &after[..end]));
        }
        rest = &after[end + THOUGHT_MARK.len()..];
    }
    if !rest.is_empty() {
        segments.push((false, rest));
    }
    segments
}

fn wrap_message(message: &str, max_len: usize, style: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut len = 0;

    for (thought, segment) in split_thoughts(message) {
        let span_style = if thought {
            style.add_modifier(Modifier::BOLD | Modifier::ITALIC)
        } else {
            style
        };
        let mut s = String::with_capacity(segment.len());
        for c in segment.chars() {
            if c != '\n' {
                s.push(c);
                len += if c.is_ascii() { 1 } else { 2 };
            }
            if len >= max_len || c == '\n' {
                spans.push(Span::styled(std::mem::take(&mut s), span_style));
                lines.push(Line::from(std::mem::take(&mut spans)));
                len = 0;
            }
        }
        if !s.is_empty() {
            spans.push(Span::styled(s, span_style));
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "YOU",
        Role::Assistant => "NARRATOR",
        Role::System => "GAME",
    }
}

pub struct MessagesComponent {
    pub contents: LinkedList<Content>,
    title: String,
    cursor: (u16, u16),
    last_mouse_event: MouseEvent,
    lock_on_bottom: bool,
    area: Rect,
    active: bool,
}

impl MessagesComponent {
    pub fn new(title: String) -> Self {
        Self {
            contents: LinkedList::new(),
            title,
            cursor: (0, 0),
            lock_on_bottom: true,
            active: true,
            area: Rect::default(),
            last_mouse_event: MouseEvent {
                row: 0,
                column: 0,
                kind: MouseEventKind::Moved,
                modifiers: KeyModifiers::empty(),
            },
        }
    }

    fn update_active(&mut self, event: MouseEvent) {
        if event.kind == MouseEventKind::Down(MouseButton::Left) {
            self.active = self.area.contains(Position::new(event.column, event.row))
        }
        if event.kind == MouseEventKind::Drag(MouseButton::Left) && self.active {
            self.move_scoll(event);
        }
        self.last_mouse_event = event;
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.area = area;
        let max_len = (area.width.max(3) - 2) as usize;

        let mut text = Text::default();
        for content in &self.contents {
            let style = match content.role {
                Role::Assistant => Style::new().fg(Color::Cyan),
                Role::User => Style::new().fg(Color::Yellow),
                Role::System => Style::new().fg(Color::Gray),
            };
            text.extend([Line::styled(format!("{}:", speaker(content.role)), style.bold())]);
            text.extend(wrap_message(&content.message, max_len, style));
            text.extend([Line::default()]);
        }

        let line_n = text.lines.len();

        let max_line = area.height.saturating_sub(2) as usize;
        if line_n > max_line {
            let max_cursor = line_n - max_line;
            if self.cursor.0 >= max_cursor as u16 {
                self.lock_on_bottom = true;
            }

            if self.lock_on_bottom {
                self.cursor.0 = max_cursor as u16;
            }
        } else {
            self.cursor.0 = 0;
        }

        let paragraph = Paragraph::new(text)
            .block(Block::bordered().title(self.title.as_str()).gray())
            .scroll(self.cursor);
        frame.render_widget(paragraph, area);
    }

    pub fn move_scoll(&mut self, event: MouseEvent) {
        let (delta_y, delta_x) = (
            event.row as i16 - self.last_mouse_event.row as i16,
            event.column as i16 - self.last_mouse_event.column as i16,
        );
        if delta_x != 0 {
            self.cursor.1 = (self.cursor.1 as i16 - delta_x).max(0) as u16;
        }
        if delta_y != 0 {
            self.cursor.0 = (self.cursor.0 as i16 - delta_y).max(0) as u16;
            self.lock_on_bottom = false;
        }
    }

    pub fn handler_input(&mut self, input: Input) {
        if let Input::Event(Event::Mouse(event)) = input {
            match event.kind {
                MouseEventKind::ScrollDown => {
                    if event.modifiers.contains(KeyModifiers::CONTROL) {
                        self.cursor.1 += 6;
                    } else {
                        self.cursor.0 += 3;
                    }
                }
                MouseEventKind::ScrollUp => {
                    if event.modifiers.contains(KeyModifiers::CONTROL) {
                        self.cursor.1 = self.cursor.1.max(6) - 6;
                    } else {
                        self.cursor.0 = self.cursor.0.max(3) - 3;
                        self.lock_on_bottom = false;
                    }
                }
                _ => {}
            }
            self.update_active(event);
        }
    }
}

pub struct ChatComponent {
    pub messages: MessagesComponent,
    input: TextArea<'static>,
    started: bool,
    waiting: bool,
    exit_n: u8,
}

#[derive(Debug)]
pub enum Input {
    Event(Event),
    Message(Token),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Output {
    Exit,
    Submit(String),
    Normal,
}

impl ChatComponent {
    pub fn new(character: &str) -> Self {
        let mut messages = MessagesComponent::new(format!("{character}'s story"));
        messages.contents.push_back(Content::system(format!(
            "You are playing as {character}. Type '{START_SENTINEL}' to begin."
        )));

        Self {
            messages,
            input: Self::new_textarea(false),
            started: false,
            waiting: false,
            exit_n: 0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let vertical = Layout::vertical([Constraint::Min(5), Constraint::Length(5)]);
        let [messages_area, input_area] = vertical.areas(area);

        self.messages.render(frame, messages_area);

        let title = if self.waiting {
            "The story is being written..."
        } else if self.started {
            "What do you do next?"
        } else {
            "Input"
        };
        self.input.set_block(Block::bordered().title(title).gray());
        frame.render_widget(&self.input, input_area);
    }

    fn new_textarea(started: bool) -> TextArea<'static> {
        let mut textarea = TextArea::default();
        if !started {
            textarea.set_placeholder_text(format!("Type '{START_SENTINEL}' to begin"));
        }
        textarea
    }

    fn set_input(&mut self, action: &str) {
        self.input.select_all();
        self.input.cut();
        self.input.insert_str(action);
    }

    fn submit_message(&mut self) -> Option<String> {
        if self.waiting {
            return None;
        }
        let message = self.input.lines().join("\n");
        if message.trim().is_empty() {
            return None;
        }

        self.input = Self::new_textarea(true);
        self.started = true;
        self.waiting = true;
        self.messages.contents.push_back(Content::user(message.clone()));
        self.messages.lock_on_bottom = true;
        Some(message)
    }

    /// Clears what is shown; the session itself is untouched.
    fn clear(&mut self) {
        self.messages.contents.clear();
        self.messages.cursor = (0, 0);
        self.messages.lock_on_bottom = true;
    }

    fn handler_token(&mut self, token: Token) {
        match token {
            Token::Start => {
                self.messages.contents.push_back(Content::assistant("..."));
            }
            Token::End(reply) => {
                self.waiting = false;
                self.replace_pending(Content::assistant(reply));
            }
            Token::Failed(reason) => {
                self.waiting = false;
                self.replace_pending(Content::system(reason));
            }
        }
        self.messages.lock_on_bottom = true;
    }

    fn replace_pending(&mut self, content: Content) {
        match self.messages.contents.back_mut() {
            Some(last) if last.role == Role::Assistant && last.message == "..." => *last = content,
            _ => self.messages.contents.push_back(content),
        }
    }

    pub fn handler_input(&mut self, input: Input) -> Output {
        let is_event = matches!(&input, Input::Event(..));

        match input {
            Input::Event(Event::Key(key)) if key.kind != KeyEventKind::Press => {}
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Enter
                    || (key.code == KeyCode::Char('j')
                        && key.modifiers.contains(KeyModifiers::CONTROL)) =>
            {
                if let Some(message) = self.submit_message() {
                    return Output::Submit(message);
                }
            }
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('l')
                    && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.clear();
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::F(1) => {
                self.set_input(EXAMPLE_ACTIONS[0]);
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::F(2) => {
                self.set_input(EXAMPLE_ACTIONS[1]);
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::Esc => {
                self.exit_n += 2;
                if self.exit_n >= 3 {
                    return Output::Exit;
                }
            }
            Input::Event(Event::Key(key)) => {
                self.input.input(key);
            }
            Input::Message(token) => {
                self.handler_token(token);
            }
            input => {
                self.messages.handler_input(input);
            }
        }

        if is_event {
            self.exit_n = self.exit_n.max(1) - 1;
        }
        Output::Normal
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEvent;

    use super::*;

    fn key(code: KeyCode) -> Input {
        Input::Event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_str(chat: &mut ChatComponent, s: &str) {
        for c in s.chars() {
            chat.handler_input(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn splits_thought_spans() {
        assert_eq!(
            split_thoughts("You pause. ***What if I fail?*** Then you breathe."),
            vec![
                (false, "You pause. "),
                (true, "What if I fail?"),
                (false, " Then you breathe."),
            ]
        );
        assert_eq!(split_thoughts("***only***"), vec![(true, "only")]);
        assert_eq!(split_thoughts("a ***b"), vec![(false, "a ***b")]);
        assert!(split_thoughts("").is_empty());
    }

    #[test]
    fn wraps_at_width_and_newlines() {
        let lines = wrap_message("abcdef\ngh", 4, Style::new());
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(rendered, vec!["abcd", "ef", "gh"]);
    }

    #[test]
    fn thought_spans_are_emphasised() {
        let lines = wrap_message("calm ***panic*** calm", 80, Style::new());
        assert_eq!(lines.len(), 1);
        let thought = &lines[0].spans[1];
        assert_eq!(thought.content, "panic");
        assert!(thought.style.add_modifier.contains(Modifier::BOLD | Modifier::ITALIC));
    }

    #[test]
    fn enter_submits_once_until_reply() {
        let mut chat = ChatComponent::new("Elara");
        type_str(&mut chat, "start game");
        assert_eq!(
            chat.handler_input(key(KeyCode::Enter)),
            Output::Submit("start game".into())
        );
        assert!(chat.is_waiting());

        type_str(&mut chat, "look around");
        assert_eq!(chat.handler_input(key(KeyCode::Enter)), Output::Normal);

        chat.handler_input(Input::Message(Token::Start));
        chat.handler_input(Input::Message(Token::End("You wake.".into())));
        assert!(!chat.is_waiting());
        assert_eq!(
            chat.messages.contents.back(),
            Some(&Content::assistant("You wake."))
        );
        assert_eq!(
            chat.handler_input(key(KeyCode::Enter)),
            Output::Submit("look around".into())
        );
    }

    #[test]
    fn empty_input_is_not_submitted() {
        let mut chat = ChatComponent::new("Elara");
        type_str(&mut chat, "   ");
        assert_eq!(chat.handler_input(key(KeyCode::Enter)), Output::Normal);
        assert!(!chat.is_waiting());
    }

    #[test]
    fn failure_replaces_pending_reply_with_notice() {
        let mut chat = ChatComponent::new("Elara");
        type_str(&mut chat, "open the door");
        chat.handler_input(key(KeyCode::Enter));
        chat.handler_input(Input::Message(Token::Start));
        chat.handler_input(Input::Message(Token::Failed(
            "generation unavailable: request timed out".into(),
        )));

        let last = chat.messages.contents.back().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.message.contains("timed out"));
        assert!(!chat.is_waiting());
    }

    #[test]
    fn example_action_fills_input() {
        let mut chat = ChatComponent::new("Elara");
        chat.handler_input(key(KeyCode::F(2)));
        assert_eq!(
            chat.handler_input(key(KeyCode::Enter)),
            Output::Submit("Continue the story".into())
        );
    }

    #[test]
    fn double_escape_exits() {
        let mut chat = ChatComponent::new("Elara");
        assert_eq!(chat.handler_input(key(KeyCode::Esc)), Output::Normal);
        assert_eq!(chat.handler_input(key(KeyCode::Esc)), Output::Exit);
    }

    #[test]
    fn clear_only_empties_the_view() {
        let mut chat = ChatComponent::new("Elara");
        assert!(!chat.messages.contents.is_empty());
        chat.handler_input(Input::Event(Event::Key(KeyEvent::new(
            KeyCode::Char('l'),
            KeyModifiers::CONTROL,
        ))));
        assert!(chat.messages.contents.is_empty());
    }
}
