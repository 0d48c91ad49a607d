use std::time::{Duration, Instant};

use chat::{Input, Output};
use crossbeam::channel::TryRecvError;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout},
    style::Stylize,
    widgets::{Block, Paragraph},
    Frame, Terminal,
};

use crate::llm::im_channel::{Endpoint, Message, MessageRx, MessageTx, Token};

pub mod chat;

pub struct App {
    pub chat: chat::ChatComponent,
    character: String,
    tx: MessageTx,
    rx: MessageRx,
    sent_at: Option<Instant>,
    status: String,
}

impl App {
    pub fn new(character: &str, endpoint: Endpoint) -> Self {
        Self {
            chat: chat::ChatComponent::new(character),
            character: character.to_string(),
            tx: endpoint.tx,
            rx: endpoint.rx,
            sent_at: None,
            status: String::new(),
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ]);

        let [title_area, main_area, help_area, status_area] = vertical.areas(f.size());

        let title = Paragraph::new(format!("AI RPG - playing as {}", self.character))
            .bold()
            .alignment(Alignment::Center)
            .block(Block::bordered());
        f.render_widget(title, title_area);

        self.chat.render(f, main_area);

        let help_message = Paragraph::new(format!(
            "help: [Enter send] [F1 {}] [F2 {}] [Ctrl+L clear] [Esc+Esc quit]",
            chat::EXAMPLE_ACTIONS[0],
            chat::EXAMPLE_ACTIONS[1]
        ));
        f.render_widget(help_message, help_area);

        f.render_widget(Paragraph::new(self.status.as_str()).gray(), status_area);
    }

    fn on_token(&mut self, token: Token) {
        match &token {
            Token::Start => {}
            Token::End(_) => {
                let elapsed = self.sent_at.take().map(|t| t.elapsed()).unwrap_or_default();
                self.status = format!(
                    "last reply at {} ({:.1}s)",
                    chrono::Local::now().format("%H:%M:%S"),
                    elapsed.as_secs_f32()
                );
            }
            Token::Failed(_) => {
                self.sent_at = None;
                self.status = format!(
                    "generation failed at {}",
                    chrono::Local::now().format("%H:%M:%S")
                );
            }
        }
        self.chat.handler_input(Input::Message(token));
    }

    fn drain_replies(&mut self) -> anyhow::Result<()> {
        loop {
            match self.rx.try_recv() {
                Ok(Message::Assistant(token)) => self.on_token(token),
                Ok(Message::Action(_)) => {}
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(anyhow::anyhow!("narrator stopped unexpectedly"))
                }
            }
        }
    }

    pub fn run_loop(mut self) -> anyhow::Result<()> {
        // setup terminal
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut main_loop = || -> anyhow::Result<()> {
            loop {
                self.drain_replies()?;
                terminal.draw(|f| self.render(f))?;

                if !event::poll(Duration::from_millis(50))? {
                    continue;
                }

                match self.chat.handler_input(Input::Event(event::read()?)) {
                    Output::Exit => break,
                    Output::Submit(action) => {
                        log::debug!("player action: {action}");
                        self.sent_at = Some(Instant::now());
                        self.tx.send(Message::Action(action))?;
                    }
                    Output::Normal => {}
                }
            }
            Ok(())
        };

        let r = main_loop();

        // restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        r
    }
}
