use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use crate::llm::im_channel::{Message, MessageRx, MessageTx, Token};
use crate::session::START_SENTINEL;
use crate::sys::llm::{Content, GenerationError, GenerationOptions, Generator, Role};

/// Offline backend: replies with a hash of everything it was sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

impl Generator for EchoGenerator {
    fn chat(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        let mut hasher = DefaultHasher::new();
        for content in messages {
            content.role.as_ref().hash(&mut hasher);
            content.message.hash(&mut hasher);
        }
        options.seed.hash(&mut hasher);
        options.temperature.to_bits().hash(&mut hasher);

        let last_user = messages
            .iter()
            .rev()
            .find(|c| c.role == Role::User)
            .map(|c| c.message.as_str())
            .unwrap_or_default();

        Ok(format!(
            "[echo {:016x}] You try to {last_user}. ***What if this goes wrong?*** What would you like to do? You can: 1) Look around 2) Continue the story",
            hasher.finish()
        ))
    }
}

pub struct TerminalApp {
    pub character: String,
    pub tx: MessageTx,
    pub rx: MessageRx,
}

impl TerminalApp {
    fn listen_user_input(tx: crossbeam::channel::Sender<String>) {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if line.starts_with("exit!") {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    }

    fn prompt() {
        print!("> ");
        let _ = std::io::stdout().flush();
    }

    pub fn run_loop(self) -> anyhow::Result<()> {
        let (input_tx, input_rx) = crossbeam::channel::unbounded();

        std::thread::spawn(move || Self::listen_user_input(input_tx));

        println!(
            "AI RPG - you are playing as {}. Type '{START_SENTINEL}' to begin, 'exit!' to quit.",
            self.character
        );
        Self::prompt();

        let mut waiting = false;
        loop {
            crossbeam::select! {
                recv(input_rx) -> input => {
                    let Ok(action) = input else { break };
                    if waiting {
                        println!("(still writing the last reply, please wait)");
                        continue;
                    }
                    waiting = true;
                    self.tx.send(Message::Action(action))?;
                }
                recv(self.rx) -> message => {
                    let Ok(message) = message else { break };
                    match message {
                        Message::Assistant(Token::Start) => println!("..."),
                        Message::Assistant(Token::End(reply)) => {
                            waiting = false;
                            println!("\n{reply}\n");
                            Self::prompt();
                        }
                        Message::Assistant(Token::Failed(reason)) => {
                            waiting = false;
                            eprintln!("{reason}");
                            Self::prompt();
                        }
                        Message::Action(_) => {}
                    }
                }
            }
        }

        Ok(())
    }
}
