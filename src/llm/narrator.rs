use crate::session::{GameMaster, Session};
use crate::sys::llm::Generator;

use super::im_channel::{Endpoint, Message, MessageRx, MessageTx, Token};

/// Owns one session and serves the player's actions one at a time.
pub struct Narrator<G> {
    master: GameMaster<G>,
    session: Session,
    rx: MessageRx,
    tx: MessageTx,
}

impl<G: Generator> Narrator<G> {
    pub fn new(master: GameMaster<G>, session: Session, endpoint: Endpoint) -> Self {
        Narrator {
            master,
            session,
            rx: endpoint.rx,
            tx: endpoint.tx,
        }
    }

    fn wait_input(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().ok()? {
                Message::Action(action) => break Some(action),
                Message::Assistant(_) => continue,
            }
        }
    }

    pub fn run_loop(mut self) -> anyhow::Result<Session> {
        while let Some(action) = self.wait_input() {
            self.tx.send(Message::Assistant(Token::Start))?;

            let token = match self.master.handle_action(&action, &mut self.session) {
                Ok(reply) => Token::End(reply),
                Err(e) => {
                    log::error!("action `{action}` failed: {e}");
                    Token::Failed(e.to_string())
                }
            };

            self.tx.send(Message::Assistant(token))?;
        }
        log::info!(
            "{}'s narrator stopped after {} turns",
            self.session.profile().name,
            self.session.transcript().len()
        );
        Ok(self.session)
    }
}

impl<G: Generator + Send + 'static> Narrator<G> {
    pub fn spawn(self) -> std::thread::JoinHandle<anyhow::Result<Session>> {
        std::thread::spawn(move || self.run_loop())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::debug_tool::EchoGenerator;
    use crate::llm::im_channel::channel;
    use crate::prompt::PromptComposer;
    use crate::sys::llm::{Content, GenerationError, GenerationOptions};
    use crate::sys::CharacterProfile;

    struct Offline;

    impl Generator for Offline {
        fn chat(
            &self,
            _messages: &[Content],
            _options: GenerationOptions,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Timeout)
        }
    }

    fn profile() -> Arc<CharacterProfile> {
        Arc::new(
            CharacterProfile::from_json_str(
                r#"{"name":"Elara","physical":{"race":{"name":"Elf"}},"class":{"name":"Mage"},"behaviour":["anxious","shy"]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn serves_actions_in_order_and_returns_session() {
        let master = GameMaster::new(PromptComposer::builtin().unwrap(), EchoGenerator);
        let session = master.create_session_with_seed(profile(), 5).unwrap();
        let opening = session.opening().to_string();

        let (ui, worker) = channel();
        let handle = Narrator::new(master, session, worker).spawn();

        ui.tx.send(Message::Action("start game".into())).unwrap();
        ui.tx.send(Message::Action("look around".into())).unwrap();

        assert_eq!(ui.rx.recv().unwrap(), Message::Assistant(Token::Start));
        assert_eq!(ui.rx.recv().unwrap(), Message::Assistant(Token::End(opening)));
        assert_eq!(ui.rx.recv().unwrap(), Message::Assistant(Token::Start));
        let reply = match ui.rx.recv().unwrap() {
            Message::Assistant(Token::End(reply)) => reply,
            other => panic!("unexpected {other:?}"),
        };

        drop(ui);
        let session = handle.join().unwrap().unwrap();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].player, "look around");
        assert_eq!(session.transcript()[0].reply, reply);
    }

    #[test]
    fn failure_is_reported_and_not_recorded() {
        let echo = GameMaster::new(PromptComposer::builtin().unwrap(), EchoGenerator);
        let session = echo.create_session_with_seed(profile(), 5).unwrap();

        let master = GameMaster::new(PromptComposer::builtin().unwrap(), Offline);
        let (ui, worker) = channel();
        let handle = Narrator::new(master, session, worker).spawn();

        ui.tx.send(Message::Action("open the door".into())).unwrap();
        assert_eq!(ui.rx.recv().unwrap(), Message::Assistant(Token::Start));
        match ui.rx.recv().unwrap() {
            Message::Assistant(Token::Failed(reason)) => {
                assert!(reason.contains("generation unavailable"))
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(ui);
        let session = handle.join().unwrap().unwrap();
        assert!(session.transcript().is_empty());
    }
}
