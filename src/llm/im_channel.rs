use crossbeam::channel::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start,
    End(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Action(String),
    Assistant(Token),
}

pub type MessageTx = Sender<Message>;
pub type MessageRx = Receiver<Message>;

/// Both ends of a duplex link between a chat surface and the narrator.
pub struct Endpoint {
    pub tx: MessageTx,
    pub rx: MessageRx,
}

pub fn channel() -> (Endpoint, Endpoint) {
    let (ui_tx, narrator_rx) = crossbeam::channel::unbounded();
    let (narrator_tx, ui_rx) = crossbeam::channel::unbounded();
    (
        Endpoint {
            tx: ui_tx,
            rx: ui_rx,
        },
        Endpoint {
            tx: narrator_tx,
            rx: narrator_rx,
        },
    )
}
