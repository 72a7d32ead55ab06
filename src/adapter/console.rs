//! Console transport: outbound messages as JSON lines on stdout.
//!
//! Sends only push onto an unbounded channel; a writer task owns stdout, so lanes never wait
//! on the terminal or on whatever reads our output.

use tokio::{
    io::{AsyncWriteExt, Stdout},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle
};
use tracing::{Level, event};

use crate::{
    domain::{
        constant::console,
        event::{ChannelId, Outbound, UserId}
    },
    port::transport::Transport
};

pub struct ConsoleTransport {
    outbox: UnboundedSender<Outbound>
}

impl ConsoleTransport {
    /// Create the transport and spawn its stdout writer. The writer finishes once every
    /// clone of the transport is dropped and the queue is flushed.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_lines(inbox, tokio::io::stdout()));
        (Self { outbox }, writer)
    }

    fn push(&self, message: Outbound) {
        if let Err(e) = self.outbox.send(message) {
            event!(Level::WARN, event = console::OUTBOX_CLOSED, dropped = ?e.0);
        }
    }
}

impl Transport for ConsoleTransport {
    fn send_to_channel(&self, channel_id: ChannelId, text: &str) {
        self.push(Outbound::to_channel(channel_id, text));
    }

    fn send_private_to_user(&self, user_id: UserId, text: &str) {
        self.push(Outbound::to_user(user_id, text));
    }
}

async fn write_lines(mut inbox: UnboundedReceiver<Outbound>, mut stdout: Stdout) {
    while let Some(message) = inbox.recv().await {
        let mut line = match serde_json::to_vec(&message) {
            Ok(line) => line,
            Err(e) => {
                event!(Level::ERROR, event = console::ENCODE_FAILED, error = %e);
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = stdout.write_all(&line).await {
            event!(Level::ERROR, event = console::WRITE_FAILED, error = %e);
            return;
        }
        if let Err(e) = stdout.flush().await {
            event!(Level::ERROR, event = console::WRITE_FAILED, error = %e);
            return;
        }
    }
}
