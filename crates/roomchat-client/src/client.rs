//! Public async handle for a chat session.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::session::{ConnectionManager, SessionNotice, SessionSnapshot};
use crate::transport::{Connector, ReconnectPolicy};
use crate::view::ViewIntent;

const COMMAND_CAPACITY: usize = 64;

type Reply = oneshot::Sender<Result<(), ClientError>>;

enum Command {
    Join {
        room_id: String,
        display_name: Option<String>,
        reply: Reply,
    },
    Send {
        text: String,
        reply: Reply,
    },
    Leave,
    Teardown,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for driving a chat session.
///
/// The session runs in a background task that serialises user commands and
/// transport events, so handles can be cloned and used from anywhere. When
/// the last handle is dropped the session is torn down.
#[derive(Clone)]
pub struct ChatClient {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionSnapshot>,
    notice_tx: broadcast::Sender<SessionNotice>,
}

impl ChatClient {
    /// Start the session task.
    /// Returns `(client, state_receiver, notice_receiver)`.
    pub fn spawn<C: Connector>(
        connector: C,
        policy: ReconnectPolicy,
    ) -> (
        Self,
        watch::Receiver<SessionSnapshot>,
        broadcast::Receiver<SessionNotice>,
    ) {
        let manager = ConnectionManager::new(connector, policy);
        let state_rx = manager.subscribe();
        let notice_rx = manager.subscribe_notices();
        let notice_tx = manager.notice_sender();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        tokio::spawn(session_task(manager, command_rx));

        let client = Self {
            command_tx,
            state_rx: state_rx.clone(),
            notice_tx,
        };
        (client, state_rx, notice_rx)
    }

    /// Join `room_id`, replacing any current session.
    pub async fn join(&self, room_id: &str, display_name: Option<&str>) -> Result<(), ClientError> {
        self.request(|reply| Command::Join {
            room_id: room_id.to_string(),
            display_name: display_name.map(str::to_string),
            reply,
        })
        .await
    }

    /// Send chat text to the current room.
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        self.request(|reply| Command::Send {
            text: text.to_string(),
            reply,
        })
        .await
    }

    /// Leave the current room, keeping its messages visible.
    pub async fn leave(&self) -> Result<(), ClientError> {
        self.command(Command::Leave).await
    }

    /// Leave and discard the session.
    pub async fn teardown(&self) -> Result<(), ClientError> {
        self.command(Command::Teardown).await
    }

    /// Tear down and stop the session task. Later calls fail with
    /// [`ClientError::Shutdown`].
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.command(Command::Shutdown).await
    }

    pub async fn dispatch(&self, intent: ViewIntent) -> Result<(), ClientError> {
        match intent {
            ViewIntent::Join {
                room_id,
                display_name,
            } => self.join(&room_id, display_name.as_deref()).await,
            ViewIntent::Send { text } => self.send(&text).await,
            ViewIntent::Leave => self.leave().await,
            ViewIntent::Teardown => self.teardown().await,
        }
    }

    /// The latest published snapshot.
    pub fn state(&self) -> SessionSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_rx.clone()
    }

    /// A new notice receiver. Only notices published after this call are
    /// delivered.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notice_tx.subscribe()
    }

    async fn command(&self, command: Command) -> Result<(), ClientError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientError::Shutdown)
    }

    async fn request(&self, build: impl FnOnce(Reply) -> Command) -> Result<(), ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(build(reply_tx)).await?;
        reply_rx.await.map_err(|_| ClientError::Shutdown)?
    }
}

// ---------------------------------------------------------------------------
// Session Task
// ---------------------------------------------------------------------------

async fn session_task<C: Connector>(
    mut manager: ConnectionManager<C>,
    mut command_rx: mpsc::Receiver<Command>,
) {
    loop {
        let listening = manager.has_transport();
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(Command::Join { room_id, display_name, reply }) => {
                    let _ = reply.send(manager.join(&room_id, display_name.as_deref()));
                }
                Some(Command::Send { text, reply }) => {
                    let _ = reply.send(manager.send(&text));
                }
                Some(Command::Leave) => manager.leave(),
                Some(Command::Teardown) => manager.teardown(),
                Some(Command::Shutdown) | None => {
                    info!("Chat client shutting down");
                    manager.teardown();
                    return;
                }
            },
            Some(event) = manager.next_event(), if listening => {
                debug!(?event, "Transport event");
                manager.handle_event(event);
            }
        }
    }
}
