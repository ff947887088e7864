//! The contract between the session core and a user interface.

use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::session::{SessionNotice, SessionSnapshot};

/// Something the user asked for, as a value a view can hand to
/// [`ChatClient::dispatch`](crate::ChatClient::dispatch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewIntent {
    Join {
        room_id: String,
        display_name: Option<String>,
    },
    Send {
        text: String,
    },
    Leave,
    Teardown,
}

/// A user interface driven by session snapshots.
///
/// `render` receives the whole current state every time; a view keeps no
/// session state of its own. Messages with `is_self` set belong on the
/// local user's side.
pub trait ViewAdapter {
    fn render(&mut self, snapshot: &SessionSnapshot);

    /// One-shot notices (errors, server close, reconnect exhausted).
    fn notice(&mut self, _notice: &SessionNotice) {}
}

/// Feed a view from the state and notice streams until the state sender is
/// gone. Renders the current state first.
pub async fn run_view<V: ViewAdapter>(
    view: &mut V,
    mut state: watch::Receiver<SessionSnapshot>,
    mut notices: broadcast::Receiver<SessionNotice>,
) {
    view.render(&state.borrow_and_update());
    let mut notices_open = true;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    return;
                }
                let snapshot = state.borrow_and_update().clone();
                view.render(&snapshot);
            }
            notice = notices.recv(), if notices_open => match notice {
                Ok(notice) => view.notice(&notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "View fell behind on notices");
                }
                Err(broadcast::error::RecvError::Closed) => notices_open = false,
            },
        }
    }
}
