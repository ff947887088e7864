//! Line-oriented terminal rendering of session snapshots.

use std::io::{self, Write};
use std::sync::Arc;

use roomchat_client::{ConnectionStatus, Message, SessionNotice, SessionSnapshot, ViewAdapter};
use tracing::warn;

const DEFAULT_WIDTH: usize = 72;
const PLACEHOLDER: &str = "No messages yet. Say hello!";

/// Prints new messages as they arrive and reprints when the log is replaced.
pub struct TerminalView<W: Write> {
    out: W,
    width: usize,
    room: String,
    status: Option<ConnectionStatus>,
    exhausted: bool,
    shown: Arc<[Message]>,
    placeholder_shown: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: DEFAULT_WIDTH,
            room: String::new(),
            status: None,
            exhausted: false,
            shown: Arc::from(Vec::new()),
            placeholder_shown: false,
        }
    }

    #[cfg(test)]
    fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    fn draw(&mut self, snapshot: &SessionSnapshot) -> io::Result<()> {
        if !snapshot.has_session() {
            if !self.room.is_empty() {
                writeln!(self.out, "Left room {}.", self.room)?;
            }
            self.reset();
            return self.out.flush();
        }

        let room_changed = snapshot.room_id != self.room;
        if room_changed {
            self.reset();
            self.room = snapshot.room_id.clone();
        }

        if self.status != Some(snapshot.status) || self.exhausted != snapshot.reconnect_exhausted {
            self.status = Some(snapshot.status);
            self.exhausted = snapshot.reconnect_exhausted;
            writeln!(self.out, "{}", header(snapshot))?;
        }

        if !snapshot.messages.starts_with(&self.shown) {
            writeln!(self.out, "{:-^width$}", " history ", width = self.width)?;
            self.shown = Arc::from(Vec::new());
        }

        if snapshot.messages.is_empty() {
            if !self.placeholder_shown {
                writeln!(self.out, "{PLACEHOLDER}")?;
                self.placeholder_shown = true;
            }
        } else {
            for msg in &snapshot.messages[self.shown.len()..] {
                writeln!(self.out, "{}", format_message(msg, self.width))?;
            }
            self.shown = Arc::clone(&snapshot.messages);
            self.placeholder_shown = false;
        }
        self.out.flush()
    }

    fn reset(&mut self) {
        self.room.clear();
        self.status = None;
        self.exhausted = false;
        self.shown = Arc::from(Vec::new());
        self.placeholder_shown = false;
    }
}

impl<W: Write> ViewAdapter for TerminalView<W> {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.draw(snapshot) {
            warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn notice(&mut self, notice: &SessionNotice) {
        let written = writeln!(self.out, "! {notice}").and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

pub fn header(snapshot: &SessionSnapshot) -> String {
    let mut line = format!("== Room: {} [{}]", snapshot.room_id, snapshot.status);
    if let Some(name) = &snapshot.display_name {
        line.push_str(&format!(" as {name}"));
    }
    if snapshot.reconnect_exhausted {
        line.push_str(" (gave up reconnecting; /join to retry)");
    }
    line.push_str(" ==");
    line
}

/// One message as a terminal line.
///
/// System notices are centred in brackets, the local user's messages are
/// right-aligned without a sender, everyone else's carry the sender.
pub fn format_message(msg: &Message, width: usize) -> String {
    let time = msg.time_label();
    if msg.is_system() {
        let body = with_time(&format!("[{}]", msg.content), &time);
        return format!("{body:^width$}").trim_end().to_string();
    }
    if msg.is_self {
        let body = with_time(&msg.content, &time);
        return format!("{body:>width$}");
    }
    let sender = msg.sender.as_deref().unwrap_or("anonymous");
    let body = format!("{sender}: {}", msg.content);
    if time.is_empty() {
        body
    } else {
        format!("{time} {body}")
    }
}

fn with_time(body: &str, time: &str) -> String {
    if time.is_empty() {
        body.to_string()
    } else {
        format!("{body}  {time}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn snapshot(status: ConnectionStatus, messages: Vec<Message>) -> SessionSnapshot {
        SessionSnapshot {
            room_id: "room1".into(),
            display_name: Some("alice".into()),
            status,
            messages: messages.into(),
            reconnect_exhausted: false,
        }
    }

    fn lines(view: &TerminalView<Vec<u8>>) -> Vec<String> {
        String::from_utf8(view.output().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn formats_each_message_kind() {
        assert_eq!(
            format_message(&Message::system("alice joined"), 20),
            "   [alice joined]"
        );
        assert_eq!(
            format_message(&Message::chat("me", "hello").with_self(true), 10),
            "     hello"
        );
        assert_eq!(format_message(&Message::chat("bob", "hi"), 20), "bob: hi");

        let mut anonymous = Message::chat("x", "hi");
        anonymous.sender = None;
        assert_eq!(format_message(&anonymous, 20), "anonymous: hi");
    }

    #[test]
    fn timestamps_are_labelled() {
        let ts: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = Message::chat("bob", "hi").with_timestamp(ts);
        let label = msg.time_label();
        assert_eq!(format_message(&msg, 20), format!("{label} bob: hi"));

        let own = Message::chat("me", "yo").with_self(true).with_timestamp(ts);
        assert!(format_message(&own, 20).ends_with(&format!("yo  {label}")));
    }

    #[test]
    fn header_shows_room_status_and_name() {
        let snap = snapshot(ConnectionStatus::Connected, vec![]);
        assert_eq!(header(&snap), "== Room: room1 [connected] as alice ==");

        let mut snap = snapshot(ConnectionStatus::Disconnected, vec![]);
        snap.display_name = None;
        snap.reconnect_exhausted = true;
        assert!(header(&snap).contains("gave up reconnecting"));
    }

    #[test]
    fn empty_log_shows_placeholder_once() {
        let mut view = TerminalView::new(Vec::new());
        view.render(&snapshot(ConnectionStatus::Connecting, vec![]));
        view.render(&snapshot(ConnectionStatus::Connected, vec![]));

        let out = lines(&view);
        assert_eq!(
            out,
            vec![
                "== Room: room1 [connecting] as alice ==",
                PLACEHOLDER,
                "== Room: room1 [connected] as alice ==",
            ]
        );
    }

    #[test]
    fn prints_only_new_messages() {
        let mut view = TerminalView::new(Vec::new()).with_width(20);
        let first = vec![Message::chat("bob", "one")];
        let second = vec![Message::chat("bob", "one"), Message::chat("bob", "two")];
        view.render(&snapshot(ConnectionStatus::Connected, first));
        view.render(&snapshot(ConnectionStatus::Connected, second));

        let out = lines(&view);
        assert_eq!(
            out,
            vec![
                "== Room: room1 [connected] as alice ==",
                "bob: one",
                "bob: two",
            ]
        );
    }

    #[test]
    fn replaced_log_is_reprinted() {
        let mut view = TerminalView::new(Vec::new()).with_width(11);
        view.render(&snapshot(
            ConnectionStatus::Connected,
            vec![Message::chat("bob", "live")],
        ));
        view.render(&snapshot(
            ConnectionStatus::Connected,
            vec![Message::chat("ann", "old"), Message::chat("bob", "live")],
        ));

        let out = lines(&view);
        assert_eq!(
            out,
            vec![
                "== Room: room1 [connected] as alice ==",
                "bob: live",
                "- history -",
                "ann: old",
                "bob: live",
            ]
        );
    }

    #[test]
    fn emptied_log_shows_placeholder_again() {
        let mut view = TerminalView::new(Vec::new()).with_width(11);
        view.render(&snapshot(ConnectionStatus::Connected, vec![]));
        view.render(&snapshot(
            ConnectionStatus::Connected,
            vec![Message::chat("bob", "live")],
        ));
        view.render(&snapshot(ConnectionStatus::Connected, vec![]));

        let out = lines(&view);
        assert_eq!(
            out,
            vec![
                "== Room: room1 [connected] as alice ==",
                PLACEHOLDER,
                "bob: live",
                "- history -",
                PLACEHOLDER,
            ]
        );
    }

    #[test]
    fn teardown_and_notices() {
        let mut view = TerminalView::new(Vec::new());
        view.render(&snapshot(ConnectionStatus::Connected, vec![Message::system("hi")]));
        view.notice(&SessionNotice::ServerClosed);
        view.render(&SessionSnapshot::default());

        let out = lines(&view);
        assert_eq!(out.last().unwrap(), "Left room room1.");
        assert!(out.contains(&"! the server closed the session".to_string()));
    }
}
