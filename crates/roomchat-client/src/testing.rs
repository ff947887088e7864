//! Test doubles shared by unit tests.

use tokio::sync::mpsc;

use crate::transport::{Connector, ReconnectPolicy, Transport, TransportRemote};

/// Connector that hands the far end of every opened transport to the test.
pub(crate) struct MockConnector {
    opened: mpsc::UnboundedSender<(ReconnectPolicy, TransportRemote)>,
}

impl MockConnector {
    pub(crate) fn new() -> (
        Self,
        mpsc::UnboundedReceiver<(ReconnectPolicy, TransportRemote)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { opened: tx }, rx)
    }
}

impl Connector for MockConnector {
    fn open(&mut self, policy: &ReconnectPolicy) -> Transport {
        let (transport, remote) = Transport::channel();
        let _ = self.opened.send((policy.clone(), remote));
        transport
    }
}
