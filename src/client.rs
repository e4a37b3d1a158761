//! Runtime glue between the transport, the framer and the session.
//!
//! `Client` owns one [`Link`] at a time and turns each kind of input (a
//! transport message, an expired flush deadline, a user line) into session
//! events. The select loop in `main.rs` only waits and draws.

use crate::core::{Session, SessionEvent};
use crate::framer::StreamFramer;
use crate::frontend::FrontendEvent;
use crate::network::{MudConnection, ServerMessage};
use crate::protocol::Envelope;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Channels and task for one transport connection
pub struct Link {
    server_rx: Option<mpsc::UnboundedReceiver<ServerMessage>>,
    command_tx: mpsc::UnboundedSender<Envelope>,
    task: JoinHandle<()>,
}

impl Link {
    pub fn new(
        server_rx: mpsc::UnboundedReceiver<ServerMessage>,
        command_tx: mpsc::UnboundedSender<Envelope>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            server_rx: Some(server_rx),
            command_tx,
            task,
        }
    }

    /// Spawn a WebSocket connection task for `url`
    pub fn open(url: &str) -> Self {
        let (server_tx, server_rx) = mpsc::unbounded_channel::<ServerMessage>();
        let (command_tx, command_rx) = mpsc::unbounded_channel::<Envelope>();
        let url = url.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = MudConnection::start(&url, server_tx, command_rx).await {
                tracing::error!("Network connection error: {:#}", e);
            }
        });
        Self::new(server_rx, command_tx, task)
    }

    /// Next transport message; pends forever once the transport is gone
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        match self.server_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    fn close(self) {
        self.task.abort();
    }
}

/// Opens a link for a URL
pub type Connector = Box<dyn FnMut(&str) -> Link + Send>;

pub struct Client {
    pub session: Session,
    framer: StreamFramer,
    url: String,
    connect: Connector,
    link: Link,
}

impl Client {
    /// Build the client and open the first connection
    pub fn new(session: Session, framer: StreamFramer, url: String, mut connect: Connector) -> Self {
        let link = connect(&url);
        Self {
            session,
            framer,
            url,
            connect,
            link,
        }
    }

    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    pub fn flush_deadline(&self) -> Option<Instant> {
        self.framer.flush_deadline()
    }

    pub fn on_server(&mut self, msg: Option<ServerMessage>, now: Instant) -> Vec<SessionEvent> {
        match msg {
            Some(ServerMessage::Chunk(data)) => {
                let mut events = Vec::new();
                for line in self.framer.feed(&data, now) {
                    events.extend(self.session.handle_line(&line));
                }
                events
            }
            Some(ServerMessage::Connected) => self.session.system("Connected successfully."),
            Some(ServerMessage::Disconnected) => self.session.system("Disconnected."),
            Some(ServerMessage::Error(e)) => {
                tracing::warn!("Transport error: {}", e);
                self.session.system("Socket Error.")
            }
            None => {
                tracing::debug!("Transport channel closed");
                self.link.server_rx = None;
                Vec::new()
            }
        }
    }

    pub fn on_flush(&mut self, now: Instant) -> Vec<SessionEvent> {
        match self.framer.flush_due(now) {
            Some(line) => self.session.handle_line(&line),
            None => Vec::new(),
        }
    }

    /// Handle one user input event. None means quit.
    pub fn on_input(&mut self, event: FrontendEvent) -> Option<Vec<SessionEvent>> {
        let events = match event {
            FrontendEvent::Command(command) => {
                let (events, envelopes) = self.session.submit(&command);
                for envelope in envelopes {
                    if self.link.command_tx.send(envelope).is_err() {
                        tracing::debug!("Not connected, dropping command");
                        break;
                    }
                }
                events
            }
            FrontendEvent::Connect => self.reconnect(),
            FrontendEvent::RecentWords => self.session.show_recent_words(),
            FrontendEvent::Location => self.session.show_location(),
            FrontendEvent::Unknown(command) => {
                self.session.system(&format!("Unknown command: {}", command))
            }
            FrontendEvent::Quit => return None,
        };
        Some(events)
    }

    /// Drop the current link and start over with a clean stream
    fn reconnect(&mut self) -> Vec<SessionEvent> {
        tracing::info!("Reconnecting to {}", self.url);
        let fresh = (self.connect)(&self.url);
        std::mem::replace(&mut self.link, fresh).close();
        self.framer.reset();
        self.session.reset_stream()
    }

    /// Stop the connection task
    pub fn shutdown(self) {
        self.link.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::{Arc, Mutex};

    type Ends = (
        mpsc::UnboundedSender<ServerMessage>,
        mpsc::UnboundedReceiver<Envelope>,
    );

    /// Connector that hands the far end of every link to the test
    fn fake_connector(ends: Arc<Mutex<Vec<Ends>>>) -> Connector {
        Box::new(move |_url: &str| {
            let (server_tx, server_rx) = mpsc::unbounded_channel();
            let (command_tx, command_rx) = mpsc::unbounded_channel();
            ends.lock().unwrap().push((server_tx, command_rx));
            let task = tokio::spawn(std::future::pending::<()>());
            Link::new(server_rx, command_tx, task)
        })
    }

    fn client(ends: &Arc<Mutex<Vec<Ends>>>) -> Client {
        let session = Session::new(&Config::default(), None).unwrap();
        Client::new(
            session,
            StreamFramer::new(),
            "ws://localhost:1".to_string(),
            fake_connector(ends.clone()),
        )
    }

    fn written(events: &[SessionEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Write { segments, .. } => {
                    Some(segments.iter().map(|s| s.text.as_str()).collect::<String>())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_are_framed_into_session_lines() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);
        let now = Instant::now();

        let events = client.on_server(Some(ServerMessage::Chunk("Hello\r\nWor".into())), now);
        assert_eq!(written(&events), "Hello");
        assert!(client.flush_deadline().is_some());

        let events = client.on_flush(now + crate::framer::DEFAULT_FLUSH_DELAY);
        assert_eq!(written(&events), "Wor");
        assert!(client.flush_deadline().is_none());
    }

    #[tokio::test]
    async fn test_status_messages() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);
        let now = Instant::now();
        assert_eq!(written(&client.on_server(Some(ServerMessage::Connected), now)), "Connected successfully.");
        assert_eq!(written(&client.on_server(Some(ServerMessage::Disconnected), now)), "Disconnected.");
        assert_eq!(
            written(&client.on_server(Some(ServerMessage::Error("boom".into())), now)),
            "Socket Error."
        );
    }

    #[tokio::test]
    async fn test_commands_go_to_current_link() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);

        let events = client.on_input(FrontendEvent::Command("look; north".into())).unwrap();
        assert_eq!(written(&events), "look; north");

        let mut ends = ends.lock().unwrap();
        let (_, command_rx) = &mut ends[0];
        assert_eq!(command_rx.try_recv().unwrap(), Envelope::command("look"));
        assert_eq!(command_rx.try_recv().unwrap(), Envelope::command("north"));
    }

    #[tokio::test]
    async fn test_reconnect_resets_framer_and_replaces_link() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);
        let now = Instant::now();

        client.on_server(Some(ServerMessage::Chunk("half a li".into())), now);
        assert_eq!(client.framer.remainder(), "half a li");

        client.on_input(FrontendEvent::Connect).unwrap();
        assert_eq!(client.framer.remainder(), "");
        assert!(client.flush_deadline().is_none());

        {
            let ends = ends.lock().unwrap();
            assert_eq!(ends.len(), 2);
            // The old link's receiver is gone with it
            assert!(ends[0].0.is_closed());
            assert!(!ends[1].0.is_closed());
        }

        // Late data on the old link reaches nobody; the new link is read
        let old_send = ends.lock().unwrap()[0].0.send(ServerMessage::Chunk("stale\n".into()));
        assert!(old_send.is_err());

        ends.lock().unwrap()[1]
            .0
            .send(ServerMessage::Chunk("fresh\n".into()))
            .unwrap();
        let msg = client.link_mut().recv().await;
        assert_eq!(written(&client.on_server(msg, now)), "fresh");

        client.on_input(FrontendEvent::Command("look".into())).unwrap();
        let mut ends = ends.lock().unwrap();
        assert!(ends[0].1.try_recv().is_err());
        assert_eq!(ends[1].1.try_recv().unwrap(), Envelope::command("look"));
    }

    #[tokio::test]
    async fn test_closed_transport_stops_being_polled() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);
        ends.lock().unwrap().clear();

        let msg = client.link_mut().recv().await;
        assert_eq!(msg, None);
        assert!(client.on_server(msg, Instant::now()).is_empty());

        let pending = tokio::time::timeout(std::time::Duration::from_millis(10), client.link_mut().recv()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_quit() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&ends);
        assert!(client.on_input(FrontendEvent::Quit).is_none());
        client.shutdown();
    }
}
