//! Connection lifecycle over a pluggable message transport.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use parking_lot::Mutex;
use protocol::{decode, encode, ClientMessage, ServerMessage};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start transport worker")]
    Spawn(#[from] std::io::Error),
    #[error("transport link is not open")]
    NotOpen,
    #[error("socket error: {0}")]
    Socket(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot connect while the session is {0:?}")]
    Busy(SessionState),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What a transport reports back from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Text(String),
    Closed,
    Failed(String),
}

/// A bidirectional text-frame link.
pub trait Transport {
    fn connect(&mut self, url: &str) -> Result<(), TransportError>;
    fn send(&mut self, text: String) -> Result<(), TransportError>;
    /// Drains everything that arrived since the last call. Never blocks.
    fn poll(&mut self) -> Vec<TransportEvent>;
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Status(SessionState),
    Message(ServerMessage),
}

/// Drives a [`Transport`] through `Idle -> Connecting -> Connected ->
/// Disconnected | Error -> Idle`. Reconnecting is always an explicit
/// [`TransportSession::connect`].
#[derive(Debug)]
pub struct TransportSession<T> {
    transport: T,
    state: SessionState,
    url: Option<String>,
    backlog: Vec<SessionEvent>,
}

impl<T: Transport> TransportSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Idle,
            url: None,
            backlog: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Starts connecting. Only allowed from `Idle`; the returned events are
    /// the status transitions this call caused. If the transport refuses to
    /// open, those transitions are queued for the next [`Self::pump`].
    pub fn connect(&mut self, url: &str) -> Result<Vec<SessionEvent>, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::Busy(self.state));
        }
        self.url = Some(url.to_string());
        let mut events = Vec::new();
        self.transition(SessionState::Connecting, &mut events);
        if let Err(err) = self.transport.connect(url) {
            error!(?err, url, "failed to open transport");
            self.fault(SessionState::Error, &mut events);
            self.backlog.extend(events);
            return Err(err.into());
        }
        Ok(events)
    }

    /// Status transitions left over from a refused [`Self::connect`].
    pub fn take_backlog(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.backlog)
    }

    /// Sends `msg` if connected. Returns whether it was handed to the
    /// transport; anything else is dropped silently.
    pub fn send(&mut self, msg: &ClientMessage) -> bool {
        if self.state != SessionState::Connected {
            debug!(?msg, state = ?self.state, "dropping outbound message");
            return false;
        }
        let text = match encode(msg) {
            Ok(text) => text,
            Err(err) => {
                warn!(?err, "Failed to encode client message");
                return false;
            }
        };
        match self.transport.send(text) {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, "Failed to send client message");
                false
            }
        }
    }

    /// Applies every pending transport event and returns the resulting
    /// status changes and decoded messages, in arrival order.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let mut out = self.take_backlog();
        for event in self.transport.poll() {
            match event {
                TransportEvent::Opened => {
                    if self.state == SessionState::Connecting {
                        self.transition(SessionState::Connected, &mut out);
                    } else {
                        debug!(state = ?self.state, "ignoring stray open event");
                    }
                }
                TransportEvent::Text(text) => {
                    if self.state != SessionState::Connected {
                        debug!(state = ?self.state, "ignoring frame outside a session");
                        continue;
                    }
                    match decode::<ServerMessage>(&text) {
                        Ok(msg) => out.push(SessionEvent::Message(msg)),
                        Err(err) => warn!(?err, "Failed to decode server message"),
                    }
                }
                TransportEvent::Closed => {
                    if self.is_active() {
                        self.fault(SessionState::Disconnected, &mut out);
                    }
                }
                TransportEvent::Failed(reason) => {
                    if self.is_active() {
                        error!(%reason, "transport failed");
                        self.fault(SessionState::Error, &mut out);
                    }
                }
            }
        }
        out
    }

    /// Closes the link locally. Reported like a remote close.
    pub fn close(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        if self.is_active() {
            self.transport.close();
            self.fault(SessionState::Disconnected, &mut out);
        }
        out
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            SessionState::Connecting | SessionState::Connected
        )
    }

    fn fault(&mut self, terminal: SessionState, out: &mut Vec<SessionEvent>) {
        self.transition(terminal, out);
        self.transition(SessionState::Idle, out);
    }

    fn transition(&mut self, next: SessionState, out: &mut Vec<SessionEvent>) {
        info!(from = ?self.state, to = ?next, url = ?self.url, "session status");
        self.state = next;
        out.push(SessionEvent::Status(next));
    }
}

/// Worker-side half of a [`ChannelTransport`]: whoever owns the socket
/// reports events here and takes outbound frames from here.
#[derive(Debug)]
pub struct RemoteLink {
    events: Sender<TransportEvent>,
    outbound: Receiver<String>,
}

impl RemoteLink {
    /// Returns `false` once the session side has gone away.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Next queued outbound frame. `Err(Disconnected)` means the session
    /// closed the link.
    pub fn try_outbound(&self) -> Result<String, TryRecvError> {
        self.outbound.try_recv()
    }
}

/// Starts whatever owns the socket for one connection attempt.
pub trait Connector {
    fn open(&self, url: &str, link: RemoteLink) -> Result<(), TransportError>;
}

/// [`Transport`] over a pair of channels, so the socket itself can live on
/// another thread while the session is only touched by its owner.
#[derive(Debug)]
pub struct ChannelTransport<C> {
    connector: C,
    events: Option<Receiver<TransportEvent>>,
    outbound: Option<Sender<String>>,
}

impl<C: Connector> ChannelTransport<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            events: None,
            outbound: None,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connector> Transport for ChannelTransport<C> {
    fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel();
        self.connector.open(
            url,
            RemoteLink {
                events: event_tx,
                outbound: out_rx,
            },
        )?;
        self.events = Some(event_rx);
        self.outbound = Some(out_tx);
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let tx = self.outbound.as_ref().ok_or(TransportError::NotOpen)?;
        tx.send(text).map_err(|_| TransportError::NotOpen)
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut out = Vec::new();
        let Some(rx) = self.events.as_ref() else {
            return out;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // worker exited without saying goodbye
                    if !matches!(
                        out.last(),
                        Some(TransportEvent::Closed | TransportEvent::Failed(_))
                    ) {
                        out.push(TransportEvent::Closed);
                    }
                    self.events = None;
                    self.outbound = None;
                    break;
                }
            }
        }
        out
    }

    fn close(&mut self) {
        self.events = None;
        self.outbound = None;
    }
}

/// In-process connector: parks each [`RemoteLink`] so the caller can play
/// the server side. Used by tests and offline replays.
#[derive(Debug, Clone, Default)]
pub struct LoopbackConnector {
    links: Arc<Mutex<Vec<RemoteLink>>>,
    refuse: bool,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every `open` fails.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Takes the most recently opened link.
    pub fn take_link(&self) -> Option<RemoteLink> {
        self.links.lock().pop()
    }
}

impl Connector for LoopbackConnector {
    fn open(&self, url: &str, link: RemoteLink) -> Result<(), TransportError> {
        if self.refuse {
            return Err(TransportError::Socket(format!("connection to {url} refused")));
        }
        self.links.lock().push(link);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(events: &[SessionEvent]) -> Vec<SessionState> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Status(s) => Some(*s),
                SessionEvent::Message(_) => None,
            })
            .collect()
    }

    fn session() -> (TransportSession<ChannelTransport<LoopbackConnector>>, LoopbackConnector) {
        let connector = LoopbackConnector::new();
        let session = TransportSession::new(ChannelTransport::new(connector.clone()));
        (session, connector)
    }

    #[test]
    fn connect_only_from_idle() {
        let (mut session, _connector) = session();
        session.connect("ws://test").unwrap();
        assert!(matches!(
            session.connect("ws://test"),
            Err(SessionError::Busy(SessionState::Connecting))
        ));
    }

    #[test]
    fn refused_connect_reports_error_then_idle() {
        let mut session = TransportSession::new(ChannelTransport::new(LoopbackConnector::refusing()));
        assert!(session.connect("ws://test").is_err());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            statuses(&session.pump()),
            vec![
                SessionState::Connecting,
                SessionState::Error,
                SessionState::Idle,
            ]
        );
        assert!(session.pump().is_empty());
    }

    #[test]
    fn malformed_frame_does_not_end_session() {
        let (mut session, connector) = session();
        session.connect("ws://test").unwrap();
        let link = connector.take_link().unwrap();
        link.emit(TransportEvent::Opened);
        link.emit(TransportEvent::Text("{not json".into()));
        link.emit(TransportEvent::Text(r#"{"type":"nonsense"}"#.into()));
        let events = session.pump();
        assert_eq!(session.state(), SessionState::Connected);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Message(ServerMessage::Unknown))
        ));
    }

    #[test]
    fn dropped_worker_counts_as_close() {
        let (mut session, connector) = session();
        let mut events = session.connect("ws://test").unwrap();
        let link = connector.take_link().unwrap();
        link.emit(TransportEvent::Opened);
        drop(link);
        events.extend(session.pump());
        assert_eq!(
            statuses(&events),
            vec![
                SessionState::Connecting,
                SessionState::Connected,
                SessionState::Disconnected,
                SessionState::Idle,
            ]
        );
    }

    #[test]
    fn failure_reports_error() {
        let (mut session, connector) = session();
        session.connect("ws://test").unwrap();
        let link = connector.take_link().unwrap();
        link.emit(TransportEvent::Failed("connection reset".into()));
        let events = session.pump();
        assert_eq!(
            statuses(&events),
            vec![SessionState::Error, SessionState::Idle]
        );
        assert!(!session.send(&ClientMessage::Sim));
    }

    #[test]
    fn send_reaches_remote_when_connected() {
        let (mut session, connector) = session();
        session.connect("ws://test").unwrap();
        let link = connector.take_link().unwrap();
        assert!(!session.send(&ClientMessage::Reset));
        link.emit(TransportEvent::Opened);
        session.pump();
        assert!(session.send(&ClientMessage::Reset));
        assert_eq!(link.try_outbound().unwrap(), r#"{"type":"reset"}"#);
        assert!(link.try_outbound().is_err());
    }
}
