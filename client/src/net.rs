use std::net::TcpStream;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::time::{Duration, Instant};

use bevy::prelude::*;
use parking_lot::{Mutex, MutexGuard};
use scene_sync::session::{ChannelTransport, Connector, RemoteLink};
use scene_sync::{DirectorSettings, Intent, SceneDirector, TransportError, TransportEvent};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::ClientConfig;
use crate::Args;

/// How long the socket worker blocks on a read before checking for
/// outbound frames.
const READ_POLL: Duration = Duration::from_millis(15);

/// Opens one WebSocket per connection attempt on its own thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str, link: RemoteLink) -> Result<(), TransportError> {
        let url = url.to_string();
        thread::Builder::new()
            .name("ws-link".into())
            .spawn(move || run_link(&url, link))?;
        Ok(())
    }
}

fn run_link(url: &str, link: RemoteLink) {
    let mut socket = match tungstenite::connect(url) {
        Ok((socket, _response)) => socket,
        Err(err) => {
            link.emit(TransportEvent::Failed(err.to_string()));
            return;
        }
    };
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        if let Err(err) = stream.set_read_timeout(Some(READ_POLL)) {
            warn!(?err, "Failed to set socket read timeout");
        }
    }
    info!(url, "WebSocket open");
    if !link.emit(TransportEvent::Opened) {
        shutdown(&mut socket);
        return;
    }

    loop {
        loop {
            match link.try_outbound() {
                Ok(text) => {
                    if let Err(err) = socket.send(Message::text(text)) {
                        link.emit(TransportEvent::Failed(err.to_string()));
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("session dropped the link, closing socket");
                    shutdown(&mut socket);
                    return;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if !link.emit(TransportEvent::Text(text.as_str().to_owned())) {
                    shutdown(&mut socket);
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "server closed the socket");
                let _ = socket.flush();
                link.emit(TransportEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                link.emit(TransportEvent::Closed);
                return;
            }
            Err(err) => {
                link.emit(TransportEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}

fn shutdown(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    if let Err(err) = socket.close(None) {
        debug!(?err, "close handshake failed");
    }
    let _ = socket.flush();
}

pub type LiveDirector = SceneDirector<ChannelTransport<WsConnector>>;

/// The single owner of scene state. Systems lock it for the duration of
/// one pump or one UI pass.
#[derive(Resource)]
pub struct Director(Mutex<LiveDirector>);

impl Director {
    pub fn new(settings: DirectorSettings) -> Self {
        Self(Mutex::new(SceneDirector::new(
            ChannelTransport::new(WsConnector),
            settings,
        )))
    }

    pub fn from_config(args: &Args, config: &ClientConfig) -> Self {
        Self::new(DirectorSettings {
            url: args.url.clone(),
            visuals: config.visuals,
            grid: config.grid,
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, LiveDirector> {
        self.0.lock()
    }
}

/// Intents raised this frame by the UI or keyboard, applied in order.
#[derive(Resource, Default, Debug)]
pub struct PendingIntents(pub Vec<Intent>);

impl PendingIntents {
    pub fn push(&mut self, intent: Intent) {
        self.0.push(intent);
    }
}

#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct LinkStats {
    pub builds: u64,
    pub telems: u64,
    pub unknown: u64,
    pub last_telem: Option<Instant>,
    /// Smoothed time between telemetry frames.
    pub inter_arrival_ewma_ms: f32,
}

impl LinkStats {
    fn record_telem(&mut self, now: Instant) {
        if let Some(prev) = self.last_telem {
            let dt_ms = now.saturating_duration_since(prev).as_secs_f32() * 1000.0;
            let alpha = 0.2_f32;
            self.inter_arrival_ewma_ms = if self.inter_arrival_ewma_ms == 0.0 {
                dt_ms
            } else {
                self.inter_arrival_ewma_ms + alpha * (dt_ms - self.inter_arrival_ewma_ms)
            };
        }
        self.last_telem = Some(now);
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetSet;

pub fn client_connect(director: Res<Director>, args: Res<Args>) {
    if args.no_autoconnect {
        info!(url = %args.url, "Autoconnect disabled, waiting for Connect");
        return;
    }
    info!(url = %args.url, "Client connecting");
    director.lock().connect();
}

pub fn apply_intents(director: Res<Director>, mut pending: ResMut<PendingIntents>) {
    if pending.0.is_empty() {
        return;
    }
    let mut director = director.lock();
    for intent in pending.0.drain(..) {
        let route = director.handle_intent(intent);
        debug!(?route, "intent handled");
    }
}

pub fn pump_director(director: Res<Director>, mut stats: ResMut<LinkStats>) {
    let report = director.lock().pump();
    if report.is_empty() {
        return;
    }
    stats.builds += report.builds as u64;
    stats.unknown += report.unknown as u64;
    if report.telems > 0 {
        stats.telems += report.telems as u64;
        stats.record_telem(Instant::now());
    }
    for status in &report.statuses {
        info!(?status, "Connection status");
    }
}
