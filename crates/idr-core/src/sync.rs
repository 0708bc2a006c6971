//! WebSocket transport.
//!
//! Provides the [`Transport`] seam the sync client talks to, plus a native
//! WebSocket implementation that runs the socket on a background thread and
//! is polled without blocking.

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid WebSocket URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Send failed: {0}")]
    Send(String),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the transport
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Socket is open
    Connected,
    /// Socket closed, or a connection attempt failed
    Disconnected,
    /// A text frame arrived
    Message(String),
    /// Error occurred
    Error { message: String },
}

/// A full-duplex text message channel.
pub trait Transport {
    /// Start connecting. Completion is reported as [`SyncEvent::Connected`].
    fn connect(&mut self, url: &str) -> Result<(), SyncError>;

    /// Close the channel.
    fn disconnect(&mut self);

    /// Queue a text frame. Fire-and-forget.
    fn send(&self, msg: &str) -> Result<(), SyncError>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<SyncEvent>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}

mod native_client {
    use super::*;
    use std::io::ErrorKind;
    use std::net::TcpStream;
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{connect, Message, WebSocket};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        /// Handle to the WebSocket thread.
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Check if connected.
        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }

        /// Forget the worker once it has reported that it is gone, so that a
        /// later `connect` can start a fresh one.
        fn release_worker(&mut self) {
            self.cmd_tx = None;
            self.event_rx = None;
            self._thread = None;
        }
    }

    /// Validate a `ws://` or `wss://` URL.
    pub(crate) fn parse_ws_url(url: &str) -> Result<Url, SyncError> {
        let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "ws" | "wss" => Ok(parsed),
            other => Err(SyncError::UnsupportedScheme(other.to_string())),
        }
    }

    /// First 100 characters of a frame, for logs.
    fn preview(text: &str) -> &str {
        match text.char_indices().nth(100) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

    /// What the worker loop should do next.
    enum Step {
        Continue,
        Stop,
    }

    /// Poll the socket with a short read timeout so outgoing commands are
    /// serviced between reads. TLS streams keep their blocking defaults.
    #[allow(irrefutable_let_patterns)]
    fn set_poll_timeouts(socket: &mut Socket) {
        if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
    }

    fn forward_command(socket: &mut Socket, cmd_rx: &Receiver<WsCommand>) -> Step {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(text)) => {
                log::debug!("-> {}", preview(&text));
                match socket.send(Message::Text(text)) {
                    Ok(()) => Step::Continue,
                    Err(e) => {
                        log::error!("WebSocket send error: {}", e);
                        Step::Stop
                    }
                }
            }
            Ok(WsCommand::Close) => {
                let _ = socket.close(None);
                Step::Stop
            }
            Err(TryRecvError::Disconnected) => Step::Stop,
            Err(TryRecvError::Empty) => Step::Continue,
        }
    }

    fn read_frame(socket: &mut Socket, event_tx: &Sender<SyncEvent>) -> Step {
        match socket.read() {
            Ok(Message::Text(text)) => {
                log::debug!("<- {}", preview(&text));
                match event_tx.send(SyncEvent::Message(text)) {
                    Ok(()) => Step::Continue,
                    // Owner dropped the receiver.
                    Err(_) => Step::Stop,
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = socket.send(Message::Pong(payload));
                Step::Continue
            }
            Ok(Message::Close(frame)) => {
                log::info!("Server closed the socket: {:?}", frame);
                Step::Stop
            }
            Ok(_) => Step::Continue,
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Step::Continue
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                Step::Stop
            }
        }
    }

    /// Worker thread body. Always ends by reporting `Disconnected`.
    fn run_socket(url: String, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
        match connect(url.as_str()) {
            Ok((mut socket, response)) => {
                log::info!("Socket open to {} ({})", url, response.status());
                let _ = event_tx.send(SyncEvent::Connected);
                set_poll_timeouts(&mut socket);

                loop {
                    if matches!(forward_command(&mut socket, &cmd_rx), Step::Stop)
                        || matches!(read_frame(&mut socket, &event_tx), Step::Stop)
                    {
                        break;
                    }
                }
                log::info!("Socket to {} closed", url);
            }
            Err(e) => {
                log::error!("Could not connect to {}: {}", url, e);
                let _ = event_tx.send(SyncEvent::Error {
                    message: format!("Connection failed: {}", e),
                });
            }
        }
        let _ = event_tx.send(SyncEvent::Disconnected);
    }

    impl Transport for NativeWebSocket {
        fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }
            let url = parse_ws_url(url)?.to_string();

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let handle = thread::spawn(move || run_socket(url, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.release_worker();
            self.state = ConnectionState::Disconnected;
        }

        fn send(&self, msg: &str) -> Result<(), SyncError> {
            match self.cmd_tx {
                Some(ref tx) if self.is_connected() => tx
                    .send(WsCommand::Send(msg.to_string()))
                    .map_err(|e| SyncError::Send(e.to_string())),
                _ => Err(SyncError::NotConnected),
            }
        }

        fn poll_events(&mut self) -> Vec<SyncEvent> {
            let mut worker_gone = false;
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected => self.state = ConnectionState::Connected,
                        SyncEvent::Disconnected => {
                            self.state = ConnectionState::Disconnected;
                            worker_gone = true;
                        }
                        SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                        SyncEvent::Message(_) => {}
                    }
                    self.events.push(event);
                }
            }
            if worker_gone {
                self.release_worker();
            }

            std::mem::take(&mut self.events)
        }

        fn state(&self) -> ConnectionState {
            self.state
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

pub use native_client::NativeWebSocket;
