//! Session façade: the crate's idiomatic public entry point.
//!
//! Mirrors `mimiioController`/`mimiioAsynchronousCallbackAPIController`:
//! `open` performs the handshake, `start` spawns the three worker
//! threads, and `is_active`/`stream_state`/`error` expose the same
//! observable state the original's polling API does.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::SessionConfig;
use crate::encoder::{self, Encoder};
use crate::error::{self, Error};
use crate::frame::Frame;
use crate::transport::ConnectParams;
use crate::websocket::WebSocket;
use crate::worker::{self, AudioSource, ResultSink, SharedState};

/// The externally observable phase of a session. `Wait` covers both
/// "not yet started" and "threads spinning up"; `Both` is duplex live;
/// `SendOnly`/`RecvOnly` once one side finishes; `Closed` once both have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Wait,
    Both,
    SendOnly,
    RecvOnly,
    Closed,
}

/// An opened, and optionally started, speech session.
pub struct Session {
    socket: Arc<WebSocket>,
    shared: Option<Arc<SharedState>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    monitor_result: Arc<Mutex<Option<i32>>>,
    config: SessionConfig,
}

impl Session {
    /// Connects and performs the opening handshake. Does not start the
    /// worker threads; call [`Session::start`] for that.
    pub fn open(config: SessionConfig) -> Result<Session, Error> {
        crate::logging::init_once(config.log_level);

        let params = ConnectParams {
            host: &config.host,
            port: config.port,
            use_tls: config.use_tls,
            connect_timeout: config.connect_timeout,
            send_timeout: config.send_timeout,
            recv_timeout: config.recv_timeout,
        };
        let socket = WebSocket::connect(
            &params,
            &config.path,
            &config.extra_headers,
            config.bearer_token.as_deref(),
        )?;

        Ok(Session {
            socket: Arc::new(socket),
            shared: None,
            handles: Mutex::new(Vec::new()),
            monitor_result: Arc::new(Mutex::new(None)),
            config,
        })
    }

    /// Spawns the transmit, receive, and monitor threads. May only be
    /// called once per session.
    pub fn start(
        &mut self,
        source: Box<dyn AudioSource>,
        sink: Box<dyn ResultSink>,
    ) -> Result<(), Error> {
        if self.shared.is_some() {
            return Err(Error::CouldNotStart("session already started".into()));
        }

        let encoder: Box<dyn Encoder> =
            encoder::for_format(self.config.format, self.config.sample_rate, self.config.channels)?;

        let shared = Arc::new(SharedState::new(Arc::clone(&self.socket)));
        self.shared = Some(Arc::clone(&shared));

        let mut handles = Vec::with_capacity(3);

        let tx_shared = Arc::clone(&shared);
        handles.push(
            std::thread::Builder::new()
                .name("mimi-tx".into())
                .spawn(move || worker::run_tx(tx_shared, source, encoder))
                .map_err(|e| Error::CouldNotStart(e.to_string()))?,
        );

        let rx_shared = Arc::clone(&shared);
        handles.push(
            std::thread::Builder::new()
                .name("mimi-rx".into())
                .spawn(move || worker::run_rx(rx_shared, sink))
                .map_err(|e| Error::CouldNotStart(e.to_string()))?,
        );

        let monitor_shared = Arc::clone(&shared);
        let monitor_result = Arc::clone(&self.monitor_result);
        handles.push(
            std::thread::Builder::new()
                .name("mimi-mon".into())
                .spawn(move || {
                    let code = worker::run_monitor(monitor_shared);
                    *monitor_result.lock().expect("monitor result lock poisoned") = Some(code);
                })
                .map_err(|e| Error::CouldNotStart(e.to_string()))?,
        );

        *self.handles.lock().expect("handle list lock poisoned") = handles;
        Ok(())
    }

    /// `true` once `start()` has run and at least one of the two
    /// workers is still active.
    pub fn is_active(&self) -> bool {
        match &self.shared {
            None => false,
            Some(shared) => {
                !(shared.tx_finished.load(Ordering::SeqCst) && shared.rx_finished.load(Ordering::SeqCst))
            }
        }
    }

    /// Current phase of the session, per spec.md's state machine.
    pub fn stream_state(&self) -> StreamState {
        let shared = match &self.shared {
            None => return StreamState::Wait,
            Some(shared) => shared,
        };

        let tx_started = shared.tx_started.load(Ordering::SeqCst);
        let rx_started = shared.rx_started.load(Ordering::SeqCst);
        let tx_finished = shared.tx_finished.load(Ordering::SeqCst);
        let rx_finished = shared.rx_finished.load(Ordering::SeqCst);

        if !tx_started || !rx_started {
            return StreamState::Wait;
        }
        match (tx_finished, rx_finished) {
            (true, true) => StreamState::Closed,
            (true, false) => StreamState::RecvOnly,
            (false, true) => StreamState::SendOnly,
            (false, false) => StreamState::Both,
        }
    }

    /// The first error code recorded by either worker, or 0 if none yet.
    pub fn error(&self) -> i32 {
        match &self.shared {
            None => 0,
            Some(shared) => shared.first_error.load(Ordering::SeqCst),
        }
    }

    /// Human-readable string for `self.error()`.
    pub fn error_string(&self) -> &'static str {
        error::strerror(self.error())
    }

    /// Requests shutdown, sends a close frame, and joins the worker
    /// threads. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(shared) = &self.shared {
            shared.shutdown_requested.store(true, Ordering::SeqCst);
            let _ = self.socket.send_close(1000);
            self.socket.shutdown();
        }
        for handle in self.handles.lock().expect("handle list lock poisoned").drain(..) {
            let _ = handle.join();
        }
    }

    /// Sends one payload directly on the underlying connection without
    /// starting the worker threads. Only valid before `start()` is
    /// called; mirrors `mimiioController::send` for callers that want a
    /// simple request/response exchange instead of the streaming model.
    pub fn send(&self, payload: &[u8]) -> Result<(), Error> {
        if self.shared.is_some() {
            return Err(Error::CouldNotStart(
                "send() cannot be used after start()".into(),
            ));
        }
        self.socket.send_binary(payload)
    }

    /// Blocks for exactly one frame and returns its payload, ignoring
    /// control frames. Only valid before `start()`; see [`Session::send`].
    pub fn recv_once(&self) -> Result<Vec<u8>, Error> {
        if self.shared.is_some() {
            return Err(Error::CouldNotStart(
                "recv_once() cannot be used after start()".into(),
            ));
        }
        loop {
            match self.socket.recv_frame()? {
                Frame::Text(bytes) => return Ok(bytes),
                Frame::Binary(bytes) => return Ok(bytes),
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close { status } => return Err(Error::PeerClose(status)),
                Frame::Unknown { .. } => return Err(Error::UnknownFrame),
                Frame::PeerGone => return Err(Error::PeerGone),
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
