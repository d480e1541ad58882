//! Integration tests driving a real `Session` against a minimal,
//! hand-rolled WebSocket server running on a background thread over a
//! real loopback TCP socket (no mocking framework, matching the style
//! of raw-socket tests elsewhere in the WebSocket-client corpus).

mod common;

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mimi_client::config::SessionConfigBuilder;
use mimi_client::encoder::AudioFormat;
use mimi_client::session::Session;

use common::{accept_handshake, read_client_frame, write_server_frame, CapturingSink, CountingSource};

const RECOG_BREAK_JSON: &[u8] = br#"{"command":"recog-break"}"#;

/// S1/S2: a session sends a couple of binary frames, flushes with
/// `recog-break`, receives one text result, and the server closes
/// normally (1000). The session ends up inactive with no recorded error.
#[test]
fn normal_round_trip_ends_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream);

        let (opcode, _) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x2);
        let (opcode, _) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x2);

        let (opcode, payload) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x1);
        assert_eq!(payload, RECOG_BREAK_JSON);

        write_server_frame(&mut stream, 0x1, b"hello from server");
        write_server_frame(&mut stream, 0x8, &1000u16.to_be_bytes());

        let (opcode, _) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x8);
    });

    let config = SessionConfigBuilder::new("127.0.0.1", addr.port())
        .use_tls(false)
        .format(AudioFormat::Pcm)
        .sample_rate(16000)
        .recv_timeout(Duration::from_secs(5))
        .build();

    let mut session = Session::open(config).expect("handshake should succeed");
    let texts = Arc::new(Mutex::new(Vec::new()));
    let sink = CapturingSink {
        texts: Arc::clone(&texts),
    };
    session
        .start(Box::new(CountingSource { remaining: 2 }), Box::new(sink))
        .expect("start should succeed");

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while session.is_active() && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert!(!session.is_active(), "session should have finished");
    assert_eq!(session.error(), 0);
    assert_eq!(&*texts.lock().unwrap(), &["hello from server".to_string()]);

    server.join().unwrap();
}

/// The synchronous escape hatch works before `start()` is called.
#[test]
fn synchronous_send_and_recv_once() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream);
        let (opcode, payload) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x2);
        assert_eq!(payload, b"ping");
        write_server_frame(&mut stream, 0x2, b"pong");
    });

    let config = SessionConfigBuilder::new("127.0.0.1", addr.port())
        .use_tls(false)
        .recv_timeout(Duration::from_secs(5))
        .build();
    let session = Session::open(config).unwrap();
    session.send(b"ping").unwrap();
    let reply = session.recv_once().unwrap();
    assert_eq!(reply, b"pong");

    server.join().unwrap();
}

/// A caller's negative error code from `AudioSource` is recorded
/// verbatim as the session's error, and the transmit worker still makes
/// a best-effort attempt at the terminating `recog-break` frame first.
#[test]
fn user_callback_error_is_recorded_verbatim() {
    struct FailingSource;
    impl mimi_client::worker::AudioSource for FailingSource {
        fn next_chunk(&mut self) -> Result<mimi_client::worker::AudioChunk, mimi_client::Error> {
            Err(mimi_client::Error::UserCallback(-42))
        }
    }

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream);
        // best-effort recog-break sent by the failing transmit worker
        let (opcode, payload) = read_client_frame(&mut stream);
        assert_eq!(opcode, 0x1);
        assert_eq!(payload, RECOG_BREAK_JSON);
        write_server_frame(&mut stream, 0x8, &1000u16.to_be_bytes());
        let _ = read_client_frame(&mut stream);
    });

    let config = SessionConfigBuilder::new("127.0.0.1", addr.port())
        .use_tls(false)
        .recv_timeout(Duration::from_secs(5))
        .build();
    let mut session = Session::open(config).unwrap();
    session
        .start(Box::new(FailingSource), Box::new(CapturingSink::default()))
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while session.is_active() && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(session.error(), -42);
    server.join().unwrap();
}
