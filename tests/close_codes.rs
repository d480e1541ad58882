//! Focused tests on the WebSocket close-status dispatch table: 1000 is a
//! clean finish, any other nonzero status is an error equal to that
//! status, and a close frame with no status body is its own error (904).

mod common;

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use mimi_client::config::SessionConfigBuilder;

use common::{accept_handshake, read_client_frame, write_server_frame, CapturingSink, CountingSource};

fn run_session_against(status_frame: Option<Vec<u8>>) -> i32 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream);
        if let Some(payload) = status_frame {
            write_server_frame(&mut stream, 0x8, &payload);
        }
        let _ = read_client_frame(&mut stream);
    });

    let config = SessionConfigBuilder::new("127.0.0.1", addr.port())
        .use_tls(false)
        .recv_timeout(Duration::from_secs(5))
        .build();
    let mut session = mimi_client::Session::open(config).unwrap();
    session
        .start(
            Box::new(CountingSource { remaining: 0 }),
            Box::new(CapturingSink::default()),
        )
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while session.is_active() && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    server.join().unwrap();
    session.error()
}

#[test]
fn status_1000_is_not_an_error() {
    assert_eq!(run_session_against(Some(1000u16.to_be_bytes().to_vec())), 0);
}

#[test]
fn nonzero_status_is_the_error_code() {
    assert_eq!(run_session_against(Some(1008u16.to_be_bytes().to_vec())), 1008);
}

#[test]
fn close_without_status_is_error_904() {
    assert_eq!(run_session_against(Some(Vec::new())), 904);
}
