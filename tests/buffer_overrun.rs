//! A user source that reports more bytes than the transmit worker's
//! scratch buffer can hold is a fatal policy breach: the worker exits
//! immediately with errorno 903 and sends no `recog-break`.

mod common;

use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use mimi_client::config::SessionConfigBuilder;
use mimi_client::session::Session;
use mimi_client::worker::{AudioChunk, AudioSource, TX_BUFFER_CAPACITY};
use mimi_client::Error;

use common::{accept_handshake, CapturingSink};

struct OverrunSource;

impl AudioSource for OverrunSource {
    fn next_chunk(&mut self) -> Result<AudioChunk, Error> {
        Ok(AudioChunk {
            pcm: vec![0u8; TX_BUFFER_CAPACITY + 2],
            recog_break: false,
        })
    }
}

#[test]
fn overrun_exits_with_903_and_no_recog_break() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream);
        // Give the transmit worker a moment; it should send nothing at
        // all before exiting, so a short read timeout firing is the
        // expected (and only) outcome here.
        stream
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        let mut buf = [0u8; 1];
        let n = stream.read(&mut buf).unwrap_or(0);
        assert_eq!(n, 0, "no frame should have been sent before the overrun exit");
    });

    let config = SessionConfigBuilder::new("127.0.0.1", addr.port())
        .use_tls(false)
        .recv_timeout(Duration::from_secs(5))
        .build();
    let mut session = Session::open(config).unwrap();
    session
        .start(Box::new(OverrunSource), Box::new(CapturingSink::default()))
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while session.error() == 0 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(session.error(), 903);
    server.join().unwrap();
}
