//! Shared helpers for the integration tests: a minimal WebSocket server
//! side (handshake + raw frame read/write) plus a couple of reusable
//! `AudioSource`/`ResultSink` stubs.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{Digest, Sha1};

use mimi_client::worker::{AudioChunk, AudioSource, ResultSink};
use mimi_client::Error;

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

pub fn accept_handshake(stream: &mut TcpStream) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut key = String::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("sec-websocket-key") {
                key = value.trim().to_string();
            }
        }
    }
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    let accept = STANDARD.encode(hasher.finalize());

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    stream.write_all(response.as_bytes()).unwrap();
}

pub fn read_client_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).unwrap();
    let opcode = head[0] & 0x0F;
    let masked = head[1] & 0x80 != 0;
    let len_code = head[1] & 0x7F;
    let len: usize = match len_code {
        0..=125 => len_code as usize,
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).unwrap();
            u16::from_be_bytes(ext) as usize
        }
        _ => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).unwrap();
            u64::from_be_bytes(ext) as usize
        }
    };
    let key = if masked {
        let mut k = [0u8; 4];
        stream.read_exact(&mut k).unwrap();
        Some(k)
    } else {
        None
    };
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    if let Some(k) = key {
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= k[i % 4];
        }
    }
    (opcode, payload)
}

pub fn write_server_frame(stream: &mut TcpStream, opcode: u8, payload: &[u8]) {
    let mut header = vec![0x80 | opcode];
    let len = payload.len();
    if len <= 125 {
        header.push(len as u8);
    } else {
        header.push(126);
        header.extend_from_slice(&(len as u16).to_be_bytes());
    }
    stream.write_all(&header).unwrap();
    stream.write_all(payload).unwrap();
}

pub struct CountingSource {
    pub remaining: u32,
}

impl AudioSource for CountingSource {
    fn next_chunk(&mut self) -> Result<AudioChunk, Error> {
        if self.remaining == 0 {
            return Ok(AudioChunk {
                pcm: Vec::new(),
                recog_break: true,
            });
        }
        self.remaining -= 1;
        Ok(AudioChunk {
            pcm: vec![0u8; 320],
            recog_break: false,
        })
    }
}

#[derive(Default)]
pub struct CapturingSink {
    pub texts: Arc<Mutex<Vec<String>>>,
}

impl ResultSink for CapturingSink {
    fn on_text(&mut self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }
    fn on_binary(&mut self, _data: &[u8]) {}
}
