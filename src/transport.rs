//! Connection establishment: plain or TLS TCP, optional HTTP(S) proxy,
//! connect/send/recv timeouts.
//!
//! `WsStream` follows the blocking `Plain`/`Tls` stream-enum shape used for
//! the blocking transport variant in the wider WebSocket-client corpus,
//! substituting `openssl`'s `SslStream` for the TLS leg since this crate
//! needs the original's literal OpenSSL cipher-list string and relaxed
//! verification semantics, which don't translate to rustls. [`WsStream::split`]
//! divides the connection into an independent read half and write half so a
//! blocked receive never stalls a concurrent send, the way the original's
//! Poco socket lets one thread stream audio while another blocks on results.

use std::cell::UnsafeCell;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVerifyMode};

use crate::error::Error;

const CIPHER_LIST: &str = "ALL:!ADH:!LOW:!EXP:!MD5:@STRENGTH";

/// Default timeouts, matching `mimiioImpl.cpp`'s 30-second constants.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(30);

/// A connected byte stream, either plain TCP or TLS-over-TCP.
pub enum WsStream {
    Plain(TcpStream),
    Tls(Box<SslStream<TcpStream>>),
}

impl Read for WsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            WsStream::Plain(s) => s.read(buf),
            WsStream::Tls(s) => s.read(buf),
        }
    }
}

impl WsStream {
    /// Shuts the underlying socket down in both directions, unblocking
    /// any thread parked in a read or write call on this connection.
    pub fn shutdown(&self) -> io::Result<()> {
        let tcp = match self {
            WsStream::Plain(s) => s,
            WsStream::Tls(s) => s.get_ref(),
        };
        tcp.shutdown(std::net::Shutdown::Both)
    }

    /// Splits the connection into an independent read half and write
    /// half, plus a raw `TcpStream` handle good only for forcing the
    /// socket closed. The plain case duplicates the file descriptor with
    /// `try_clone`, which the OS already treats as safe for one thread to
    /// read from while another writes. The TLS case can't duplicate the
    /// `SSL` object itself, so both halves share it through [`TlsHandle`].
    pub fn split(self) -> (ReadStream, WriteStream, TcpStream) {
        match self {
            WsStream::Plain(tcp) => {
                let shutdown_handle = tcp.try_clone().expect("tcp stream try_clone");
                let write_half = tcp.try_clone().expect("tcp stream try_clone");
                (ReadStream::Plain(tcp), WriteStream::Plain(write_half), shutdown_handle)
            }
            WsStream::Tls(ssl) => {
                let shutdown_handle = ssl.get_ref().try_clone().expect("tcp stream try_clone");
                let shared = TlsHandle(Arc::new(UnsafeCell::new(*ssl)));
                (ReadStream::Tls(shared.clone()), WriteStream::Tls(shared), shutdown_handle)
            }
        }
    }
}

/// Shared handle onto a TLS stream's single `SSL` object, letting the
/// receive worker read while a writer holds the send-mutex and writes, with
/// neither direction waiting on the other.
///
/// Safe because exactly one thread ever calls `read` through this handle
/// (the receive worker owns the read half) and every writer already
/// serializes through its own mutex before calling `write`, so the two
/// `&mut` accesses this produces are never live at the same time from more
/// than one thread per direction. OpenSSL supports a dedicated reader
/// thread and a dedicated writer thread driving the same `SSL*`
/// concurrently; this mirrors that at the Rust level.
pub struct TlsHandle(Arc<UnsafeCell<SslStream<TcpStream>>>);

impl Clone for TlsHandle {
    fn clone(&self) -> TlsHandle {
        TlsHandle(Arc::clone(&self.0))
    }
}

// SAFETY: see the invariant documented on `TlsHandle` above.
unsafe impl Send for TlsHandle {}

/// The read half produced by [`WsStream::split`].
pub enum ReadStream {
    Plain(TcpStream),
    Tls(TlsHandle),
}

impl Read for ReadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ReadStream::Plain(s) => s.read(buf),
            ReadStream::Tls(handle) => unsafe { &mut *handle.0.get() }.read(buf),
        }
    }
}

/// The write half produced by [`WsStream::split`].
pub enum WriteStream {
    Plain(TcpStream),
    Tls(TlsHandle),
}

impl Write for WriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            WriteStream::Plain(s) => s.write(buf),
            WriteStream::Tls(handle) => unsafe { &mut *handle.0.get() }.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            WriteStream::Plain(s) => s.flush(),
            WriteStream::Tls(handle) => unsafe { &mut *handle.0.get() }.flush(),
        }
    }
}

impl Write for WsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            WsStream::Plain(s) => s.write(buf),
            WsStream::Tls(s) => s.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            WsStream::Plain(s) => s.flush(),
            WsStream::Tls(s) => s.flush(),
        }
    }
}

/// Connection parameters needed to establish the transport, independent
/// of the higher-level `SessionConfig` (kept separate so unit tests can
/// construct one without pulling in the whole session type).
pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub use_tls: bool,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
}

/// Opens the transport: resolves any configured proxy, opens the TCP
/// socket (via `CONNECT` if proxied), and layers TLS on top when
/// `use_tls` is set. Verification is "relaxed": the handshake completes
/// even against a certificate this client can't fully validate, matching
/// the original's `NotifyAndRejectCertificateHandler`-adjacent policy of
/// warning rather than hard-failing on verification issues by default.
pub fn connect(params: &ConnectParams) -> Result<WsStream, Error> {
    let tcp = match crate::proxy::resolve_for_host(params.host) {
        Some(proxy) => connect_via_proxy(&proxy, params)?,
        None => connect_plain(params.host, params.port, params.connect_timeout)?,
    };

    tcp.set_read_timeout(Some(params.recv_timeout))
        .map_err(Error::Io)?;
    tcp.set_write_timeout(Some(params.send_timeout))
        .map_err(Error::Io)?;

    if params.use_tls {
        let mut builder =
            SslConnector::builder(SslMethod::tls_client()).map_err(|e| Error::TlsContext(e.to_string()))?;
        builder
            .set_cipher_list(CIPHER_LIST)
            .map_err(|e| Error::TlsContext(e.to_string()))?;
        builder.set_verify(SslVerifyMode::NONE);
        let connector = builder.build();
        let stream = connector
            .connect(params.host, tcp)
            .map_err(|e| Error::TlsGeneric(e.to_string()))?;
        Ok(WsStream::Tls(Box::new(stream)))
    } else {
        Ok(WsStream::Plain(tcp))
    }
}

fn connect_plain(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, Error> {
    use std::net::ToSocketAddrs;
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|_| Error::HostNotFound(host.to_string()))?
        .next()
        .ok_or_else(|| Error::HostNotFound(host.to_string()))?;
    TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
        io::ErrorKind::TimedOut => Error::ConnectTimeout,
        io::ErrorKind::ConnectionRefused => Error::ConnectionRefused,
        _ => Error::Network(e.to_string()),
    })
}

fn connect_via_proxy(
    proxy: &crate::proxy::ProxyTarget,
    params: &ConnectParams,
) -> Result<TcpStream, Error> {
    let mut tcp = connect_plain(&proxy.host, proxy.port, params.connect_timeout)?;
    let mut request = format!(
        "CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n",
        host = params.host,
        port = params.port
    );
    if let Some(header) = proxy_authorization_header(proxy) {
        request.push_str(&header);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    tcp.write_all(request.as_bytes()).map_err(Error::Io)?;

    let mut reader = BufReader::new(&tcp);
    let mut status_line = String::new();
    std::io::BufRead::read_line(&mut reader, &mut status_line).map_err(Error::Io)?;
    if !status_line.contains("200") {
        return Err(Error::Network(format!(
            "proxy CONNECT failed: {}",
            status_line.trim()
        )));
    }
    loop {
        let mut line = String::new();
        std::io::BufRead::read_line(&mut reader, &mut line).map_err(Error::Io)?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
    }
    Ok(tcp)
}

/// Builds a `Proxy-Authorization: Basic ...` header line (no trailing
/// `\r\n`) from the proxy URL's userinfo, or `None` if none was given.
fn proxy_authorization_header(proxy: &crate::proxy::ProxyTarget) -> Option<String> {
    let username = proxy.username.as_deref().unwrap_or_default();
    if proxy.username.is_none() && proxy.password.is_none() {
        return None;
    }
    let password = proxy.password.as_deref().unwrap_or_default();
    let credentials = STANDARD.encode(format!("{username}:{password}"));
    Some(format!("Proxy-Authorization: Basic {credentials}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn no_auth_header_without_credentials() {
        let proxy = crate::proxy::ProxyTarget {
            host: "proxy.example.com".into(),
            port: 3128,
            username: None,
            password: None,
        };
        assert_eq!(proxy_authorization_header(&proxy), None);
    }

    #[test]
    fn auth_header_encodes_user_and_password() {
        let proxy = crate::proxy::ProxyTarget {
            host: "proxy.example.com".into(),
            port: 3128,
            username: Some("user".into()),
            password: Some("pass".into()),
        };
        assert_eq!(
            proxy_authorization_header(&proxy),
            Some(format!("Proxy-Authorization: Basic {}", STANDARD.encode("user:pass")))
        );
    }

    #[test]
    fn plain_split_allows_independent_read_and_write() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let (mut read_half, mut write_half, shutdown_handle) = WsStream::Plain(client).split();
        write_half.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").unwrap();
        let mut buf = [0u8; 4];
        read_half.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");

        shutdown_handle.shutdown(std::net::Shutdown::Both).unwrap();
    }
}
