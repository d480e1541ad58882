//! Stable error taxonomy shared by every layer of the client.
//!
//! Codes are grouped by decade exactly as the wire protocol's close-code
//! space and this crate's own policy errors are grouped: 1xx misc, 5xx
//! encoder, 6xx TLS, 7xx networking, 8xx WebSocket protocol, 9xx policy,
//! 1000-1015 RFC 6455 close codes, anything else above 1000 is a
//! peer-declared reason passed through verbatim. Negative codes are reserved
//! for user callback errors and never originate here.

/// Errors produced by this crate.
///
/// Every variant carries enough detail for a human log line; [`Error::code`]
/// recovers the stable numeric code used by the C ABI and by the session's
/// first-error slot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 101 - anything that doesn't fit a more specific bucket.
    #[error("unknown error: {0}")]
    Misc(String),

    /// 501 - the underlying encoder refused its configuration.
    #[error("encoder initialization error: {0}")]
    EncoderInit(String),
    /// 502 - the encoder rejected a chunk of input during processing.
    #[error("encoder processing error: {0}")]
    EncoderProcess(String),

    /// 601 - failed to build a TLS client context.
    #[error("TLS client context error: {0}")]
    TlsContext(String),
    /// 602 - the peer presented a certificate this client rejected.
    #[error("TLS invalid certificate: {0}")]
    TlsInvalidCert(String),
    /// 603 - certificate chain validation failed.
    #[error("TLS certificate validation error: {0}")]
    TlsCertValidation(String),
    /// 604 - the TLS session was closed unexpectedly.
    #[error("TLS connection closed unexpectedly")]
    TlsClosed,
    /// 605 - any other TLS failure.
    #[error("TLS error: {0}")]
    TlsGeneric(String),

    /// 701 - DNS resolution of the host failed.
    #[error("host not found: {0}")]
    HostNotFound(String),
    /// 703 - connecting to the remote host timed out.
    #[error("connect timed out")]
    ConnectTimeout,
    /// 704 - the remote host refused the connection.
    #[error("connection refused")]
    ConnectionRefused,
    /// 705 - the peer reset the connection, typically a capacity limit.
    #[error("connection reset by peer")]
    ConnectionReset,
    /// 790 - any other network-layer failure.
    #[error("network error: {0}")]
    Network(String),
    /// 791 - the peer vanished without a close frame.
    #[error("unexpected network disconnection")]
    PeerGone,
    /// 799 - a network failure that doesn't map to anything more specific.
    #[error("undefined network error: {0}")]
    NetworkUndefined(String),

    /// 800 + RFC 6455 handshake/protocol code.
    #[error("WebSocket protocol error ({0})")]
    WebSocketProtocol(u16),
    /// 830 - a send or receive call exceeded its configured timeout.
    #[error("WebSocket receive timeout")]
    WebSocketReceiveTimeout,
    /// 890 - a frame arrived with a flags combination this client doesn't
    /// understand.
    #[error("unknown WebSocket frame received")]
    UnknownFrame,

    /// 901 - no transmit callback was supplied.
    #[error("no tx callback configured")]
    MissingTx,
    /// 902 - no receive callback was supplied.
    #[error("no rx callback configured")]
    MissingRx,
    /// 903 - the caller's tx callback wrote more than the scratch buffer.
    #[error("audio buffer overrun")]
    BufferOverrun,
    /// 904 - the server sent an empty close frame (no status).
    #[error("close frame received without a status")]
    CloseWithoutStatus,
    /// 905 - worker threads could not be started.
    #[error("could not start session: {0}")]
    CouldNotStart(String),
    /// 906 - an empty text frame was received.
    #[error("received empty text frame")]
    EmptyText,
    /// 907 - an empty binary frame was received.
    #[error("received empty binary frame")]
    EmptyBinary,

    /// 1000-1015 - an RFC 6455 close code, or anything above 1000 passed
    /// through verbatim from the peer.
    #[error("connection closed by peer with status {0}")]
    PeerClose(u16),

    /// A user callback reported failure; the negative value is opaque to
    /// this crate and is passed through to [`Error::code`] unchanged.
    #[error("user callback error ({0})")]
    UserCallback(i32),

    /// Wraps a `std::io::Error` that doesn't carry enough context to be
    /// classified more precisely.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The stable numeric code for this error, matching the decadal
    /// taxonomy in the crate documentation.
    pub fn code(&self) -> i32 {
        match self {
            Error::Misc(_) => 101,
            Error::EncoderInit(_) => 501,
            Error::EncoderProcess(_) => 502,
            Error::TlsContext(_) => 601,
            Error::TlsInvalidCert(_) => 602,
            Error::TlsCertValidation(_) => 603,
            Error::TlsClosed => 604,
            Error::TlsGeneric(_) => 605,
            Error::HostNotFound(_) => 701,
            Error::ConnectTimeout => 703,
            Error::ConnectionRefused => 704,
            Error::ConnectionReset => 705,
            Error::Network(_) => 790,
            Error::PeerGone => 791,
            Error::NetworkUndefined(_) => 799,
            Error::WebSocketProtocol(code) => 800 + *code as i32,
            Error::WebSocketReceiveTimeout => 830,
            Error::UnknownFrame => 890,
            Error::MissingTx => 901,
            Error::MissingRx => 902,
            Error::BufferOverrun => 903,
            Error::CloseWithoutStatus => 904,
            Error::CouldNotStart(_) => 905,
            Error::EmptyText => 906,
            Error::EmptyBinary => 907,
            Error::PeerClose(status) => *status as i32,
            Error::UserCallback(code) => *code,
            Error::Io(_) => 799,
        }
    }
}

/// Map a raw numeric code (as stored in the session's first-error slot, or
/// read back off a close frame) to a stable human string.
///
/// Mirrors the taxonomy in [`Error::code`] without requiring a live `Error`
/// value, since codes often arrive detached from the `Error` that produced
/// them (e.g. after crossing the C ABI).
pub fn strerror(errorno: i32) -> &'static str {
    if errorno < 0 {
        return "user defined error";
    }
    match errorno {
        0 => "no error",
        101 => "unknown error",
        501 => "encoder initialization error",
        502 => "encoder processing error",
        601 => "TLS client context error",
        602 => "TLS invalid certificate error",
        603 => "TLS certificate validation error",
        604 => "TLS connection closed unexpectedly",
        605 => "TLS error",
        701 => "host not found",
        703 => "timed out establishing connection",
        704 => "connection refused by remote host",
        705 => "connection reset by peer (capacity exceeded)",
        790 => "network error",
        791 => "unexpected network disconnection",
        799 => "undefined network error",
        801..=811 => "WebSocket handshake or protocol error",
        830 => "WebSocket receive timeout",
        890 => "WebSocket unknown frame received",
        901 => "tx callback is not set",
        902 => "rx callback is not set",
        903 => "audio buffer overrun",
        904 => "close frame received without a status",
        905 => "could not start session",
        906 => "received empty text frame",
        907 => "received empty binary frame",
        1000 => "connection closed normally",
        1001 => "endpoint going away",
        1002 => "protocol error",
        1003 => "unacceptable payload type",
        1004 => "reserved",
        1005 => "reserved (no status code)",
        1006 => "reserved (abnormal close)",
        1007 => "malformed payload",
        1008 => "policy violation",
        1009 => "payload too big",
        1010 => "extension required",
        1011 => "unexpected condition",
        1015 => "reserved (TLS failure)",
        _ => "remote host reported an error; see the numeric code",
    }
}
