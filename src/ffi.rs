//! `extern "C"` shim over the safe [`crate::session::Session`] API,
//! matching the shape of the original's public header: an opaque handle,
//! callback function pointers plus an opaque `userdata`, and out-params
//! for error codes. `userdata` is never dereferenced by this crate — it
//! is only ever handed back to the caller's own callback.

use std::ffi::{c_char, c_void, CStr, CString};
use std::os::raw::c_int;
use std::sync::{Mutex, OnceLock};

use crate::config::{LogLevel, SessionConfigBuilder};
use crate::encoder::AudioFormat;
use crate::error::{self, Error};
use crate::session::{Session, StreamState};
use crate::worker::{AudioChunk, AudioSource, ResultSink, TX_BUFFER_CAPACITY};

/// Tx callback contract, matching the wire worker's own signature exactly:
/// called once per transmit iteration to fill `buf` (capacity `*len`
/// bytes, at most [`TX_BUFFER_CAPACITY`]) with raw 16-bit LE PCM.
///
/// On entry, `*len` holds the buffer's capacity. The callback overwrites
/// `*len` with the number of bytes it actually wrote (`0` is valid — an
/// idle pause), may set `*recog_break` to request end-of-utterance, and
/// may set `*tx_error` to a nonzero caller-defined code to abort the
/// session. The callback has no return value.
pub type OnTxCallback = unsafe extern "C" fn(
    buf: *mut u8,
    len: *mut usize,
    recog_break: *mut bool,
    tx_error: *mut i32,
    userdata: *mut c_void,
);

/// Rx callback contract: `kind` is `0` for text, `1` for binary.
/// `data`/`len` describe a borrowed buffer valid only for the duration
/// of the call.
pub type OnRxCallback =
    unsafe extern "C" fn(kind: c_int, data: *const u8, len: usize, userdata: *mut c_void);

struct FfiAudioSource {
    callback: OnTxCallback,
    userdata: RawUserData,
    /// The fixed scratch buffer the callback writes into, owned once for
    /// the worker's lifetime rather than reallocated per iteration.
    buffer: Vec<u8>,
}

// The caller is responsible for `userdata` being safe to use from the
// transmit worker thread; this crate never dereferences it.
unsafe impl Send for FfiAudioSource {}

impl AudioSource for FfiAudioSource {
    fn next_chunk(&mut self) -> Result<AudioChunk, Error> {
        let mut len: usize = self.buffer.len();
        let mut recog_break = false;
        let mut tx_error: i32 = 0;

        unsafe {
            (self.callback)(
                self.buffer.as_mut_ptr(),
                &mut len as *mut usize,
                &mut recog_break as *mut bool,
                &mut tx_error as *mut i32,
                self.userdata.0,
            );
        }

        if tx_error != 0 {
            return Err(Error::UserCallback(tx_error));
        }
        if len > self.buffer.len() {
            // The callback reported more bytes than the buffer can hold;
            // reading that far would run past what it actually wrote.
            return Err(Error::BufferOverrun);
        }

        Ok(AudioChunk {
            pcm: self.buffer[..len].to_vec(),
            recog_break,
        })
    }
}

struct FfiResultSink {
    callback: OnRxCallback,
    userdata: RawUserData,
}

unsafe impl Send for FfiResultSink {}

impl ResultSink for FfiResultSink {
    fn on_text(&mut self, text: &str) {
        unsafe {
            (self.callback)(0, text.as_ptr(), text.len(), self.userdata.0);
        }
    }

    fn on_binary(&mut self, data: &[u8]) {
        unsafe {
            (self.callback)(1, data.as_ptr(), data.len(), self.userdata.0);
        }
    }
}

/// Wraps the raw `userdata` pointer so it can cross the thread boundary
/// into the worker threads without this crate claiming to know anything
/// about what it points to.
struct RawUserData(*mut c_void);
unsafe impl Send for RawUserData {}

fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_owned)
}

/// Opens a session. On success, writes a new session handle to
/// `out_session` and returns `0`; on failure, `out_session` is left
/// untouched and a nonzero error code is returned.
///
/// # Safety
/// `host`, `path`, and `bearer_token` (if non-null) must be valid,
/// NUL-terminated C strings for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn mimi_open(
    host: *const c_char,
    port: u16,
    path: *const c_char,
    use_tls: c_int,
    format: c_int,
    flac_level: u8,
    sample_rate: u32,
    channels: u8,
    bearer_token: *const c_char,
    log_level: c_int,
    out_session: *mut *mut Session,
) -> c_int {
    let host = match cstr_to_string(host) {
        Some(h) => h,
        None => return Error::Misc("host is null".into()).code(),
    };
    let path = cstr_to_string(path).unwrap_or_else(|| "/".to_string());
    let token = cstr_to_string(bearer_token);

    let audio_format = match format {
        0 => AudioFormat::Pcm,
        1 => match AudioFormat::flac(flac_level) {
            Ok(f) => f,
            Err(e) => return e.code(),
        },
        2 => AudioFormat::FlacPassThrough,
        _ => return Error::Misc("unknown audio format tag".into()).code(),
    };

    let mut builder = SessionConfigBuilder::new(host, port)
        .path(path)
        .use_tls(use_tls != 0)
        .format(audio_format)
        .sample_rate(sample_rate)
        .channels(channels)
        .log_level(LogLevel::from_numeric(log_level).unwrap_or(LogLevel::Warning));
    if let Some(token) = token {
        builder = builder.bearer_token(token);
    }

    match Session::open(builder.build()) {
        Ok(session) => {
            unsafe { *out_session = Box::into_raw(Box::new(session)) };
            0
        }
        Err(e) => e.code(),
    }
}

/// Starts the worker threads on an opened session.
///
/// # Safety
/// `session` must be a live pointer returned by `mimi_open` and not yet
/// passed to `mimi_close`.
#[no_mangle]
pub unsafe extern "C" fn mimi_start(
    session: *mut Session,
    tx_callback: OnTxCallback,
    tx_userdata: *mut c_void,
    rx_callback: OnRxCallback,
    rx_userdata: *mut c_void,
) -> c_int {
    let session = unsafe { &mut *session };
    let source = Box::new(FfiAudioSource {
        callback: tx_callback,
        userdata: RawUserData(tx_userdata),
        buffer: vec![0u8; TX_BUFFER_CAPACITY],
    });
    let sink = Box::new(FfiResultSink {
        callback: rx_callback,
        userdata: RawUserData(rx_userdata),
    });
    match session.start(source, sink) {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

/// # Safety
/// `session` must be a live pointer returned by `mimi_open`.
#[no_mangle]
pub unsafe extern "C" fn mimi_is_active(session: *const Session) -> c_int {
    let session = unsafe { &*session };
    session.is_active() as c_int
}

/// # Safety
/// `session` must be a live pointer returned by `mimi_open`.
#[no_mangle]
pub unsafe extern "C" fn mimi_stream_state(session: *const Session) -> c_int {
    let session = unsafe { &*session };
    match session.stream_state() {
        StreamState::Wait => 0,
        StreamState::Both => 1,
        StreamState::SendOnly => 2,
        StreamState::RecvOnly => 3,
        StreamState::Closed => 4,
    }
}

/// # Safety
/// `session` must be a live pointer returned by `mimi_open`.
#[no_mangle]
pub unsafe extern "C" fn mimi_error(session: *const Session) -> c_int {
    let session = unsafe { &*session };
    session.error()
}

/// Closes the session, joins its worker threads, and frees it. `session`
/// must not be used again after this call.
///
/// # Safety
/// `session` must be a live pointer returned by `mimi_open`, not
/// previously passed to `mimi_close`.
#[no_mangle]
pub unsafe extern "C" fn mimi_close(session: *mut Session) {
    if session.is_null() {
        return;
    }
    let mut session = unsafe { Box::from_raw(session) };
    session.close();
}

static STRERROR_CACHE: OnceLock<Mutex<std::collections::HashMap<i32, &'static CStr>>> = OnceLock::new();

/// Returns a NUL-terminated, process-lifetime string describing
/// `errorno`. Never returns null.
#[no_mangle]
pub extern "C" fn mimi_strerror(errorno: c_int) -> *const c_char {
    let cache = STRERROR_CACHE.get_or_init(|| Mutex::new(std::collections::HashMap::new()));
    let mut cache = cache.lock().expect("strerror cache lock poisoned");
    let entry = cache.entry(errorno).or_insert_with(|| {
        let owned = CString::new(error::strerror(errorno)).unwrap_or_default();
        Box::leak(owned.into_boxed_c_str())
    });
    entry.as_ptr()
}

static VERSION: OnceLock<CString> = OnceLock::new();

/// Returns this crate's version string (`CARGO_PKG_VERSION`), baked in
/// at compile time.
#[no_mangle]
pub extern "C" fn mimi_version() -> *const c_char {
    VERSION
        .get_or_init(|| CString::new(env!("CARGO_PKG_VERSION")).unwrap())
        .as_ptr()
}
