//! Status codes and the thread-local last error

use glyphport_text::TextError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Result of every exported call
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    NullArgument = 1,
    InvalidUtf8 = 2,
    InvalidHandle = 3,
    EngineInit = 4,
    FaceLoad = 5,
    InvalidPixelSize = 6,
    GlyphNotFound = 7,
    RenderFailed = 8,
    Allocation = 9,
    Io = 10,
    Panic = 11,
}

/// Errors raised at the boundary
#[derive(Error, Debug)]
pub enum FfiError {
    #[error("Null pointer passed for `{0}`")]
    NullArgument(&'static str),

    #[error("Argument `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("Font handle {0:#x} is not live (never created, or already disposed)")]
    InvalidHandle(u64),

    #[error(transparent)]
    Text(#[from] TextError),
}

impl FfiError {
    pub fn status(&self) -> Status {
        match self {
            Self::NullArgument(_) => Status::NullArgument,
            Self::InvalidUtf8(_) => Status::InvalidUtf8,
            Self::InvalidHandle(_) => Status::InvalidHandle,
            Self::Text(e) => match e {
                TextError::EngineInit(_) => Status::EngineInit,
                TextError::FaceLoad { .. } => Status::FaceLoad,
                TextError::InvalidPixelSize(_) => Status::InvalidPixelSize,
                TextError::GlyphNotFound(_) => Status::GlyphNotFound,
                TextError::RenderFailed { .. } | TextError::MalformedBitmap { .. } => {
                    Status::RenderFailed
                }
                TextError::Allocation { .. } => Status::Allocation,
                TextError::Io(_) => Status::Io,
            },
        }
    }
}

pub type FfiResult<T> = Result<T, FfiError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: String) {
    // Interior NULs would truncate the message on the C side anyway
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Run an exported call body: record errors, never unwind into the host
pub(crate) fn guard(name: &'static str, body: impl FnOnce() -> FfiResult<()>) -> Status {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => {
            clear_last_error();
            Status::Ok
        }
        Ok(Err(e)) => {
            match &e {
                FfiError::NullArgument(_) | FfiError::InvalidHandle(_) => {
                    tracing::warn!("{}: {}", name, e)
                }
                _ => tracing::debug!("{}: {}", name, e),
            }
            let status = e.status();
            set_last_error(e.to_string());
            status
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("{} panicked: {}", name, message);
            set_last_error(format!("{} panicked: {}", name, message));
            Status::Panic
        }
    }
}

/// Copy the calling thread's last error message into `buf`
///
/// Writes at most `cap - 1` bytes plus a NUL terminator and returns the full
/// message length in bytes (0 when the last call succeeded). Call with a null
/// `buf` to query the length.
///
/// # Safety
///
/// `buf` must be null or valid for `cap` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_last_error(buf: *mut c_char, cap: usize) -> usize {
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let Some(message) = slot.as_ref() else {
            if !buf.is_null() && cap > 0 {
                *buf = 0;
            }
            return 0;
        };
        let bytes = message.as_bytes();
        if !buf.is_null() && cap > 0 {
            let n = bytes.len().min(cap - 1);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, n);
            *buf.add(n) = 0;
        }
        bytes.len()
    })
}
