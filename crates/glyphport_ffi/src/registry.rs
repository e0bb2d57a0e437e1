//! Process-wide table of live fonts
//!
//! Hosts hold `u64` handles, never pointers. A handle is a slotmap key
//! (index plus generation), so a handle that was disposed, or that never
//! existed, is detected instead of dereferenced. `0` is never a valid handle.
//!
//! A panic while the table is locked poisons the mutex. The table itself is
//! never left half-updated by font code, so the lock is recovered and other
//! handles keep working.

use crate::status::{FfiError, FfiResult};
use glyphport_text::Font;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

new_key_type! {
    /// Key of a live font
    pub struct FontKey;
}

static FONTS: OnceLock<Mutex<SlotMap<FontKey, Font>>> = OnceLock::new();

fn table() -> MutexGuard<'static, SlotMap<FontKey, Font>> {
    FONTS
        .get_or_init(|| Mutex::new(SlotMap::with_key()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn key_from_handle(handle: u64) -> FontKey {
    KeyData::from_ffi(handle).into()
}

/// Register a font and return its handle
pub fn insert(font: Font) -> u64 {
    let key = table().insert(font);
    let handle = key.data().as_ffi();
    tracing::debug!("Registered font handle {:#x}", handle);
    handle
}

/// Run `f` with exclusive access to the font behind `handle`
///
/// The table lock is held for the duration of `f`, which serializes all use
/// of every handle.
pub fn with_font<T>(handle: u64, f: impl FnOnce(&mut Font) -> FfiResult<T>) -> FfiResult<T> {
    let mut fonts = table();
    let font = fonts
        .get_mut(key_from_handle(handle))
        .ok_or(FfiError::InvalidHandle(handle))?;
    f(font)
}

/// Remove and drop the font behind `handle`
pub fn remove(handle: u64) -> FfiResult<()> {
    let font = table()
        .remove(key_from_handle(handle))
        .ok_or(FfiError::InvalidHandle(handle))?;
    tracing::debug!("Disposed font handle {:#x} ({:?})", handle, font.family_name());
    Ok(())
}

/// Drop every live font, returning how many were released
pub fn clear() -> usize {
    let mut fonts = table();
    let count = fonts.len();
    fonts.clear();
    count
}

/// Number of live fonts
pub fn len() -> usize {
    table().len()
}
