//! # Handles and Wide Strings
//!
//! RAII ownership for kernel handles and UTF-16 conversions for the `*W`
//! APIs.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::PathBuf;
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::GetFinalPathNameByHandleW;

/// Kernel handle closed exactly once, on drop
///
/// Handles the OS owns (the process and thread handles inside a
/// `CREATE_PROCESS_DEBUG_EVENT`) must never be wrapped in this.
#[derive(Debug)]
pub struct OwnedHandle
{
    raw: HANDLE,
}

impl OwnedHandle
{
    /// Take ownership of `raw`; `None` for null and `INVALID_HANDLE_VALUE`.
    pub fn new(raw: HANDLE) -> Option<Self>
    {
        if raw.is_null() || raw == INVALID_HANDLE_VALUE {
            None
        } else {
            Some(Self { raw })
        }
    }

    pub fn raw(&self) -> HANDLE
    {
        self.raw
    }
}

impl Drop for OwnedHandle
{
    fn drop(&mut self)
    {
        unsafe {
            CloseHandle(self.raw);
        }
    }
}

/// NUL-terminated UTF-16 copy of `text`.
pub fn wide(text: impl AsRef<OsStr>) -> Vec<u16>
{
    text.as_ref().encode_wide().chain(std::iter::once(0)).collect()
}

/// Decode a UTF-16 buffer up to its first NUL.
pub fn from_wide(buffer: &[u16]) -> String
{
    let len = buffer.iter().position(|&unit| unit == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Decode a NUL-terminated UTF-16 string owned by the OS.
///
/// ## Safety
///
/// `text` must be null or point to a readable NUL-terminated UTF-16 string.
pub unsafe fn from_wide_ptr(text: *const u16) -> Option<String>
{
    if text.is_null() {
        return None;
    }
    let mut len = 0;
    while *text.add(len) != 0 {
        len += 1;
    }
    Some(String::from_utf16_lossy(std::slice::from_raw_parts(text, len)))
}

/// Resolve the path of an open file, then close the file handle.
///
/// Used for the image handles carried by process-created and module-loaded
/// events, which the debugger is responsible for closing.
pub fn take_image_path(file: HANDLE) -> Option<PathBuf>
{
    let file = OwnedHandle::new(file)?;
    let mut buffer = vec![0u16; 1024];
    let len = unsafe { GetFinalPathNameByHandleW(file.raw(), buffer.as_mut_ptr(), buffer.len() as u32, 0) };
    if len == 0 || len as usize >= buffer.len() {
        return None;
    }
    let path = from_wide(&buffer[..len as usize]);
    // GetFinalPathNameByHandleW reports \\?\ prefixed paths
    Some(PathBuf::from(path.strip_prefix(r"\\?\").map_or(path.clone(), str::to_string)))
}

/// Null wide-string pointer for optional `PCWSTR` arguments.
pub fn null_wide() -> *const u16
{
    ptr::null()
}
