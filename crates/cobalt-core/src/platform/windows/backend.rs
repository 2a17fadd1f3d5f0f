//! # Win32 Debug Backend
//!
//! [`DebugBackend`] on top of the Win32 debugging API.
//!
//! ## Event handles
//!
//! - `CREATE_PROCESS_DEBUG_EVENT`: `hProcess` and `hThread` belong to the
//!   OS and are never closed here; `hFile` is ours and is closed after its
//!   path has been resolved.
//! - `LOAD_DLL_DEBUG_EVENT`: `hFile` is ours, same as above.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use tracing::{debug, info, trace, warn};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, DBG_CONTINUE, DBG_EXCEPTION_NOT_HANDLED, ERROR_INVALID_PARAMETER, HANDLE,
};
use windows_sys::Win32::System::Diagnostics::Debug::{
    ContinueDebugEvent, DebugActiveProcess, DebugActiveProcessStop, ReadProcessMemory, WaitForDebugEvent,
    CREATE_PROCESS_DEBUG_EVENT, CREATE_THREAD_DEBUG_EVENT, DEBUG_EVENT, EXCEPTION_DEBUG_EVENT,
    EXIT_PROCESS_DEBUG_EVENT, EXIT_THREAD_DEBUG_EVENT, LOAD_DLL_DEBUG_EVENT, OUTPUT_DEBUG_STRING_EVENT,
    RIP_EVENT, UNLOAD_DLL_DEBUG_EVENT,
};
use windows_sys::Win32::System::Threading::{
    CreateProcessW, IsWow64Process, OpenProcess, OpenThread, TerminateProcess, CREATE_NEW_CONSOLE,
    DEBUG_ONLY_THIS_PROCESS, INFINITE, PROCESS_ALL_ACCESS, PROCESS_INFORMATION, STARTUPINFOW, THREAD_GET_CONTEXT,
    THREAD_QUERY_INFORMATION,
};

use super::constants;
use super::context::NativeContext;
use super::handle::{null_wide, take_image_path, wide, OwnedHandle};
use crate::backend::{DebugBackend, MemoryAccess};
use crate::error::{DebuggerError, Result};
use crate::events::{DebugEvent, DebugEventKind, Disposition, ExceptionRecord};
use crate::types::{Address, ContextParts, ProcessId, ThreadContext, ThreadId, WordSize};

const HOST_WORD: WordSize = if cfg!(target_pointer_width = "64") {
    WordSize::Bits64
} else {
    WordSize::Bits32
};

/// Win32 debugger for one target at a time
#[derive(Debug, Default)]
pub struct WindowsBackend
{
    process: Option<OwnedHandle>,
    pid: Option<ProcessId>,
    wow64: bool,
    /// Set once the target reported its exit; cleared on the next continue
    exited: bool,
}

impl WindowsBackend
{
    pub fn new() -> Self
    {
        Self::default()
    }

    fn require_process(&self) -> Result<HANDLE>
    {
        self.process.as_ref().map(OwnedHandle::raw).ok_or(DebuggerError::NotAttached)
    }

    fn begin(&mut self, pid: ProcessId, process: OwnedHandle)
    {
        let mut wow64 = 0;
        let ok = unsafe { IsWow64Process(process.raw(), &mut wow64) };
        self.wow64 = cfg!(target_arch = "x86_64") && ok != 0 && wow64 != 0;
        self.process = Some(process);
        self.pid = Some(pid);
        self.exited = false;
        debug!(pid = %pid, wow64 = self.wow64, "target acquired");
    }

    fn forget(&mut self)
    {
        self.process = None;
        self.pid = None;
        self.wow64 = false;
        self.exited = false;
    }

    fn continue_raw(pid: u32, tid: u32, disposition: Disposition) -> Result<()>
    {
        let status = match disposition {
            Disposition::Handled => DBG_CONTINUE,
            Disposition::Unhandled => DBG_EXCEPTION_NOT_HANDLED,
        };
        if unsafe { ContinueDebugEvent(pid, tid, status) } == 0 {
            return Err(DebuggerError::last_os_error("ContinueDebugEvent"));
        }
        Ok(())
    }
}

impl MemoryAccess for WindowsBackend
{
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        let process = self.require_process()?;
        let mut buffer = vec![0u8; len];
        let mut read = 0usize;
        let ok = unsafe {
            ReadProcessMemory(
                process,
                address.value() as usize as *const c_void,
                buffer.as_mut_ptr().cast(),
                len,
                &mut read,
            )
        };
        if ok == 0 || read != len {
            return Err(DebuggerError::MemoryRead {
                address: address.value(),
                len,
            });
        }
        Ok(buffer)
    }
}

impl DebugBackend for WindowsBackend
{
    fn launch(&mut self, program: &str, args: &str) -> Result<ProcessId>
    {
        let command = if args.is_empty() {
            format!("\"{program}\"")
        } else {
            format!("\"{program}\" {args}")
        };
        // CreateProcessW may write into the command line buffer
        let mut command = wide(command);

        let mut startup: STARTUPINFOW = unsafe { mem::zeroed() };
        startup.cb = mem::size_of::<STARTUPINFOW>() as u32;
        let mut created: PROCESS_INFORMATION = unsafe { mem::zeroed() };

        let ok = unsafe {
            CreateProcessW(
                null_wide(),
                command.as_mut_ptr(),
                ptr::null(),
                ptr::null(),
                0,
                DEBUG_ONLY_THIS_PROCESS | CREATE_NEW_CONSOLE,
                ptr::null(),
                null_wide(),
                &startup,
                &mut created,
            )
        };
        if ok == 0 {
            return Err(DebuggerError::last_os_error("CreateProcessW"));
        }

        drop(OwnedHandle::new(created.hThread));
        let pid = ProcessId(created.dwProcessId);
        let process = OwnedHandle::new(created.hProcess).ok_or(DebuggerError::ProcessNotFound(pid))?;
        self.begin(pid, process);
        info!(pid = %pid, program, "process created under the debugger");
        Ok(pid)
    }

    fn attach(&mut self, pid: ProcessId) -> Result<()>
    {
        if unsafe { DebugActiveProcess(pid.0) } == 0 {
            if unsafe { GetLastError() } == ERROR_INVALID_PARAMETER {
                return Err(DebuggerError::ProcessNotFound(pid));
            }
            return Err(DebuggerError::last_os_error("DebugActiveProcess"));
        }

        let raw = unsafe { OpenProcess(PROCESS_ALL_ACCESS, 0, pid.0) };
        let Some(process) = OwnedHandle::new(raw) else {
            let err = DebuggerError::last_os_error("OpenProcess");
            unsafe {
                DebugActiveProcessStop(pid.0);
            }
            return Err(err);
        };
        self.begin(pid, process);
        info!(pid = %pid, "attached");
        Ok(())
    }

    fn detach(&mut self, pending: Option<&DebugEvent>) -> Result<()>
    {
        let pid = self.pid.ok_or(DebuggerError::NotAttached)?;
        if let Some(event) = pending {
            Self::continue_raw(event.process.0, event.thread.0, Disposition::Handled)?;
        }
        if unsafe { DebugActiveProcessStop(pid.0) } == 0 {
            return Err(DebuggerError::last_os_error("DebugActiveProcessStop"));
        }
        info!(pid = %pid, "detached");
        self.forget();
        Ok(())
    }

    fn kill(&mut self, pending: Option<&DebugEvent>) -> Result<()>
    {
        let process = self.require_process()?;
        if unsafe { TerminateProcess(process, constants::KILL_EXIT_CODE) } == 0 {
            return Err(DebuggerError::last_os_error("TerminateProcess"));
        }
        if let Some(event) = pending {
            Self::continue_raw(event.process.0, event.thread.0, Disposition::Handled)?;
        }

        // Consume what the dying target still reports, up to its exit
        loop {
            let mut raw: DEBUG_EVENT = unsafe { mem::zeroed() };
            if unsafe { WaitForDebugEvent(&mut raw, constants::DRAIN_TIMEOUT_MS) } == 0 {
                warn!("target did not report its exit after termination");
                break;
            }
            trace!(code = raw.dwDebugEventCode, "draining event");
            close_event_file(&raw);
            let exited = raw.dwDebugEventCode == EXIT_PROCESS_DEBUG_EVENT;
            Self::continue_raw(raw.dwProcessId, raw.dwThreadId, Disposition::Handled)?;
            if exited {
                break;
            }
        }
        info!(pid = ?self.pid, "target terminated");
        self.forget();
        Ok(())
    }

    fn wait_for_event(&mut self) -> Result<DebugEvent>
    {
        let mut raw: DEBUG_EVENT = unsafe { mem::zeroed() };
        if unsafe { WaitForDebugEvent(&mut raw, INFINITE) } == 0 {
            return Err(DebuggerError::WaitFailed(Box::new(DebuggerError::last_os_error(
                "WaitForDebugEvent",
            ))));
        }
        let event = translate(&raw);
        if matches!(event.kind, DebugEventKind::ExitProcess { .. }) {
            self.exited = true;
        }
        Ok(event)
    }

    fn continue_event(&mut self, pid: ProcessId, tid: ThreadId, disposition: Disposition) -> Result<()>
    {
        Self::continue_raw(pid.0, tid.0, disposition)?;
        if self.exited {
            self.forget();
        }
        Ok(())
    }

    fn thread_context(&self, tid: ThreadId, parts: ContextParts) -> Result<ThreadContext>
    {
        self.require_process()?;
        let raw = unsafe { OpenThread(THREAD_GET_CONTEXT | THREAD_QUERY_INFORMATION, 0, tid.0) };
        let thread = OwnedHandle::new(raw).ok_or_else(|| DebuggerError::last_os_error("OpenThread"))?;
        let native = NativeContext::capture(thread.raw(), self.wow64, parts)?;
        Ok(native.to_thread_context(parts))
    }

    fn word_size(&self) -> WordSize
    {
        if self.wow64 {
            WordSize::Bits32
        } else {
            HOST_WORD
        }
    }
}

fn pointer(value: *mut c_void) -> Address
{
    Address::from(value as usize as u64)
}

fn close_event_file(raw: &DEBUG_EVENT)
{
    let file = match raw.dwDebugEventCode {
        CREATE_PROCESS_DEBUG_EVENT => unsafe { raw.u.CreateProcessInfo.hFile },
        LOAD_DLL_DEBUG_EVENT => unsafe { raw.u.LoadDll.hFile },
        _ => return,
    };
    if !file.is_null() {
        unsafe {
            CloseHandle(file);
        }
    }
}

/// Convert a raw `DEBUG_EVENT`, taking ownership of any file handle in it.
fn translate(raw: &DEBUG_EVENT) -> DebugEvent
{
    let kind = unsafe {
        match raw.dwDebugEventCode {
            EXCEPTION_DEBUG_EVENT => {
                let info = &raw.u.Exception;
                let record = &info.ExceptionRecord;
                let count = (record.NumberParameters as usize).min(record.ExceptionInformation.len());
                DebugEventKind::Exception(ExceptionRecord {
                    code: record.ExceptionCode as u32,
                    address: pointer(record.ExceptionAddress),
                    first_chance: info.dwFirstChance != 0,
                    parameters: record.ExceptionInformation[..count].iter().map(|&p| p as u64).collect(),
                })
            }
            CREATE_THREAD_DEBUG_EVENT => {
                let info = &raw.u.CreateThread;
                DebugEventKind::CreateThread {
                    handle: info.hThread as u64,
                    local_base: pointer(info.lpThreadLocalBase),
                    start: Address::from(info.lpStartAddress.map_or(0, |start| start as usize as u64)),
                }
            }
            CREATE_PROCESS_DEBUG_EVENT => {
                let info = &raw.u.CreateProcessInfo;
                DebugEventKind::CreateProcess {
                    image: take_image_path(info.hFile),
                    base: pointer(info.lpBaseOfImage),
                    process_handle: info.hProcess as u64,
                    thread_handle: info.hThread as u64,
                    start: Address::from(info.lpStartAddress.map_or(0, |start| start as usize as u64)),
                }
            }
            EXIT_THREAD_DEBUG_EVENT => DebugEventKind::ExitThread {
                exit_code: raw.u.ExitThread.dwExitCode,
            },
            EXIT_PROCESS_DEBUG_EVENT => DebugEventKind::ExitProcess {
                exit_code: raw.u.ExitProcess.dwExitCode,
            },
            LOAD_DLL_DEBUG_EVENT => {
                let info = &raw.u.LoadDll;
                DebugEventKind::LoadModule {
                    image: take_image_path(info.hFile),
                    base: pointer(info.lpBaseOfDll),
                }
            }
            UNLOAD_DLL_DEBUG_EVENT => DebugEventKind::UnloadModule {
                base: pointer(raw.u.UnloadDll.lpBaseOfDll),
            },
            OUTPUT_DEBUG_STRING_EVENT => {
                let info = &raw.u.DebugString;
                DebugEventKind::DebugString {
                    address: Address::from(info.lpDebugStringData as usize as u64),
                    length: info.nDebugStringLength,
                    unicode: info.fUnicode != 0,
                }
            }
            RIP_EVENT => DebugEventKind::Rip {
                error: raw.u.RipInfo.dwError,
                kind: raw.u.RipInfo.dwType,
            },
            other => DebugEventKind::Rip { error: other, kind: 0 },
        }
    };

    DebugEvent {
        process: ProcessId(raw.dwProcessId),
        thread: ThreadId(raw.dwThreadId),
        kind,
    }
}
