//! Toolhelp snapshots (`CreateToolhelp32Snapshot` and its first/next walkers).

use std::mem;
use std::path::PathBuf;

use tracing::trace;
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Heap32First, Heap32ListFirst, Heap32ListNext, Heap32Next, Module32FirstW,
    Module32NextW, Process32FirstW, Process32NextW, Thread32First, Thread32Next, HEAPENTRY32, HEAPLIST32,
    MODULEENTRY32W, PROCESSENTRY32W, TH32CS_SNAPHEAPLIST, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
    TH32CS_SNAPPROCESS, TH32CS_SNAPTHREAD, THREADENTRY32,
};

use super::handle::{from_wide, OwnedHandle};
use crate::error::{DebuggerError, Result};
use crate::snapshot::{SnapshotKinds, SnapshotProvider, SnapshotSource};
use crate::types::{
    Address, HeapBlock, HeapListEntry, ModuleInfo, ProcessId, ProcessInfo, SymbolFormat, ThreadId, ThreadInfo,
};

/// Opens toolhelp snapshots
#[derive(Debug, Default)]
pub struct ToolhelpProvider;

impl SnapshotProvider for ToolhelpProvider
{
    fn open(&self, pid: ProcessId, kinds: SnapshotKinds) -> Result<Box<dyn SnapshotSource>>
    {
        let mut flags = 0;
        if kinds.contains(SnapshotKinds::HEAPS) {
            flags |= TH32CS_SNAPHEAPLIST;
        }
        if kinds.contains(SnapshotKinds::PROCESSES) {
            flags |= TH32CS_SNAPPROCESS;
        }
        if kinds.contains(SnapshotKinds::THREADS) {
            flags |= TH32CS_SNAPTHREAD;
        }
        if kinds.contains(SnapshotKinds::MODULES) {
            // 32-bit modules of a WOW64 target are only listed with SNAPMODULE32
            flags |= TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32;
        }

        let raw = unsafe { CreateToolhelp32Snapshot(flags, pid.0) };
        let handle = OwnedHandle::new(raw).ok_or_else(|| DebuggerError::last_os_error("CreateToolhelp32Snapshot"))?;
        Ok(Box::new(ToolhelpSnapshot {
            handle: Some(handle),
            block: None,
        }))
    }
}

/// One open toolhelp snapshot
pub struct ToolhelpSnapshot
{
    handle: Option<OwnedHandle>,
    /// Cursor of the heap whose blocks are being walked
    block: Option<HEAPENTRY32>,
}

impl ToolhelpSnapshot
{
    fn raw(&self) -> Option<HANDLE>
    {
        self.handle.as_ref().map(OwnedHandle::raw)
    }

    fn process(&mut self, first: bool) -> Option<ProcessInfo>
    {
        let handle = self.raw()?;
        let mut entry: PROCESSENTRY32W = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;
        let ok = unsafe {
            if first {
                Process32FirstW(handle, &mut entry)
            } else {
                Process32NextW(handle, &mut entry)
            }
        };
        (ok != 0).then(|| ProcessInfo {
            pid: ProcessId(entry.th32ProcessID),
            parent: ProcessId(entry.th32ParentProcessID),
            thread_count: entry.cntThreads,
            exe: from_wide(&entry.szExeFile),
        })
    }

    fn thread(&mut self, first: bool) -> Option<ThreadInfo>
    {
        let handle = self.raw()?;
        let mut entry: THREADENTRY32 = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<THREADENTRY32>() as u32;
        let ok = unsafe {
            if first {
                Thread32First(handle, &mut entry)
            } else {
                Thread32Next(handle, &mut entry)
            }
        };
        (ok != 0).then(|| ThreadInfo {
            tid: ThreadId(entry.th32ThreadID),
            owner: ProcessId(entry.th32OwnerProcessID),
        })
    }

    fn module(&mut self, first: bool) -> Option<ModuleInfo>
    {
        let handle = self.raw()?;
        let mut entry: MODULEENTRY32W = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<MODULEENTRY32W>() as u32;
        let ok = unsafe {
            if first {
                Module32FirstW(handle, &mut entry)
            } else {
                Module32NextW(handle, &mut entry)
            }
        };
        (ok != 0).then(|| ModuleInfo {
            base: Address::from(entry.modBaseAddr as u64),
            size: entry.modBaseSize,
            handle: entry.hModule as u64,
            name: from_wide(&entry.szModule),
            path: PathBuf::from(from_wide(&entry.szExePath)),
            symbol_format: SymbolFormat::None,
        })
    }

    fn heap(&mut self, first: bool) -> Option<HeapListEntry>
    {
        let handle = self.raw()?;
        let mut entry: HEAPLIST32 = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<HEAPLIST32>();
        let ok = unsafe {
            if first {
                Heap32ListFirst(handle, &mut entry)
            } else {
                Heap32ListNext(handle, &mut entry)
            }
        };
        (ok != 0).then(|| HeapListEntry {
            heap_id: entry.th32HeapID as u64,
            owner: ProcessId(entry.th32ProcessID),
            flags: entry.dwFlags,
        })
    }
}

fn block_info(entry: &HEAPENTRY32) -> HeapBlock
{
    HeapBlock {
        handle: entry.hHandle as u64,
        owner: ProcessId(entry.th32ProcessID),
        address: Address::from(entry.dwAddress as u64),
        size: entry.dwBlockSize as u64,
        flags: entry.dwFlags,
    }
}

impl SnapshotSource for ToolhelpSnapshot
{
    fn first_process(&mut self) -> Option<ProcessInfo>
    {
        self.process(true)
    }

    fn next_process(&mut self) -> Option<ProcessInfo>
    {
        self.process(false)
    }

    fn first_thread(&mut self) -> Option<ThreadInfo>
    {
        self.thread(true)
    }

    fn next_thread(&mut self) -> Option<ThreadInfo>
    {
        self.thread(false)
    }

    fn first_module(&mut self) -> Option<ModuleInfo>
    {
        self.module(true)
    }

    fn next_module(&mut self) -> Option<ModuleInfo>
    {
        self.module(false)
    }

    fn first_heap(&mut self) -> Option<HeapListEntry>
    {
        self.heap(true)
    }

    fn next_heap(&mut self) -> Option<HeapListEntry>
    {
        self.heap(false)
    }

    fn first_block(&mut self, heap: &HeapListEntry) -> Option<HeapBlock>
    {
        let mut entry: HEAPENTRY32 = unsafe { mem::zeroed() };
        entry.dwSize = mem::size_of::<HEAPENTRY32>();
        if unsafe { Heap32First(&mut entry, heap.owner.0, heap.heap_id as usize) } == 0 {
            trace!(heap = heap.heap_id, "heap has no readable blocks");
            self.block = None;
            return None;
        }
        let block = block_info(&entry);
        self.block = Some(entry);
        Some(block)
    }

    fn next_block(&mut self) -> Option<HeapBlock>
    {
        let entry = self.block.as_mut()?;
        if unsafe { Heap32Next(entry) } == 0 {
            self.block = None;
            return None;
        }
        Some(block_info(entry))
    }

    fn close(&mut self)
    {
        self.block = None;
        self.handle = None;
    }
}
