//! # Snapshot Introspection
//!
//! Point-in-time listings of processes, threads, modules and heaps.
//!
//! The OS exposes these through a snapshot handle scoped to the requested
//! kinds and a first/next iteration protocol per kind. [`SnapshotSource`]
//! mirrors that protocol; [`Snapshot`] owns a source, drives the iteration
//! and releases the handle exactly once, when enumeration is done or when it
//! is dropped on an early return.
//!
//! Every listing is rebuilt from a fresh snapshot; nothing is cached.

use std::fmt;
use std::ops::BitOr;

use tracing::debug;

use crate::error::Result;
use crate::symbols::SymbolProvider;
use crate::types::{HeapBlock, HeapInfo, HeapListEntry, ModuleInfo, ProcessId, ProcessInfo, ThreadInfo};

/// Entity kinds a snapshot is opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnapshotKinds(u8);

impl SnapshotKinds
{
    pub const HEAPS: Self = SnapshotKinds(0x01);
    pub const PROCESSES: Self = SnapshotKinds(0x02);
    pub const THREADS: Self = SnapshotKinds(0x04);
    pub const MODULES: Self = SnapshotKinds(0x08);

    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8
    {
        self.0
    }
}

impl BitOr for SnapshotKinds
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        SnapshotKinds(self.0 | rhs.0)
    }
}

/// Factory for OS snapshot handles
pub trait SnapshotProvider
{
    /// Open a snapshot of `kinds` for process `pid` (0 for system-wide kinds).
    ///
    /// ## Errors
    ///
    /// - `Os`: the snapshot could not be created
    fn open(&self, pid: ProcessId, kinds: SnapshotKinds) -> Result<Box<dyn SnapshotSource>>;
}

/// First/next enumeration over one open snapshot handle
///
/// Each `first_*` restarts its kind; `next_*` returns `None` when exhausted.
pub trait SnapshotSource
{
    fn first_process(&mut self) -> Option<ProcessInfo>;
    fn next_process(&mut self) -> Option<ProcessInfo>;

    fn first_thread(&mut self) -> Option<ThreadInfo>;
    fn next_thread(&mut self) -> Option<ThreadInfo>;

    fn first_module(&mut self) -> Option<ModuleInfo>;
    fn next_module(&mut self) -> Option<ModuleInfo>;

    fn first_heap(&mut self) -> Option<HeapListEntry>;
    fn next_heap(&mut self) -> Option<HeapListEntry>;

    /// Start enumerating the blocks of one heap.
    fn first_block(&mut self, heap: &HeapListEntry) -> Option<HeapBlock>;
    fn next_block(&mut self) -> Option<HeapBlock>;

    /// Release the snapshot handle.
    fn close(&mut self);
}

/// Open snapshot that closes its handle exactly once
pub struct Snapshot
{
    source: Box<dyn SnapshotSource>,
    pid: ProcessId,
    active: bool,
}

impl Snapshot
{
    /// Open a snapshot through `provider`.
    pub fn open(provider: &dyn SnapshotProvider, pid: ProcessId, kinds: SnapshotKinds) -> Result<Self>
    {
        let source = provider.open(pid, kinds)?;
        debug!(pid = %pid, kinds = kinds.bits(), "snapshot opened");
        Ok(Self {
            source,
            pid,
            active: true,
        })
    }

    /// All processes in the system.
    pub fn processes(&mut self) -> Vec<ProcessInfo>
    {
        let source = &mut self.source;
        collect(source.first_process(), || source.next_process())
    }

    /// Threads owned by the snapshot's process (all threads for pid 0).
    pub fn threads(&mut self) -> Vec<ThreadInfo>
    {
        let pid = self.pid;
        let source = &mut self.source;
        let mut threads = collect(source.first_thread(), || source.next_thread());
        threads.retain(|thread| pid.0 == 0 || thread.owner == pid);
        threads
    }

    /// Modules loaded in the snapshot's process.
    pub fn modules(&mut self) -> Vec<ModuleInfo>
    {
        let source = &mut self.source;
        collect(source.first_module(), || source.next_module())
    }

    /// Heaps of the snapshot's process with their blocks.
    ///
    /// A listed heap is kept even when none of its blocks can be enumerated.
    pub fn heaps(&mut self) -> Vec<HeapInfo>
    {
        let pid = self.pid;
        let source = &mut self.source;
        let entries = collect(source.first_heap(), || source.next_heap());

        entries
            .into_iter()
            .filter(|entry| pid.0 == 0 || entry.owner == pid)
            .map(|entry| {
                let mut blocks = collect(source.first_block(&entry), || source.next_block());
                blocks.retain(|block| pid.0 == 0 || block.owner == pid);
                HeapInfo {
                    owner: entry.owner,
                    flags: entry.flags,
                    blocks,
                }
            })
            .collect()
    }

    /// Release the handle now instead of on drop.
    pub fn close(mut self)
    {
        self.release();
    }

    fn release(&mut self)
    {
        if self.active {
            self.source.close();
            self.active = false;
        }
    }
}

impl Drop for Snapshot
{
    fn drop(&mut self)
    {
        self.release();
    }
}

impl fmt::Debug for Snapshot
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Snapshot")
            .field("pid", &self.pid)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

fn collect<T>(first: Option<T>, mut next: impl FnMut() -> Option<T>) -> Vec<T>
{
    let mut items = Vec::new();
    let mut current = first;
    while let Some(item) = current {
        items.push(item);
        current = next();
    }
    items
}

/// List every process in the system.
pub fn list_processes(provider: &dyn SnapshotProvider) -> Result<Vec<ProcessInfo>>
{
    let mut snapshot = Snapshot::open(provider, ProcessId(0), SnapshotKinds::PROCESSES)?;
    let processes = snapshot.processes();
    snapshot.close();
    Ok(processes)
}

/// List the threads of `pid`.
pub fn list_threads(provider: &dyn SnapshotProvider, pid: ProcessId) -> Result<Vec<ThreadInfo>>
{
    let mut snapshot = Snapshot::open(provider, pid, SnapshotKinds::THREADS)?;
    let threads = snapshot.threads();
    snapshot.close();
    Ok(threads)
}

/// List the modules of `pid`, with the symbol format the provider loaded
/// for each when one is available.
pub fn list_modules(
    provider: &dyn SnapshotProvider,
    pid: ProcessId,
    symbols: Option<&dyn SymbolProvider>,
) -> Result<Vec<ModuleInfo>>
{
    let mut snapshot = Snapshot::open(provider, pid, SnapshotKinds::MODULES)?;
    let mut modules = snapshot.modules();
    snapshot.close();
    if let Some(symbols) = symbols {
        for module in &mut modules {
            module.symbol_format = symbols.symbol_format(module.base);
        }
    }
    Ok(modules)
}

/// List the heaps of `pid` and their blocks.
pub fn list_heaps(provider: &dyn SnapshotProvider, pid: ProcessId) -> Result<Vec<HeapInfo>>
{
    let mut snapshot = Snapshot::open(provider, pid, SnapshotKinds::HEAPS)?;
    let heaps = snapshot.heaps();
    snapshot.close();
    Ok(heaps)
}
