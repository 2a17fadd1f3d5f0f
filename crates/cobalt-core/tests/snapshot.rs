//! Snapshot enumeration and handle lifetime.

mod common;

use std::path::PathBuf;

use cobalt_core::snapshot::{list_heaps, list_modules, list_processes, list_threads, Snapshot, SnapshotKinds};
use cobalt_core::symbols::SymbolProvider;
use cobalt_core::types::{
    Address, BlockKind, HeapBlock, HeapKind, HeapListEntry, ModuleInfo, ProcessId, ProcessInfo, SymbolFormat,
    ThreadId, ThreadInfo,
};
use common::{FakeSnapshots, SnapshotData, TableSymbols, PID};

fn system() -> SnapshotData
{
    let other = ProcessId(999);
    SnapshotData {
        processes: vec![
            ProcessInfo {
                pid: ProcessId(4),
                parent: ProcessId(0),
                thread_count: 120,
                exe: "System".to_string(),
            },
            ProcessInfo {
                pid: PID,
                parent: ProcessId(4),
                thread_count: 2,
                exe: "notepad.exe".to_string(),
            },
        ],
        threads: vec![
            ThreadInfo {
                tid: ThreadId(7),
                owner: PID,
            },
            ThreadInfo {
                tid: ThreadId(8),
                owner: other,
            },
            ThreadInfo {
                tid: ThreadId(9),
                owner: PID,
            },
        ],
        modules: vec![
            ModuleInfo {
                base: Address::from(0x0040_0000),
                size: 0x0003_0000,
                handle: 0x0040_0000,
                name: "notepad.exe".to_string(),
                path: PathBuf::from(r"C:\Windows\notepad.exe"),
                symbol_format: SymbolFormat::None,
            },
            ModuleInfo {
                base: Address::from(0x7700_0000),
                size: 0x0018_0000,
                handle: 0x7700_0000,
                name: "ntdll.dll".to_string(),
                path: PathBuf::from(r"C:\Windows\SysWOW64\ntdll.dll"),
                symbol_format: SymbolFormat::None,
            },
        ],
        heaps: vec![
            (
                HeapListEntry {
                    heap_id: 0x0050_0000,
                    owner: PID,
                    flags: 1,
                },
                vec![
                    HeapBlock {
                        handle: 0x0050_0010,
                        owner: PID,
                        address: Address::from(0x0050_0010),
                        size: 64,
                        flags: 1,
                    },
                    HeapBlock {
                        handle: 0x0050_0060,
                        owner: PID,
                        address: Address::from(0x0050_0060),
                        size: 128,
                        flags: 2,
                    },
                ],
            ),
            (
                HeapListEntry {
                    heap_id: 0x0060_0000,
                    owner: PID,
                    flags: 0,
                },
                Vec::new(),
            ),
        ],
    }
}

fn provider() -> FakeSnapshots
{
    FakeSnapshots {
        data: system(),
        ..FakeSnapshots::default()
    }
}

#[test]
fn test_list_processes_uses_system_snapshot()
{
    let snapshots = provider();
    let processes = list_processes(&snapshots).unwrap();

    assert_eq!(processes.len(), 2);
    assert_eq!(processes[1].exe, "notepad.exe");
    assert_eq!(snapshots.opened.borrow().as_slice(), &[(ProcessId(0), SnapshotKinds::PROCESSES)]);
    assert_eq!(snapshots.closes.get(), 1);
}

#[test]
fn test_list_threads_filters_by_owner()
{
    let snapshots = provider();
    let threads = list_threads(&snapshots, PID).unwrap();

    let ids: Vec<ThreadId> = threads.iter().map(|thread| thread.tid).collect();
    assert_eq!(ids, vec![ThreadId(7), ThreadId(9)]);
    assert_eq!(snapshots.closes.get(), 1);
}

#[test]
fn test_list_modules_fills_symbol_format()
{
    let snapshots = provider();
    let mut symbols = TableSymbols::new();
    symbols.modules.push((0x0040_0000, 0x0003_0000, "notepad.exe".to_string()));

    let modules = list_modules(&snapshots, PID, Some(&symbols as &dyn SymbolProvider)).unwrap();
    assert_eq!(modules[0].symbol_format, SymbolFormat::Pdb);
    assert_eq!(modules[1].symbol_format, SymbolFormat::None);

    let modules = list_modules(&snapshots, PID, None).unwrap();
    assert!(modules.iter().all(|module| module.symbol_format == SymbolFormat::None));
    assert_eq!(snapshots.closes.get(), 2);
}

#[test]
fn test_list_heaps_keeps_empty_heaps()
{
    let snapshots = provider();
    let heaps = list_heaps(&snapshots, PID).unwrap();

    assert_eq!(heaps.len(), 2);
    assert_eq!(heaps[0].kind(), HeapKind::Default);
    assert_eq!(heaps[0].blocks.len(), 2);
    assert_eq!(heaps[0].blocks[1].kind(), BlockKind::Free);
    assert_eq!(heaps[1].kind(), HeapKind::Other);
    assert!(heaps[1].blocks.is_empty());
}

#[test]
fn test_snapshot_closes_once_on_drop()
{
    let snapshots = provider();
    {
        let mut snapshot = Snapshot::open(&snapshots, PID, SnapshotKinds::THREADS | SnapshotKinds::MODULES).unwrap();
        assert_eq!(snapshot.threads().len(), 2);
        assert_eq!(snapshot.modules().len(), 2);
        assert_eq!(snapshots.closes.get(), 0);
    }
    assert_eq!(snapshots.closes.get(), 1);
}

#[test]
fn test_explicit_close_is_not_repeated_by_drop()
{
    let snapshots = provider();
    let snapshot = Snapshot::open(&snapshots, PID, SnapshotKinds::HEAPS).unwrap();
    snapshot.close();
    assert_eq!(snapshots.closes.get(), 1);
}

#[test]
fn test_open_failure_is_reported()
{
    let snapshots = FakeSnapshots {
        refuse: true,
        ..provider()
    };
    assert!(list_processes(&snapshots).is_err());
    assert_eq!(snapshots.closes.get(), 0);
}
