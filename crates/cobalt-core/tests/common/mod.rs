//! Scripted doubles for the OS collaborators.
//!
//! Each double keeps its observable effects in an `Rc<RefCell<..>>` log so a
//! test can hand the double to a `DebugSession` and still inspect it later.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;

use cobalt_core::backend::{DebugBackend, MemoryAccess, Platform};
use cobalt_core::console::{Console, ConsoleColor};
use cobalt_core::error::{DebuggerError, Result};
use cobalt_core::events::{DebugEvent, DebugEventKind, Disposition, ExceptionRecord};
use cobalt_core::snapshot::{SnapshotKinds, SnapshotProvider, SnapshotSource};
use cobalt_core::symbols::{BaseKind, SymTag, SymbolProvider, TypeInfoSource};
use cobalt_core::types::{
    Address, ContextParts, HeapBlock, HeapListEntry, ModuleInfo, ModuleLoad, ProcessId, ProcessInfo, SourceLine,
    SymbolFlags, SymbolFormat, SymbolHit, SymbolScope, ThreadContext, ThreadId, ThreadInfo, VariableSymbol, WordSize,
};
use cobalt_core::unwind::{StackWalker, WalkFrame};

pub const PID: ProcessId = ProcessId(4242);
pub const TID: ThreadId = ThreadId(7);
pub const IMAGE_BASE: u64 = 0x0040_0000;

// ============================================================================
// Events
// ============================================================================

pub fn event(kind: DebugEventKind) -> DebugEvent
{
    DebugEvent {
        process: PID,
        thread: TID,
        kind,
    }
}

pub fn exception(code: u32, first_chance: bool) -> DebugEvent
{
    event(DebugEventKind::Exception(ExceptionRecord {
        code,
        address: Address::from(0x0040_1010),
        first_chance,
        parameters: Vec::new(),
    }))
}

pub fn create_process() -> DebugEvent
{
    event(DebugEventKind::CreateProcess {
        image: Some(PathBuf::from(r"C:\Windows\notepad.exe")),
        base: Address::from(IMAGE_BASE),
        process_handle: 0x44,
        thread_handle: 0x48,
        start: Address::from(0x0040_1000),
    })
}

pub fn exit_process(exit_code: u32) -> DebugEvent
{
    event(DebugEventKind::ExitProcess { exit_code })
}

pub fn context32(pc: u64, sp: u64, fp: u64) -> ThreadContext
{
    ThreadContext::control(WordSize::Bits32, Address::from(pc), Address::from(sp), Address::from(fp))
}

// ============================================================================
// Memory
// ============================================================================

/// Sparse target memory; a read fails if any byte of the range is unmapped
#[derive(Debug, Clone, Default)]
pub struct MemoryMap
{
    bytes: BTreeMap<u64, u8>,
}

impl MemoryMap
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn write(&mut self, address: u64, data: &[u8])
    {
        for (offset, byte) in data.iter().enumerate() {
            self.bytes.insert(address + offset as u64, *byte);
        }
    }

    pub fn with(mut self, address: u64, data: &[u8]) -> Self
    {
        self.write(address, data);
        self
    }
}

impl MemoryAccess for MemoryMap
{
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        (0..len as u64)
            .map(|offset| self.bytes.get(&(address.value() + offset)).copied())
            .collect::<Option<Vec<u8>>>()
            .ok_or(DebuggerError::MemoryRead {
                address: address.value(),
                len,
            })
    }
}

// ============================================================================
// Backend
// ============================================================================

/// What the session asked the backend to do
#[derive(Debug, Default)]
pub struct BackendLog
{
    pub launched: Vec<(String, String)>,
    pub attached: Vec<ProcessId>,
    pub continuations: Vec<Disposition>,
    pub detaches: usize,
    pub kills: usize,
}

/// Backend replaying a fixed event script
pub struct ScriptedBackend
{
    pub events: VecDeque<DebugEvent>,
    pub memory: MemoryMap,
    pub context: ThreadContext,
    pub word: WordSize,
    pub refuse_launch: bool,
    pub log: Rc<RefCell<BackendLog>>,
}

impl ScriptedBackend
{
    pub fn new(events: impl IntoIterator<Item = DebugEvent>) -> Self
    {
        Self {
            events: events.into_iter().collect(),
            memory: MemoryMap::new(),
            context: context32(0x0040_1010, 0x0012_FF00, 0x0012_FF40),
            word: WordSize::Bits32,
            refuse_launch: false,
            log: Rc::new(RefCell::new(BackendLog::default())),
        }
    }
}

impl MemoryAccess for ScriptedBackend
{
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        self.memory.read_memory(address, len)
    }
}

impl DebugBackend for ScriptedBackend
{
    fn launch(&mut self, program: &str, args: &str) -> Result<ProcessId>
    {
        if self.refuse_launch {
            return Err(DebuggerError::os(
                "CreateProcessW",
                std::io::Error::new(std::io::ErrorKind::NotFound, "The system cannot find the file specified."),
            ));
        }
        self.log.borrow_mut().launched.push((program.to_string(), args.to_string()));
        Ok(PID)
    }

    fn attach(&mut self, pid: ProcessId) -> Result<()>
    {
        self.log.borrow_mut().attached.push(pid);
        Ok(())
    }

    fn detach(&mut self, pending: Option<&DebugEvent>) -> Result<()>
    {
        let mut log = self.log.borrow_mut();
        if pending.is_some() {
            log.continuations.push(Disposition::Handled);
        }
        log.detaches += 1;
        Ok(())
    }

    fn kill(&mut self, pending: Option<&DebugEvent>) -> Result<()>
    {
        let mut log = self.log.borrow_mut();
        if pending.is_some() {
            log.continuations.push(Disposition::Handled);
        }
        log.kills += 1;
        self.events.clear();
        Ok(())
    }

    fn wait_for_event(&mut self) -> Result<DebugEvent>
    {
        self.events.pop_front().ok_or_else(|| {
            DebuggerError::WaitFailed(Box::new(DebuggerError::os(
                "WaitForDebugEvent",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "script exhausted"),
            )))
        })
    }

    fn continue_event(&mut self, _pid: ProcessId, _tid: ThreadId, disposition: Disposition) -> Result<()>
    {
        self.log.borrow_mut().continuations.push(disposition);
        Ok(())
    }

    fn thread_context(&self, _tid: ThreadId, _parts: ContextParts) -> Result<ThreadContext>
    {
        Ok(self.context.clone())
    }

    fn word_size(&self) -> WordSize
    {
        self.word
    }
}

// ============================================================================
// Symbols
// ============================================================================

/// One debug-info record of the table
#[derive(Debug, Clone, Default)]
pub struct TypeRecord
{
    pub tag: Option<u32>,
    pub base: Option<BaseKind>,
    pub length: Option<u64>,
    pub inner: Option<u32>,
    pub reference: bool,
    pub count: Option<u32>,
    pub children: Vec<u32>,
    pub name: Option<String>,
    pub offset: Option<u32>,
    pub value: Option<i128>,
}

impl TypeRecord
{
    pub fn base(kind: BaseKind, length: u64) -> Self
    {
        Self {
            tag: Some(SymTag::BaseType.raw()),
            base: Some(kind),
            length: Some(length),
            ..Self::default()
        }
    }

    pub fn tagged(tag: SymTag) -> Self
    {
        Self {
            tag: Some(tag.raw()),
            ..Self::default()
        }
    }

    pub fn inner(mut self, inner: u32) -> Self
    {
        self.inner = Some(inner);
        self
    }

    pub fn named(mut self, name: &str) -> Self
    {
        self.name = Some(name.to_string());
        self
    }

    pub fn children(mut self, children: &[u32]) -> Self
    {
        self.children = children.to_vec();
        self
    }

    pub fn length(mut self, length: u64) -> Self
    {
        self.length = Some(length);
        self
    }
}

/// What the session asked the symbol provider to do
#[derive(Debug, Default)]
pub struct SymbolLog
{
    pub initialized: Vec<ProcessId>,
    pub loaded: Vec<ModuleLoad>,
    pub unloaded: Vec<Address>,
    pub cleanups: usize,
    pub scopes: Vec<SymbolScope>,
}

/// Table-driven symbol provider
#[derive(Default)]
pub struct TableSymbols
{
    pub types: HashMap<u32, TypeRecord>,
    /// (start, length, name)
    pub functions: Vec<(u64, u64, String)>,
    /// (start, length, file, line)
    pub lines: Vec<(u64, u64, String, u32)>,
    /// (base, size, name)
    pub modules: Vec<(u64, u64, String)>,
    pub variables: Vec<VariableSymbol>,
    /// Frames handed out by the stack walker, innermost first
    pub frames: Vec<WalkFrame>,
    /// Walker step at which the walk faults
    pub fault_at: Option<usize>,
    pub tag_queries: Cell<usize>,
    pub log: Rc<RefCell<SymbolLog>>,
}

impl TableSymbols
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_type(mut self, id: u32, record: TypeRecord) -> Self
    {
        self.types.insert(id, record);
        self
    }

    fn record(&self, id: u32) -> Option<&TypeRecord>
    {
        self.types.get(&id)
    }
}

impl TypeInfoSource for TableSymbols
{
    fn tag(&self, _module: Address, type_id: u32) -> Option<SymTag>
    {
        self.tag_queries.set(self.tag_queries.get() + 1);
        self.record(type_id)?.tag.map(SymTag::from_raw)
    }

    fn base_kind(&self, _module: Address, type_id: u32) -> Option<BaseKind>
    {
        self.record(type_id)?.base
    }

    fn length(&self, _module: Address, type_id: u32) -> Option<u64>
    {
        self.record(type_id)?.length
    }

    fn inner_type(&self, _module: Address, type_id: u32) -> Option<u32>
    {
        self.record(type_id)?.inner
    }

    fn is_reference(&self, _module: Address, type_id: u32) -> bool
    {
        self.record(type_id).is_some_and(|record| record.reference)
    }

    fn count(&self, _module: Address, type_id: u32) -> Option<u32>
    {
        self.record(type_id)?.count
    }

    fn children(&self, _module: Address, type_id: u32) -> Vec<u32>
    {
        self.record(type_id).map(|record| record.children.clone()).unwrap_or_default()
    }

    fn name(&self, _module: Address, type_id: u32) -> Option<String>
    {
        self.record(type_id)?.name.clone()
    }

    fn offset(&self, _module: Address, type_id: u32) -> Option<u32>
    {
        self.record(type_id)?.offset
    }

    fn constant_value(&self, _module: Address, type_id: u32) -> Option<i128>
    {
        self.record(type_id)?.value
    }
}

impl SymbolProvider for TableSymbols
{
    fn initialize(&mut self, pid: ProcessId) -> Result<()>
    {
        self.log.borrow_mut().initialized.push(pid);
        Ok(())
    }

    fn load_module(&mut self, load: &ModuleLoad) -> Result<()>
    {
        self.log.borrow_mut().loaded.push(load.clone());
        Ok(())
    }

    fn unload_module(&mut self, base: Address) -> Result<()>
    {
        self.log.borrow_mut().unloaded.push(base);
        Ok(())
    }

    fn cleanup(&mut self)
    {
        self.log.borrow_mut().cleanups += 1;
    }

    fn symbol_from_address(&self, address: Address) -> Option<SymbolHit>
    {
        self.functions
            .iter()
            .find(|(start, len, _)| (*start..start + len).contains(&address.value()))
            .map(|(start, _, name)| SymbolHit {
                name: name.clone(),
                displacement: address.value() - start,
            })
    }

    fn line_from_address(&self, address: Address) -> Option<SourceLine>
    {
        self.lines
            .iter()
            .find(|(start, len, _, _)| (*start..start + len).contains(&address.value()))
            .map(|(start, _, file, line)| SourceLine {
                file: PathBuf::from(file),
                line: *line,
                displacement: (address.value() - start) as u32,
            })
    }

    fn module_name(&self, address: Address) -> Option<String>
    {
        self.modules
            .iter()
            .find(|(base, size, _)| (*base..base + size).contains(&address.value()))
            .map(|(_, _, name)| name.clone())
    }

    fn module_base(&self, address: Address) -> Option<Address>
    {
        self.modules
            .iter()
            .find(|(base, size, _)| (*base..base + size).contains(&address.value()))
            .map(|(base, _, _)| Address::from(*base))
    }

    fn symbol_format(&self, base: Address) -> SymbolFormat
    {
        if self.modules.iter().any(|(start, _, _)| *start == base.value()) {
            SymbolFormat::Pdb
        } else {
            SymbolFormat::None
        }
    }

    fn enumerate_variables(&self, scope: SymbolScope, mask: &str) -> Result<Vec<VariableSymbol>>
    {
        self.log.borrow_mut().scopes.push(scope);
        let prefix = mask.trim_end_matches('*');
        Ok(self
            .variables
            .iter()
            .filter(|symbol| symbol.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn stack_walker(&self, _thread: ThreadId, _word: WordSize) -> Result<Box<dyn StackWalker + '_>>
    {
        Ok(Box::new(ScriptedWalker::new(self.frames.clone(), self.fault_at)))
    }
}

pub fn variable(name: &str, type_id: u32, size: u32, flags: u32, address: u64) -> VariableSymbol
{
    VariableSymbol {
        type_id,
        size,
        module_base: Address::from(IMAGE_BASE),
        flags: SymbolFlags(flags),
        value: 0,
        address,
        register: 0,
        name: name.to_string(),
    }
}

/// Walker replaying a frame chain
pub struct ScriptedWalker
{
    frames: VecDeque<WalkFrame>,
    fault_at: Option<usize>,
    steps: usize,
}

impl ScriptedWalker
{
    pub fn new(frames: Vec<WalkFrame>, fault_at: Option<usize>) -> Self
    {
        Self {
            frames: frames.into(),
            fault_at,
            steps: 0,
        }
    }

    /// Chain of `depth` frames with distinct non-zero pcs and frame pointers.
    pub fn chain(depth: usize) -> Vec<WalkFrame>
    {
        (0..depth as u64)
            .map(|index| WalkFrame {
                pc: Address::from(0x0040_1000 + index * 0x10),
                sp: Address::from(0x0012_F000 + index * 0x40),
                fp: Address::from(0x0012_F020 + index * 0x40),
                return_address: Address::from(0x0040_1010 + index * 0x10),
            })
            .collect()
    }
}

impl StackWalker for ScriptedWalker
{
    fn step(&mut self, frame: &mut WalkFrame, context: &mut ThreadContext) -> Result<bool>
    {
        if self.fault_at == Some(self.steps) {
            return Err(DebuggerError::MemoryRead {
                address: frame.fp.value(),
                len: 4,
            });
        }
        self.steps += 1;
        match self.frames.pop_front() {
            Some(next) => {
                *frame = next;
                context.pc = next.pc;
                context.sp = next.sp;
                context.fp = next.fp;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Fixed snapshot contents
#[derive(Debug, Clone, Default)]
pub struct SnapshotData
{
    pub processes: Vec<ProcessInfo>,
    pub threads: Vec<ThreadInfo>,
    pub modules: Vec<ModuleInfo>,
    pub heaps: Vec<(HeapListEntry, Vec<HeapBlock>)>,
}

/// Snapshot provider over [`SnapshotData`], counting opens and closes
#[derive(Default)]
pub struct FakeSnapshots
{
    pub data: SnapshotData,
    pub refuse: bool,
    pub opened: Rc<RefCell<Vec<(ProcessId, SnapshotKinds)>>>,
    pub closes: Rc<Cell<usize>>,
}

impl SnapshotProvider for FakeSnapshots
{
    fn open(&self, pid: ProcessId, kinds: SnapshotKinds) -> Result<Box<dyn SnapshotSource>>
    {
        if self.refuse {
            return Err(DebuggerError::os(
                "CreateToolhelp32Snapshot",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access is denied."),
            ));
        }
        self.opened.borrow_mut().push((pid, kinds));
        Ok(Box::new(FakeSource {
            data: self.data.clone(),
            cursor: 0,
            heap: None,
            block: 0,
            closes: Rc::clone(&self.closes),
        }))
    }
}

struct FakeSource
{
    data: SnapshotData,
    cursor: usize,
    heap: Option<usize>,
    block: usize,
    closes: Rc<Cell<usize>>,
}

impl FakeSource
{
    fn at<T: Clone>(&mut self, items: fn(&SnapshotData) -> &Vec<T>, first: bool) -> Option<T>
    {
        self.cursor = if first { 0 } else { self.cursor + 1 };
        items(&self.data).get(self.cursor).cloned()
    }
}

impl SnapshotSource for FakeSource
{
    fn first_process(&mut self) -> Option<ProcessInfo>
    {
        self.at(|data| &data.processes, true)
    }

    fn next_process(&mut self) -> Option<ProcessInfo>
    {
        self.at(|data| &data.processes, false)
    }

    fn first_thread(&mut self) -> Option<ThreadInfo>
    {
        self.at(|data| &data.threads, true)
    }

    fn next_thread(&mut self) -> Option<ThreadInfo>
    {
        self.at(|data| &data.threads, false)
    }

    fn first_module(&mut self) -> Option<ModuleInfo>
    {
        self.at(|data| &data.modules, true)
    }

    fn next_module(&mut self) -> Option<ModuleInfo>
    {
        self.at(|data| &data.modules, false)
    }

    fn first_heap(&mut self) -> Option<HeapListEntry>
    {
        self.cursor = 0;
        self.data.heaps.first().map(|(entry, _)| *entry)
    }

    fn next_heap(&mut self) -> Option<HeapListEntry>
    {
        self.cursor += 1;
        self.data.heaps.get(self.cursor).map(|(entry, _)| *entry)
    }

    fn first_block(&mut self, heap: &HeapListEntry) -> Option<HeapBlock>
    {
        self.heap = self.data.heaps.iter().position(|(entry, _)| entry.heap_id == heap.heap_id);
        self.block = 0;
        let index = self.heap?;
        self.data.heaps[index].1.first().copied()
    }

    fn next_block(&mut self) -> Option<HeapBlock>
    {
        let index = self.heap?;
        self.block += 1;
        self.data.heaps[index].1.get(self.block).copied()
    }

    fn close(&mut self)
    {
        self.closes.set(self.closes.get() + 1);
    }
}

// ============================================================================
// Console
// ============================================================================

/// Console fed from a script that records everything written
#[derive(Debug, Default)]
pub struct RecordingConsole
{
    pub input: VecDeque<String>,
    pub output: String,
    /// Text written while a non-default color was active
    pub colored: Vec<(ConsoleColor, String)>,
    color: Option<ConsoleColor>,
}

impl RecordingConsole
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn scripted(lines: &[&str]) -> Self
    {
        Self {
            input: lines.iter().map(|line| (*line).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<&str>
    {
        self.output.lines().collect()
    }

    pub fn contains(&self, text: &str) -> bool
    {
        self.output.contains(text)
    }

    pub fn colored_with(&self, color: ConsoleColor) -> Vec<&str>
    {
        self.colored
            .iter()
            .filter(|(used, _)| *used == color)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl Console for RecordingConsole
{
    fn write(&mut self, text: &str)
    {
        self.output.push_str(text);
        if let Some(color) = self.color {
            if text != "\n" {
                self.colored.push((color, text.to_string()));
            }
        }
    }

    fn set_color(&mut self, color: ConsoleColor)
    {
        self.color = (color != ConsoleColor::Default).then_some(color);
    }

    fn read_line(&mut self, _prompt: &str) -> Option<String>
    {
        self.input.pop_front()
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Handles to the logs of a platform handed to a session
pub struct Probes
{
    pub backend: Rc<RefCell<BackendLog>>,
    pub symbols: Rc<RefCell<SymbolLog>>,
    pub snapshot_closes: Rc<Cell<usize>>,
}

pub fn platform(backend: ScriptedBackend, symbols: TableSymbols, snapshots: FakeSnapshots) -> (Platform, Probes)
{
    let probes = Probes {
        backend: Rc::clone(&backend.log),
        symbols: Rc::clone(&symbols.log),
        snapshot_closes: Rc::clone(&snapshots.closes),
    };
    let platform = Platform {
        backend: Box::new(backend),
        symbols: Box::new(symbols),
        snapshots: Box::new(snapshots),
    };
    (platform, probes)
}
