//! # Debug Session
//!
//! The orchestrator: owns the target, consumes debug events, applies the
//! exception policy and serves operator commands while the target is halted.
//!
//! ## States
//!
//! ```text
//! NoTarget --run/attach--> Running --event--> Halted --go--> Running
//!                                                |
//!                                       process exits --> NoTarget
//! ```
//!
//! `detach` and `stop` drop back to `NoTarget` from any state with a live
//! target. A process-exit event is continued and ends the event loop for that
//! target; the session then waits for the next command.
//!
//! ## Exception policy
//!
//! Access violations, breakpoints, misaligned accesses and control-break
//! exceptions are handed straight back to the target on first chance (with
//! an "unhandled" disposition) unless [`SessionOptions::catch_first_chance`]
//! is set. Everything else halts and is shown to the operator.
//!
//! ## Suspension
//!
//! [`DebugSession::pump_event`] is the only place that blocks waiting on the
//! target. Commands never change the session state except `run`, `attach`,
//! `go`, `detach`, `stop` and `quit`.

mod commands;
pub mod display;

use std::fs;
use std::path::Path;

use cobalt_utils::cmdline::parse_command_line;
pub use commands::{lookup, Command, CommandHandler, COMMANDS};
use tracing::{debug, error, info, warn};

use crate::backend::{DebugBackend, MemoryAccess, Platform};
use crate::console::{Console, ConsoleColor};
use crate::error::{DebuggerError, Result};
use crate::events::{DebugEvent, DebugEventKind, Disposition, ExceptionRecord};
use crate::image::{inspect_image, ImageInfo};
use crate::snapshot::{list_heaps, list_modules, list_processes, list_threads, SnapshotProvider};
use crate::symbols::SymbolProvider;
use crate::typemodel::TypeArena;
use crate::types::{Address, ContextParts, ModuleLoad, ProcessId, SymbolScope, ThreadContext, ThreadId, WordSize};
use crate::unwind::{capture_stack_trace, describe_address};
use crate::variables::list_variables;

/// Prompt shown while waiting for a command
pub const PROMPT: &str = ">";

/// Operator-tunable session behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions
{
    /// Surface first-chance exceptions that would otherwise go straight back
    /// to the target
    pub catch_first_chance: bool,
    /// Frame cap for the `k` command
    pub max_stack_depth: usize,
}

impl Default for SessionOptions
{
    fn default() -> Self
    {
        Self {
            catch_first_chance: false,
            max_stack_depth: 64,
        }
    }
}

/// Where the session is in the target's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState
{
    /// No target process
    NoTarget,
    /// The target runs; the session is about to wait for its next event
    Running(ProcessId),
    /// A debug event is outstanding and the reporting thread is stopped
    Halted(ProcessId),
}

/// Variable scope for the listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope
{
    /// Globals of the module the halted thread is executing in
    Globals,
    /// Locals and parameters of the current function
    Locals,
}

/// One debugging session, reused across targets
pub struct DebugSession
{
    backend: Box<dyn DebugBackend>,
    symbols: Box<dyn SymbolProvider>,
    snapshots: Box<dyn SnapshotProvider>,
    options: SessionOptions,
    target: Option<ProcessId>,
    /// Outstanding event; only ever set while `target` is
    pending: Option<DebugEvent>,
    image: Option<ImageInfo>,
    arena: TypeArena,
    quit: bool,
}

impl DebugSession
{
    pub fn new(platform: Platform, options: SessionOptions) -> Self
    {
        let word = platform.backend.word_size();
        Self {
            backend: platform.backend,
            symbols: platform.symbols,
            snapshots: platform.snapshots,
            options,
            target: None,
            pending: None,
            image: None,
            arena: TypeArena::new(word),
            quit: false,
        }
    }

    pub fn state(&self) -> SessionState
    {
        match (self.target, &self.pending) {
            (None, _) => SessionState::NoTarget,
            (Some(pid), None) => SessionState::Running(pid),
            (Some(pid), Some(_)) => SessionState::Halted(pid),
        }
    }

    pub fn options(&self) -> &SessionOptions
    {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SessionOptions
    {
        &mut self.options
    }

    pub fn target(&self) -> Option<ProcessId>
    {
        self.target
    }

    pub fn pending_event(&self) -> Option<&DebugEvent>
    {
        self.pending.as_ref()
    }

    /// Type nodes resolved for the current target
    pub fn type_arena(&self) -> &TypeArena
    {
        &self.arena
    }

    /// Header facts of the launched image, when it could be inspected
    pub fn image(&self) -> Option<&ImageInfo>
    {
        self.image.as_ref()
    }

    /// `true` once `quit` was issued or the console reached end of input
    pub fn has_quit(&self) -> bool
    {
        self.quit
    }

    /// Run until the operator quits.
    ///
    /// Alternates between reading commands (no target, or halted) and
    /// waiting for debug events (running). A live target is killed on the
    /// way out.
    pub fn run(&mut self, console: &mut dyn Console)
    {
        while !self.quit {
            match self.state() {
                SessionState::Running(_) => self.pump_event(console),
                SessionState::NoTarget | SessionState::Halted(_) => self.wait_for_command(console),
            }
        }
        self.shutdown();
    }

    /// Read and dispatch commands until one of them asks to stop waiting.
    ///
    /// End of input counts as `quit`.
    pub fn wait_for_command(&mut self, console: &mut dyn Console)
    {
        loop {
            let Some(line) = console.read_line(PROMPT) else {
                debug!("console closed");
                self.quit = true;
                return;
            };
            if self.execute(console, &line) {
                return;
            }
        }
    }

    /// Tokenize and dispatch one command line.
    ///
    /// Returns the command's "stop waiting for commands" signal. Blank lines
    /// and unknown commands return `false`.
    pub fn execute(&mut self, console: &mut dyn Console, line: &str) -> bool
    {
        let Some(invocation) = parse_command_line(line).split_command() else {
            return false;
        };
        match lookup(&invocation.name) {
            Some(command) if command.raw_arguments => {
                debug!(command = command.name, arguments = ?invocation.arguments, "dispatching command");
                (command.handler)(self, console, &invocation.arguments, &[])
            }
            Some(command) => {
                debug!(command = command.name, tokens = ?invocation.tokens, switches = ?invocation.switches, "dispatching command");
                (command.handler)(self, console, &invocation.tokens, &invocation.switches)
            }
            None => {
                console.write_line(&format!("Unknown command '{}', type 'help' for a list.", invocation.name));
                false
            }
        }
    }

    /// Block for the next debug event and handle it.
    ///
    /// A failed wait is fatal for the target: it is reported, the symbol
    /// session is torn down and the session returns to `NoTarget`.
    pub fn pump_event(&mut self, console: &mut dyn Console)
    {
        let event = match self.backend.wait_for_event() {
            Ok(event) => event,
            Err(err) => {
                let err = if matches!(err, DebuggerError::WaitFailed(_)) {
                    err
                } else {
                    DebuggerError::WaitFailed(Box::new(err))
                };
                report(console, &err);
                self.abandon_target();
                return;
            }
        };
        debug!(
            pid = %event.process,
            tid = %event.thread,
            kind = event.kind.name(),
            "debug event received"
        );
        self.handle_event(console, event);
    }

    /// Apply the policy and side effects of one event.
    ///
    /// Leaves the session `Halted` on the event unless the event was passed
    /// straight back to the target or ended it.
    pub fn handle_event(&mut self, console: &mut dyn Console, event: DebugEvent)
    {
        if let DebugEventKind::Exception(record) = &event.kind {
            if self.defers_to_target(record) {
                debug!(
                    code = record.code,
                    exception = record.kind().name(),
                    "first-chance exception passed to target"
                );
                self.pending = Some(event);
                if let Err(err) = self.resume(Disposition::Unhandled) {
                    report(console, &err);
                }
                return;
            }
        }

        self.apply_side_effects(console, &event);
        self.display_event(console, &event);

        let exited = matches!(event.kind, DebugEventKind::ExitProcess { .. });
        self.pending = Some(event);
        if exited {
            if let Err(err) = self.resume(Disposition::Handled) {
                report(console, &err);
            }
            self.abandon_target();
        }
    }

    /// Whether an exception goes back to the target without being shown.
    pub fn defers_to_target(&self, record: &ExceptionRecord) -> bool
    {
        record.first_chance && !self.options.catch_first_chance && record.kind().defers_to_target()
    }

    /// Continue the outstanding event.
    ///
    /// ## Errors
    ///
    /// - `NoPendingEvent`: the target is not halted
    /// - `Os`: the OS refused to continue the event
    pub fn resume(&mut self, disposition: Disposition) -> Result<()>
    {
        let event = self.pending.take().ok_or(DebuggerError::NoPendingEvent)?;
        debug!(pid = %event.process, tid = %event.thread, %disposition, "continuing event");
        self.backend.continue_event(event.process, event.thread, disposition)
    }

    /// Start `program` under the debugger.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: a target is already being debugged
    /// - `LaunchFailed`: the OS refused to create the process
    pub fn launch(&mut self, program: &str, args: &str) -> Result<ProcessId>
    {
        self.ensure_no_target()?;
        self.image = match inspect_image(Path::new(program)) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(program, "cannot inspect image: {err}");
                None
            }
        };
        let pid = self
            .backend
            .launch(program, args)
            .map_err(|err| DebuggerError::LaunchFailed(Box::new(err)))?;
        info!(%pid, program, args, "launched target");
        self.begin_target(pid);
        Ok(pid)
    }

    /// Attach to a running process.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: a target is already being debugged
    /// - `LaunchFailed`: the OS refused to attach
    pub fn attach(&mut self, pid: ProcessId) -> Result<()>
    {
        self.ensure_no_target()?;
        self.image = None;
        self.backend
            .attach(pid)
            .map_err(|err| DebuggerError::LaunchFailed(Box::new(err)))?;
        info!(%pid, "attached to target");
        self.begin_target(pid);
        Ok(())
    }

    /// Stop debugging and let the target run on.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`: no target
    /// - `Os`: the OS refused to detach; the session is unchanged
    pub fn detach(&mut self) -> Result<ProcessId>
    {
        let pid = self.target.ok_or(DebuggerError::NotAttached)?;
        let pending = self.pending.take();
        if let Err(err) = self.backend.detach(pending.as_ref()) {
            self.pending = pending;
            return Err(err);
        }
        info!(%pid, "detached from target");
        self.abandon_target();
        Ok(pid)
    }

    /// Terminate the target.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`: no target
    /// - `Os`: the OS refused to terminate the process; the session is unchanged
    pub fn kill(&mut self) -> Result<ProcessId>
    {
        let pid = self.target.ok_or(DebuggerError::NotAttached)?;
        let pending = self.pending.take();
        if let Err(err) = self.backend.kill(pending.as_ref()) {
            self.pending = pending;
            return Err(err);
        }
        info!(%pid, "killed target");
        self.abandon_target();
        Ok(pid)
    }

    /// Leave the command loop; a live target is killed by [`run`](Self::run).
    pub fn request_quit(&mut self)
    {
        self.quit = true;
    }

    /// Register snapshot of the thread that reported the outstanding event.
    ///
    /// ## Errors
    ///
    /// - `NoPendingEvent`: the target is not halted
    /// - `Os`: the thread's context could not be captured
    pub fn halted_context(&self, parts: ContextParts) -> Result<(ThreadId, ThreadContext)>
    {
        let event = self.pending.as_ref().ok_or(DebuggerError::NoPendingEvent)?;
        let context = self.backend.thread_context(event.thread, parts)?;
        Ok((event.thread, context))
    }

    /// Pointer width of the current target.
    ///
    /// The launched image's header wins over the backend's guess, which is
    /// only reliable once the process-created event arrived.
    pub fn word_size(&self) -> WordSize
    {
        self.image
            .as_ref()
            .map_or_else(|| self.backend.word_size(), |image| image.word)
    }

    /// Read `len` bytes, falling back to byte-wise reads so unreadable bytes
    /// come back as `None` instead of failing the whole range.
    pub fn read_bytes(&self, address: Address, len: usize) -> Vec<Option<u8>>
    {
        match self.backend.read_memory(address, len) {
            Ok(bytes) => bytes.into_iter().map(Some).collect(),
            Err(err) => {
                debug!(%address, len, "bulk read failed, reading byte-wise: {err}");
                (0..len)
                    .map(|index| {
                        self.backend
                            .read_memory(address + index as u64, 1)
                            .ok()
                            .and_then(|bytes| bytes.first().copied())
                    })
                    .collect()
            }
        }
    }

    /// Text of an `OutputDebugString` event, `??` when unreadable.
    pub fn read_debug_string(&self, address: Address, length: u16, unicode: bool) -> String
    {
        let width = if unicode { 2 } else { 1 };
        match self.backend.read_memory(address, usize::from(length) * width) {
            Ok(bytes) => decode_debug_string(&bytes, unicode),
            Err(err) => {
                debug!(%address, length, "debug string unreadable: {err}");
                "??".to_string()
            }
        }
    }

    /// Listing lines for `list processes|threads|modules|heaps`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: unknown listing kind
    /// - `NotAttached`: thread, module and heap listings need a target
    /// - `Os`: the snapshot could not be taken
    pub fn listing(&self, what: &str) -> Result<Vec<String>>
    {
        let word = self.word_size();
        let snapshots = &*self.snapshots;
        match what.to_ascii_lowercase().as_str() {
            "processes" => {
                let processes = list_processes(snapshots)?;
                let mut lines = vec![display::process_header().to_string()];
                lines.extend(processes.iter().map(display::process_line));
                Ok(lines)
            }
            "threads" => {
                let pid = self.target.ok_or(DebuggerError::NotAttached)?;
                Ok(list_threads(snapshots, pid)?.iter().map(display::thread_line).collect())
            }
            "modules" => {
                let pid = self.target.ok_or(DebuggerError::NotAttached)?;
                let symbols: &dyn SymbolProvider = &*self.symbols;
                Ok(list_modules(snapshots, pid, Some(symbols))?
                    .iter()
                    .map(|module| display::module_line(module, word))
                    .collect())
            }
            "heaps" => {
                let pid = self.target.ok_or(DebuggerError::NotAttached)?;
                Ok(list_heaps(snapshots, pid)?
                    .iter()
                    .flat_map(|heap| display::heap_lines(heap, word))
                    .collect())
            }
            other => Err(DebuggerError::InvalidArgument(format!(
                "cannot list '{other}', expected processes, threads, modules or heaps"
            ))),
        }
    }

    /// Call stack of the halted thread, innermost frame first.
    ///
    /// ## Errors
    ///
    /// - `NoPendingEvent`: the target is not halted
    /// - `Os` / `Symbol`: no context or no stack walker for the thread
    pub fn call_stack(&self, max_depth: usize) -> Result<Vec<String>>
    {
        let (thread, context) = self.halted_context(ContextParts::CONTROL)?;
        let word = self.word_size();
        let trace = {
            let mut walker = self.symbols.stack_walker(thread, word)?;
            capture_stack_trace(&mut *walker, &context, max_depth)
        };
        debug!(depth = trace.depth(), %thread, "captured call stack");
        Ok(trace
            .innermost_first()
            .enumerate()
            .map(|(index, pc)| display::frame_line(index, pc, &describe_address(&*self.symbols, pc), word))
            .collect())
    }

    /// Source lines around the halted thread's program counter.
    ///
    /// ## Errors
    ///
    /// - `NoPendingEvent`: the target is not halted
    /// - `Symbol`: no line information for the program counter
    pub fn source_listing(&self) -> Result<Vec<String>>
    {
        let (_, context) = self.halted_context(ContextParts::CONTROL)?;
        let line = self.symbols.line_from_address(context.pc).ok_or_else(|| {
            DebuggerError::Symbol(format!("no line information for 0x{}", context.pc.to_hex(self.word_size())))
        })?;

        let mut lines = vec![line.to_string()];
        match fs::read_to_string(&line.file) {
            Ok(source) => lines.extend(display::source_window(&source, line.line, 3)),
            Err(err) => {
                warn!(file = %line.file.display(), "source file unreadable: {err}");
                lines.push(format!("    <source unavailable: {err}>"));
            }
        }
        Ok(lines)
    }

    /// Variable listing lines for the halted thread.
    ///
    /// A variable whose memory cannot be read is listed with value `??`.
    ///
    /// ## Errors
    ///
    /// - `NoPendingEvent`: the target is not halted
    /// - `Os`: the thread's context could not be captured
    /// - `Symbol`: the scope could not be resolved or enumerated
    pub fn variables(&mut self, scope: VariableScope, mask: &str, verbose: bool) -> Result<Vec<String>>
    {
        let (_, context) = self.halted_context(ContextParts::CONTROL)?;
        let scope = match scope {
            VariableScope::Globals => {
                let base = self.symbols.module_base(context.pc).ok_or_else(|| {
                    DebuggerError::Symbol(format!("no module contains 0x{}", context.pc.to_hex(context.word)))
                })?;
                SymbolScope::Module(base)
            }
            VariableScope::Locals => SymbolScope::Frame(context.pc),
        };
        let found = self.symbols.enumerate_variables(scope, mask)?;
        debug!(?scope, mask, count = found.len(), "enumerated variables");
        Ok(list_variables(
            &mut self.arena,
            &*self.symbols,
            &*self.backend,
            &found,
            &context,
            verbose,
        ))
    }

    fn ensure_no_target(&self) -> Result<()>
    {
        match self.target {
            Some(pid) => Err(DebuggerError::InvalidArgument(format!(
                "already debugging process {pid}; detach or stop it first"
            ))),
            None => Ok(()),
        }
    }

    fn begin_target(&mut self, pid: ProcessId)
    {
        self.target = Some(pid);
        self.pending = None;
        self.arena.reset(self.word_size());
    }

    /// Forget the target and everything cached for it.
    fn abandon_target(&mut self)
    {
        self.symbols.cleanup();
        self.arena.reset(self.backend.word_size());
        self.pending = None;
        self.target = None;
        self.image = None;
    }

    fn apply_side_effects(&mut self, console: &mut dyn Console, event: &DebugEvent)
    {
        match &event.kind {
            DebugEventKind::CreateProcess { image, base, .. } => {
                self.arena.reset(self.word_size());
                if let Err(err) = self.symbols.initialize(event.process) {
                    report(console, &err);
                    return;
                }
                self.register_module(&ModuleLoad {
                    base: *base,
                    image: image.clone(),
                });
            }
            DebugEventKind::LoadModule { image, base } => {
                self.register_module(&ModuleLoad {
                    base: *base,
                    image: image.clone(),
                });
            }
            DebugEventKind::UnloadModule { base } => {
                if let Err(err) = self.symbols.unload_module(*base) {
                    warn!(%base, "symbol unload failed: {err}");
                }
                let evicted = self.arena.evict_module(*base);
                debug!(%base, evicted, "evicted module types");
            }
            DebugEventKind::ExitProcess { exit_code } => {
                info!(pid = %event.process, exit_code, "target exited");
                self.symbols.cleanup();
            }
            _ => {}
        }
    }

    fn register_module(&mut self, load: &ModuleLoad)
    {
        if let Err(err) = self.symbols.load_module(load) {
            warn!(base = %load.base, "symbols not loaded: {err}");
        }
    }

    fn display_event(&self, console: &mut dyn Console, event: &DebugEvent)
    {
        console.write_colored(ConsoleColor::Green, &event.header());
        match &event.kind {
            DebugEventKind::DebugString {
                address,
                length,
                unicode,
            } => {
                let text = self.read_debug_string(*address, *length, *unicode);
                console.write_line(&format!("OUTPUT_DEBUG_STRING_INFO: \n    {text}"));
            }
            DebugEventKind::Exception(record) => {
                console.write_colored(ConsoleColor::Red, &record.describe(self.word_size()));
            }
            _ => console.write_line(&event.describe(self.word_size())),
        }
    }

    fn shutdown(&mut self)
    {
        if self.target.is_some() {
            if let Err(err) = self.kill() {
                error!("failed to stop target on exit: {err}");
            }
        }
    }
}

/// Report an operation failure to the operator and the log.
pub fn report(console: &mut dyn Console, err: &DebuggerError)
{
    error!("{err}");
    console.write_colored(ConsoleColor::Red, &format!("TraceError: {err}"));
}

/// Decode debug-string bytes up to the first NUL.
fn decode_debug_string(bytes: &[u8], unicode: bool) -> String
{
    let text = if unicode {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        let end = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    };
    text.trim_end_matches(['\r', '\n']).to_string()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_decode_unicode_stops_at_nul()
    {
        let bytes: Vec<u8> = "hi\0junk".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode_debug_string(&bytes, true), "hi");
    }

    #[test]
    fn test_decode_ansi_trims_newline()
    {
        assert_eq!(decode_debug_string(b"loaded config\r\n\0\0", false), "loaded config");
        assert_eq!(decode_debug_string(b"", false), "");
    }

    #[test]
    fn test_default_options()
    {
        let options = SessionOptions::default();
        assert!(!options.catch_first_chance);
        assert_eq!(options.max_stack_depth, 64);
    }
}
