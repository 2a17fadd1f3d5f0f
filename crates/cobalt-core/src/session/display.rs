//! Text layout for session output.

use crate::types::{Address, HeapInfo, ModuleInfo, ProcessInfo, ThreadInfo, WordSize};

/// Bytes shown per line of a memory dump
pub const BYTES_PER_LINE: usize = 20;

/// Largest memory dump a single command may request
pub const MAX_DUMP_BYTES: usize = 4096;

/// Length used when `memory` is given no byte count
pub const DEFAULT_DUMP_BYTES: usize = 40;

/// Hex dump, one line per [`BYTES_PER_LINE`] bytes; `None` bytes render `??`.
pub fn memory_dump(start: Address, bytes: &[Option<u8>], word: WordSize) -> Vec<String>
{
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(line, chunk)| {
            let address = start + (line * BYTES_PER_LINE) as u64;
            let cells: Vec<String> = chunk
                .iter()
                .map(|byte| byte.map_or_else(|| "??".to_string(), |b| format!("{b:02X}")))
                .collect();
            format!("0x{}  {}", address.to_hex(word), cells.join(" "))
        })
        .collect()
}

pub fn process_header() -> &'static str
{
    "   PID   PPID  THREADS  IMAGE"
}

pub fn process_line(process: &ProcessInfo) -> String
{
    format!(
        "{:>6} {:>6} {:>8}  {}",
        process.pid, process.parent, process.thread_count, process.exe
    )
}

pub fn thread_line(thread: &ThreadInfo) -> String
{
    format!("{:>6}  owner {}", thread.tid, thread.owner)
}

pub fn module_line(module: &ModuleInfo, word: WordSize) -> String
{
    format!(
        "0x{} {:08X} {:<9} {:<24} {}",
        module.base.to_hex(word),
        module.size,
        module.symbol_format.to_string(),
        module.name,
        module.path.display()
    )
}

/// Heap summary line followed by one line per block.
pub fn heap_lines(heap: &HeapInfo, word: WordSize) -> Vec<String>
{
    let mut lines = Vec::with_capacity(heap.blocks.len() + 1);
    lines.push(format!(
        "Heap of process {} [{}]: {} blocks",
        heap.owner,
        heap.kind(),
        heap.blocks.len()
    ));
    lines.extend(heap.blocks.iter().map(|block| {
        format!(
            "    0x{} {:>10} {:<8} handle 0x{}",
            block.address.to_hex(word),
            block.size,
            block.kind().to_string(),
            Address::from(block.handle).to_hex(word)
        )
    }));
    lines
}

/// One call-stack line, innermost frame numbered 0.
pub fn frame_line(index: usize, pc: Address, description: &str, word: WordSize) -> String
{
    format!("#{index} 0x{} {description}", pc.to_hex(word))
}

/// Window of source lines around `line` (1-based), current line marked.
pub fn source_window(source: &str, line: u32, radius: u32) -> Vec<String>
{
    let first = line.saturating_sub(radius).max(1);
    let last = line.saturating_add(radius);
    source
        .lines()
        .enumerate()
        .map(|(index, text)| (index as u32 + 1, text))
        .filter(|(number, _)| (first..=last).contains(number))
        .map(|(number, text)| {
            let marker = if number == line { '>' } else { ' ' };
            format!("{number:>5}{marker} {text}")
        })
        .collect()
}
