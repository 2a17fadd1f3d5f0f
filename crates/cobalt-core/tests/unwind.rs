//! Stack capture and frame description.

mod common;

use cobalt_core::types::Address;
use cobalt_core::unwind::{capture_stack_trace, describe_address, WalkFrame};
use common::{context32, ScriptedWalker, TableSymbols};

fn halted() -> cobalt_core::types::ThreadContext
{
    context32(0x0040_1000, 0x0012_F000, 0x0012_F020)
}

#[test]
fn test_depth_capped_by_max()
{
    let mut walker = ScriptedWalker::new(ScriptedWalker::chain(5), None);
    let trace = capture_stack_trace(&mut walker, &halted(), 3);

    assert_eq!(trace.depth(), 3);
    assert_eq!(trace.slots().len(), 3);
    // Oldest captured call first
    assert_eq!(trace.frames()[0], Address::from(0x0040_1020));
    assert_eq!(trace.frames()[2], Address::from(0x0040_1000));
}

#[test]
fn test_short_stack_is_zero_filled()
{
    let mut walker = ScriptedWalker::new(ScriptedWalker::chain(5), None);
    let trace = capture_stack_trace(&mut walker, &halted(), 8);

    assert_eq!(trace.depth(), 5);
    assert_eq!(trace.slots().len(), 8);
    assert!(trace.slots()[5..].iter().all(|slot| slot.is_null()));

    let innermost: Vec<Address> = trace.clone().innermost_first().collect();
    assert_eq!(innermost.len(), 5);
    assert_eq!(innermost[0], Address::from(0x0040_1000));
    assert_eq!(trace.into_iter().count(), 5);
}

#[test]
fn test_zero_frame_pointer_ends_walk()
{
    let mut frames = ScriptedWalker::chain(6);
    frames[2].fp = Address::ZERO;
    let mut walker = ScriptedWalker::new(frames, None);

    assert_eq!(capture_stack_trace(&mut walker, &halted(), 16).depth(), 2);
}

#[test]
fn test_zero_pc_ends_walk()
{
    let mut frames = ScriptedWalker::chain(6);
    frames[3] = WalkFrame {
        pc: Address::ZERO,
        ..frames[3]
    };
    let mut walker = ScriptedWalker::new(frames, None);

    assert_eq!(capture_stack_trace(&mut walker, &halted(), 16).depth(), 3);
}

#[test]
fn test_fault_keeps_frames_captured_so_far()
{
    let mut walker = ScriptedWalker::new(ScriptedWalker::chain(6), Some(2));
    let trace = capture_stack_trace(&mut walker, &halted(), 16);

    assert_eq!(trace.depth(), 2);
    assert_eq!(trace.slots().len(), 16);
}

#[test]
fn test_walk_leaves_snapshot_untouched()
{
    let context = halted();
    let before = context.clone();
    let mut walker = ScriptedWalker::new(ScriptedWalker::chain(4), None);

    capture_stack_trace(&mut walker, &context, 16);
    assert_eq!(context, before);
}

#[test]
fn test_describe_address_parts()
{
    let mut symbols = TableSymbols::new();
    symbols.functions.push((0x0040_1000, 0x80, "wWinMain".to_string()));
    symbols.lines.push((0x0040_1000, 0x20, r"c:\src\notepad.c".to_string(), 212));
    symbols.modules.push((0x0040_0000, 0x0001_0000, "notepad.exe".to_string()));

    assert_eq!(
        describe_address(&symbols, Address::from(0x0040_1004)),
        r"wWinMain      #c:\src\notepad.c:212 @notepad.exe"
    );
    // Past the line table: function and module only
    assert_eq!(
        describe_address(&symbols, Address::from(0x0040_1040)),
        "wWinMain N/A:?? @notepad.exe"
    );
    assert_eq!(describe_address(&symbols, Address::from(0x1000)), " N/A:??");
}
