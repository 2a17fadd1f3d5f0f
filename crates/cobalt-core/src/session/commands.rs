//! Operator command table.
//!
//! Every command takes the positional tokens and the switches that followed
//! its name and returns `true` when the session should stop waiting for
//! commands (the target was started, resumed, or the operator quit).
//! `run` instead gets its arguments unsplit, so the program sees its
//! switches where the operator typed them.

use std::collections::HashMap;

use cobalt_utils::cmdline::{parse_hex, parse_number};
use once_cell::sync::Lazy;

use super::display::{memory_dump, DEFAULT_DUMP_BYTES, MAX_DUMP_BYTES};
use super::{report, DebugSession, VariableScope};
use crate::console::{Console, ConsoleColor};
use crate::events::Disposition;
use crate::types::{Address, ContextParts, ProcessId};

/// Command implementation: `(session, console, tokens, switches) -> stop waiting`
pub type CommandHandler = fn(&mut DebugSession, &mut dyn Console, &[String], &[String]) -> bool;

/// One entry of the command table
#[derive(Debug, Clone, Copy)]
pub struct Command
{
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    /// Receives every argument as a positional token in line order, with no
    /// switches split off
    pub raw_arguments: bool,
    pub handler: CommandHandler,
}

/// All commands, in help order
pub static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        description: "help",
        usage: "help [cmd]",
        raw_arguments: false,
        handler: help,
    },
    Command {
        name: "run",
        description: "debug a new process",
        usage: "run filename [param0 param1]",
        raw_arguments: true,
        handler: run,
    },
    Command {
        name: "attach",
        description: "attach a active process",
        usage: "attach pid",
        raw_arguments: false,
        handler: attach,
    },
    Command {
        name: "detach",
        description: "detach current debuggee",
        usage: "detach",
        raw_arguments: false,
        handler: detach,
    },
    Command {
        name: "stop",
        description: "terminate debuggee",
        usage: "stop",
        raw_arguments: false,
        handler: stop,
    },
    Command {
        name: "go",
        description: "continue the halted debuggee",
        usage: "go [u]",
        raw_arguments: false,
        handler: go,
    },
    Command {
        name: "list",
        description: "list processes, threads, modules or heaps",
        usage: "list processes|threads|modules|heaps",
        raw_arguments: false,
        handler: list,
    },
    Command {
        name: "registers",
        description: "display registers of the halted thread",
        usage: "registers",
        raw_arguments: false,
        handler: registers,
    },
    Command {
        name: "memory",
        description: "display debuggee memory",
        usage: "memory address [bytes]",
        raw_arguments: false,
        handler: memory,
    },
    Command {
        name: "l",
        description: "list current source line",
        usage: "l",
        raw_arguments: false,
        handler: source,
    },
    Command {
        name: "k",
        description: "display call stack of the halted thread",
        usage: "k [depth]",
        raw_arguments: false,
        handler: stack,
    },
    Command {
        name: "globals",
        description: "list global variables of the current module",
        usage: "globals [mask] [-v]",
        raw_arguments: false,
        handler: globals,
    },
    Command {
        name: "locals",
        description: "list local variables of the current function",
        usage: "locals [mask] [-v]",
        raw_arguments: false,
        handler: locals,
    },
    Command {
        name: "catch",
        description: "show or set first-chance exception catching",
        usage: "catch [on|off]",
        raw_arguments: false,
        handler: catch,
    },
    Command {
        name: "quit",
        description: "stop the debuggee and exit",
        usage: "quit",
        raw_arguments: false,
        handler: quit,
    },
];

static BY_NAME: Lazy<HashMap<String, &'static Command>> = Lazy::new(|| {
    COMMANDS
        .iter()
        .map(|command| (command.name.to_ascii_lowercase(), command))
        .collect()
});

/// Find a command by name, ignoring case.
pub fn lookup(name: &str) -> Option<&'static Command>
{
    BY_NAME.get(&name.to_ascii_lowercase()).copied()
}

fn help_line(index: usize, command: &Command) -> String
{
    format!(
        "{index}. {}\t: {}, usage:{}",
        command.name, command.description, command.usage
    )
}

fn print_usage(console: &mut dyn Console, name: &str)
{
    if let Some(command) = lookup(name) {
        console.write_colored(ConsoleColor::Yellow, &format!("usage:{}", command.usage));
    }
}

fn write_lines(console: &mut dyn Console, lines: &[String])
{
    for line in lines {
        console.write_line(line);
    }
}

fn help(_: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    match tokens.first() {
        None => {
            for (index, command) in COMMANDS.iter().enumerate() {
                console.write_line(&help_line(index, command));
            }
        }
        Some(name) => match COMMANDS
            .iter()
            .enumerate()
            .find(|(_, command)| command.name.eq_ignore_ascii_case(name))
        {
            Some((index, command)) => console.write_line(&help_line(index, command)),
            None => console.write_line(&format!("Unknown command '{name}', type 'help' for a list.")),
        },
    }
    false
}

fn run(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    let Some((program, params)) = tokens.split_first() else {
        print_usage(console, "run");
        return false;
    };
    let params: Vec<String> = params.iter().map(|param| quote_param(param)).collect();
    match session.launch(program, &params.join(" ")) {
        Ok(pid) => {
            console.write_line(&format!("Debugging process {pid}: {program}"));
            true
        }
        Err(err) => {
            report(console, &err);
            false
        }
    }
}

/// Re-quote a parameter the tokenizer unquoted.
fn quote_param(param: &str) -> String
{
    if param.contains(char::is_whitespace) {
        format!("\"{param}\"")
    } else {
        param.to_string()
    }
}

fn attach(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    let Some(pid) = tokens
        .first()
        .and_then(|token| token.parse::<u32>().ok())
        .map(ProcessId::from)
    else {
        print_usage(console, "attach");
        return false;
    };
    match session.attach(pid) {
        Ok(()) => {
            console.write_line(&format!("Attached to process {pid}"));
            true
        }
        Err(err) => {
            report(console, &err);
            false
        }
    }
}

fn detach(session: &mut DebugSession, console: &mut dyn Console, _: &[String], _: &[String]) -> bool
{
    match session.detach() {
        Ok(pid) => console.write_line(&format!("Detached from process {pid}")),
        Err(err) => report(console, &err),
    }
    false
}

fn stop(session: &mut DebugSession, console: &mut dyn Console, _: &[String], _: &[String]) -> bool
{
    match session.kill() {
        Ok(pid) => console.write_line(&format!("Process {pid} terminated")),
        Err(err) => report(console, &err),
    }
    false
}

fn go(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    let disposition = if tokens.is_empty() {
        Disposition::Handled
    } else {
        Disposition::Unhandled
    };
    match session.resume(disposition) {
        Ok(()) => true,
        Err(err) => {
            report(console, &err);
            false
        }
    }
}

fn list(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    let Some(what) = tokens.first() else {
        print_usage(console, "list");
        return false;
    };
    match session.listing(what) {
        Ok(lines) => write_lines(console, &lines),
        Err(err) => report(console, &err),
    }
    false
}

fn registers(session: &mut DebugSession, console: &mut dyn Console, _: &[String], _: &[String]) -> bool
{
    match session.halted_context(ContextParts::ALL) {
        Ok((thread, context)) => {
            console.write_colored(ConsoleColor::Cyan, &format!("Thread {thread}:"));
            console.write_line(&context.to_string());
        }
        Err(err) => report(console, &err),
    }
    false
}

fn memory(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    if session.target().is_none() {
        return false;
    }
    let Some(address) = tokens.first().and_then(|token| parse_hex(token)).map(Address::from) else {
        print_usage(console, "memory");
        return false;
    };
    let len = tokens
        .get(1)
        .and_then(|token| parse_number(token))
        .map_or(DEFAULT_DUMP_BYTES, |count| {
            usize::try_from(count).map_or(MAX_DUMP_BYTES, |count| count.clamp(1, MAX_DUMP_BYTES))
        });

    let bytes = session.read_bytes(address, len);
    write_lines(console, &memory_dump(address, &bytes, session.word_size()));
    false
}

fn source(session: &mut DebugSession, console: &mut dyn Console, _: &[String], _: &[String]) -> bool
{
    match session.source_listing() {
        Ok(lines) => write_lines(console, &lines),
        Err(err) => report(console, &err),
    }
    false
}

fn stack(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    let depth = tokens
        .first()
        .and_then(|token| parse_number(token))
        .and_then(|depth| usize::try_from(depth).ok())
        .unwrap_or(session.options().max_stack_depth);
    match session.call_stack(depth) {
        Ok(lines) => write_lines(console, &lines),
        Err(err) => report(console, &err),
    }
    false
}

fn list_scope(session: &mut DebugSession, console: &mut dyn Console, scope: VariableScope, tokens: &[String], switches: &[String])
{
    let mask = tokens.first().map_or("", String::as_str);
    let verbose = switches
        .iter()
        .any(|switch| switch.eq_ignore_ascii_case("-v") || switch.eq_ignore_ascii_case("/v"));
    match session.variables(scope, mask, verbose) {
        Ok(lines) => write_lines(console, &lines),
        Err(err) => report(console, &err),
    }
}

fn globals(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], switches: &[String]) -> bool
{
    list_scope(session, console, VariableScope::Globals, tokens, switches);
    false
}

fn locals(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], switches: &[String]) -> bool
{
    list_scope(session, console, VariableScope::Locals, tokens, switches);
    false
}

fn catch(session: &mut DebugSession, console: &mut dyn Console, tokens: &[String], _: &[String]) -> bool
{
    match tokens.first().map(|token| token.to_ascii_lowercase()).as_deref() {
        None => {}
        Some("on") => session.options_mut().catch_first_chance = true,
        Some("off") => session.options_mut().catch_first_chance = false,
        Some(_) => {
            print_usage(console, "catch");
            return false;
        }
    }
    let state = if session.options().catch_first_chance { "on" } else { "off" };
    console.write_line(&format!("catch first chance: {state}"));
    false
}

fn quit(session: &mut DebugSession, _: &mut dyn Console, _: &[String], _: &[String]) -> bool
{
    session.request_quit();
    true
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_lookup_ignores_case()
    {
        assert_eq!(lookup("HELP").map(|command| command.name), Some("help"));
        assert_eq!(lookup("Go").map(|command| command.name), Some("go"));
        assert!(lookup("frobnicate").is_none());
    }

    #[test]
    fn test_help_line_layout()
    {
        let run = lookup("run").unwrap();
        assert_eq!(
            help_line(1, run),
            "1. run\t: debug a new process, usage:run filename [param0 param1]"
        );
    }

    #[test]
    fn test_quote_param()
    {
        assert_eq!(quote_param("-v"), "-v");
        assert_eq!(quote_param("two words"), "\"two words\"");
    }

    #[test]
    fn test_names_are_unique()
    {
        assert_eq!(BY_NAME.len(), COMMANDS.len());
    }
}
