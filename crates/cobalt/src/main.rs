use std::error::Error;
use std::process;

use clap::{Parser, Subcommand};
use cobalt_core::{create_backend, DebugSession, SessionOptions};
use cobalt_utils::{info, init_logging, LogLevel, LoggingConfig};

mod terminal;

use terminal::TerminalConsole;

/// An interactive, command-driven debugger for native Windows processes.
#[derive(Parser, Debug)]
#[command(name = "cobalt")]
#[command(version)]
#[command(about = "An interactive, command-driven debugger for native Windows processes", long_about = None)]
struct Cli
{
    /// Stop on first-chance access violations and breakpoints instead of
    /// passing them to the target
    #[arg(long, default_value_t = false)]
    catch_first_chance: bool,

    /// Maximum number of frames shown by `k`
    #[arg(long, default_value_t = 64)]
    stack_depth: usize,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Start by running or attaching, exactly as if typed at the prompt
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Debug a new process
    Run
    {
        /// Path to the executable
        program: String,
        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Attach to a running process by PID
    Attach
    {
        /// Process ID (PID) to attach to
        pid: u32,
    },
}

impl Commands
{
    /// The equivalent prompt command line.
    fn to_command_line(&self) -> String
    {
        match self {
            Commands::Run { program, args } => std::iter::once(program)
                .chain(args)
                .map(|token| quote(token))
                .fold(String::from("run"), |line, token| line + " " + &token),
            Commands::Attach { pid } => format!("attach {pid}"),
        }
    }
}

fn quote(token: &str) -> String
{
    if token.is_empty() || token.contains(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}

fn main()
{
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env().with_level(cli.log_level);
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>>
{
    let options = SessionOptions {
        catch_first_chance: cli.catch_first_chance,
        max_stack_depth: cli.stack_depth,
    };
    let platform = create_backend()?;
    let mut session = DebugSession::new(platform, options);
    let mut console = TerminalConsole::new()?;

    info!(options = ?session.options(), "session ready");
    if let Some(command) = &cli.command {
        session.execute(&mut console, &command.to_command_line());
    }
    session.run(&mut console);
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_run_command_line_quotes_spaces()
    {
        let command = Commands::Run {
            program: String::from(r"C:\Program Files\app.exe"),
            args: vec![String::from("-v"), String::from("two words")],
        };
        assert_eq!(
            command.to_command_line(),
            r#"run "C:\Program Files\app.exe" -v "two words""#
        );
    }

    #[test]
    fn test_attach_command_line()
    {
        assert_eq!(Commands::Attach { pid: 42 }.to_command_line(), "attach 42");
    }

    #[test]
    fn test_cli_parses_flags_and_subcommand()
    {
        let cli = Cli::parse_from(["cobalt", "--catch-first-chance", "--stack-depth", "8", "run", "notepad.exe"]);
        assert!(cli.catch_first_chance);
        assert_eq!(cli.stack_depth, 8);
        assert!(matches!(cli.command, Some(Commands::Run { ref program, .. }) if program == "notepad.exe"));
    }
}
