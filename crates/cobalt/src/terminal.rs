//! Interactive terminal console: rustyline for input, crossterm for colors.

use std::io::{self, Stdout, Write};

use cobalt_core::{Console, ConsoleColor};
use cobalt_utils::warn;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::QueueableCommand;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Console on the controlling terminal, with line editing and history
pub struct TerminalConsole
{
    editor: DefaultEditor,
    out: Stdout,
    color: ConsoleColor,
}

impl TerminalConsole
{
    /// ## Errors
    ///
    /// Fails when the terminal cannot be put into line-editing mode.
    pub fn new() -> Result<Self, ReadlineError>
    {
        Ok(Self {
            editor: DefaultEditor::new()?,
            out: io::stdout(),
            color: ConsoleColor::Default,
        })
    }

    fn emit(&mut self, text: &str) -> io::Result<()>
    {
        match terminal_color(self.color) {
            Some(color) => {
                self.out
                    .queue(SetForegroundColor(color))?
                    .queue(Print(text))?
                    .queue(ResetColor)?;
            }
            None => {
                self.out.queue(Print(text))?;
            }
        }
        self.out.flush()
    }
}

fn terminal_color(color: ConsoleColor) -> Option<Color>
{
    match color {
        ConsoleColor::Default => None,
        ConsoleColor::Green => Some(Color::Green),
        ConsoleColor::Red => Some(Color::Red),
        ConsoleColor::Yellow => Some(Color::Yellow),
        ConsoleColor::Cyan => Some(Color::Cyan),
    }
}

impl Console for TerminalConsole
{
    fn write(&mut self, text: &str)
    {
        if let Err(err) = self.emit(text) {
            warn!("console write failed: {err}");
        }
    }

    fn set_color(&mut self, color: ConsoleColor)
    {
        self.color = color;
    }

    fn read_line(&mut self, prompt: &str) -> Option<String>
    {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    // History failures are ignored
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Some(line)
            }
            // Ctrl-C abandons the current line only
            Err(ReadlineError::Interrupted) => Some(String::new()),
            Err(ReadlineError::Eof) => None,
            Err(err) => {
                warn!("console read failed: {err}");
                None
            }
        }
    }
}
