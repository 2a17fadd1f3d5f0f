//! Operator console interface.
//!
//! The session writes everything the operator sees through a [`Console`]
//! and reads commands from it. The binary provides a line-editing terminal
//! implementation; tests record the output instead.

/// Text colors the session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleColor
{
    /// Regular output
    Default,
    /// Event headers
    Green,
    /// Errors
    Red,
    /// Prompts and hints
    Yellow,
    /// Listings headers
    Cyan,
}

/// Line-oriented terminal
pub trait Console
{
    /// Write text as-is (no newline is added).
    fn write(&mut self, text: &str);

    /// Color for subsequent writes.
    fn set_color(&mut self, color: ConsoleColor);

    /// Read one command line; `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Option<String>;

    /// Write `text` followed by a newline.
    fn write_line(&mut self, text: &str)
    {
        self.write(text);
        self.write("\n");
    }

    /// Write one line in `color`, then restore the default color.
    fn write_colored(&mut self, color: ConsoleColor, text: &str)
    {
        self.set_color(color);
        self.write_line(text);
        self.set_color(ConsoleColor::Default);
    }
}
