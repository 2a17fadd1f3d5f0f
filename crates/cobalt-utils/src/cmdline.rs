//! # Command Line Parsing
//!
//! Splits an operator command line into positional tokens and switches, and
//! parses the numbers commands take.
//!
//! ## Tokenization
//!
//! - Tokens are separated by whitespace.
//! - A token that starts with `"` runs to the closing quote; the quotes are
//!   dropped and whitespace inside is kept.
//! - Inside a bare token a `"` toggles whitespace protection and is kept,
//!   so `name="a b"` stays one token.
//! - Tokens starting with `-` or `/` are switches.
//! - Everything after the command name is also kept in line order, for
//!   commands that forward their arguments to another program.
//!
//! ```rust
//! use cobalt_utils::cmdline::parse_command_line;
//!
//! let line = parse_command_line(r#"run "C:\Program Files\app.exe" -v /q"#);
//! assert_eq!(line.tokens, vec!["run", r"C:\Program Files\app.exe"]);
//! assert_eq!(line.switches, vec!["-v", "/q"]);
//! ```

/// One parsed command line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine
{
    /// Positional tokens, command name first
    pub tokens: Vec<String>,
    /// Switch tokens, including their `-` or `/` prefix
    pub switches: Vec<String>,
    /// Tokens after the command name in line order, switches included
    pub arguments: Vec<String>,
}

/// A command line with its name split off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation
{
    pub name: String,
    pub tokens: Vec<String>,
    pub switches: Vec<String>,
    pub arguments: Vec<String>,
}

impl CommandLine
{
    /// Split off the command name, if any.
    pub fn split_command(mut self) -> Option<Invocation>
    {
        if self.tokens.is_empty() {
            return None;
        }
        let name = self.tokens.remove(0);
        Some(Invocation {
            name,
            tokens: self.tokens,
            switches: self.switches,
            arguments: self.arguments,
        })
    }
}

/// Tokenize one command line.
pub fn parse_command_line(line: &str) -> CommandLine
{
    let mut parsed = CommandLine::default();
    let mut rest = line;

    while let Some((token, tail)) = next_token(rest) {
        rest = tail;
        if token.is_empty() {
            continue;
        }
        if !parsed.tokens.is_empty() {
            parsed.arguments.push(token.clone());
        }
        if token.starts_with('-') || token.starts_with('/') {
            parsed.switches.push(token);
        } else {
            parsed.tokens.push(token);
        }
    }
    parsed
}

/// Next token and the unparsed remainder; `None` once only whitespace is left.
fn next_token(input: &str) -> Option<(String, &str)>
{
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    if let Some(quoted) = input.strip_prefix('"') {
        return Some(match quoted.find('"') {
            Some(end) => (quoted[..end].to_string(), &quoted[end + 1..]),
            None => (quoted.to_string(), ""),
        });
    }

    let mut in_quote = false;
    for (index, ch) in input.char_indices() {
        if ch.is_whitespace() && !in_quote {
            return Some((input[..index].to_string(), &input[index..]));
        }
        if ch == '"' {
            in_quote = !in_quote;
        }
    }
    Some((input.to_string(), ""))
}

/// Parse a hexadecimal number with or without a `0x` prefix.
///
/// ```rust
/// use cobalt_utils::cmdline::parse_hex;
///
/// assert_eq!(parse_hex("0x00401000"), Some(0x0040_1000));
/// assert_eq!(parse_hex("7ffe0000"), Some(0x7FFE_0000));
/// assert_eq!(parse_hex("0xZZ"), None);
/// ```
pub fn parse_hex(text: &str) -> Option<u64>
{
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a count: decimal, or hexadecimal when prefixed with `0x`.
pub fn parse_number(text: &str) -> Option<u64>
{
    if text.starts_with("0x") || text.starts_with("0X") {
        parse_hex(text)
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_empty_line()
    {
        let line = parse_command_line("   \t ");
        assert!(line.tokens.is_empty());
        assert!(line.switches.is_empty());
        assert_eq!(line.split_command(), None);
    }

    #[test]
    fn test_tokens_and_switches()
    {
        let line = parse_command_line("locals  g_* -v");
        assert_eq!(line.tokens, vec!["locals", "g_*"]);
        assert_eq!(line.switches, vec!["-v"]);
    }

    #[test]
    fn test_quoted_token_strips_quotes()
    {
        let line = parse_command_line(r#"run "C:\My Apps\demo.exe" arg"#);
        assert_eq!(line.tokens, vec!["run", r"C:\My Apps\demo.exe", "arg"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end()
    {
        let line = parse_command_line(r#"run "C:\My Apps\demo"#);
        assert_eq!(line.tokens, vec!["run", r"C:\My Apps\demo"]);
    }

    #[test]
    fn test_embedded_quotes_are_kept()
    {
        let line = parse_command_line(r#"set name="a b" next"#);
        assert_eq!(line.tokens, vec!["set", r#"name="a b""#, "next"]);
    }

    #[test]
    fn test_split_command()
    {
        let invocation = parse_command_line("memory 0x1000 40 /x").split_command().unwrap();
        assert_eq!(invocation.name, "memory");
        assert_eq!(invocation.tokens, vec!["0x1000", "40"]);
        assert_eq!(invocation.switches, vec!["/x"]);
    }

    #[test]
    fn test_arguments_keep_line_order()
    {
        let invocation = parse_command_line(r#"run app.exe -x foo "two words" /q"#).split_command().unwrap();
        assert_eq!(invocation.arguments, vec!["app.exe", "-x", "foo", "two words", "/q"]);
        assert_eq!(invocation.tokens, vec!["app.exe", "foo", "two words"]);
        assert_eq!(invocation.switches, vec!["-x", "/q"]);
    }

    #[test]
    fn test_numbers()
    {
        assert_eq!(parse_hex("0X1F"), Some(0x1F));
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_number("40"), Some(40));
        assert_eq!(parse_number("0x28"), Some(40));
        assert_eq!(parse_number("forty"), None);
    }
}
