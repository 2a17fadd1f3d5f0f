//! Symbol name cleanup for display.
//!
//! Names handed out by the symbol provider are raw: some carry non-printable
//! leading bytes, and Rust functions are mangled (`_ZN...E` legacy or `_R...` v0).
//! C and C++ names from PDB debug info are already undecorated by the provider.

use rustc_demangle::try_demangle;

/// Printable name for a raw symbol.
///
/// ```rust
/// use cobalt_core::symbols::display_name;
///
/// assert_eq!(display_name("\u{1}\u{2}main"), "main");
/// assert_eq!(display_name("_ZN4core3fmt5write17h0123456789abcdefE"), "core::fmt::write");
/// ```
pub fn display_name(raw: &str) -> String
{
    let trimmed = raw.trim_start_matches(|c: char| c.is_control() || c == ' ');
    match try_demangle(trimmed) {
        // `{:#}` drops the trailing hash
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_plain_names_untouched()
    {
        assert_eq!(display_name("WinMain"), "WinMain");
        assert_eq!(display_name("CNotepad::OnCommand"), "CNotepad::OnCommand");
    }

    #[test]
    fn test_leading_garbage_stripped()
    {
        assert_eq!(display_name("\u{7}\u{0}wmain"), "wmain");
        assert_eq!(display_name(""), "");
    }
}
