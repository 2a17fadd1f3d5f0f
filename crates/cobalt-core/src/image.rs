//! Executable image inspection.
//!
//! Reads the header of the program about to be launched to learn its
//! machine type, pointer width and entry point before the first debug event
//! arrives. Works on any object format the `object` crate understands,
//! though only PE images can actually be debugged.

use std::fs;
use std::path::{Path, PathBuf};

use object::Object;
use tracing::debug;

use crate::error::{DebuggerError, Result};
use crate::types::{Address, Architecture, WordSize};

/// Header facts about an executable image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo
{
    pub path: PathBuf,
    pub architecture: Architecture,
    pub word: WordSize,
    /// Entry point as recorded in the header
    pub entry: Address,
}

/// Read and parse the image at `path`.
///
/// ## Errors
///
/// - `Io`: the file cannot be read
/// - `InvalidArgument`: the file is not a recognised object file
pub fn inspect_image(path: &Path) -> Result<ImageInfo>
{
    let data = fs::read(path)?;
    let info = parse_image(path, &data)?;
    debug!(
        path = %info.path.display(),
        arch = %info.architecture,
        entry = %info.entry,
        "inspected image"
    );
    Ok(info)
}

/// Parse an in-memory image.
///
/// ## Errors
///
/// - `InvalidArgument`: `data` is not a recognised object file
pub fn parse_image(path: &Path, data: &[u8]) -> Result<ImageInfo>
{
    let file = object::File::parse(data)
        .map_err(|err| DebuggerError::InvalidArgument(format!("failed to parse {}: {err}", path.display())))?;

    let architecture = match file.architecture() {
        object::Architecture::I386 => Architecture::X86,
        object::Architecture::X86_64 => Architecture::X86_64,
        object::Architecture::Aarch64 => Architecture::Arm64,
        _ => Architecture::Unknown("unrecognised machine"),
    };
    let word = if file.is_64() { WordSize::Bits64 } else { WordSize::Bits32 };

    Ok(ImageInfo {
        path: path.to_path_buf(),
        architecture,
        word,
        entry: Address::from(file.entry()),
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_garbage_is_rejected()
    {
        let err = parse_image(Path::new("junk.exe"), b"definitely not an image").unwrap_err();
        assert!(matches!(err, DebuggerError::InvalidArgument(ref msg) if msg.contains("junk.exe")));
    }

    #[test]
    fn test_missing_file_is_io_error()
    {
        let err = inspect_image(Path::new("/nonexistent/cobalt/target.exe")).unwrap_err();
        assert!(matches!(err, DebuggerError::Io(_)));
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
    #[test]
    fn test_current_executable()
    {
        let exe = std::env::current_exe().unwrap();
        let info = inspect_image(&exe).unwrap();
        assert_eq!(info.architecture, Architecture::native());
        assert_eq!(info.word, WordSize::native());
    }
}
