//! Build script for cobalt-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version (Rust 1.70.0+)
//! - Target platform (the live debugging backend exists only on Windows)
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer
//! - **Windows**: any version with `dbghelp.dll` (ships with the OS)
//! - **Other targets**: the engine builds and its tests run, but
//!   `create_backend()` reports the backend as unsupported

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!("cobalt-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // Some build environments hide rustc; warn instead of failing
        println!("cargo:warning=could not verify Rust version");
    }

    // CARGO_CFG_TARGET_OS describes the target, not the host running this script
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" {
        println!("cargo:warning=cobalt-core: live debugging backend is only built for Windows targets");
    }

    check_target_arch();
}

fn check_target_arch()
{
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // The Windows backend reads CONTEXT records for x86 and x86-64 only
    if target_os == "windows" && target_arch != "x86" && target_arch != "x86_64" {
        println!("cargo:warning=cobalt-core: Windows backend does not support {target_arch} thread contexts");
    }
}
