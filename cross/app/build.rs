//! Copies `memory.x` into the output directory so the linker finds it regardless of
//! where the workspace is built from.

use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    let out = PathBuf::from(env::var_os("OUT_DIR").context("missing OUT_DIR")?);
    File::create(out.join("memory.x"))
        .context("failed to create memory.x")?
        .write_all(include_bytes!("memory.x"))
        .context("failed to write memory.x")?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    Ok(())
}
