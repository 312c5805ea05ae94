//! Links the on-target tests against the application's memory layout.

use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    let out = PathBuf::from(env::var_os("OUT_DIR").context("missing OUT_DIR")?);
    File::create(out.join("memory.x"))
        .context("failed to create memory.x")?
        .write_all(include_bytes!("../app/memory.x"))
        .context("failed to write memory.x")?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=../app/memory.x");

    println!("cargo:rustc-link-arg-tests=--nmagic");
    println!("cargo:rustc-link-arg-tests=-Tlink.x");
    println!("cargo:rustc-link-arg-tests=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-tests=-Tdefmt.x");

    Ok(())
}
