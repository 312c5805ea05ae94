//! Task runner for the two workspaces: `host` builds on the development machine,
//! `cross` builds for the RP2040.
use std::{env, path::PathBuf};

use anyhow::{Context, Error};
use xshell::cmd;

type Result<T> = std::result::Result<T, Error>;

const HOST_PACKAGE: &str = "co2_monitor";
const FIRMWARE_PACKAGE: &str = "app";
const SELF_TESTS_PACKAGE: &str = "self_tests";

fn main() -> Result<()> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(|s| &**s).collect::<Vec<_>>();

    let result = match &args[..] {
        ["run"] | ["flash"] => run(),
        ["build"] => build_all(),
        ["build", "host"] => build_host(),
        ["build", "target"] => build_target(),
        ["test"] => test_all(),
        ["test", "host"] => test_host(),
        ["test", "target"] => test_target(),
        ["lint"] => lint(),
        [rest @ .., "host"] => subcommand_host(rest),
        [rest @ .., "target"] => subcommand_target(rest),
        [] => Err(Error::msg("missing command")),
        _ => subcommand_all(&args),
    };

    result.with_context(|| format!("`cargo xtask {}` failed", args.join(" ")))
}

/// Flashes the firmware and streams its defmt logs.
fn run() -> Result<()> {
    let _p = xshell::pushd(root_dir().join("cross"))?;
    cmd!("cargo run --release --package {FIRMWARE_PACKAGE}").run()?;
    Ok(())
}

fn build_all() -> Result<()> {
    build_host()?;
    build_target()?;
    Ok(())
}

fn build_host() -> Result<()> {
    let _p = xshell::pushd(root_dir())?;
    println!("building host...");
    cmd!("cargo build --package {HOST_PACKAGE}").run()?;
    // The firmware builds the library with defmt logging.
    cmd!("cargo build --package {HOST_PACKAGE} --features defmt").run()?;
    Ok(())
}

fn build_target() -> Result<()> {
    let _p = xshell::pushd(root_dir().join("cross"))?;
    println!("building target...");
    cmd!("cargo build --release --package {FIRMWARE_PACKAGE}").run()?;
    Ok(())
}

fn test_all() -> Result<()> {
    test_host()?;
    test_target()?;
    Ok(())
}

fn test_host() -> Result<()> {
    let _p = xshell::pushd(root_dir())?;
    println!("testing host...");
    cmd!("cargo test --package {HOST_PACKAGE}").run()?;
    Ok(())
}

/// Runs the self tests on a connected board.
fn test_target() -> Result<()> {
    let _p = xshell::pushd(root_dir().join("cross"))?;
    println!("testing target...");
    cmd!("cargo test --package {SELF_TESTS_PACKAGE}").run()?;
    Ok(())
}

fn lint() -> Result<()> {
    {
        let _p = xshell::pushd(root_dir())?;
        println!("linting host...");
        cmd!("cargo clippy --all-targets -- -D warnings").run()?;
    }

    let _p = xshell::pushd(root_dir().join("cross"))?;
    println!("linting target...");
    cmd!("cargo clippy --package {FIRMWARE_PACKAGE} -- -D warnings").run()?;
    Ok(())
}

fn subcommand_all(args: &[&str]) -> Result<()> {
    subcommand_host(args)?;
    subcommand_target(args)?;
    Ok(())
}

fn subcommand_host(args: &[&str]) -> Result<()> {
    let _p = xshell::pushd(root_dir())?;
    cmd!("cargo {args...}").run()?;
    Ok(())
}

fn subcommand_target(args: &[&str]) -> Result<()> {
    let _p = xshell::pushd(root_dir().join("cross"))?;
    cmd!("cargo {args...}").run()?;
    Ok(())
}

fn root_dir() -> PathBuf {
    let mut xtask_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    xtask_dir.pop();
    xtask_dir
}
