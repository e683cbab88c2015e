// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::ffi::OsString;

use anyhow::Result;
use clap::{CommandFactory as _, Parser};
use nix::unistd::Pid;

use crate::{formatting::FormattingStyle, tracing::Tracer};

mod format_helpers;
mod formatting;
mod ioctls;
mod memory;
mod tracing;

#[cfg(test)]
mod tests;

/// Trace the I2C/SMBus ioctls of a process, strace-style.
#[derive(Parser, Debug)]
#[command(author, version, about, trailing_var_arg = true)]
struct Args {
    /// Formatting style, `one-line` or `multi-line`
    #[arg(long = "format", value_enum, default_value_t = FormattingStyle::default())]
    style: FormattingStyle,

    /// Only print ioctls that decode as I2C requests
    #[arg(long = "i2c-only")]
    i2c_only: bool,

    /// PID to trace
    #[arg(short = 'p', long = "pid", conflicts_with = "command")]
    pid: Option<i32>,

    /// Command to run and its arguments
    #[arg(conflicts_with = "pid")]
    command: Option<Vec<OsString>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let tracer = Tracer::new(args.style, args.i2c_only);

    if let Some(command) = args.command.filter(|command| !command.is_empty()) {
        let child = tracing::spawn_traced(&command)?;
        tracer.run(child).await?;
    } else if let Some(pid) = args.pid {
        let pid = Pid::from_raw(pid);
        tracing::attach(pid)?;
        tracer.run(pid).await?;
    } else {
        // Print clap's usage message and exit
        Args::command().print_help().expect("Failed to print usage");
        println!();
        std::process::exit(2);
    };

    Ok(())
}
