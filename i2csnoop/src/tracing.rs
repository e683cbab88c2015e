// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! The ptrace engine: attaches to (or spawns) the tracee, stops it at
//! every syscall boundary, and drives the two-phase ioctl rendering.

use std::{
    collections::HashMap,
    ffi::{c_void, CString, OsString},
    mem::MaybeUninit,
    os::unix::ffi::OsStrExt as _,
    pin::Pin,
};

use anyhow::{bail, Context as _, Result};
use libc::{
    ptrace_syscall_info, PTRACE_GET_SYSCALL_INFO, PTRACE_SYSCALL_INFO_ENTRY,
    PTRACE_SYSCALL_INFO_EXIT,
};
use log::{debug, trace, warn};
use nix::{
    sys::{
        ptrace,
        wait::{waitpid, WaitStatus},
    },
    unistd::{execvp, fork, ForkResult, Pid},
};
use tokio::io::{AsyncWriteExt as _, BufWriter, Stdout};

use crate::{
    argf,
    format_helpers::format_ioctl_request,
    formatting::{Formatter, FormattingStyle},
    ioctls::{self, IoctlDecision},
    memory::{MemRead, TracedProcess},
};

/// Rendering state carried from a syscall's entry stop to its exit stop.
/// Note that no decoded *values* are carried across: the exit half
/// re-reads everything it renders.
pub struct PendingIoctl {
    pub(crate) output: Vec<u8>,
    pub(crate) args: Vec<usize>,
    pub(crate) decision: IoctlDecision,
    pub(crate) request: u64,
    pub(crate) arg: u64,
}

/// Render the entry half of an ioctl and park the partial line.
pub async fn ioctl_entry(
    mem: &dyn MemRead,
    style: FormattingStyle,
    tid: u32,
    fd: i32,
    request: u64,
    arg: u64,
) -> Result<PendingIoctl> {
    let mut output = Vec::new();

    let pinned = Pin::new(&mut output);
    let mut sf = Formatter::new(pinned, style)
        .push_ioctl(tid)
        .await?;
    argf!(sf, "fd: {}", fd);
    argf!(sf, "request: {}", format_ioctl_request(request));

    let decision = ioctls::decode_entry(mem, &mut sf, request, arg).await?;
    if decision == IoctlDecision::NotDecoded {
        argf!(sf, "arg: 0x{:x}", arg);
    }

    let args = sf.suspend();

    Ok(PendingIoctl {
        output,
        args,
        decision,
        request,
        arg,
    })
}

/// Render the exit half onto the parked line and hand it back finished.
pub async fn ioctl_exit(
    pending: PendingIoctl,
    mem: &dyn MemRead,
    style: FormattingStyle,
    return_value: i64,
    failed: bool,
) -> Result<Vec<u8>> {
    let PendingIoctl {
        mut output,
        args,
        decision,
        request,
        arg,
    } = pending;

    let pinned = Pin::new(&mut output);
    let mut sf = Formatter::resume(pinned, style, args);
    if decision == IoctlDecision::DecodedOnEntry {
        ioctls::decode_exit(mem, &mut sf, request, arg, failed).await?;
    }
    let _ = sf.finish(return_value).await?;

    Ok(output)
}

pub struct Tracer {
    style: FormattingStyle,
    i2c_only: bool,
}

impl Tracer {
    pub fn new(style: FormattingStyle, i2c_only: bool) -> Self {
        Tracer { style, i2c_only }
    }

    /// Run the syscall-stop loop until the tracee goes away.
    pub async fn run(&self, pid: Pid) -> Result<()> {
        let mem = TracedProcess::new(pid);
        let mut pending: HashMap<Pid, PendingIoctl> = HashMap::new();
        let mut stdout = BufWriter::new(tokio::io::stdout());

        ptrace::syscall(pid, None).context("restarting tracee")?;

        loop {
            match waitpid(pid, None)? {
                WaitStatus::PtraceSyscall(tid) => {
                    self.handle_syscall_stop(tid, &mem, &mut pending, &mut stdout)
                        .await?;
                    ptrace::syscall(tid, None)?;
                }
                WaitStatus::Stopped(tid, signal) => {
                    // Not ours; deliver the signal and keep going.
                    trace!("delivering {signal} to {tid}");
                    ptrace::syscall(tid, signal)?;
                }
                WaitStatus::Exited(tid, code) => {
                    debug!("{tid} exited with status {code}");
                    break;
                }
                WaitStatus::Signaled(tid, signal, _) => {
                    debug!("{tid} killed by {signal}");
                    break;
                }
                status => trace!("ignoring wait status {status:?}"),
            }
        }

        stdout.flush().await?;

        Ok(())
    }

    async fn handle_syscall_stop(
        &self,
        tid: Pid,
        mem: &TracedProcess,
        pending: &mut HashMap<Pid, PendingIoctl>,
        stdout: &mut BufWriter<Stdout>,
    ) -> Result<()> {
        let info = match syscall_info(tid) {
            Ok(info) => info,
            Err(e) => {
                warn!("could not query syscall stop for {tid}: {e}");
                return Ok(());
            }
        };

        if info.op == PTRACE_SYSCALL_INFO_ENTRY {
            let entry = unsafe { info.u.entry };
            if entry.nr != libc::SYS_ioctl as u64 {
                return Ok(());
            }

            let fd = entry.args[0] as i32;
            let request = entry.args[1];
            let arg = entry.args[2];
            trace!("{tid} entering ioctl, request 0x{request:x}");

            let parked =
                ioctl_entry(mem, self.style, tid.as_raw() as u32, fd, request, arg).await?;
            pending.insert(tid, parked);
        } else if info.op == PTRACE_SYSCALL_INFO_EXIT {
            let Some(parked) = pending.remove(&tid) else {
                return Ok(());
            };

            if self.i2c_only && parked.decision == IoctlDecision::NotDecoded {
                return Ok(());
            }

            let exit = unsafe { info.u.exit };
            let line = ioctl_exit(parked, mem, self.style, exit.sval, exit.is_error != 0).await?;
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }

        Ok(())
    }
}

/// Ask the kernel which side of the syscall we stopped on, and for the
/// arguments or the return value. Goes through libc rather than nix's
/// wrapper so the struct size handshake stays in our hands.
fn syscall_info(pid: Pid) -> Result<ptrace_syscall_info> {
    let mut info = MaybeUninit::<ptrace_syscall_info>::uninit();

    let ret = unsafe {
        libc::ptrace(
            PTRACE_GET_SYSCALL_INFO,
            pid.as_raw(),
            std::mem::size_of::<ptrace_syscall_info>() as *mut c_void,
            info.as_mut_ptr(),
        )
    };
    if ret < 0 {
        bail!(
            "PTRACE_GET_SYSCALL_INFO failed for {pid}: {}",
            std::io::Error::last_os_error()
        );
    }

    Ok(unsafe { info.assume_init() })
}

/// Fork and exec `command` with tracing already requested; the child
/// stops before running any of its own code.
pub fn spawn_traced(command: &[OsString]) -> Result<Pid> {
    let program = CString::new(command[0].as_bytes()).context("program name")?;
    let args: Vec<CString> = command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<_, _>>()
        .context("command arguments")?;

    // SAFETY: the child only calls async-signal-safe functions between
    // fork and exec.
    match unsafe { fork() }.context("fork")? {
        ForkResult::Child => {
            if ptrace::traceme().is_err() {
                std::process::exit(126);
            }
            let _ = execvp(&program, &args);
            std::process::exit(127);
        }
        ForkResult::Parent { child } => {
            init_tracee(child)?;
            Ok(child)
        }
    }
}

/// Attach to an already-running process.
pub fn attach(pid: Pid) -> Result<()> {
    ptrace::attach(pid).with_context(|| format!("attaching to {pid}"))?;
    init_tracee(pid)
}

/// Wait for the initial stop and arm the syscall-stop marker so the
/// wait loop can tell syscall stops from plain signal stops.
fn init_tracee(pid: Pid) -> Result<()> {
    match waitpid(pid, None)? {
        WaitStatus::Stopped(_, _) => {}
        status => bail!("unexpected initial wait status for {pid}: {status:?}"),
    }

    ptrace::setoptions(pid, ptrace::Options::PTRACE_O_TRACESYSGOOD)
        .with_context(|| format!("setting ptrace options on {pid}"))?;

    Ok(())
}
