// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::io::{self, IoSliceMut};

use nix::{
    sys::uio::{process_vm_readv, RemoteIoVec},
    unistd::Pid,
};

/// Read-only view of another process's address space. Every read is
/// independently fallible; a failure never means anything more than
/// "this pointer was not readable at this moment".
pub trait MemRead {
    /// Read exactly `len` bytes at `addr` in the traced process.
    fn read_bytes(&self, addr: u64, len: usize) -> io::Result<Vec<u8>>;
}

/// Read a `#[repr(C)]` value out of the traced process.
pub fn read_struct<T: Copy>(mem: &dyn MemRead, addr: u64) -> io::Result<T> {
    let bytes = mem.read_bytes(addr, std::mem::size_of::<T>())?;

    // SAFETY: the buffer holds exactly size_of::<T>() bytes, and T is a
    // plain value type valid for any bit pattern.
    Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

pub struct TracedProcess {
    pid: Pid,
}

impl TracedProcess {
    pub fn new(pid: Pid) -> Self {
        TracedProcess { pid }
    }
}

impl MemRead for TracedProcess {
    fn read_bytes(&self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; len];
        let read = process_vm_readv(
            self.pid,
            &mut [IoSliceMut::new(&mut buf)],
            &[RemoteIoVec {
                base: addr as usize,
                len,
            }],
        )
        .map_err(io::Error::from)?;

        // A read that crosses into an unmapped page comes back short;
        // the caller asked for a specific shape, so treat it the same
        // as an unreadable pointer.
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read from {}: {read} of {len} bytes", self.pid),
            ));
        }

        Ok(buf)
    }
}
