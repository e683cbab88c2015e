// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>


use std::{cell::RefCell, io};

use indoc::indoc;

use crate::{
    formatting::FormattingStyle,
    memory::MemRead,
    tracing::{ioctl_entry, ioctl_exit},
};

/// Fake tracee address space: a handful of mapped regions. Reads are
/// logged so tests can assert on what actually got dereferenced.
pub struct TestMem {
    regions: Vec<(u64, Vec<u8>)>,
    reads: RefCell<Vec<(u64, usize)>>,
}

impl TestMem {
    pub fn new() -> Self {
        TestMem {
            regions: Vec::new(),
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn with(mut self, addr: u64, bytes: Vec<u8>) -> Self {
        self.regions.push((addr, bytes));
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.borrow().len()
    }
}

impl MemRead for TestMem {
    fn read_bytes(&self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        self.reads.borrow_mut().push((addr, len));

        if len == 0 {
            return Ok(Vec::new());
        }

        for (base, bytes) in &self.regions {
            let Some(offset) = addr.checked_sub(*base) else {
                continue;
            };
            let offset = offset as usize;
            if offset.checked_add(len).is_some_and(|end| end <= bytes.len()) {
                return Ok(bytes[offset..offset + len].to_vec());
            }
        }

        Err(io::Error::other(format!("no mapping at 0x{addr:x}")))
    }
}

pub const TEST_TID: u32 = 1234;
pub const TEST_FD: i32 = 3;

/// Drive both halves of the rendering the way the ptrace loop does,
/// against the same fake memory, and hand back the finished line.
pub async fn trace_ioctl(mem: &TestMem, request: u64, arg: u64, return_value: i64) -> String {
    trace_ioctl_phases(mem, mem, FormattingStyle::OneLine, request, arg, return_value).await
}

/// Same, but with distinct entry- and exit-phase address spaces, for
/// cases where the tracee's memory changes while the call is in flight.
pub async fn trace_ioctl_phases(
    entry_mem: &TestMem,
    exit_mem: &TestMem,
    style: FormattingStyle,
    request: u64,
    arg: u64,
    return_value: i64,
) -> String {
    let parked = ioctl_entry(entry_mem, style, TEST_TID, TEST_FD, request, arg)
        .await
        .unwrap();
    let line = ioctl_exit(parked, exit_mem, style, return_value, return_value < 0)
        .await
        .unwrap();
    String::from_utf8(line).unwrap()
}

// Encoders for the kernel ABI shapes, field order and padding as laid
// out by <linux/i2c-dev.h> on LP64.

pub fn rdwr_header(msgs: u64, nmsgs: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&msgs.to_ne_bytes());
    out.extend_from_slice(&nmsgs.to_ne_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out
}

pub fn i2c_msg(addr: u16, flags: u16, len: u16, buf: u64) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&addr.to_ne_bytes());
    out.extend_from_slice(&flags.to_ne_bytes());
    out.extend_from_slice(&len.to_ne_bytes());
    out.extend_from_slice(&[0u8; 2]);
    out.extend_from_slice(&buf.to_ne_bytes());
    out
}

pub fn smbus_header(read_write: u8, command: u8, size: u32, data: u64) -> Vec<u8> {
    let mut out = vec![read_write, command, 0, 0];
    out.extend_from_slice(&size.to_ne_bytes());
    out.extend_from_slice(&data.to_ne_bytes());
    out
}

pub fn smbus_data(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.resize(i2csnoop_common::kernel_types::I2C_SMBUS_DATA_SIZE, 0);
    out
}

#[tokio::test]
async fn multi_line_rendering() {
    let mem = TestMem::new().with(
        0x1000,
        smbus_header(i2csnoop_common::I2C_SMBUS_WRITE, 0x0, i2csnoop_common::I2C_SMBUS_QUICK, 0),
    );

    let line = trace_ioctl_phases(
        &mem,
        &mem,
        FormattingStyle::MultiLine,
        i2csnoop_common::I2C_SMBUS,
        0x1000,
        0,
    )
    .await;

    assert_eq!(
        line,
        indoc! {"
            1234
            \tioctl(
            \t    fd: 3,
            \t    request: I2C_SMBUS,
            \t    arg: {
            \t        read_write: I2C_SMBUS_WRITE,
            \t        command: 0x0,
            \t        size: I2C_SMBUS_QUICK,
            \t        data: ...
            \t    }
            \t) = 0
        "}
    );
}
