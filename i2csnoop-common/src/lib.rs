// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

#![no_std]

pub mod kernel_types;

// Request codes from <linux/i2c-dev.h>.
pub const I2C_RETRIES: u64 = 0x0701;
pub const I2C_TIMEOUT: u64 = 0x0702;
pub const I2C_SLAVE: u64 = 0x0703;
pub const I2C_TENBIT: u64 = 0x0704;
pub const I2C_FUNCS: u64 = 0x0705;
pub const I2C_SLAVE_FORCE: u64 = 0x0706;
pub const I2C_RDWR: u64 = 0x0707;
pub const I2C_PEC: u64 = 0x0708;
pub const I2C_SMBUS: u64 = 0x0720;

/// The kernel rejects I2C_RDWR batches larger than this, so the decoder
/// never walks past it either.
pub const I2C_RDWR_IOCTL_MAX_MSGS: u32 = 42;

pub fn ioctl_name_from_request(request: u64) -> Option<&'static str> {
    Some(match request {
        I2C_RETRIES => "I2C_RETRIES",
        I2C_TIMEOUT => "I2C_TIMEOUT",
        I2C_SLAVE => "I2C_SLAVE",
        I2C_TENBIT => "I2C_TENBIT",
        I2C_FUNCS => "I2C_FUNCS",
        I2C_SLAVE_FORCE => "I2C_SLAVE_FORCE",
        I2C_RDWR => "I2C_RDWR",
        I2C_PEC => "I2C_PEC",
        I2C_SMBUS => "I2C_SMBUS",
        _ => return None,
    })
}

// SMBus transfer direction, from <linux/i2c.h>.
pub const I2C_SMBUS_WRITE: u8 = 0;
pub const I2C_SMBUS_READ: u8 = 1;

pub fn smbus_direction_name(read_write: u8) -> Option<&'static str> {
    Some(match read_write {
        I2C_SMBUS_WRITE => "I2C_SMBUS_WRITE",
        I2C_SMBUS_READ => "I2C_SMBUS_READ",
        _ => return None,
    })
}

// SMBus transfer size classes.
pub const I2C_SMBUS_QUICK: u32 = 0;
pub const I2C_SMBUS_BYTE: u32 = 1;
pub const I2C_SMBUS_BYTE_DATA: u32 = 2;
pub const I2C_SMBUS_WORD_DATA: u32 = 3;
pub const I2C_SMBUS_PROC_CALL: u32 = 4;
pub const I2C_SMBUS_BLOCK_DATA: u32 = 5;
pub const I2C_SMBUS_I2C_BLOCK_BROKEN: u32 = 6;
pub const I2C_SMBUS_BLOCK_PROC_CALL: u32 = 7;
pub const I2C_SMBUS_I2C_BLOCK_DATA: u32 = 8;

pub fn smbus_size_name(size: u32) -> Option<&'static str> {
    Some(match size {
        I2C_SMBUS_QUICK => "I2C_SMBUS_QUICK",
        I2C_SMBUS_BYTE => "I2C_SMBUS_BYTE",
        I2C_SMBUS_BYTE_DATA => "I2C_SMBUS_BYTE_DATA",
        I2C_SMBUS_WORD_DATA => "I2C_SMBUS_WORD_DATA",
        I2C_SMBUS_PROC_CALL => "I2C_SMBUS_PROC_CALL",
        I2C_SMBUS_BLOCK_DATA => "I2C_SMBUS_BLOCK_DATA",
        I2C_SMBUS_I2C_BLOCK_BROKEN => "I2C_SMBUS_I2C_BLOCK_BROKEN",
        I2C_SMBUS_BLOCK_PROC_CALL => "I2C_SMBUS_BLOCK_PROC_CALL",
        I2C_SMBUS_I2C_BLOCK_DATA => "I2C_SMBUS_I2C_BLOCK_DATA",
        _ => return None,
    })
}

/// Adapter capability bits reported by I2C_FUNCS, from <linux/i2c.h>.
pub const I2C_FUNC_FLAGS: &[(u64, &str)] = &[
    (0x0000_0001, "I2C_FUNC_I2C"),
    (0x0000_0002, "I2C_FUNC_10BIT_ADDR"),
    (0x0000_0004, "I2C_FUNC_PROTOCOL_MANGLING"),
    (0x0000_0008, "I2C_FUNC_SMBUS_PEC"),
    (0x0000_0010, "I2C_FUNC_NOSTART"),
    (0x0000_0020, "I2C_FUNC_SLAVE"),
    (0x0000_8000, "I2C_FUNC_SMBUS_BLOCK_PROC_CALL"),
    (0x0001_0000, "I2C_FUNC_SMBUS_QUICK"),
    (0x0002_0000, "I2C_FUNC_SMBUS_READ_BYTE"),
    (0x0004_0000, "I2C_FUNC_SMBUS_WRITE_BYTE"),
    (0x0008_0000, "I2C_FUNC_SMBUS_READ_BYTE_DATA"),
    (0x0010_0000, "I2C_FUNC_SMBUS_WRITE_BYTE_DATA"),
    (0x0020_0000, "I2C_FUNC_SMBUS_READ_WORD_DATA"),
    (0x0040_0000, "I2C_FUNC_SMBUS_WRITE_WORD_DATA"),
    (0x0080_0000, "I2C_FUNC_SMBUS_PROC_CALL"),
    (0x0100_0000, "I2C_FUNC_SMBUS_READ_BLOCK_DATA"),
    (0x0200_0000, "I2C_FUNC_SMBUS_WRITE_BLOCK_DATA"),
    (0x0400_0000, "I2C_FUNC_SMBUS_READ_I2C_BLOCK"),
    (0x0800_0000, "I2C_FUNC_SMBUS_WRITE_I2C_BLOCK"),
    (0x1000_0000, "I2C_FUNC_SMBUS_HOST_NOTIFY"),
];

/// Per-message flags for I2C_RDWR descriptors.
pub const I2C_MSG_FLAGS: &[(u64, &str)] = &[
    (0x0001, "I2C_M_RD"),
    (0x0010, "I2C_M_TEN"),
    (0x0200, "I2C_M_DMA_SAFE"),
    (0x0400, "I2C_M_RECV_LEN"),
    (0x0800, "I2C_M_NO_RD_ACK"),
    (0x1000, "I2C_M_IGNORE_NAK"),
    (0x2000, "I2C_M_REV_DIR_ADDR"),
    (0x4000, "I2C_M_NOSTART"),
    (0x8000, "I2C_M_STOP"),
];
