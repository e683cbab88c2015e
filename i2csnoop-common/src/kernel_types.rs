// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Kernel ABI structures for the I2C character device interface,
//! matching <linux/i2c.h> and <linux/i2c-dev.h> on 64-bit targets.

/// Largest SMBus block transfer payload.
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

/// Size of `union i2c_smbus_data`: a full block plus the length prefix
/// and one spare byte for PEC.
pub const I2C_SMBUS_DATA_SIZE: usize = I2C_SMBUS_BLOCK_MAX + 2;

/// One transfer descriptor of an I2C_RDWR batch, matching struct i2c_msg.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct I2cMsg {
    pub addr: u16,
    pub flags: u16,
    pub len: u16,
    pub buf: u64, // tracee pointer to exactly `len` bytes
}

/// Header of an I2C_RDWR batch, matching struct i2c_rdwr_ioctl_data.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct I2cRdwrIoctlData {
    pub msgs: u64, // tracee pointer to `nmsgs` descriptors
    pub nmsgs: u32,
}

/// Header of an I2C_SMBUS transfer, matching struct i2c_smbus_ioctl_data.
/// `data` points at the 34-byte `union i2c_smbus_data`; which member of
/// that union is live depends on `size`, so the union is never mirrored
/// here as a Rust type.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct I2cSmbusIoctlData {
    pub read_write: u8,
    pub command: u8,
    pub size: u32,
    pub data: u64,
}
