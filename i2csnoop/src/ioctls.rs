// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Decoding of the I2C character device ioctls.
//!
//! Everything here is a pure function of the request code and whatever
//! bytes are readable in the tracee at the moment of the call: nothing
//! read at the entry stop is trusted again at the exit stop, because the
//! tracee owns that memory and may have rewritten it in between.

use std::io;

use anyhow::Result;
use i2csnoop_common::{
    kernel_types::{I2cMsg, I2cRdwrIoctlData, I2cSmbusIoctlData, I2C_SMBUS_DATA_SIZE},
    I2C_FUNCS, I2C_PEC, I2C_RDWR, I2C_RDWR_IOCTL_MAX_MSGS, I2C_RETRIES, I2C_SLAVE,
    I2C_SLAVE_FORCE, I2C_SMBUS, I2C_SMBUS_BLOCK_PROC_CALL, I2C_SMBUS_BYTE, I2C_SMBUS_BYTE_DATA,
    I2C_SMBUS_PROC_CALL, I2C_SMBUS_QUICK, I2C_SMBUS_READ, I2C_SMBUS_WORD_DATA, I2C_SMBUS_WRITE,
    I2C_TENBIT, I2C_TIMEOUT,
};

use crate::{
    arg, argf,
    format_helpers::{
        format_addr, format_hex_bytes, format_i2c_funcs, format_i2c_msg_flags,
        format_smbus_direction, format_smbus_size,
    },
    formatting::IoctlFormatter,
    memory::{read_struct, MemRead},
    raw, with_array, with_struct,
};

/// What the dispatch layer should do after an entry-stop invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoctlDecision {
    /// Unknown request; the caller falls back to the default rendering.
    NotDecoded,
    /// Entry rendered; invoke the decoder again at the exit stop.
    DecodedOnEntry,
    /// Nothing further to render at exit.
    FullyDecoded,
}

pub async fn decode_entry(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    request: u64,
    arg: u64,
) -> Result<IoctlDecision> {
    match request {
        // Numeric arguments; I2C_TIMEOUT is in units of 10ms.
        I2C_RETRIES | I2C_TIMEOUT => {
            argf!(sf, "arg: {}", arg as i64);
            Ok(IoctlDecision::FullyDecoded)
        }

        // Booleans (0 as false, anything else as true).
        I2C_PEC | I2C_TENBIT => {
            argf!(sf, "arg: {}", arg as i64);
            Ok(IoctlDecision::FullyDecoded)
        }

        // Target addresses.
        I2C_SLAVE | I2C_SLAVE_FORCE => {
            argf!(sf, "arg: 0x{:x}", arg);
            Ok(IoctlDecision::FullyDecoded)
        }

        // The capability mask only exists once the call returns.
        I2C_FUNCS => Ok(IoctlDecision::DecodedOnEntry),

        I2C_RDWR => rdwr_entry(mem, sf, arg).await,
        I2C_SMBUS => smbus_entry(mem, sf, arg).await,

        _ => Ok(IoctlDecision::NotDecoded),
    }
}

/// Exit-stop half of the protocol; only invoked for calls the entry half
/// reported as [`IoctlDecision::DecodedOnEntry`].
pub async fn decode_exit(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    request: u64,
    arg: u64,
    failed: bool,
) -> Result<()> {
    match request {
        I2C_FUNCS => funcs_exit(mem, sf, arg).await,
        I2C_RDWR => rdwr_exit(mem, sf, arg, failed).await,
        I2C_SMBUS => smbus_exit(mem, sf, arg, failed).await,
        _ => Ok(()),
    }
}

async fn funcs_exit(mem: &dyn MemRead, sf: &mut IoctlFormatter<'_>, arg: u64) -> Result<()> {
    match read_struct::<u64>(mem, arg) {
        Ok(funcs) => argf!(sf, "funcs: {}", format_i2c_funcs(funcs)),
        Err(_) => argf!(sf, "funcs: {}", format_addr(arg)),
    }
    Ok(())
}

fn format_i2c_msg(mem: &dyn MemRead, msg: &I2cMsg) -> String {
    let buf = match mem.read_bytes(msg.buf, usize::from(msg.len)) {
        Ok(bytes) => format_hex_bytes(&bytes),
        Err(_) => format_addr(msg.buf),
    };

    format!(
        "{{ addr: 0x{:x}, flags: {}, len: {}, buf: {} }}",
        msg.addr,
        format_i2c_msg_flags(msg.flags),
        msg.len,
        buf
    )
}

/// Walk the descriptor array. Each descriptor read and each buffer read
/// fails on its own: an unreadable element renders a placeholder and the
/// walk keeps going.
async fn walk_msgs(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    msgs: u64,
    nmsgs: u32,
) -> Result<()> {
    let walked = nmsgs.min(I2C_RDWR_IOCTL_MAX_MSGS);

    with_array!(sf, {
        for i in 0..u64::from(walked) {
            let addr = msgs.wrapping_add(i.wrapping_mul(std::mem::size_of::<I2cMsg>() as u64));
            let rendered = match read_struct::<I2cMsg>(mem, addr) {
                Ok(msg) => format_i2c_msg(mem, &msg),
                Err(_) => format_addr(addr),
            };
            arg!(sf, rendered);
        }
        if nmsgs > walked {
            // The kernel refuses batches this large; don't chase a
            // garbage count through the tracee.
            arg!(sf, "...");
        }
    });

    Ok(())
}

async fn rdwr_entry(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    arg: u64,
) -> Result<IoctlDecision> {
    let rwd: I2cRdwrIoctlData = match read_struct(mem, arg) {
        Ok(rwd) => rwd,
        Err(_) => {
            argf!(sf, "arg: {}", format_addr(arg));
            return Ok(IoctlDecision::FullyDecoded);
        }
    };

    arg!(sf, "arg:");
    sf.push_depth(b"{").await?;
    argf!(sf, "nmsgs: {}", rwd.nmsgs);
    arg!(sf, "msgs:");
    walk_msgs(mem, sf, rwd.msgs, rwd.nmsgs).await?;

    // The outer struct stays open: read-direction buffers only hold
    // their real contents once the call returns, so the exit stop
    // renders the whole array again.
    Ok(IoctlDecision::DecodedOnEntry)
}

async fn rdwr_exit(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    arg: u64,
    failed: bool,
) -> Result<()> {
    if failed {
        sf.pop_depth(b"}").await?;
        return Ok(());
    }

    sf.value_changed().await?;
    match read_struct::<I2cRdwrIoctlData>(mem, arg) {
        Ok(rwd) => walk_msgs(mem, sf, rwd.msgs, rwd.nmsgs).await?,
        Err(_) => raw!(sf, format!(" {}", format_addr(arg))),
    }
    sf.pop_depth(b"}").await?;

    Ok(())
}

/// For QUICK actions and single-byte writes the data field is ignored;
/// only the command byte goes on the wire.
fn smbus_data_matters(sd: &I2cSmbusIoctlData) -> bool {
    !(sd.size == I2C_SMBUS_QUICK
        || (sd.size == I2C_SMBUS_BYTE && sd.read_write == I2C_SMBUS_WRITE))
}

/// The kernel only writes back into the data union on procedure calls
/// and reads.
fn smbus_data_mutated(sd: &I2cSmbusIoctlData) -> bool {
    sd.size == I2C_SMBUS_PROC_CALL
        || sd.size == I2C_SMBUS_BLOCK_PROC_CALL
        || sd.read_write == I2C_SMBUS_READ
}

/// The one live interpretation of `union i2c_smbus_data`, constructed
/// only after the size class is known.
enum SmbusData {
    Byte(u8),
    Word(u16),
    Block([u8; I2C_SMBUS_DATA_SIZE]),
}

fn read_smbus_data(mem: &dyn MemRead, addr: u64, size: u32) -> io::Result<SmbusData> {
    let bytes = mem.read_bytes(addr, I2C_SMBUS_DATA_SIZE)?;

    Ok(match size {
        I2C_SMBUS_BYTE | I2C_SMBUS_BYTE_DATA => SmbusData::Byte(bytes[0]),
        I2C_SMBUS_WORD_DATA | I2C_SMBUS_PROC_CALL => {
            SmbusData::Word(u16::from_ne_bytes([bytes[0], bytes[1]]))
        }
        _ => {
            let mut block = [0u8; I2C_SMBUS_DATA_SIZE];
            block.copy_from_slice(&bytes);
            SmbusData::Block(block)
        }
    })
}

async fn render_smbus_data(sf: &mut IoctlFormatter<'_>, data: &SmbusData) -> Result<()> {
    with_struct!(sf, {
        match data {
            SmbusData::Byte(byte) => argf!(sf, "byte: 0x{:x}", byte),
            SmbusData::Word(word) => argf!(sf, "word: 0x{:x}", word),
            SmbusData::Block(block) => argf!(sf, "block: {}", format_hex_bytes(block)),
        }
    });
    Ok(())
}

async fn smbus_entry(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    arg: u64,
) -> Result<IoctlDecision> {
    let sd: I2cSmbusIoctlData = match read_struct(mem, arg) {
        Ok(sd) => sd,
        Err(_) => {
            argf!(sf, "arg: {}", format_addr(arg));
            return Ok(IoctlDecision::FullyDecoded);
        }
    };

    arg!(sf, "arg:");
    sf.push_depth(b"{").await?;
    argf!(sf, "read_write: {}", format_smbus_direction(sd.read_write));
    argf!(sf, "command: 0x{:x}", sd.command);
    argf!(sf, "size: {}", format_smbus_size(sd.size));

    if !smbus_data_matters(&sd) {
        // Defined-absent, as opposed to unreadable.
        arg!(sf, "data: ...");
        sf.pop_depth(b"}").await?;
        return Ok(IoctlDecision::FullyDecoded);
    }

    match read_smbus_data(mem, sd.data, sd.size) {
        Ok(data) => {
            arg!(sf, "data:");
            render_smbus_data(sf, &data).await?;
        }
        Err(_) => {
            argf!(sf, "data: {}", format_addr(sd.data));
            sf.pop_depth(b"}").await?;
            return Ok(IoctlDecision::FullyDecoded);
        }
    }

    Ok(IoctlDecision::DecodedOnEntry)
}

async fn smbus_exit(
    mem: &dyn MemRead,
    sf: &mut IoctlFormatter<'_>,
    arg: u64,
    failed: bool,
) -> Result<()> {
    if !failed {
        // Both predicates are re-derived from a fresh header read.
        if let Ok(sd) = read_struct::<I2cSmbusIoctlData>(mem, arg) {
            if smbus_data_mutated(&sd) {
                if let Ok(data) = read_smbus_data(mem, sd.data, sd.size) {
                    sf.value_changed().await?;
                    render_smbus_data(sf, &data).await?;
                }
            }
        }
    }
    sf.pop_depth(b"}").await?;

    Ok(())
}
