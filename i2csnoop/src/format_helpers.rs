// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::fmt::Write as _;

use i2csnoop_common::{
    ioctl_name_from_request, smbus_direction_name, smbus_size_name, I2C_FUNC_FLAGS, I2C_MSG_FLAGS,
};

/// Renders a bitmask against a vocabulary of named bits, e.g.
/// `0x11 (I2C_M_RD|I2C_M_TEN)`. Bits outside the vocabulary keep the
/// output informative instead of failing: they show up as a trailing
/// `???` entry, with the literal value already part of the rendering.
pub fn format_flag_set(value: u64, known: &[(u64, &str)], unknown: &str) -> String {
    if value == 0 {
        return "0x0".to_string();
    }

    let mut parts = vec![];
    let mut rest = value;
    for &(bit, name) in known {
        if value & bit != 0 {
            parts.push(name);
            rest &= !bit;
        }
    }
    if rest != 0 {
        parts.push(unknown);
    }

    format!("0x{value:x} ({})", parts.join("|"))
}

pub fn format_i2c_funcs(funcs: u64) -> String {
    format_flag_set(funcs, I2C_FUNC_FLAGS, "I2C_FUNC_???")
}

pub fn format_i2c_msg_flags(flags: u16) -> String {
    format_flag_set(u64::from(flags), I2C_MSG_FLAGS, "I2C_M_???")
}

pub fn format_ioctl_request(request: u64) -> String {
    match ioctl_name_from_request(request) {
        Some(name) => name.to_string(),
        None => format!("0x{request:x}"),
    }
}

pub fn format_smbus_direction(read_write: u8) -> String {
    match smbus_direction_name(read_write) {
        Some(name) => name.to_string(),
        None => format!("0x{read_write:x} (I2C_SMBUS_???)"),
    }
}

pub fn format_smbus_size(size: u32) -> String {
    match smbus_size_name(size) {
        Some(name) => name.to_string(),
        None => format!("0x{size:x} (I2C_SMBUS_???)"),
    }
}

/// Force-hex quoted rendering for payload bytes. Buffer contents are
/// arbitrary bus traffic, so they are never printed as text.
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4 + 2);
    out.push('"');
    for b in bytes {
        let _ = write!(out, "\\x{b:02x}");
    }
    out.push('"');
    out
}

/// Placeholder for a pointer that could not be dereferenced in the
/// tracee. Distinct from the `...` marker used for fields that are
/// defined not to apply.
pub fn format_addr(addr: u64) -> String {
    if addr == 0 {
        "NULL".to_string()
    } else {
        format!("0x{addr:x} (unreadable)")
    }
}

pub fn format_return_value(return_value: i64) -> String {
    if return_value < 0 {
        format!("-1 ({:?})", nix::errno::Errno::from_raw((-return_value) as i32))
    } else {
        return_value.to_string()
    }
}
