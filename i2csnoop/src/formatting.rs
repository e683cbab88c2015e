// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::pin::Pin;

use anyhow::Result;
use clap::ValueEnum;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};

use crate::format_helpers::format_return_value;

/// Push formatted argument to the formatter
#[macro_export]
macro_rules! argf {
    ($sf:expr, $($arg:tt)*) => {
        $sf.push_arg(format!($($arg)*).as_bytes()).await?
    };
}

/// Push argument to the formatter
#[macro_export]
macro_rules! arg {
    ($sf:expr, $arg:expr) => {
        $sf.push_arg($arg.as_bytes()).await?
    };
}

/// Push raw bytes to the formatter
#[macro_export]
macro_rules! raw {
    ($sf:expr, $arg:expr) => {
        $sf.push_raw($arg.as_bytes()).await?
    };
}

/// Create a section with indented content
#[macro_export]
macro_rules! with_struct {
    ($sf:expr, $($body:tt)*) => {
        $sf.push_depth(b"{").await?;
        $($body)*
        $sf.pop_depth(b"}").await?;
    };
}

#[macro_export]
macro_rules! with_array {
    ($sf:expr, $($body:tt)*) => {
        $sf.push_depth(b"[").await?;
        $($body)*
        $sf.pop_depth(b"]").await?;
    };
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum FormattingStyle {
    #[default]
    OneLine,
    MultiLine,
}

pub struct Formatter<'f> {
    style: FormattingStyle,
    output: Pin<&'f mut dyn AsyncWrite>,
}

impl<'f> Formatter<'f> {
    pub fn new(output: Pin<&'f mut dyn AsyncWrite>, style: FormattingStyle) -> Self {
        Formatter { style, output }
    }

    pub async fn push_ioctl(mut self, tid: u32) -> Result<IoctlFormatter<'f>> {
        let output = &mut self.output;

        output.write_all(tid.to_string().as_bytes()).await?;

        match self.style {
            FormattingStyle::OneLine => output.write_all(b" ").await?,
            FormattingStyle::MultiLine => output.write_all(b"\n\t").await?,
        };

        output.write_all(b"ioctl(").await?;

        Ok(IoctlFormatter {
            formatter: self,
            args: vec![0],
        })
    }

    /// Continue rendering a call whose entry half was written earlier:
    /// the argument-count stack captured by [`IoctlFormatter::suspend`]
    /// keeps comma placement and bracket depth consistent across the
    /// entry/exit gap.
    pub fn resume(
        output: Pin<&'f mut dyn AsyncWrite>,
        style: FormattingStyle,
        args: Vec<usize>,
    ) -> IoctlFormatter<'f> {
        IoctlFormatter {
            formatter: Formatter { style, output },
            args,
        }
    }
}

pub struct IoctlFormatter<'f> {
    formatter: Formatter<'f>,
    args: Vec<usize>,
}

const INDENT_STEP: &[u8] = &[b' '; 4];
impl<'f> IoctlFormatter<'f> {
    fn argc(&self) -> usize {
        // We should always have at least one item.
        *self.args.last().unwrap()
    }

    fn inc_argc(&mut self) {
        // We should always have at least one item.
        *self.args.last_mut().unwrap() += 1;
    }

    pub async fn push_depth(&mut self, bracket: &[u8]) -> Result<()> {
        let output = &mut self.formatter.output;

        match self.formatter.style {
            FormattingStyle::OneLine => {
                output.write_all(b" ").await?;
                output.write_all(bracket).await?;
                output.write_all(b" ").await?;
            }
            FormattingStyle::MultiLine => {
                output.write_all(b" ").await?;
                output.write_all(bracket).await?;
            }
        }

        self.args.push(0);

        Ok(())
    }

    pub async fn pop_depth(&mut self, bracket: &[u8]) -> Result<()> {
        assert_ne!(self.get_depth(), 1);

        self.args.pop();

        let depth = self.get_depth();
        let output = &mut self.formatter.output;
        match self.formatter.style {
            FormattingStyle::OneLine => output.write_all(b" ").await?,
            FormattingStyle::MultiLine => {
                output.write_all(b"\n\t").await?;
                for _ in 0..depth {
                    output.write_all(INDENT_STEP).await?;
                }
            }
        }

        output.write_all(bracket).await?;

        Ok(())
    }

    pub fn get_depth(&self) -> usize {
        self.args.len()
    }

    pub async fn push_arg(&mut self, arg: &[u8]) -> Result<()> {
        let argc = self.argc();
        let depth = self.get_depth();

        let output = &mut self.formatter.output;

        // Always add a comma after a previous argument, if any.
        if argc > 0 {
            output.write_all(b",").await?;
        }
        match self.formatter.style {
            FormattingStyle::OneLine => {
                if argc > 0 {
                    output.write_all(b" ").await?;
                }
                output.write_all(arg).await?;
            }
            FormattingStyle::MultiLine => {
                output.write_all(b"\n\t").await?;
                for _ in 0..depth {
                    output.write_all(INDENT_STEP).await?;
                }
                output.write_all(arg).await?;
            }
        }

        self.inc_argc();

        Ok(())
    }

    pub async fn push_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let output = &mut self.formatter.output;
        output.write_all(bytes).await?;
        Ok(())
    }

    /// Mark the transition from the entry-time rendering to the value
    /// the kernel wrote back, strace-style.
    pub async fn value_changed(&mut self) -> Result<()> {
        let output = &mut self.formatter.output;
        output.write_all(b" =>").await?;
        Ok(())
    }

    /// Hand the argument-count stack back to the caller so rendering
    /// can pick up on the same line at the exit stop.
    pub fn suspend(self) -> Vec<usize> {
        self.args
    }

    pub async fn finish(mut self, return_value: i64) -> Result<Formatter<'f>> {
        assert_eq!(self.get_depth(), 1);

        let formatted = format_return_value(return_value);

        let output = &mut self.formatter.output;

        if let FormattingStyle::MultiLine = self.formatter.style {
            output.write_all(b"\n\t").await?;
        }

        output.write_all(b") = ").await?;
        output.write_all(formatted.as_bytes()).await?;
        output.write_all(b"\n").await?;

        Ok(self.formatter)
    }
}
