/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

//! Userspace access to a single I2C bus device.
//!
//! An [`I2cDevice`] owns one bus descriptor and one bound slave address and
//! offers plain reads and writes, bus timeout/retry control, and a combined
//! write-then-read transaction submitted as one `I2C_RDWR` request.

pub mod buffer;
pub mod device;
pub mod transport;

#[cfg(test)]
mod scenarios;

pub use buffer::BusBuffer;
pub use device::I2cDevice;
pub use transport::{Bus, Message, SlaveAddress};

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("could not allocate a {0} byte transfer buffer")]
    OutOfMemory(usize),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    /// Wraps an OS error with the operation that produced it.
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Io { context, source }
    }

    /// OS error code of an [`Error::Io`], if the OS reported one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
