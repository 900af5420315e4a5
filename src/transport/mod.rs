/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

pub mod i2c;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

use crate::{Error, Result};
use std::{fmt, io};

pub use i2c::LinuxBus;
#[cfg(any(test, feature = "sim"))]
pub use sim::SimBus;

/// Read direction flag of a transfer message.
pub const I2C_M_RD: u16 = 0x0001;
/// The message targets a ten bit address.
pub const I2C_M_TEN: u16 = 0x0010;

/// OS calls an [`I2cDevice`](crate::I2cDevice) makes against its bus.
pub trait Bus {
    /// Binds the slave address for plain reads and writes.
    fn bind(&mut self, addr: SlaveAddress) -> io::Result<()>;
    /// Bus timeout, in units of 10 ms.
    fn set_timeout(&mut self, timeout: i32) -> io::Result<()>;
    fn set_retries(&mut self, retries: i32) -> io::Result<()>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
    /// Submits all messages as one transaction, with a repeated start
    /// between segments and no other traffic in between.
    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlaveAddress {
    SevenBit(u8),
    TenBit(u16),
}

impl SlaveAddress {
    /// Picks the narrowest address mode that fits `addr`.
    pub fn new(addr: u16) -> Result<Self> {
        match addr {
            0..=0x7f => Ok(Self::SevenBit(addr as u8)),
            0x80..=0x3ff => Ok(Self::TenBit(addr)),
            _ => Err(Error::InvalidArgument("I2C address does not fit in 10 bits")),
        }
    }

    pub fn ten_bit(addr: u16) -> Result<Self> {
        if addr > 0x3ff {
            return Err(Error::InvalidArgument("I2C address does not fit in 10 bits"));
        }
        Ok(Self::TenBit(addr))
    }

    pub fn raw(self) -> u16 {
        match self {
            Self::SevenBit(addr) => addr.into(),
            Self::TenBit(addr) => addr,
        }
    }

    pub fn is_ten_bit(self) -> bool {
        matches!(self, Self::TenBit(_))
    }
}

impl fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit(addr) => write!(f, "0x{addr:02x}"),
            Self::TenBit(addr) => write!(f, "0x{addr:03x}"),
        }
    }
}

/// One segment of a combined transaction.
#[derive(Debug)]
pub enum Message<'a> {
    Write { addr: SlaveAddress, data: &'a [u8] },
    Read { addr: SlaveAddress, data: &'a mut [u8] },
}

impl Message<'_> {
    pub fn addr(&self) -> SlaveAddress {
        match self {
            Message::Write { addr, .. } | Message::Read { addr, .. } => *addr,
        }
    }

    pub fn flags(&self) -> u16 {
        let mut flags = match self {
            Message::Write { .. } => 0,
            Message::Read { .. } => I2C_M_RD,
        };
        if self.addr().is_ten_bit() {
            flags |= I2C_M_TEN;
        }
        flags
    }

    pub fn len(&self) -> usize {
        match self {
            Message::Write { data, .. } => data.len(),
            Message::Read { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
