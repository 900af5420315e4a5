/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::buffer::BusBuffer;
use crate::transport::{Bus, LinuxBus, Message, SlaveAddress};
use crate::{Error, Result};
use log::{debug, warn};

#[cfg(any(target_os = "linux", target_os = "android"))]
use std::{fs::OpenOptions, os::fd::AsFd, path::Path};

/// Longest segment an `i2c_msg` can describe.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

#[derive(Debug)]
struct Session<B> {
    bus: B,
    addr: SlaveAddress,
}

/// One I2C bus connection bound to one slave address.
///
/// A device starts out closed. [`I2cDevice::open`] (or [`I2cDevice::attach`]
/// for an already acquired bus) binds the address; every other operation
/// fails with [`Error::InvalidState`] until then. Dropping the device
/// releases the bus.
#[derive(Debug)]
pub struct I2cDevice<B: Bus = LinuxBus> {
    name: String,
    session: Option<Session<B>>,
}

impl<B: Bus> I2cDevice<B> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn address(&self) -> Option<SlaveAddress> {
        self.session.as_ref().map(|s| s.addr)
    }

    pub fn bus(&self) -> Option<&B> {
        self.session.as_ref().map(|s| &s.bus)
    }

    /// Takes ownership of `bus` and binds `addr` on it.
    ///
    /// If the bind is rejected the bus is released and the device stays
    /// closed.
    pub fn attach(&mut self, mut bus: B, addr: SlaveAddress) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::InvalidState("device is already open"));
        }
        bus.bind(addr)
            .map_err(Error::io("could not set I2C slave address"))?;
        debug!("{}: bound slave address {addr}", self.name);
        self.session = Some(Session { bus, addr });
        Ok(())
    }

    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("{}: closed", self.name);
        }
    }

    fn session(&mut self) -> Result<&mut Session<B>> {
        self.session
            .as_mut()
            .ok_or(Error::InvalidState("device is closed"))
    }

    /// Reads up to `length` bytes through a temporary buffer.
    ///
    /// The result holds only what the device delivered in one read cycle,
    /// which may be fewer than `length` bytes.
    pub fn read_array(&mut self, length: usize) -> Result<Vec<u8>> {
        let session = self.session()?;
        let mut buf = scratch(length)?;
        buf.resize(length, 0);

        let count = session
            .bus
            .read(&mut buf)
            .map_err(Error::io("I2C read failed"))?;
        buf.truncate(count.min(length));
        debug!("{}: read {}/{length} bytes", self.name, buf.len());
        Ok(buf)
    }

    /// Reads up to `length` bytes straight into `buf`, returning the count.
    pub fn read_direct<T>(&mut self, buf: &mut T, length: usize) -> Result<usize>
    where
        T: BusBuffer + ?Sized,
    {
        let region = buf.region_mut(length)?;
        let session = self.session()?;

        let count = session
            .bus
            .read(region)
            .map_err(Error::io("I2C read failed"))?;
        debug!("{}: read {count}/{length} bytes", self.name);
        Ok(count.min(length))
    }

    /// Writes the first `length` bytes of `data` through a temporary buffer.
    pub fn write_array(&mut self, data: &[u8], length: usize) -> Result<()> {
        let data = data
            .get(..length)
            .ok_or(Error::InvalidArgument("array is shorter than the requested length"))?;
        let session = self.session()?;
        let mut buf = scratch(length)?;
        buf.extend_from_slice(data);

        let written = session
            .bus
            .write(&buf)
            .map_err(Error::io("I2C write failed"))?;
        self.log_write(written, length);
        Ok(())
    }

    pub fn write_direct<T>(&mut self, buf: &T, length: usize) -> Result<()>
    where
        T: BusBuffer + ?Sized,
    {
        let region = buf.region(length)?;
        let session = self.session()?;

        let written = session
            .bus
            .write(region)
            .map_err(Error::io("I2C write failed"))?;
        self.log_write(written, length);
        Ok(())
    }

    fn log_write(&self, written: usize, length: usize) {
        if written < length {
            warn!("{}: short write, {written}/{length} bytes", self.name);
        } else {
            debug!("{}: wrote {length} bytes", self.name);
        }
    }

    /// Sets the bus timeout, in units of 10 ms.
    pub fn set_timeout(&mut self, timeout: i32) -> Result<()> {
        self.session()?
            .bus
            .set_timeout(timeout)
            .map_err(Error::io("could not set I2C timeout"))?;
        debug!("{}: timeout {timeout}", self.name);
        Ok(())
    }

    pub fn set_retries(&mut self, retries: i32) -> Result<()> {
        self.session()?
            .bus
            .set_retries(retries)
            .map_err(Error::io("could not set I2C number of retries"))?;
        debug!("{}: retries {retries}", self.name);
        Ok(())
    }

    /// Writes `write_len` bytes from `write` and then reads `read_len` bytes
    /// into `read` as one bus transaction.
    ///
    /// Both segments target the bound address and are joined by a repeated
    /// start, so no other master can address the device in between.
    pub fn write_then_read<W, R>(
        &mut self,
        write: &W,
        write_len: usize,
        read: &mut R,
        read_len: usize,
    ) -> Result<()>
    where
        W: BusBuffer + ?Sized,
        R: BusBuffer + ?Sized,
    {
        let out = write.region(write_len)?;
        let inp = read.region_mut(read_len)?;
        if write_len > MAX_MESSAGE_LEN || read_len > MAX_MESSAGE_LEN {
            return Err(Error::InvalidArgument("I2C message longer than 65535 bytes"));
        }
        let session = self.session()?;
        let addr = session.addr;

        let mut msgs = [
            Message::Write { addr, data: out },
            Message::Read { addr, data: inp },
        ];
        session
            .bus
            .transfer(&mut msgs)
            .map_err(Error::io("combined I2C transfer failed"))?;
        debug!("{}: wrote {write_len}, read {read_len} bytes at {addr}", self.name);
        Ok(())
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl I2cDevice<LinuxBus> {
    /// Binds `addr` on a private duplicate of `fd`.
    ///
    /// The caller keeps ownership of `fd` and may close it right away.
    pub fn open(&mut self, fd: impl AsFd, addr: SlaveAddress) -> Result<()> {
        if self.is_open() {
            return Err(Error::InvalidState("device is already open"));
        }
        let bus = LinuxBus::duplicate(fd.as_fd())?;
        self.attach(bus, addr)
    }

    /// Opens the bus node at `path` and binds `addr`.
    pub fn open_path(path: impl AsRef<Path>, addr: SlaveAddress) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::io("could not open I2C device"))?;

        let mut device = Self::new(path.display().to_string());
        device.open(&file, addr)?;
        Ok(device)
    }
}

impl<B: Bus> Drop for I2cDevice<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn scratch(length: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(length)
        .map_err(|_| Error::OutOfMemory(length))?;
    Ok(buf)
}
