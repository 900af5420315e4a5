/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::transport::{Bus, Message, SlaveAddress};
use std::{collections::VecDeque, io};

// Value an undriven bus reads as.
const IDLE: u8 = 0xff;

/// Every call made against a [`SimBus`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bind(SlaveAddress),
    SetTimeout(i32),
    SetRetries(i32),
    Read(usize),
    Write(Vec<u8>),
    /// Address and flags of each submitted message.
    Transfer(Vec<(u16, u16)>),
}

impl Call {
    /// Whether the call is an ioctl rather than a plain read or write.
    pub fn is_control(&self) -> bool {
        !matches!(self, Call::Read(_) | Call::Write(_))
    }
}

/// An in-memory I2C device.
///
/// Reads drain a queue of pending bytes, at most `read_cycle` of them per
/// call. With loopback enabled, written bytes are queued for reading.
#[derive(Debug, Default)]
pub struct SimBus {
    pending: VecDeque<u8>,
    loopback: bool,
    read_cycle: Option<usize>,
    absent: Vec<SlaveAddress>,
    busy: bool,
    timeout: Option<i32>,
    retries: Option<i32>,
    calls: Vec<Call>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loopback() -> Self {
        Self {
            loopback: true,
            ..Self::default()
        }
    }

    /// Queues bytes for the device to deliver.
    pub fn preload(mut self, data: &[u8]) -> Self {
        self.pending.extend(data);
        self
    }

    /// Caps the bytes delivered by one read.
    pub fn read_cycle(mut self, max: usize) -> Self {
        self.read_cycle = Some(max);
        self
    }

    /// No device answers at `addr`.
    pub fn without(mut self, addr: SlaveAddress) -> Self {
        self.absent.push(addr);
        self
    }

    /// Another master holds the bus; every data transfer loses arbitration.
    pub fn busy(mut self) -> Self {
        self.busy = true;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn control_calls(&self) -> usize {
        self.calls.iter().filter(|c| c.is_control()).count()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn timeout(&self) -> Option<i32> {
        self.timeout
    }

    pub fn retries(&self) -> Option<i32> {
        self.retries
    }

    fn nak(&self, addr: SlaveAddress) -> io::Result<()> {
        if self.absent.contains(&addr) {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("no device at {addr}")));
        }
        Ok(())
    }

    fn arbitrate(&self) -> io::Result<()> {
        if self.busy {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "bus arbitration lost"));
        }
        Ok(())
    }

    fn deliver(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *dst = src;
        }
        count
    }
}

fn negative(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("negative {what}"))
}

impl Bus for SimBus {
    fn bind(&mut self, addr: SlaveAddress) -> io::Result<()> {
        self.calls.push(Call::Bind(addr));
        self.nak(addr)
    }

    fn set_timeout(&mut self, timeout: i32) -> io::Result<()> {
        self.calls.push(Call::SetTimeout(timeout));
        if timeout < 0 {
            return Err(negative("timeout"));
        }
        self.timeout = Some(timeout);
        Ok(())
    }

    fn set_retries(&mut self, retries: i32) -> io::Result<()> {
        self.calls.push(Call::SetRetries(retries));
        if retries < 0 {
            return Err(negative("retry count"));
        }
        self.retries = Some(retries);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls.push(Call::Read(buf.len()));
        self.arbitrate()?;
        let limit = self.read_cycle.unwrap_or(buf.len()).min(buf.len());
        Ok(self.deliver(&mut buf[..limit]))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.calls.push(Call::Write(data.to_vec()));
        self.arbitrate()?;
        if self.loopback {
            self.pending.extend(data);
        }
        Ok(data.len())
    }

    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> io::Result<()> {
        self.calls.push(Call::Transfer(
            msgs.iter().map(|m| (m.addr().raw(), m.flags())).collect(),
        ));
        self.arbitrate()?;
        for msg in msgs.iter_mut() {
            self.nak(msg.addr())?;
            match msg {
                Message::Write { data, .. } => {
                    if self.loopback {
                        self.pending.extend(data.iter());
                    }
                }
                Message::Read { data, .. } => {
                    let count = self.deliver(data);
                    data[count..].fill(IDLE);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_respect_cycle_and_availability() {
        let mut bus = SimBus::new().preload(&[1, 2, 3, 4, 5]).read_cycle(2);
        let mut buf = [0u8; 8];
        assert_eq!(bus.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(bus.read(&mut buf[..1]).unwrap(), 1);
        assert_eq!(bus.pending(), 2);
    }

    #[test]
    fn transfer_reads_idle_past_pending() {
        let mut bus = SimBus::new().preload(&[0xaa]);
        let addr = SlaveAddress::SevenBit(0x50);
        let mut inp = [0u8; 3];
        bus.transfer(&mut [Message::Read { addr, data: &mut inp }]).unwrap();
        assert_eq!(inp, [0xaa, IDLE, IDLE]);
    }

    #[test]
    fn absent_device_naks() {
        let addr = SlaveAddress::SevenBit(0x20);
        let mut bus = SimBus::new().without(addr);
        assert_eq!(bus.bind(addr).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(bus.calls(), &[Call::Bind(addr)]);
    }

    #[test]
    fn rejects_negative_settings() {
        let mut bus = SimBus::new();
        assert!(bus.set_timeout(-1).is_err());
        assert!(bus.set_retries(-3).is_err());
        bus.set_retries(2).unwrap();
        assert_eq!((bus.timeout(), bus.retries()), (None, Some(2)));
        assert_eq!(bus.control_calls(), 3);
    }
}
