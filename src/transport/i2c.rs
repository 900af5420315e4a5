/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::transport::{Bus, Message, SlaveAddress};
use std::io;

#[cfg(any(target_os = "linux", target_os = "android"))]
use crate::{Error, Result};
#[cfg(any(target_os = "linux", target_os = "android"))]
use log::debug;
#[cfg(any(target_os = "linux", target_os = "android"))]
use std::{
    fs::File,
    io::{Read, Write},
    os::fd::{AsRawFd, BorrowedFd},
};

// <linux/i2c-dev.h>
#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_RETRIES: libc::c_ulong = 0x0701;
#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_TIMEOUT: libc::c_ulong = 0x0702;
#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_SLAVE: libc::c_ulong = 0x0703;
#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_TENBIT: libc::c_ulong = 0x0704;
#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_RDWR: libc::c_ulong = 0x0707;

#[cfg(any(target_os = "linux", target_os = "android"))]
#[allow(non_camel_case_types)]
#[derive(Debug)]
#[repr(C)]
struct i2c_msg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[allow(non_camel_case_types)]
#[repr(C)]
struct i2c_rdwr_ioctl_data {
    msgs: *mut i2c_msg,
    nmsgs: u32,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn raw_msg(msg: &mut Message<'_>) -> io::Result<i2c_msg> {
    let len = u16::try_from(msg.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "i2c message too long"))?;
    let addr = msg.addr().raw();
    let flags = msg.flags();
    // The kernel only reads from write segments.
    let buf = match msg {
        Message::Write { data, .. } => data.as_ptr() as *mut u8,
        Message::Read { data, .. } => data.as_mut_ptr(),
    };
    Ok(i2c_msg { addr, flags, len, buf })
}

/// An `i2c-dev` bus node, owned through a private duplicate of the caller's
/// descriptor.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[derive(Debug)]
pub struct LinuxBus {
    dev: File,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl LinuxBus {
    /// Duplicates `fd` so the caller may close its own copy at any time.
    pub fn duplicate(fd: BorrowedFd<'_>) -> Result<Self> {
        let owned = fd
            .try_clone_to_owned()
            .map_err(Error::io("could not open I2C bus"))?;
        debug!("duplicated bus descriptor {} as {}", fd.as_raw_fd(), owned.as_raw_fd());
        Ok(Self { dev: File::from(owned) })
    }

    fn control(&self, request: libc::c_ulong, arg: libc::c_ulong) -> io::Result<()> {
        let ret = unsafe { libc::ioctl(self.dev.as_raw_fd(), request as _, arg) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl Bus for LinuxBus {
    fn bind(&mut self, addr: SlaveAddress) -> io::Result<()> {
        self.control(I2C_TENBIT, addr.is_ten_bit().into())?;
        self.control(I2C_SLAVE, addr.raw().into())
    }

    // Negative values sign-extend past INT_MAX, which the driver rejects.
    fn set_timeout(&mut self, timeout: i32) -> io::Result<()> {
        self.control(I2C_TIMEOUT, timeout as libc::c_ulong)
    }

    fn set_retries(&mut self, retries: i32) -> io::Result<()> {
        self.control(I2C_RETRIES, retries as libc::c_ulong)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.dev.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.dev.write(data)
    }

    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> io::Result<()> {
        let mut raw = msgs.iter_mut().map(raw_msg).collect::<io::Result<Vec<_>>>()?;
        let mut data = i2c_rdwr_ioctl_data {
            msgs: raw.as_mut_ptr(),
            nmsgs: raw.len() as u32,
        };
        let ret = unsafe {
            libc::ioctl(
                self.dev.as_raw_fd(),
                I2C_RDWR as _,
                &mut data as *mut i2c_rdwr_ioctl_data,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[derive(Debug)]
pub struct LinuxBus;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "i2c bus is linux-only")
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl Bus for LinuxBus {
    fn bind(&mut self, _addr: SlaveAddress) -> io::Result<()> {
        Err(unsupported())
    }

    fn set_timeout(&mut self, _timeout: i32) -> io::Result<()> {
        Err(unsupported())
    }

    fn set_retries(&mut self, _retries: i32) -> io::Result<()> {
        Err(unsupported())
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    fn transfer(&mut self, _msgs: &mut [Message<'_>]) -> io::Result<()> {
        Err(unsupported())
    }
}
