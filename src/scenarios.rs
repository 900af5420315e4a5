/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */

use crate::transport::sim::{Call, SimBus};
use crate::{Error, I2cDevice, SlaveAddress};

fn addr() -> SlaveAddress {
    SlaveAddress::new(0x50).unwrap()
}

#[test]
fn write_read_close() {
    let mut dev = I2cDevice::new("/dev/i2c-1");
    dev.attach(SimBus::new().preload(&[0xaa, 0xbb]), addr()).unwrap();

    dev.write_array(&[0x10, 0x20], 2).unwrap();
    let data = dev.read_array(4).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data, vec![0xaa, 0xbb]);

    assert_eq!(
        dev.bus().unwrap().calls(),
        &[
            Call::Bind(addr()),
            Call::Write(vec![0x10, 0x20]),
            Call::Read(4),
        ]
    );
    dev.close();
    assert!(!dev.is_open());
}

#[test]
fn loopback_round_trip() {
    for len in [0usize, 1, 2, 7, 32, 255, 4096] {
        let data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();

        let mut dev = I2cDevice::new("loop");
        dev.attach(SimBus::loopback(), addr()).unwrap();
        dev.write_array(&data, len).unwrap();
        assert_eq!(dev.read_array(len).unwrap(), data, "len {len}");

        dev.write_direct(&data, len).unwrap();
        let mut back = vec![0u8; len];
        assert_eq!(dev.read_direct(&mut back, len).unwrap(), len);
        assert_eq!(back, data, "len {len}");
    }
}

#[test]
fn negative_timeout_is_rejected() {
    let mut dev = I2cDevice::new("sim");
    dev.attach(SimBus::new(), addr()).unwrap();
    let err = dev.set_timeout(-1).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(dev.bus().unwrap().timeout().is_none());
    dev.set_timeout(100).unwrap();
    assert_eq!(dev.bus().unwrap().timeout(), Some(100));
}

#[test]
fn register_read_uses_single_control_call() {
    let mut dev = I2cDevice::new("sim");
    dev.attach(SimBus::new().preload(&[0x5a, 0xa5, 0x01]), addr()).unwrap();

    let before = dev.bus().unwrap().control_calls();
    let mut value = [0u8; 3];
    dev.write_then_read(&[0x3fu8], 1, &mut value, 3).unwrap();
    assert_eq!(value, [0x5a, 0xa5, 0x01]);

    let bus = dev.bus().unwrap();
    assert_eq!(bus.control_calls(), before + 1);
    assert!(!bus
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Read(_) | Call::Write(_))));
}

#[test]
fn close_twice_after_drop_of_bus() {
    let mut dev: I2cDevice<SimBus> = I2cDevice::new("sim");
    dev.close();
    dev.attach(SimBus::new(), addr()).unwrap();
    dev.close();
    dev.close();
    assert!(dev.bus().is_none());
    assert!(matches!(dev.read_array(1), Err(Error::InvalidState(_))));
}
