/*
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright The Asahi Linux Contributors
 */


#![cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code, unused_imports))]
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {
    eprintln!("i2cdevtool currently supports Linux only.");
}

use clap::ArgMatches;
use env_logger::Env;
use i2cdevtool::device::MAX_MESSAGE_LEN;
use i2cdevtool::transport::LinuxBus;
use i2cdevtool::{I2cDevice, SlaveAddress};
use log::{error, info};
use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Device(#[from] i2cdevtool::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid number: {0}")]
    Parse(#[from] std::num::ParseIntError),
}

type Result<T> = std::result::Result<T, Error>;

fn parse_number<T: TryFrom<i64>>(s: &str) -> Result<T> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16)?,
        None => s.parse::<i64>()?,
    };
    T::try_from(value).map_err(|_| Error::InvalidArgument("number out of range"))
}

fn required<'a>(args: &'a ArgMatches, id: &'static str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .ok_or(Error::InvalidArgument(id))
}

fn parse_bytes(args: &ArgMatches) -> Result<Vec<u8>> {
    args.get_many::<String>("BYTES")
        .into_iter()
        .flatten()
        .map(|b| parse_number(b))
        .collect()
}

fn read_len(args: &ArgMatches) -> Result<usize> {
    let len = parse_number(required(args, "LEN")?)?;
    if len > MAX_MESSAGE_LEN {
        return Err(Error::InvalidArgument("LEN exceeds the I2C message limit"));
    }
    Ok(len)
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("0x{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn command() -> clap::Command {
    clap::command!()
        .arg(
            clap::arg!(-b --bus [BUS] "i2c bus device node.")
                .default_value("/dev/i2c-0"),
        )
        .arg(
            clap::arg!(-a --address [ADDRESS] "i2c slave address of the target device.")
                .default_value("0x50"),
        )
        .arg(
            clap::arg!(-t --timeout [TIMEOUT] "bus timeout in units of 10 ms.")
                .allow_negative_numbers(true),
        )
        .arg(
            clap::arg!(-r --retries [RETRIES] "number of bus retries.")
                .allow_negative_numbers(true),
        )
        .subcommand(
            clap::Command::new("read")
                .about("read up to LEN bytes")
                .arg(clap::arg!(<LEN> "number of bytes to read")),
        )
        .subcommand(
            clap::Command::new("write")
                .about("write bytes")
                .arg(clap::arg!(<BYTES> ... "bytes to write")),
        )
        .subcommand(
            clap::Command::new("write-read")
                .about("write bytes, then read LEN bytes in one transaction")
                .arg(clap::arg!(<LEN> "number of bytes to read"))
                .arg(clap::arg!(<BYTES> ... "bytes to write")),
        )
        .arg_required_else_help(true)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn i2cdevtool() -> Result<()> {
    let matches = command().get_matches();

    let addr = SlaveAddress::new(parse_number(required(&matches, "address")?)?)?;
    let bus = required(&matches, "bus")?;
    let mut device = I2cDevice::<LinuxBus>::open_path(bus, addr)?;
    info!("Opened {bus} at address {addr}");

    if let Some(timeout) = matches.get_one::<String>("timeout") {
        device.set_timeout(parse_number(timeout)?)?;
    }
    if let Some(retries) = matches.get_one::<String>("retries") {
        device.set_retries(parse_number(retries)?)?;
    }

    match matches.subcommand() {
        Some(("read", args)) => {
            let len = parse_number(required(args, "LEN")?)?;
            let data = device.read_array(len)?;
            println!("{}", hex(&data));
        }
        Some(("write", args)) => {
            let data = parse_bytes(args)?;
            device.write_array(&data, data.len())?;
        }
        Some(("write-read", args)) => {
            let len = read_len(args)?;
            let data = parse_bytes(args)?;
            let mut out = vec![0u8; len];
            device.write_then_read(&data, data.len(), &mut out, len)?;
            println!("{}", hex(&out));
        }
        _ => {}
    }

    device.close();
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match i2cdevtool() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("i2cdevtool: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_number::<u16>("0x38").unwrap(), 0x38);
        assert_eq!(parse_number::<u16>("56").unwrap(), 56);
        assert_eq!(parse_number::<i32>("-1").unwrap(), -1);
        assert_eq!(parse_number::<u8>("0XFF").unwrap(), 0xff);
        assert!(matches!(parse_number::<u8>("0x100"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_number::<u8>("zz"), Err(Error::Parse(_))));
    }

    #[test]
    fn write_read_arguments() {
        let matches = command()
            .try_get_matches_from([
                "i2cdevtool", "-a", "0x38", "-t", "-1", "write-read", "2", "0x0f", "16",
            ])
            .unwrap();
        assert_eq!(required(&matches, "address").unwrap(), "0x38");
        assert_eq!(required(&matches, "bus").unwrap(), "/dev/i2c-0");
        assert_eq!(matches.get_one::<String>("timeout").map(String::as_str), Some("-1"));

        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "write-read");
        assert_eq!(required(args, "LEN").unwrap(), "2");
        assert_eq!(parse_bytes(args).unwrap(), vec![0x0f, 0x10]);
    }

    #[test]
    fn write_read_length_is_capped_before_allocation() {
        let matches = command()
            .try_get_matches_from(["i2cdevtool", "write-read", "99999999999", "0x00"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(matches!(read_len(args), Err(Error::InvalidArgument(_))));

        let matches = command()
            .try_get_matches_from(["i2cdevtool", "write-read", "65535", "0x00"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(read_len(args).unwrap(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn hex_output() {
        assert_eq!(hex(&[0xaa, 0x01]), "0xaa 0x01");
        assert_eq!(hex(&[]), "");
    }
}
