//! Configuration management
//!
//! Loads router.toml: timers, logging, interfaces and static routes.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::dataplane::{Interface, InterfaceTable};
use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Build the interface table, asking `system_mac` for any MAC the file
/// leaves out
pub fn interface_table<F>(config: &Config, system_mac: F) -> Result<InterfaceTable>
where
    F: Fn(&str) -> Result<MacAddr>,
{
    let mut interfaces = Vec::with_capacity(config.interfaces.len());
    for iface in &config.interfaces {
        let mac = match iface.parsed_mac()? {
            Some(mac) => mac,
            None => system_mac(&iface.name)?,
        };
        interfaces.push(Interface::new(iface.name.as_str(), iface.ip, mac));
    }
    Ok(InterfaceTable::new(interfaces))
}

/// MAC of a kernel interface, read from sysfs
pub fn sysfs_mac(name: &str) -> Result<MacAddr> {
    let path = format!("/sys/class/net/{}/address", name);
    let content = std::fs::read_to_string(&path).map_err(|_| Error::InterfaceNotFound {
        name: name.to_string(),
    })?;
    content
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", path, e)))
}
