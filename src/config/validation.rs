//! Configuration validation

use super::Config;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_router(config, &mut result);
    validate_interfaces(config, &mut result);
    validate_routes(config, &mut result);

    result
}

fn validate_router(config: &Config, result: &mut ValidationResult) {
    let router = &config.router;
    for (key, value) in [
        ("arp_cache_timeout", router.arp_cache_timeout),
        ("arp_retry_interval", router.arp_retry_interval),
        ("sweep_interval", router.sweep_interval),
        ("arp_max_retries", u64::from(router.arp_max_retries)),
    ] {
        if value == 0 {
            result.error(format!("router.{}: must be greater than zero", key));
        }
    }

    if router.sweep_interval > router.arp_retry_interval && router.arp_retry_interval > 0 {
        result.warn(format!(
            "router.sweep_interval ({}s) exceeds arp_retry_interval ({}s); retransmissions will follow the sweep period",
            router.sweep_interval, router.arp_retry_interval
        ));
    }
}

fn validate_interfaces(config: &Config, result: &mut ValidationResult) {
    if config.interfaces.is_empty() {
        result.error("interfaces: at least one interface is required");
    }

    let mut names = HashSet::new();
    let mut ips = HashSet::new();
    for iface in &config.interfaces {
        if iface.name.is_empty() {
            result.error("interfaces: name must not be empty");
        }
        if !names.insert(iface.name.as_str()) {
            result.error(format!("interfaces.{}: duplicate name", iface.name));
        }
        if !ips.insert(iface.ip) {
            result.error(format!(
                "interfaces.{}: address {} already assigned",
                iface.name, iface.ip
            ));
        }
        if iface.ip.is_unspecified() || iface.ip.is_broadcast() || iface.ip.is_multicast() {
            result.error(format!(
                "interfaces.{}: {} is not a usable host address",
                iface.name, iface.ip
            ));
        }
        if let Err(e) = iface.parsed_mac() {
            result.error(e.to_string());
        }
    }
}

fn validate_routes(config: &Config, result: &mut ValidationResult) {
    for (i, route) in config.routes.iter().enumerate() {
        if !config.interfaces.iter().any(|x| x.name == route.interface) {
            result.error(format!(
                "routes[{}]: interface '{}' not defined",
                i, route.interface
            ));
        }

        let mask = u32::from(route.netmask);
        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            result.error(format!(
                "routes[{}]: netmask {} is not contiguous",
                i, route.netmask
            ));
        }

        if u32::from(route.destination) & !mask != 0 {
            result.warn(format!(
                "routes[{}]: destination {} has host bits outside netmask {}",
                i, route.destination, route.netmask
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterfaceConfig, RouteConfig, RouterConfig};
    use std::net::Ipv4Addr;

    fn iface(name: &str, ip: [u8; 4]) -> InterfaceConfig {
        InterfaceConfig {
            name: name.to_string(),
            ip: ip.into(),
            mac: None,
        }
    }

    fn route(dst: [u8; 4], mask: [u8; 4], iface: &str) -> RouteConfig {
        RouteConfig {
            destination: dst.into(),
            netmask: mask.into(),
            gateway: Ipv4Addr::UNSPECIFIED,
            interface: iface.to_string(),
        }
    }

    fn make_config() -> Config {
        Config {
            interfaces: vec![iface("eth1", [10, 0, 1, 1]), iface("eth2", [10, 0, 2, 1])],
            routes: vec![
                route([10, 0, 1, 0], [255, 255, 255, 0], "eth1"),
                route([10, 0, 2, 0], [255, 255, 255, 0], "eth2"),
            ],
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let result = validate(&make_config());
        assert!(!result.has_errors());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_no_interfaces() {
        let result = validate(&Config::default());
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("at least one interface")));
    }

    #[test]
    fn test_duplicate_name_and_address() {
        let mut config = make_config();
        config.interfaces.push(iface("eth1", [10, 0, 2, 1]));
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("duplicate name")));
        assert!(result.errors.iter().any(|e| e.contains("already assigned")));
    }

    #[test]
    fn test_bad_mac() {
        let mut config = make_config();
        config.interfaces[0].mac = Some("02:00:00:00:01".to_string());
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("interfaces.eth1")));
    }

    #[test]
    fn test_route_undefined_interface() {
        let mut config = make_config();
        config
            .routes
            .push(route([0, 0, 0, 0], [0, 0, 0, 0], "eth99"));
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("eth99")));
    }

    #[test]
    fn test_non_contiguous_netmask() {
        let mut config = make_config();
        config
            .routes
            .push(route([10, 0, 0, 0], [255, 0, 255, 0], "eth1"));
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("not contiguous")));
    }

    #[test]
    fn test_host_bits_outside_mask_warns() {
        let mut config = make_config();
        config
            .routes
            .push(route([10, 0, 3, 7], [255, 255, 255, 0], "eth2"));
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("host bits")));
    }

    #[test]
    fn test_zero_timers() {
        let mut config = make_config();
        config.router = RouterConfig {
            arp_max_retries: 0,
            sweep_interval: 0,
            ..RouterConfig::default()
        };
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("arp_max_retries")));
        assert!(result.errors.iter().any(|e| e.contains("sweep_interval")));
    }
}
