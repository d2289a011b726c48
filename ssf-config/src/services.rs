//! Per-microservice enable flags (spec §6.1's `ssf.services.*` table),
//! grounded in `common/config/services.h`'s one-struct-per-service shape.

use serde::Deserialize;

/// A plain on/off toggle, shared by every service that has no extra knobs.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    pub enable: bool,
}

/// A forwarded listener additionally chooses whether it binds every
/// interface or loopback only.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ListenerService {
    pub enable: bool,
    pub gateway_ports: bool,
}

impl Default for ListenerService {
    fn default() -> Self {
        Self {
            enable: false,
            gateway_ports: true,
        }
    }
}

/// The interactive-shell service names the binary to spawn and its
/// argument string.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShellService {
    pub enable: bool,
    pub path: String,
    pub args: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Services {
    pub datagram_forwarder: Service,
    pub datagram_listener: ListenerService,
    pub stream_forwarder: Service,
    pub stream_listener: ListenerService,
    pub copy: Service,
    pub socks: Service,
    pub shell: ShellService,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_defaults_to_gateway_ports_enabled() {
        let listener = ListenerService::default();
        assert!(!listener.enable);
        assert!(listener.gateway_ports);
    }

    #[test]
    fn services_all_disabled_by_default() {
        let services = Services::default();
        assert!(!services.copy.enable);
        assert!(!services.shell.enable);
        assert!(services.shell.path.is_empty());
    }
}
