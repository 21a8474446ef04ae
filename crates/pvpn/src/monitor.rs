//! Connection tracking for the once-a-second poll.
//!
//! A [`Snapshot`] is cheap to take (one `pgrep` and one file read), so it can
//! run every tick. Anything that needs the CLI itself only happens when
//! [`ConnectionMonitor::observe`] reports a transition.

use crate::config::CliConfig;
use crate::countries;
use crate::probe::{self, TransferStats};
use crate::servers::{self, LogicalServer};
use crate::utils::CliPaths;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub process_running: bool,
    pub connected_server: Option<String>,
}

impl Snapshot {
    pub fn take(paths: &CliPaths) -> Self {
        let process_running = probe::is_openvpn_running();
        let connected_server = CliConfig::load(&paths.config_file)
            .ok()
            .and_then(|c| c.connected_server().map(str::to_string));
        Self {
            process_running,
            connected_server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// Connected after being disconnected, or to a server other than the
    /// last known one.
    Changed,
    /// Went from connected to disconnected.
    Disconnected,
    /// Nothing changed but a refresh was requested; labels should be redrawn
    /// for the current state without announcing it.
    Refreshed,
}

#[derive(Debug)]
pub struct ConnectionMonitor {
    connected: bool,
    last_known: Option<String>,
    refresh_pending: bool,
    newly_initialized: bool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    /// The first observation always reports the current state.
    pub fn new() -> Self {
        Self {
            connected: false,
            last_known: None,
            refresh_pending: true,
            newly_initialized: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_known(&self) -> Option<&str> {
        self.last_known.as_deref()
    }

    /// Makes the next observation report the current state even if nothing
    /// changed, e.g. after the server list was rebuilt.
    pub fn request_refresh(&mut self) {
        self.refresh_pending = true;
    }

    pub fn observe(&mut self, snapshot: &Snapshot) -> Transition {
        let forced = std::mem::take(&mut self.refresh_pending);
        if snapshot.process_running {
            if !self.connected || snapshot.connected_server != self.last_known {
                self.record_connection(snapshot.connected_server.clone());
                return Transition::Changed;
            }
        } else if self.connected {
            self.mark_disconnected();
            return Transition::Disconnected;
        }
        if forced {
            Transition::Refreshed
        } else {
            Transition::Unchanged
        }
    }

    pub fn record_connection(&mut self, server: Option<String>) {
        self.connected = true;
        self.last_known = server;
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.last_known = None;
    }

    /// True exactly once after start-up, on the first connected refresh.
    pub fn take_newly_initialized(&mut self) -> bool {
        std::mem::take(&mut self.newly_initialized)
    }
}

/// Everything the connection window shows about the active connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDetails {
    pub server: String,
    pub country_code: String,
    pub country: String,
    pub protocol: Option<String>,
    pub load: Option<u32>,
    pub secure_core: bool,
    pub exit_ip: Option<String>,
}

impl ConnectionDetails {
    /// `None` when the config names no connected server.
    pub fn collect(
        config: &CliConfig,
        servers: &[LogicalServer],
        exit_ip: Option<String>,
    ) -> Option<Self> {
        let server = config.connected_server()?.to_string();
        let info = servers::find_server(servers, &server);
        if info.is_none() {
            log::warn!("Connected server {} is not in the server list", server);
        }

        let country_code = info
            .map(|s| s.exit_country.to_uppercase())
            .unwrap_or_default();
        Some(Self {
            country: countries::display_name(&country_code),
            country_code,
            protocol: config.connected_protocol().map(str::to_string),
            load: info.map(|s| s.load),
            secure_core: info.is_some_and(|s| s.is_secure_core()),
            exit_ip,
            server,
        })
    }

    pub fn exit_server_label(&self) -> String {
        format!("{} >> {}", self.country, self.server)
    }

    pub fn protocol_label(&self) -> String {
        match &self.protocol {
            Some(p) => format!("OpenVPN ({})", p.to_uppercase()),
            None => String::new(),
        }
    }

    pub fn load_label(&self) -> String {
        self.load.map(|l| format!("{}% Load", l)).unwrap_or_default()
    }

    pub fn ip_label(&self) -> String {
        ip_label(self.exit_ip.as_deref())
    }
}

pub fn ip_label(ip: Option<&str>) -> String {
    format!("IP: {}", ip.unwrap_or("unknown"))
}

/// `HH:MM:SS`; hours keep counting past 99.
pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

pub fn connection_duration(start: u64, now: u64) -> u64 {
    now.saturating_sub(start)
}

/// Values for the once-a-second stats refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: String,
    pub received: String,
    pub elapsed: String,
}

impl SessionStats {
    pub fn from_parts(transfer: Option<TransferStats>, started: Option<u64>, now: u64) -> Self {
        let (sent, received) = match transfer {
            Some(t) => (probe::format_bytes(t.sent), probe::format_bytes(t.received)),
            None => ("-".to_string(), "-".to_string()),
        };
        let elapsed = started
            .map(|start| format_elapsed(connection_duration(start, now)))
            .unwrap_or_default();
        Self {
            sent,
            received,
            elapsed,
        }
    }

    pub fn gather(paths: &CliPaths, sys_root: &Path) -> Self {
        let started = CliConfig::load(&paths.config_file)
            .ok()
            .and_then(|c| c.connected_time());
        Self::from_parts(
            probe::read_transfer_stats(sys_root),
            started,
            crate::config::unix_now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servers::tests::sample;

    fn running(server: Option<&str>) -> Snapshot {
        Snapshot {
            process_running: true,
            connected_server: server.map(str::to_string),
        }
    }

    fn stopped() -> Snapshot {
        Snapshot::default()
    }

    #[test]
    fn first_observation_reports_state() {
        let mut monitor = ConnectionMonitor::new();
        assert_eq!(monitor.observe(&stopped()), Transition::Refreshed);
        assert_eq!(monitor.observe(&stopped()), Transition::Unchanged);
        assert!(!monitor.is_connected());

        let mut monitor = ConnectionMonitor::new();
        assert_eq!(monitor.observe(&running(Some("CH#1"))), Transition::Changed);
        assert_eq!(monitor.last_known(), Some("CH#1"));
        assert!(monitor.is_connected());
    }

    #[test]
    fn server_switch_is_a_change() {
        let mut monitor = ConnectionMonitor::new();
        monitor.observe(&running(Some("CH#1")));
        assert_eq!(monitor.observe(&running(Some("CH#1"))), Transition::Unchanged);
        assert_eq!(monitor.observe(&running(Some("NL#7"))), Transition::Changed);
        assert_eq!(monitor.observe(&stopped()), Transition::Disconnected);
        assert_eq!(monitor.last_known(), None);
        assert!(!monitor.is_connected());
        assert_eq!(monitor.observe(&stopped()), Transition::Unchanged);
    }

    #[test]
    fn refresh_request_is_not_a_transition() {
        let mut monitor = ConnectionMonitor::new();
        monitor.observe(&running(Some("CH#1")));
        monitor.request_refresh();
        assert_eq!(monitor.observe(&running(Some("CH#1"))), Transition::Refreshed);
        assert_eq!(monitor.observe(&running(Some("CH#1"))), Transition::Unchanged);
        assert_eq!(monitor.last_known(), Some("CH#1"));

        monitor.observe(&stopped());
        monitor.request_refresh();
        assert_eq!(monitor.observe(&stopped()), Transition::Refreshed);
        assert_eq!(monitor.observe(&stopped()), Transition::Unchanged);
    }

    #[test]
    fn real_transition_wins_over_refresh() {
        let mut monitor = ConnectionMonitor::new();
        monitor.observe(&running(Some("CH#1")));
        monitor.request_refresh();
        assert_eq!(monitor.observe(&running(Some("NL#7"))), Transition::Changed);
        monitor.request_refresh();
        assert_eq!(monitor.observe(&stopped()), Transition::Disconnected);
        // The request was consumed by the transition.
        assert_eq!(monitor.observe(&stopped()), Transition::Unchanged);
    }

    #[test]
    fn newly_initialized_only_once() {
        let mut monitor = ConnectionMonitor::new();
        assert!(monitor.take_newly_initialized());
        assert!(!monitor.take_newly_initialized());
    }

    #[test]
    fn collects_details_from_config_and_servers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pvpn-cli.cfg");
        std::fs::write(
            &path,
            "[metadata]\nconnected_server = CH-NL#1\nconnected_proto = udp\n",
        )
        .unwrap();
        let config = CliConfig::load(&path).unwrap();

        let details =
            ConnectionDetails::collect(&config, &sample(), Some("185.159.157.12".into())).unwrap();
        assert_eq!(details.exit_server_label(), "Netherlands >> CH-NL#1");
        assert_eq!(details.protocol_label(), "OpenVPN (UDP)");
        assert_eq!(details.load_label(), "10% Load");
        assert_eq!(details.ip_label(), "IP: 185.159.157.12");
        assert!(details.secure_core);
    }

    #[test]
    fn no_connected_server_no_details() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pvpn-cli.cfg");
        std::fs::write(&path, "[metadata]\nconnected_server = None\n").unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert!(ConnectionDetails::collect(&config, &sample(), None).is_none());
        assert_eq!(ip_label(None), "IP: unknown");
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(3_725), "01:02:05");
        assert_eq!(format_elapsed(100 * 3600), "100:00:00");
        assert_eq!(connection_duration(200, 100), 0);
    }

    #[test]
    fn session_stats_without_adapter() {
        let stats = SessionStats::from_parts(None, Some(1_000), 1_065);
        assert_eq!(stats.sent, "-");
        assert_eq!(stats.received, "-");
        assert_eq!(stats.elapsed, "00:01:05");

        let stats = SessionStats::from_parts(
            Some(TransferStats {
                received: 2048,
                sent: 0,
            }),
            None,
            0,
        );
        assert_eq!(stats.received, "2.0 KB");
        assert_eq!(stats.sent, "0B");
        assert_eq!(stats.elapsed, "");
    }
}
