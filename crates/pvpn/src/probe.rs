//! Cheap, unprivileged checks run on every poll tick.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use which::which;

/// Tunnel adapters, in the order they are tried.
pub const TUNNEL_INTERFACES: [&str; 2] = ["proton0", "tun0"];

pub const SYS_ROOT: &str = "/sys";

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// True when an `openvpn` process exists. A missing `pgrep` counts as not running.
pub fn is_openvpn_running() -> bool {
    let Ok(pgrep) = which("pgrep") else {
        log::warn!("pgrep not found; assuming no VPN connection");
        return false;
    };
    Command::new(pgrep)
        .args(["--exact", "openvpn"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map(|out| !String::from_utf8_lossy(&out.stdout).trim().is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    pub received: u64,
    pub sent: u64,
}

fn statistics_dir(sys_root: &Path, interface: &str) -> PathBuf {
    sys_root
        .join("class/net")
        .join(interface)
        .join("statistics")
}

/// The first tunnel adapter that exists under `sys_root`.
pub fn active_interface(sys_root: &Path) -> Option<&'static str> {
    TUNNEL_INTERFACES
        .iter()
        .copied()
        .find(|iface| statistics_dir(sys_root, iface).is_dir())
}

fn read_counter(path: &Path) -> Option<u64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Byte counters of the tunnel adapter, `None` without one.
pub fn read_transfer_stats(sys_root: &Path) -> Option<TransferStats> {
    let iface = active_interface(sys_root)?;
    let dir = statistics_dir(sys_root, iface);
    Some(TransferStats {
        received: read_counter(&dir.join("rx_bytes"))?,
        sent: read_counter(&dir.join("tx_bytes"))?,
    })
}

/// Human-readable size in powers of 1024, e.g. `1.46 MB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut exp = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exp < UNITS.len() - 1 {
        scaled /= 1024;
        exp += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;

    let mut number = format!("{:.2}", rounded);
    while number.ends_with('0') && !number.ends_with(".0") {
        number.pop();
    }
    format!("{} {}", number, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_adapter(root: &Path, iface: &str, rx: u64, tx: u64) {
        let dir = statistics_dir(root, iface);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("rx_bytes"), format!("{}\n", rx)).unwrap();
        std::fs::write(dir.join("tx_bytes"), format!("{}\n", tx)).unwrap();
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1), "1.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_530_000), "1.46 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn prefers_proton_adapter() {
        let tmp = tempfile::tempdir().unwrap();
        fake_adapter(tmp.path(), "tun0", 1, 2);
        assert_eq!(active_interface(tmp.path()), Some("tun0"));

        fake_adapter(tmp.path(), "proton0", 2048, 512);
        assert_eq!(active_interface(tmp.path()), Some("proton0"));
        assert_eq!(
            read_transfer_stats(tmp.path()),
            Some(TransferStats {
                received: 2048,
                sent: 512
            })
        );
    }

    #[test]
    fn no_adapter_no_stats() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(active_interface(tmp.path()), None);
        assert_eq!(read_transfer_stats(tmp.path()), None);
    }
}
