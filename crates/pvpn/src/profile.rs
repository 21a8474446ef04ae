//! The user's VPN profile: credentials plus the connection preferences the
//! CLI keeps in its `[USER]` section.

use crate::config::{CliConfig, USER};
use crate::error::CliError;
use crate::utils::{change_file_owner, CliPaths};
use std::fmt;
use std::path::Path;

pub const MAX_DNS_SERVERS: usize = 3;
pub const MAX_SPLIT_TUNNEL_ENTRIES: usize = 1;

pub const KILL_SWITCH_NOTICE: &str = "By enabling the Kill Switch,\nSplit Tunneling will be disabled.";
pub const SPLIT_TUNNEL_NOTICE: &str = "By enabling Split Tunneling,\nthe Kill Switch will be disabled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plan {
    #[default]
    Free,
    Basic,
    PlusVisionary,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Basic, Plan::PlusVisionary];

    pub fn tier(&self) -> u8 {
        match self {
            Plan::Free => 0,
            Plan::Basic => 1,
            Plan::PlusVisionary => 2,
        }
    }

    pub fn from_tier(tier: u8) -> Self {
        match tier {
            1 => Plan::Basic,
            2 => Plan::PlusVisionary,
            _ => Plan::Free,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Plan::Free => "Free",
            Plan::Basic => "Basic",
            Plan::PlusVisionary => "Plus/Visionary",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Udp, Protocol::Tcp];

    /// Value written to `default_protocol` and passed to `-p`.
    pub fn as_cli_arg(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }

    pub fn from_cli_arg(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "udp" => Some(Protocol::Udp),
            "tcp" => Some(Protocol::Tcp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnsMode {
    #[default]
    LeakProtection,
    Custom,
    None,
}

impl DnsMode {
    pub const ALL: [DnsMode; 3] = [DnsMode::LeakProtection, DnsMode::Custom, DnsMode::None];

    pub fn leak_protection_value(&self) -> u8 {
        match self {
            DnsMode::LeakProtection => 1,
            DnsMode::Custom | DnsMode::None => 0,
        }
    }
}

impl fmt::Display for DnsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DnsMode::LeakProtection => "Enable Leak Protection",
            DnsMode::Custom => "Custom DNS Servers",
            DnsMode::None => "None",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KillSwitch {
    #[default]
    Disabled,
    BlockLan,
    AllowLan,
}

impl KillSwitch {
    pub const ALL: [KillSwitch; 3] = [KillSwitch::Disabled, KillSwitch::BlockLan, KillSwitch::AllowLan];

    pub fn value(&self) -> u8 {
        match self {
            KillSwitch::Disabled => 0,
            KillSwitch::BlockLan => 1,
            KillSwitch::AllowLan => 2,
        }
    }

    pub fn from_value(value: u8) -> Self {
        match value {
            1 => KillSwitch::BlockLan,
            2 => KillSwitch::AllowLan,
            _ => KillSwitch::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != KillSwitch::Disabled
    }
}

impl fmt::Display for KillSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KillSwitch::Disabled => "Disable",
            KillSwitch::BlockLan => "Enable - Block LAN",
            KillSwitch::AllowLan => "Enable - Allow LAN",
        })
    }
}

/// Fields of the profile form that differ from the saved profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Password changed; username and passfile are rewritten together.
    Credentials,
    Username,
    Plan,
    Protocol,
    Dns,
    CustomDns,
    KillSwitch,
    SplitTunnel,
    SplitTunnelIps,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub username: String,
    pub password: String,
    pub plan: Plan,
    pub protocol: Protocol,
    pub dns: DnsMode,
    /// Space-separated addresses, only meaningful with [`DnsMode::Custom`].
    pub custom_dns: String,
    pub kill_switch: KillSwitch,
    pub split_tunnel: bool,
    pub split_tunnel_ips: String,
}

impl Profile {
    /// Reads the saved profile. `None` until the profile has been initialized.
    pub fn load(paths: &CliPaths) -> Result<Option<Self>, CliError> {
        let config = match CliConfig::load(&paths.config_file) {
            Ok(config) => config,
            Err(CliError::MissingConfig { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if !config.is_initialized() {
            return Ok(None);
        }

        let password = match std::fs::read_to_string(&paths.passfile) {
            Ok(content) => content.lines().nth(1).unwrap_or_default().to_string(),
            Err(e) => {
                log::warn!("Could not read passfile: {}", e);
                String::new()
            }
        };

        let custom_dns = config.get_opt(USER, "custom_dns").unwrap_or_default().to_string();
        let dns = match config.get_parsed::<u8>(USER, "dns_leak_protection")? {
            Some(0) if custom_dns.is_empty() => DnsMode::None,
            Some(0) => DnsMode::Custom,
            _ => DnsMode::LeakProtection,
        };

        let split_tunnel_ips = match std::fs::read_to_string(&paths.split_tunnel_file) {
            Ok(content) => content.lines().map(str::trim).collect::<Vec<_>>().join(" ").trim().to_string(),
            Err(_) => String::new(),
        };

        Ok(Some(Self {
            username: config.get_opt(USER, "username").unwrap_or_default().to_string(),
            password,
            plan: Plan::from_tier(config.tier()),
            protocol: config
                .default_protocol()
                .and_then(Protocol::from_cli_arg)
                .unwrap_or_default(),
            dns,
            custom_dns: if dns == DnsMode::Custom { custom_dns } else { String::new() },
            kill_switch: KillSwitch::from_value(config.get_parsed(USER, "killswitch")?.unwrap_or(0)),
            split_tunnel: config.get_parsed::<u8>(USER, "split_tunnel")?.unwrap_or(0) == 1,
            split_tunnel_ips,
        }))
    }

    pub fn set_dns(&mut self, mode: DnsMode) {
        self.dns = mode;
        if mode != DnsMode::Custom {
            self.custom_dns.clear();
        }
    }

    /// Returns true when split tunneling had to be turned off.
    pub fn set_kill_switch(&mut self, kill_switch: KillSwitch) -> bool {
        self.kill_switch = kill_switch;
        if kill_switch.is_enabled() && self.split_tunnel {
            self.split_tunnel = false;
            self.split_tunnel_ips.clear();
            return true;
        }
        false
    }

    /// Returns true when the kill switch had to be turned off.
    pub fn set_split_tunnel(&mut self, enabled: bool) -> bool {
        self.split_tunnel = enabled;
        if !enabled {
            self.split_tunnel_ips.clear();
            return false;
        }
        if self.kill_switch.is_enabled() {
            self.kill_switch = KillSwitch::Disabled;
            return true;
        }
        false
    }

    pub fn missing_fields(&self, password_confirm: &str) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.is_empty() {
            missing.push("Username");
        }
        if self.password.is_empty() {
            missing.push("Password");
        } else if password_confirm.is_empty() {
            missing.push("Password Confirmation");
        }
        if self.dns == DnsMode::Custom && self.custom_dns.trim().is_empty() {
            missing.push("Custom DNS Servers");
        }
        if self.split_tunnel && self.split_tunnel_ips.trim().is_empty() {
            missing.push("Split Tunneling IP");
        }
        missing
    }

    pub fn passwords_match(&self, password_confirm: &str) -> bool {
        self.password == password_confirm
    }

    /// Checks the address lists the CLI will hand to OpenVPN.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.dns == DnsMode::Custom {
            validate_ip_list(&self.custom_dns, MAX_DNS_SERVERS)?;
        }
        if self.split_tunnel {
            validate_ip_list(&self.split_tunnel_ips, MAX_SPLIT_TUNNEL_ENTRIES)?;
        }
        Ok(())
    }

    pub fn changes(&self, baseline: &Profile) -> Vec<Change> {
        let mut changes = Vec::new();
        if self.password != baseline.password {
            changes.push(Change::Credentials);
        } else if self.username != baseline.username {
            changes.push(Change::Username);
        }
        if self.plan != baseline.plan {
            changes.push(Change::Plan);
        }
        if self.protocol != baseline.protocol {
            changes.push(Change::Protocol);
        }
        if self.dns != baseline.dns {
            changes.push(Change::Dns);
        }
        if self.dns == DnsMode::Custom && self.custom_dns.trim() != baseline.custom_dns.trim() {
            changes.push(Change::CustomDns);
        }
        if self.kill_switch != baseline.kill_switch {
            changes.push(Change::KillSwitch);
        }
        if self.split_tunnel != baseline.split_tunnel {
            changes.push(Change::SplitTunnel);
        }
        if self.split_tunnel_ips.trim() != baseline.split_tunnel_ips.trim() {
            changes.push(Change::SplitTunnelIps);
        }
        changes
    }

    /// Writes the whole profile and marks it initialized.
    pub fn save(&self, paths: &CliPaths) -> Result<(), CliError> {
        paths.ensure_dir()?;
        let mut config = if paths.config_file.is_file() {
            CliConfig::load(&paths.config_file)?
        } else {
            CliConfig::initialize(&paths.config_file)?
        };

        config.set(USER, "username", &self.username);
        config.set(USER, "tier", self.plan.tier());
        config.set(USER, "default_protocol", self.protocol.as_cli_arg());
        config.set(USER, "dns_leak_protection", self.dns.leak_protection_value());
        let custom_dns = self.custom_dns.split_whitespace().collect::<Vec<_>>().join(" ");
        config.set_opt(
            USER,
            "custom_dns",
            Some(custom_dns.as_str()).filter(|d| self.dns == DnsMode::Custom && !d.is_empty()),
        );
        config.set(USER, "killswitch", self.kill_switch.value());
        config.set(USER, "split_tunnel", u8::from(self.split_tunnel));
        config.set(USER, "initialized", 1);
        config.save()?;

        write_passfile(&paths.passfile, &self.username, &self.password)?;
        self.write_split_tunnel_file(&paths.split_tunnel_file)?;

        for file in [&paths.dir, &paths.config_file, &paths.passfile] {
            if let Err(e) = change_file_owner(file) {
                log::warn!("{}", e);
            }
        }
        log::info!("VPN profile saved");
        Ok(())
    }

    fn write_split_tunnel_file(&self, path: &Path) -> Result<(), CliError> {
        if self.split_tunnel {
            let mut content = self.split_tunnel_ips.split_whitespace().collect::<Vec<_>>().join("\n");
            content.push('\n');
            std::fs::write(path, content)
                .map_err(|e| CliError::io(format!("Writing {}", path.display()), e))?;
            if let Err(e) = change_file_owner(path) {
                log::warn!("{}", e);
            }
        } else if path.exists() {
            std::fs::remove_file(path)
                .map_err(|e| CliError::io(format!("Removing {}", path.display()), e))?;
            log::debug!("Split tunnel file removed");
        }
        Ok(())
    }
}

/// Writes `username\npassword`, readable by the owner only.
fn write_passfile(path: &Path, username: &str, password: &str) -> Result<(), CliError> {
    std::fs::write(path, format!("{}\n{}", username, password))
        .map_err(|e| CliError::io(format!("Writing {}", path.display()), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CliError::io(format!("Securing {}", path.display()), e))?;
    }
    log::debug!("Passfile updated");
    Ok(())
}

/// Dotted IPv4 address with an optional `/1`..`/32` prefix length.
pub fn is_valid_ipv4_entry(entry: &str) -> bool {
    let (addr, prefix) = match entry.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (entry, None),
    };
    let octets: Vec<&str> = addr.split('.').collect();
    let octet_ok = |o: &&str| {
        (1..=3).contains(&o.len())
            && o.bytes().all(|b| b.is_ascii_digit())
            && o.parse::<u16>().is_ok_and(|v| v <= 255)
    };
    if octets.len() != 4 || !octets.iter().all(octet_ok) {
        return false;
    }
    match prefix {
        None => true,
        Some(p) => {
            !p.is_empty()
                && p.len() <= 2
                && p.bytes().all(|b| b.is_ascii_digit())
                && !p.starts_with('0')
                && matches!(p.parse::<u8>(), Ok(1..=32))
        }
    }
}

pub fn validate_ip_list(list: &str, max: usize) -> Result<(), CliError> {
    let entries: Vec<&str> = list.split_whitespace().collect();
    if entries.len() > max {
        return Err(CliError::Profile {
            message: "Max allowed number of IPs exceeded.".to_string(),
        });
    }
    if entries.iter().any(|e| !is_valid_ipv4_entry(e)) {
        return Err(CliError::Profile {
            message: "Invalid IPv4 address".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Profile {
        Profile {
            username: "someone".to_string(),
            password: "hunter2".to_string(),
            plan: Plan::PlusVisionary,
            protocol: Protocol::Tcp,
            ..Profile::default()
        }
    }

    #[test]
    fn option_values_match_cli() {
        assert_eq!(Plan::from_tier(2), Plan::PlusVisionary);
        assert_eq!(Plan::Basic.tier(), 1);
        assert_eq!(DnsMode::Custom.leak_protection_value(), 0);
        assert_eq!(KillSwitch::AllowLan.value(), 2);
        assert_eq!(KillSwitch::BlockLan.to_string(), "Enable - Block LAN");
        assert_eq!(Protocol::from_cli_arg("TCP"), Some(Protocol::Tcp));
    }

    #[test]
    fn ip_entries() {
        assert!(is_valid_ipv4_entry("10.8.8.1"));
        assert!(is_valid_ipv4_entry("192.168.1.0/24"));
        assert!(is_valid_ipv4_entry("10.0.0.0/8"));
        assert!(!is_valid_ipv4_entry("10.0.0.0/0"));
        assert!(!is_valid_ipv4_entry("10.0.0.0/33"));
        assert!(!is_valid_ipv4_entry("10.0.0.0/"));
        assert!(!is_valid_ipv4_entry("256.1.1.1"));
        assert!(!is_valid_ipv4_entry("1.1.1"));
        assert!(!is_valid_ipv4_entry("dns.example"));
    }

    #[test]
    fn ip_entries_allow_leading_zero_octets() {
        assert!(is_valid_ipv4_entry("010.0.0.1"));
        assert!(is_valid_ipv4_entry("001.002.003.004/16"));
        assert!(is_valid_ipv4_entry("0.0.0.0"));
        assert!(!is_valid_ipv4_entry("0010.0.0.1"));
        assert!(!is_valid_ipv4_entry("1.2.3.4.5"));
        assert!(!is_valid_ipv4_entry("1..3.4"));
        assert!(!is_valid_ipv4_entry("+1.2.3.4"));
        assert!(validate_ip_list("010.0.0.1 8.8.8.8", MAX_DNS_SERVERS).is_ok());
    }

    #[test]
    fn ip_list_limits() {
        assert!(validate_ip_list("1.1.1.1 8.8.8.8 9.9.9.9", MAX_DNS_SERVERS).is_ok());
        let err = validate_ip_list("1.1.1.1 8.8.8.8 9.9.9.9 1.0.0.1", MAX_DNS_SERVERS).unwrap_err();
        assert_eq!(err.to_string(), "Max allowed number of IPs exceeded.");
        let err = validate_ip_list("1.1.1.1 8.8.8", MAX_DNS_SERVERS).unwrap_err();
        assert_eq!(err.to_string(), "Invalid IPv4 address");
    }

    #[test]
    fn missing_fields_follow_selected_options() {
        let empty = Profile::default();
        assert_eq!(empty.missing_fields(""), vec!["Username", "Password"]);

        let mut profile = filled();
        assert_eq!(profile.missing_fields(""), vec!["Password Confirmation"]);
        profile.set_dns(DnsMode::Custom);
        profile.set_split_tunnel(true);
        assert_eq!(
            profile.missing_fields("hunter2"),
            vec!["Custom DNS Servers", "Split Tunneling IP"]
        );
        assert!(profile.passwords_match("hunter2"));
        assert!(!profile.passwords_match("hunter3"));
    }

    #[test]
    fn kill_switch_and_split_tunnel_exclude_each_other() {
        let mut profile = filled();
        assert!(!profile.set_split_tunnel(true));
        profile.split_tunnel_ips = "192.168.1.0/24".to_string();

        assert!(profile.set_kill_switch(KillSwitch::BlockLan));
        assert!(!profile.split_tunnel);
        assert!(profile.split_tunnel_ips.is_empty());

        assert!(profile.set_split_tunnel(true));
        assert_eq!(profile.kill_switch, KillSwitch::Disabled);
        assert!(!profile.set_kill_switch(KillSwitch::Disabled));
    }

    #[test]
    fn changes_against_baseline() {
        let baseline = filled();
        let mut edited = baseline.clone();
        assert!(edited.changes(&baseline).is_empty());

        edited.username = "other".to_string();
        assert_eq!(edited.changes(&baseline), vec![Change::Username]);

        edited.password = "new".to_string();
        edited.set_dns(DnsMode::Custom);
        edited.custom_dns = "1.1.1.1".to_string();
        assert_eq!(
            edited.changes(&baseline),
            vec![Change::Credentials, Change::Dns, Change::CustomDns]
        );
    }

    #[test]
    fn uninitialized_profile_loads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CliPaths::in_dir(tmp.path().join(".pvpn-cli"));
        assert_eq!(Profile::load(&paths).unwrap(), None);

        paths.ensure_dir().unwrap();
        CliConfig::initialize(&paths.config_file).unwrap();
        assert_eq!(Profile::load(&paths).unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CliPaths::in_dir(tmp.path().join(".pvpn-cli"));

        let mut profile = filled();
        profile.set_dns(DnsMode::Custom);
        profile.custom_dns = "1.1.1.1  9.9.9.9".to_string();
        profile.set_split_tunnel(true);
        profile.split_tunnel_ips = "192.168.1.0/24".to_string();
        profile.save(&paths).unwrap();

        assert!(paths.has_required_files());
        assert_eq!(
            std::fs::read_to_string(&paths.passfile).unwrap(),
            "someone\nhunter2"
        );
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&paths.passfile).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let config = CliConfig::load(&paths.config_file).unwrap();
        assert_eq!(config.get(USER, "tier"), Some("2"));
        assert_eq!(config.get(USER, "default_protocol"), Some("tcp"));
        assert_eq!(config.get(USER, "dns_leak_protection"), Some("0"));
        assert_eq!(config.get(USER, "custom_dns"), Some("1.1.1.1 9.9.9.9"));
        assert_eq!(config.get(USER, "split_tunnel"), Some("1"));
        assert!(config.is_initialized());

        let loaded = Profile::load(&paths).unwrap().unwrap();
        assert_eq!(loaded.dns, DnsMode::Custom);
        assert_eq!(loaded.custom_dns, "1.1.1.1 9.9.9.9");
        assert_eq!(loaded.split_tunnel_ips, "192.168.1.0/24");
        assert_eq!(loaded.password, "hunter2");
        assert_eq!(loaded.protocol, Protocol::Tcp);
    }

    #[test]
    fn disabling_split_tunnel_removes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CliPaths::in_dir(tmp.path().join(".pvpn-cli"));

        let mut profile = filled();
        profile.set_split_tunnel(true);
        profile.split_tunnel_ips = "10.0.0.0/8".to_string();
        profile.save(&paths).unwrap();
        assert!(paths.split_tunnel_file.is_file());

        profile.set_split_tunnel(false);
        profile.save(&paths).unwrap();
        assert!(!paths.split_tunnel_file.exists());

        let loaded = Profile::load(&paths).unwrap().unwrap();
        assert!(!loaded.split_tunnel);
        assert_eq!(loaded.dns, DnsMode::LeakProtection);
        assert_eq!(loaded.kill_switch, KillSwitch::Disabled);
    }
}
