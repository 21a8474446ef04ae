//! Runs the `protonvpn` command-line client.
//!
//! The client refuses to run without root, so every command except
//! `--version` goes through an escalation tool unless we already are root.

use crate::countries;
use crate::error::CliError;
use crate::servers;
use crate::utils::is_root;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use which::which;

pub const DEFAULT_PROGRAM: &str = "protonvpn";

/// Supported escalation tools, in order of preference.
pub const ESCALATION_TOOLS: [&str; 4] = ["sudo", "sudo-rs", "pkexec", "doas"];

/// Returns the basename of a tool path (e.g. "/usr/bin/sudo" → "sudo").
fn tool_base_name(tool: &str) -> &str {
    Path::new(tool)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(tool)
}

/// Returns the escalation tools installed on this system.
pub fn available_escalation_tools() -> Vec<&'static str> {
    ESCALATION_TOOLS
        .iter()
        .copied()
        .filter(|&t| which(t).is_ok())
        .collect()
}

/// What a connect command should aim for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    Fastest,
    Random,
    Country { code: String },
    Server { name: String },
    /// `connect --fastest`, using the CLI's own default protocol.
    QuickFastest,
    /// `connect --sc`, using the CLI's own default protocol.
    QuickSecureCore,
}

impl ConnectTarget {
    pub fn args(&self, protocol: &str) -> Vec<String> {
        let args: Vec<&str> = match self {
            ConnectTarget::Fastest => vec!["c", "-f", "-p", protocol],
            ConnectTarget::Random => vec!["c", "-r", "-p", protocol],
            ConnectTarget::Country { code } => {
                return vec![
                    "connect".to_string(),
                    "--cc".to_string(),
                    code.to_uppercase(),
                    "-p".to_string(),
                    protocol.to_string(),
                ];
            }
            ConnectTarget::Server { name } => vec!["c", name.as_str(), "-p", protocol],
            ConnectTarget::QuickFastest => vec!["connect", "--fastest"],
            ConnectTarget::QuickSecureCore => vec!["connect", "--sc"],
        };
        args.into_iter().map(String::from).collect()
    }

    /// Text shown in the "Connecting to ..." notice.
    pub fn describe(&self) -> String {
        match self {
            ConnectTarget::Fastest => "the fastest server".to_string(),
            ConnectTarget::Random => "a random server".to_string(),
            ConnectTarget::Country { code } => {
                format!("the fastest server in {}", countries::display_name(code))
            }
            ConnectTarget::Server { name } => format!("server {}", name),
            ConnectTarget::QuickFastest => "the fastest server...".to_string(),
            ConnectTarget::QuickSecureCore => "the fastest Secure Core server...".to_string(),
        }
    }
}

/// Parsed output of `protonvpn status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    fields: Vec<(String, String)>,
}

impl StatusReport {
    /// Reads `Key: Value` lines, ignoring anything else the CLI prints.
    pub fn parse(output: &str) -> Self {
        let fields = output
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.get("Status") == Some("Connected")
    }

    /// Public IP: the VPN exit while connected, the ISP address otherwise.
    pub fn exit_ip(&self) -> Option<&str> {
        self.get("IP").or_else(|| self.get("Exit IP"))
    }
}

#[derive(Debug, Clone)]
pub struct ProtonCli {
    program: PathBuf,
    escalation_tool: String,
}

impl ProtonCli {
    /// Resolves the client executable.
    ///
    /// 1. `user_path` pointing directly at a file.
    /// 2. `user_path` looked up on PATH.
    /// 3. The usual install directories.
    pub fn locate(user_path: &str, escalation_tool: &str) -> Result<Self, CliError> {
        let candidate = Path::new(user_path);
        let program = if candidate.is_file() {
            Some(candidate.to_path_buf())
        } else if let Ok(found) = which(user_path) {
            Some(found)
        } else {
            let name = tool_base_name(user_path);
            ["/usr/local/bin", "/usr/bin", "/usr/sbin", "/sbin"]
                .iter()
                .map(|dir| Path::new(dir).join(name))
                .find(|p| p.is_file())
        };

        let program = program.ok_or_else(|| CliError::CliNotFound {
            program: user_path.to_string(),
        })?;
        log::debug!("Using ProtonVPN CLI at {:?}", program);

        Ok(Self {
            program,
            escalation_tool: escalation_tool.to_string(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn escalation_tool(&self) -> &str {
        &self.escalation_tool
    }

    /// Program and arguments for one invocation.
    fn invocation(&self, args: &[String], as_root: bool) -> (String, Vec<String>) {
        let program = self.program.display().to_string();
        if as_root {
            return (program, args.to_vec());
        }

        let mut full = Vec::with_capacity(args.len() + 2);
        if matches!(tool_base_name(&self.escalation_tool), "sudo" | "sudo-rs") {
            // Never block on a password prompt nobody can see.
            full.push("-n".to_string());
        }
        full.push(program);
        full.extend(args.iter().cloned());
        (self.escalation_tool.clone(), full)
    }

    /// Runs the client with `args` and returns its stdout.
    pub fn run(&self, args: &[String]) -> Result<String, CliError> {
        self.run_as(args, is_root())
    }

    fn run_as(&self, args: &[String], as_root: bool) -> Result<String, CliError> {
        let (program, full_args) = self.invocation(args, as_root);
        let command_line = format!("{} {}", DEFAULT_PROGRAM, args.join(" "));
        log::info!("Running: {} {}", program, full_args.join(" "));

        let output = Command::new(&program)
            .args(&full_args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CliError::CliNotFound {
                    program: program.clone(),
                },
                _ => CliError::io(format!("Starting {}", program), e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            log::debug!("{} finished: {}", command_line, stdout.trim());
            return Ok(stdout);
        }

        // The client reports most of its errors on stdout.
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let stderr = if stderr.trim().is_empty() { stdout } else { stderr };
        Err(CliError::CommandFailed {
            command: command_line,
            code: output.status.code(),
            stderr,
        })
    }

    fn run_args(&self, args: &[&str]) -> Result<String, CliError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.run(&args)
    }

    pub fn connect(&self, target: &ConnectTarget, protocol: &str) -> Result<String, CliError> {
        log::info!("Connecting to {}", target.describe());
        self.run(&target.args(protocol))
    }

    pub fn disconnect(&self) -> Result<String, CliError> {
        self.run_args(&["d"])
    }

    pub fn reconnect(&self) -> Result<String, CliError> {
        self.run_args(&["reconnect"])
    }

    /// Pulls fresh server data into `serverinfo.json`.
    pub fn refresh(&self) -> Result<String, CliError> {
        self.run_args(&["refresh"])
    }

    pub fn status(&self) -> Result<StatusReport, CliError> {
        self.run_args(&["status"]).map(|out| StatusReport::parse(&out))
    }

    /// `protonvpn --version`, which needs no privileges.
    pub fn version(&self) -> Result<String, CliError> {
        let out = self.run_as(&["--version".to_string()], true)?;
        Ok(out.trim().to_string())
    }

    /// Connects to the fastest Secure Core server exiting in `country_code`.
    ///
    /// The CLI has no such command, so this disconnects, pulls fresh server
    /// data, picks the server from `server_info` and connects to it by name.
    /// Returns the chosen server's name.
    pub fn connect_fastest_secure_core_in(
        &self,
        country_code: &str,
        protocol: &str,
        server_info: &Path,
    ) -> Result<String, CliError> {
        if let Err(e) = self.disconnect() {
            log::warn!("Disconnect before Secure Core connect failed: {}", e);
        }
        self.refresh()?;

        let all = servers::load_servers(server_info)?;
        let pool = servers::secure_core_pool(&all, country_code);
        let server = servers::fastest_server(&pool, &mut rand::thread_rng()).ok_or_else(|| {
            CliError::ServerData {
                message: format!(
                    "no Secure Core servers for {}",
                    countries::display_name(country_code)
                ),
            }
        })?;

        let target = ConnectTarget::Server {
            name: server.name.clone(),
        };
        self.connect(&target, protocol)?;
        Ok(server.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(tool: &str) -> ProtonCli {
        ProtonCli {
            program: PathBuf::from("/usr/bin/protonvpn"),
            escalation_tool: tool.to_string(),
        }
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn connect_targets_map_to_cli_arguments() {
        assert_eq!(ConnectTarget::Fastest.args("udp"), strings(&["c", "-f", "-p", "udp"]));
        assert_eq!(ConnectTarget::Random.args("tcp"), strings(&["c", "-r", "-p", "tcp"]));
        assert_eq!(
            ConnectTarget::Country { code: "ch".into() }.args("udp"),
            strings(&["connect", "--cc", "CH", "-p", "udp"])
        );
        assert_eq!(
            ConnectTarget::Server { name: "CH-NL#1".into() }.args("udp"),
            strings(&["c", "CH-NL#1", "-p", "udp"])
        );
        assert_eq!(ConnectTarget::QuickFastest.args("udp"), strings(&["connect", "--fastest"]));
        assert_eq!(ConnectTarget::QuickSecureCore.args("udp"), strings(&["connect", "--sc"]));
    }

    #[test]
    fn targets_describe_themselves() {
        assert_eq!(
            ConnectTarget::Country { code: "NL".into() }.describe(),
            "the fastest server in Netherlands"
        );
        assert_eq!(
            ConnectTarget::Server { name: "IS#3".into() }.describe(),
            "server IS#3"
        );
    }

    #[test]
    fn sudo_runs_non_interactively() {
        let (program, args) = cli("sudo").invocation(&strings(&["d"]), false);
        assert_eq!(program, "sudo");
        assert_eq!(args, strings(&["-n", "/usr/bin/protonvpn", "d"]));

        let (program, args) = cli("/usr/bin/sudo-rs").invocation(&strings(&["d"]), false);
        assert_eq!(program, "/usr/bin/sudo-rs");
        assert_eq!(args[0], "-n");
    }

    #[test]
    fn graphical_tools_get_no_extra_flags() {
        let (program, args) = cli("pkexec").invocation(&strings(&["refresh"]), false);
        assert_eq!(program, "pkexec");
        assert_eq!(args, strings(&["/usr/bin/protonvpn", "refresh"]));
    }

    #[test]
    fn root_runs_directly() {
        let (program, args) = cli("sudo").invocation(&strings(&["status"]), true);
        assert_eq!(program, "/usr/bin/protonvpn");
        assert_eq!(args, strings(&["status"]));
    }

    #[test]
    fn parses_connected_status() {
        let report = StatusReport::parse(
            "Status:       Connected\n\
             Time:         0:01:05\n\
             IP:           185.159.157.12\n\
             Server:       CH-NL#1\n\
             Features:     Secure-Core\n\
             Protocol:     UDP\n\
             Load:         23%\n",
        );
        assert!(report.is_connected());
        assert_eq!(report.get("Time"), Some("0:01:05"));
        assert_eq!(report.get("server"), Some("CH-NL#1"));
        assert_eq!(report.exit_ip(), Some("185.159.157.12"));
    }

    #[test]
    fn parses_disconnected_status() {
        let report = StatusReport::parse(
            "[!] Not connected\nStatus:     Disconnected\nExit IP:    203.0.113.7\n",
        );
        assert!(!report.is_connected());
        assert_eq!(report.exit_ip(), Some("203.0.113.7"));
        assert_eq!(StatusReport::parse("").exit_ip(), None);
    }

    #[test]
    fn locate_accepts_literal_path() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("protonvpn");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();

        let cli = ProtonCli::locate(exe.to_str().unwrap(), "sudo").unwrap();
        assert_eq!(cli.program(), exe.as_path());
        assert_eq!(cli.escalation_tool(), "sudo");
    }

    #[test]
    fn locate_reports_missing_cli() {
        let err = ProtonCli::locate("/nonexistent/dir/pvpn-test-binary", "sudo").unwrap_err();
        assert!(matches!(err, CliError::CliNotFound { .. }));
    }

    #[test]
    fn failing_command_carries_exit_code() {
        let cli = ProtonCli {
            program: PathBuf::from("false"),
            escalation_tool: "sudo".to_string(),
        };
        let err = cli.run_as(&strings(&["status"]), true).unwrap_err();
        match err {
            CliError::CommandFailed { command, code, .. } => {
                assert_eq!(command, "protonvpn status");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// A stand-in client that appends its arguments to `calls.log`.
    #[cfg(unix)]
    fn recording_cli(dir: &Path) -> ProtonCli {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("protonvpn");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\n",
                dir.join("calls.log").display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        // `env` just runs the program, with or without root.
        ProtonCli::locate(script.to_str().unwrap(), "env").unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn secure_core_connect_picks_best_score_in_exit_country() {
        let tmp = tempfile::tempdir().unwrap();
        let server_info = tmp.path().join("serverinfo.json");
        std::fs::write(&server_info, crate::servers::tests::SAMPLE).unwrap();
        let cli = recording_cli(tmp.path());

        let name = cli
            .connect_fastest_secure_core_in("nl", "udp", &server_info)
            .unwrap();
        // IS-NL#1 (0.7) beats CH-NL#1 (0.9); NL#7 is not Secure Core.
        assert_eq!(name, "IS-NL#1");

        let log = std::fs::read_to_string(tmp.path().join("calls.log")).unwrap();
        let calls: Vec<&str> = log.lines().collect();
        assert_eq!(calls, vec!["d", "refresh", "c IS-NL#1 -p udp"]);
    }

    #[cfg(unix)]
    #[test]
    fn secure_core_connect_without_pool_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let server_info = tmp.path().join("serverinfo.json");
        std::fs::write(&server_info, crate::servers::tests::SAMPLE).unwrap();
        let cli = recording_cli(tmp.path());

        let err = cli
            .connect_fastest_secure_core_in("is", "udp", &server_info)
            .unwrap_err();
        assert!(matches!(err, CliError::ServerData { .. }));
    }
}
