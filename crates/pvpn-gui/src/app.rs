use futures::SinkExt;
use iced::{Subscription, Task};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tray_icon::{menu::MenuEvent, TrayIconEvent};

use pvpn::cli::{available_escalation_tools, ConnectTarget, ESCALATION_TOOLS};
use pvpn::countries;
use pvpn::monitor::{
    ConnectionDetails, ConnectionMonitor, SessionStats, Snapshot, Transition,
};
use pvpn::probe::SYS_ROOT;
use pvpn::profile::{Profile, Protocol, KILL_SWITCH_NOTICE, SPLIT_TUNNEL_NOTICE};
use pvpn::servers::{self, CountryNode, LogicalServer};
use pvpn::{CliConfig, CliError, CliPaths, ProtonCli};

use crate::config::GuiSettings;
use crate::logger::GUI_LOGGER;
use crate::notifications::send_notification;
use crate::tray::{update_tray, TrayComponents};
use crate::types::{
    level_tag, log_level_from_slider, parse_log_line, Message, Popup, Screen, ServerData,
    CONSOLE_CAPACITY, MISSING_FIELDS_DURATION_MS, NOTICE_DURATION_MS,
    RECONNECT_NOTICE_DURATION_MS, WELCOME_DURATION_MS,
};

/// How often the server list is pulled from the API and rebuilt.
const SERVER_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Runs blocking work (subprocesses, file IO) off the UI thread.
fn blocking<T, F>(work: F) -> impl Future<Output = Result<T, CliError>>
where
    F: FnOnce() -> Result<T, CliError> + Send + 'static,
    T: Send + 'static,
{
    async move {
        match tokio::task::spawn_blocking(work).await {
            Ok(result) => result,
            Err(e) => Err(CliError::Io {
                context: "Background task".to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Like [`blocking`] for work that cannot fail.
fn blocking_infallible<T, F>(work: F, fallback: T) -> impl Future<Output = T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    async move { tokio::task::spawn_blocking(work).await.unwrap_or(fallback) }
}

/// Reads the account values and the server catalogue, pulling fresh data
/// through the CLI first when asked to or when there is no cached copy.
fn load_server_data(
    cli: Option<&ProtonCli>,
    paths: &CliPaths,
    refresh: bool,
) -> Result<ServerData, CliError> {
    if refresh || !paths.server_info.is_file() {
        match cli {
            Some(cli) => {
                if let Err(e) = cli.refresh() {
                    log::warn!("Server refresh failed: {}", e);
                }
            }
            None => log::warn!("Skipping server refresh, ProtonVPN CLI not available"),
        }
    }

    let config = CliConfig::load(&paths.config_file)?;
    let servers = servers::load_servers(&paths.server_info)?;
    Ok(ServerData {
        servers,
        tier: config.tier(),
        protocol: config
            .default_protocol()
            .and_then(Protocol::from_cli_arg)
            .unwrap_or_default(),
    })
}

/// Installed privilege tools, or every supported one when none is found.
fn installed_escalation_tools() -> Vec<String> {
    let found = available_escalation_tools();
    let tools = if found.is_empty() {
        ESCALATION_TOOLS.to_vec()
    } else {
        found
    };
    tools.into_iter().map(str::to_string).collect()
}

fn current_exit_ip(cli: Option<&ProtonCli>) -> Option<String> {
    let cli = cli?;
    match cli.status() {
        Ok(report) => report.exit_ip().map(str::to_string),
        Err(e) => {
            log::warn!("Could not read connection status: {}", e);
            None
        }
    }
}

/// Details of the active connection. When the exit IP of a new connection
/// cannot be obtained the tunnel is reconnected once and the IP shows as
/// unknown.
fn collect_details(
    cli: Option<ProtonCli>,
    paths: &CliPaths,
    servers: &[LogicalServer],
    reconnect_if_unknown: bool,
) -> Option<ConnectionDetails> {
    let exit_ip = current_exit_ip(cli.as_ref());
    if exit_ip.is_none() && reconnect_if_unknown {
        if let Some(cli) = &cli {
            log::warn!("Exit IP unavailable while connected, reconnecting once");
            if let Err(e) = cli.reconnect() {
                log::error!("Reconnect failed: {}", e);
            }
        }
    }

    let config = match CliConfig::load(&paths.config_file) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return None;
        }
    };
    ConnectionDetails::collect(&config, servers, exit_ip)
}

pub struct PvpnGui {
    // Settings
    pub settings: GuiSettings,
    pub paths: CliPaths,
    pub cli: Option<ProtonCli>,
    pub cli_version: Option<String>,
    pub cli_test_result: Option<bool>,
    pub escalation_tools: Vec<String>,

    // UI State
    pub screen: Screen,
    pub previous_screen: Screen,
    pub popup: Option<Popup>,
    popup_seq: u64,
    pub logs: Vec<String>,
    welcome_done: bool,
    app_initialized: bool,

    // Server tree
    pub user_tier: u8,
    pub protocol: Protocol,
    pub servers: Vec<LogicalServer>,
    pub server_tree: Vec<CountryNode>,
    pub expanded_country: Option<String>,
    pub secure_core: bool,
    servers_loaded: bool,
    next_server_refresh: Instant,
    refresh_in_flight: bool,

    // Connection
    pub monitor: ConnectionMonitor,
    pub connection: Option<ConnectionDetails>,
    pub current_ip: Option<String>,
    pub stats: Option<SessionStats>,
    check_in_flight: bool,
    stats_in_flight: bool,
    last_notification: Option<String>,

    // VPN settings form
    pub profile: Profile,
    pub profile_baseline: Profile,
    pub password_confirm: String,
    pub show_password: bool,
    pub profile_initialized: bool,

    // Tray & Window state
    pub tray: Option<TrayComponents>,
    pub window_id: Option<iced::window::Id>,
    pub is_visible: bool,
}

impl PvpnGui {
    pub fn new(paths: CliPaths) -> Self {
        let settings = GuiSettings::load();
        GUI_LOGGER.set_level(log_level_from_slider(settings.log_level_val));

        let mut gui = Self {
            settings,
            paths,
            cli: None,
            cli_version: None,
            cli_test_result: None,
            escalation_tools: installed_escalation_tools(),
            screen: Screen::Welcome,
            previous_screen: Screen::Main,
            popup: None,
            popup_seq: 0,
            logs: Vec::new(),
            welcome_done: false,
            app_initialized: false,
            user_tier: 0,
            protocol: Protocol::default(),
            servers: Vec::new(),
            server_tree: Vec::new(),
            expanded_country: None,
            secure_core: false,
            servers_loaded: false,
            next_server_refresh: Instant::now() + SERVER_REFRESH_INTERVAL,
            refresh_in_flight: false,
            monitor: ConnectionMonitor::new(),
            connection: None,
            current_ip: None,
            stats: None,
            check_in_flight: false,
            stats_in_flight: false,
            last_notification: None,
            profile: Profile::default(),
            profile_baseline: Profile::default(),
            password_confirm: String::new(),
            show_password: false,
            profile_initialized: false,
            tray: None,
            window_id: None,
            is_visible: false,
        };
        gui.relocate_cli();
        gui
    }

    pub fn theme(&self, _id: iced::window::Id) -> iced::Theme {
        iced::Theme::Dark
    }

    pub fn is_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    pub fn profile_has_changes(&self) -> bool {
        !self.profile.changes(&self.profile_baseline).is_empty()
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save() {
            log::error!("Failed to save settings: {}", e);
        }
    }

    fn relocate_cli(&mut self) {
        match ProtonCli::locate(self.settings.cli_program(), &self.settings.escalation_tool) {
            Ok(cli) => self.cli = Some(cli),
            Err(e) => {
                log::error!("{}", e);
                self.cli = None;
            }
        }
    }

    /// Startup work once the window is up.
    pub fn start(&self) -> Task<Message> {
        Task::batch(vec![
            self.start_cli_check(),
            Task::perform(
                tokio::time::sleep(Duration::from_millis(WELCOME_DURATION_MS)),
                |_| Message::WelcomeFinished,
            ),
        ])
    }

    fn show_notice(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
        duration_ms: u64,
    ) -> Task<Message> {
        self.popup_seq += 1;
        let seq = self.popup_seq;
        self.popup = Some(Popup::Notice {
            title: title.into(),
            body: body.into(),
        });
        Task::perform(
            tokio::time::sleep(Duration::from_millis(duration_ms)),
            move |_| Message::PopupExpired(seq),
        )
    }

    fn show_confirmation(&mut self, popup: Popup) {
        self.popup_seq += 1;
        self.popup = Some(popup);
    }

    fn secure_core_confirmation_open(&self) -> bool {
        matches!(self.popup, Some(Popup::ConfirmSecureCore { .. }))
    }

    fn rebuild_tree(&mut self) {
        self.server_tree =
            servers::build_server_tree(&self.servers, self.user_tier, self.secure_core);
        if let Some(open) = &self.expanded_country {
            if !self.server_tree.iter().any(|c| &c.name == open) {
                self.expanded_country = None;
            }
        }
        log::debug!(
            "Server tree rebuilt: {} countries (secure core: {})",
            self.server_tree.len(),
            self.secure_core
        );
    }

    fn load_servers_task(&mut self, refresh: bool) -> Task<Message> {
        self.refresh_in_flight = true;
        self.next_server_refresh = Instant::now() + SERVER_REFRESH_INTERVAL;
        let cli = self.cli.clone();
        let paths = self.paths.clone();
        Task::perform(
            blocking(move || load_server_data(cli.as_ref(), &paths, refresh)),
            Message::ServerDataLoaded,
        )
    }

    fn initialize_application(&mut self) -> Task<Message> {
        log::info!("Initializing application");
        self.app_initialized = true;
        self.monitor = ConnectionMonitor::new();
        self.screen = Screen::Main;
        self.load_servers_task(false)
    }

    fn run_command<F>(&self, work: F) -> Task<Message>
    where
        F: FnOnce(ProtonCli) -> Result<String, CliError> + Send + 'static,
    {
        match self.cli.clone() {
            Some(cli) => Task::perform(blocking(move || work(cli)), Message::CommandFinished),
            None => Task::done(Message::CommandFinished(Err(CliError::CliNotFound {
                program: self.settings.cli_program().to_string(),
            }))),
        }
    }

    fn connect(&mut self, target: ConnectTarget) -> Task<Message> {
        let notice = self.show_notice(
            "New Connection",
            format!("Connecting to {}", target.describe()),
            NOTICE_DURATION_MS,
        );
        let protocol = self.protocol.as_cli_arg();
        let command = self.run_command(move |cli| cli.connect(&target, protocol));
        Task::batch(vec![notice, command])
    }

    fn disconnect(&mut self) -> Task<Message> {
        let notice = if self.secure_core_confirmation_open() {
            Task::none()
        } else {
            let from = self
                .monitor
                .last_known()
                .unwrap_or("the VPN server")
                .to_string();
            self.show_notice("Disconnecting", format!("Disconnecting from {}", from), NOTICE_DURATION_MS)
        };
        let command = self.run_command(|cli| cli.disconnect());
        Task::batch(vec![notice, command])
    }

    /// Desktop notification, sent off the UI thread.
    fn notify(&mut self, body: impl Into<String>) -> Task<Message> {
        if !self.settings.notifications {
            return Task::none();
        }
        let body = body.into();
        self.last_notification = Some(body.clone());
        Task::perform(
            blocking_infallible(move || send_notification("ProtonVPN", &body), ()),
            |_| Message::Notified,
        )
    }

    fn details_task(&self, fresh_connection: bool) -> Task<Message> {
        let cli = self.cli.clone();
        let paths = self.paths.clone();
        let servers = self.servers.clone();
        Task::perform(
            blocking_infallible(
                move || collect_details(cli, &paths, &servers, fresh_connection),
                None,
            ),
            move |details| Message::DetailsCollected {
                details,
                fresh_connection,
            },
        )
    }

    fn disconnected_ip_task(&self) -> Task<Message> {
        let cli = self.cli.clone();
        Task::perform(
            blocking_infallible(move || current_exit_ip(cli.as_ref()), None),
            Message::DisconnectedIp,
        )
    }

    /// Adopts the Secure Core mode of the connected server once after
    /// start-up. Waits for the server list, which is what tells whether the
    /// server is a Secure Core one.
    fn sync_secure_core_on_start(&mut self, connected_secure_core: Option<bool>) {
        if !self.servers_loaded || !self.monitor.take_newly_initialized() {
            return;
        }
        if let Some(secure_core) = connected_secure_core {
            if self.user_tier >= 2 && self.secure_core != secure_core {
                log::info!("Connected server is Secure Core: {}", secure_core);
                self.secure_core = secure_core;
                self.rebuild_tree();
            }
        }
    }

    fn set_tray_state(&self) {
        if let Some(tray) = &self.tray {
            update_tray(tray, self.is_connected(), self.monitor.last_known());
        }
    }

    fn open_vpn_settings(&mut self) {
        match Profile::load(&self.paths) {
            Ok(Some(profile)) => {
                self.password_confirm = profile.password.clone();
                self.profile_baseline = profile.clone();
                self.profile = profile;
                self.profile_initialized = true;
            }
            Ok(None) => {
                self.profile = Profile::default();
                self.profile_baseline = Profile::default();
                self.password_confirm.clear();
                self.profile_initialized = false;
            }
            Err(e) => {
                log::error!("Could not load VPN profile: {}", e);
                self.profile = Profile::default();
                self.profile_baseline = Profile::default();
                self.password_confirm.clear();
            }
        }
        self.show_password = false;
        self.previous_screen = Screen::Main;
        self.screen = Screen::VpnSettings;
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::WindowOpened(id) => {
                log::debug!("Window opened with ID: {:?}", id);
                self.window_id = Some(id);
                self.is_visible = true;
                Task::none()
            }
            Message::WindowClosed(id) => {
                if self.window_id == Some(id) {
                    self.window_id = None;
                    self.is_visible = false;
                }
                Task::none()
            }
            Message::GtkTick => {
                #[cfg(target_os = "linux")]
                {
                    while gtk::events_pending() {
                        gtk::main_iteration();
                    }
                }
                Task::none()
            }
            Message::TrayEvent(event) => {
                if let TrayIconEvent::DoubleClick { .. } = event {
                    return self.update(Message::ToggleVisibility {
                        from_close_request: false,
                    });
                }
                Task::none()
            }
            Message::MenuEvent(event) => match event.id.as_ref() {
                "quit" => iced::exit(),
                "show" => self.update(Message::ToggleVisibility {
                    from_close_request: false,
                }),
                "connect" if self.app_initialized => self.update(Message::QuickConnectPressed),
                "disconnect" if self.app_initialized => self.update(Message::DisconnectPressed),
                _ => Task::none(),
            },
            Message::ToggleVisibility { from_close_request } => {
                if self.is_visible {
                    if from_close_request && !self.settings.close_to_tray {
                        log::info!("Exiting application due to close request");
                        return iced::exit();
                    }
                    self.is_visible = false;
                    if let Some(id) = self.window_id.take() {
                        return iced::window::close(id);
                    }
                    Task::none()
                } else {
                    let (id, task) = iced::window::open(crate::window_settings());
                    self.window_id = Some(id);
                    task.map(Message::WindowOpened)
                }
            }

            Message::CliChecked(result) => {
                match result {
                    Ok(version) => {
                        log::info!("Found {}", version);
                        self.cli_version = Some(version);
                        self.cli_test_result = Some(true);
                    }
                    Err(e) => {
                        log::error!("{}", e);
                        self.cli_test_result = Some(false);
                    }
                }
                Task::none()
            }
            Message::WelcomeFinished => {
                if self.welcome_done {
                    return Task::none();
                }
                self.welcome_done = true;
                let initialized = self.paths.has_required_files()
                    && CliConfig::load(&self.paths.config_file)
                        .map(|c| c.is_initialized())
                        .unwrap_or(false);
                if initialized {
                    self.initialize_application()
                } else {
                    log::info!("No VPN profile found, opening VPN settings");
                    self.open_vpn_settings();
                    Task::none()
                }
            }
            Message::ServerDataLoaded(result) => {
                self.refresh_in_flight = false;
                match result {
                    Ok(data) => {
                        self.servers = data.servers;
                        self.servers_loaded = true;
                        self.user_tier = data.tier;
                        self.protocol = data.protocol;
                        if self.user_tier < 2 {
                            self.secure_core = false;
                        }
                        self.rebuild_tree();
                        self.monitor.request_refresh();
                        Task::done(Message::CheckConnection)
                    }
                    Err(e) => {
                        log::error!("Could not load server list: {}", e);
                        Task::none()
                    }
                }
            }

            Message::Tick => {
                if !self.app_initialized {
                    return Task::none();
                }
                let mut tasks = vec![Task::done(Message::CheckConnection)];

                if self.is_connected() && !self.stats_in_flight {
                    self.stats_in_flight = true;
                    let paths = self.paths.clone();
                    let fallback = SessionStats::from_parts(None, None, 0);
                    tasks.push(Task::perform(
                        blocking_infallible(
                            move || SessionStats::gather(&paths, Path::new(SYS_ROOT)),
                            fallback,
                        ),
                        Message::StatsUpdated,
                    ));
                }

                if !self.refresh_in_flight && Instant::now() >= self.next_server_refresh {
                    log::info!("Refreshing server list");
                    tasks.push(self.load_servers_task(true));
                }
                Task::batch(tasks)
            }
            Message::CheckConnection => {
                if self.check_in_flight {
                    return Task::none();
                }
                self.check_in_flight = true;
                let paths = self.paths.clone();
                Task::perform(
                    blocking_infallible(move || Snapshot::take(&paths), Snapshot::default()),
                    Message::ConnectionChecked,
                )
            }
            Message::ConnectionChecked(snapshot) => {
                self.check_in_flight = false;
                match self.monitor.observe(&snapshot) {
                    Transition::Unchanged => Task::none(),
                    Transition::Changed => {
                        log::info!(
                            "Connection changed: {}",
                            snapshot.connected_server.as_deref().unwrap_or("unknown server")
                        );
                        self.set_tray_state();
                        self.details_task(true)
                    }
                    Transition::Refreshed if self.is_connected() => self.details_task(false),
                    Transition::Refreshed => {
                        self.sync_secure_core_on_start(None);
                        self.disconnected_ip_task()
                    }
                    Transition::Disconnected => {
                        log::info!("VPN disconnected");
                        self.sync_secure_core_on_start(None);
                        self.connection = None;
                        self.stats = None;
                        self.set_tray_state();
                        let notice = self.notify("You are not protected!");
                        Task::batch(vec![notice, self.disconnected_ip_task()])
                    }
                }
            }
            Message::DetailsCollected {
                details,
                fresh_connection,
            } => {
                if !self.is_connected() {
                    return Task::none();
                }
                let Some(details) = details else {
                    self.connection = None;
                    return Task::none();
                };

                self.sync_secure_core_on_start(Some(details.secure_core));
                let notice = if fresh_connection {
                    self.notify(format!("Connected to {}", details.exit_server_label()))
                } else {
                    Task::none()
                };
                self.current_ip = details.exit_ip.clone();
                self.connection = Some(details);
                notice
            }
            Message::Notified => Task::none(),
            Message::DisconnectedIp(ip) => {
                if !self.is_connected() {
                    self.current_ip = ip;
                }
                Task::none()
            }
            Message::StatsUpdated(stats) => {
                self.stats_in_flight = false;
                if self.is_connected() {
                    self.stats = Some(stats);
                }
                Task::none()
            }

            Message::QuickConnectPressed => {
                if self.is_connected() {
                    self.disconnect()
                } else if self.secure_core {
                    self.connect(ConnectTarget::QuickSecureCore)
                } else {
                    self.connect(ConnectTarget::QuickFastest)
                }
            }
            Message::ConnectCountry(code) => {
                if !self.secure_core {
                    return self.connect(ConnectTarget::Country { code });
                }
                let notice = self.show_notice(
                    "New Connection",
                    format!(
                        "Connecting to the fastest Secure Core server in {}",
                        countries::display_name(&code)
                    ),
                    NOTICE_DURATION_MS,
                );
                let protocol = self.protocol.as_cli_arg();
                let server_info = self.paths.server_info.clone();
                let command = self.run_command(move |cli| {
                    cli.connect_fastest_secure_core_in(&code, protocol, &server_info)
                });
                Task::batch(vec![notice, command])
            }
            Message::ConnectServer(name) => self.connect(ConnectTarget::Server { name }),
            Message::ConnectRandom => self.connect(ConnectTarget::Random),
            Message::DisconnectPressed => self.disconnect(),
            Message::CommandFinished(result) => {
                match result {
                    Ok(output) => log::debug!("Command output: {}", output.trim()),
                    Err(e) => log::error!("{}", e),
                }
                Task::done(Message::CheckConnection)
            }
            Message::SecureCoreToggled(enable) => {
                if self.user_tier < 2 || enable == self.secure_core {
                    return Task::none();
                }
                if self.is_connected() {
                    self.show_confirmation(Popup::ConfirmSecureCore { enable });
                    return Task::none();
                }
                self.secure_core = enable;
                self.next_server_refresh = Instant::now() + SERVER_REFRESH_INTERVAL;
                let notice = self.show_notice("Loading", "Building server list...", NOTICE_DURATION_MS);
                self.rebuild_tree();
                notice
            }
            Message::SecureCoreConfirmed => {
                let Some(Popup::ConfirmSecureCore { enable }) = self.popup.clone() else {
                    return Task::none();
                };
                self.secure_core = enable;
                self.next_server_refresh = Instant::now() + SERVER_REFRESH_INTERVAL;
                self.rebuild_tree();
                // Disconnect while the confirmation is still open so no
                // disconnect notice replaces it.
                let disconnect = self.disconnect();
                let notice = self.show_notice("Attention!", "Rebuilding Server List...", NOTICE_DURATION_MS);
                Task::batch(vec![disconnect, notice])
            }
            Message::SecureCoreCancelled => {
                self.popup = None;
                Task::none()
            }
            Message::CountryToggled(name) => {
                if self.expanded_country.as_deref() == Some(name.as_str()) {
                    self.expanded_country = None;
                } else {
                    self.expanded_country = Some(name);
                }
                Task::none()
            }
            Message::CopyIp => {
                if let Some(ip) = &self.current_ip {
                    match arboard::Clipboard::new().and_then(|mut c| c.set_text(ip.clone())) {
                        Ok(()) => log::info!("IP address copied to clipboard"),
                        Err(e) => log::error!("Failed to copy IP address: {}", e),
                    }
                }
                Task::none()
            }

            Message::PopupExpired(seq) => {
                if seq == self.popup_seq && matches!(self.popup, Some(Popup::Notice { .. })) {
                    self.popup = None;
                }
                Task::none()
            }
            Message::PopupDismissed => {
                self.popup = None;
                Task::none()
            }
            Message::ExitPressed => {
                self.show_confirmation(Popup::ConfirmExit);
                Task::none()
            }
            Message::ExitConfirmed => iced::exit(),
            Message::ShowScreen(screen) => {
                if screen == Screen::VpnSettings {
                    self.open_vpn_settings();
                } else {
                    if self.screen != screen {
                        self.previous_screen = self.screen;
                    }
                    self.screen = screen;
                }
                Task::none()
            }
            Message::CloseScreen => {
                if self.screen == Screen::VpnSettings && !self.profile_initialized {
                    return iced::exit();
                }
                self.screen = if self.app_initialized {
                    Screen::Main
                } else {
                    self.previous_screen
                };
                Task::none()
            }

            Message::UsernameChanged(v) => {
                self.profile.username = v;
                Task::none()
            }
            Message::PasswordChanged(v) => {
                self.profile.password = v;
                if self.profile.password.is_empty() {
                    self.password_confirm.clear();
                }
                Task::none()
            }
            Message::PasswordConfirmChanged(v) => {
                self.password_confirm = v;
                Task::none()
            }
            Message::TogglePasswordVisibility => {
                self.show_password = !self.show_password;
                Task::none()
            }
            Message::PlanSelected(plan) => {
                self.profile.plan = plan;
                Task::none()
            }
            Message::ProtocolSelected(protocol) => {
                self.profile.protocol = protocol;
                Task::none()
            }
            Message::DnsSelected(mode) => {
                self.profile.set_dns(mode);
                Task::none()
            }
            Message::CustomDnsChanged(v) => {
                self.profile.custom_dns = v;
                Task::none()
            }
            Message::KillSwitchSelected(kill_switch) => {
                if self.profile.set_kill_switch(kill_switch) {
                    return self.show_notice("Attention!", KILL_SWITCH_NOTICE, NOTICE_DURATION_MS);
                }
                Task::none()
            }
            Message::SplitTunnelToggled(enabled) => {
                if self.profile.set_split_tunnel(enabled) {
                    return self.show_notice("Attention!", SPLIT_TUNNEL_NOTICE, NOTICE_DURATION_MS);
                }
                Task::none()
            }
            Message::SplitTunnelIpsChanged(v) => {
                self.profile.split_tunnel_ips = v;
                Task::none()
            }
            Message::UpdateProfilePressed => {
                let missing = self.profile.missing_fields(&self.password_confirm);
                if !missing.is_empty() {
                    return self.show_notice(
                        "Attention!",
                        format!(
                            "Please enter missing required information:\n\n{}",
                            missing.join("\n")
                        ),
                        MISSING_FIELDS_DURATION_MS,
                    );
                }
                if !self.profile.passwords_match(&self.password_confirm) {
                    self.show_confirmation(Popup::Notice {
                        title: "Attention!".to_string(),
                        body: "Passwords do not match. Try again.".to_string(),
                    });
                    return Task::none();
                }
                if let Err(e) = self.profile.validate() {
                    return self.show_notice("Attention!", e.user_message(), NOTICE_DURATION_MS);
                }

                let profile = self.profile.clone();
                let paths = self.paths.clone();
                Task::perform(
                    blocking(move || profile.save(&paths)),
                    Message::ProfileSaved,
                )
            }
            Message::ProfileSaved(result) => match result {
                Ok(()) => {
                    self.profile_baseline = self.profile.clone();
                    if !self.profile_initialized {
                        self.profile_initialized = true;
                        return self.initialize_application();
                    }
                    let reload = self.load_servers_task(false);
                    if self.is_connected() {
                        let notice = self.show_notice(
                            "Attention!",
                            "To apply these latest updates, disconnect and reconnect the VPN.",
                            RECONNECT_NOTICE_DURATION_MS,
                        );
                        return Task::batch(vec![reload, notice]);
                    }
                    reload
                }
                Err(e) => {
                    log::error!("Failed to save VPN settings: {}", e);
                    self.show_confirmation(Popup::Notice {
                        title: "Error".to_string(),
                        body: e.user_message(),
                    });
                    Task::none()
                }
            },

            Message::CliPathChanged(path) => {
                self.settings.cli_path = path;
                self.cli_test_result = None;
                self.save_settings();
                Task::none()
            }
            Message::TestCli => {
                self.relocate_cli();
                self.cli_version = None;
                self.start_cli_check()
            }
            Message::EscalationToolChanged(tool) => {
                self.settings.escalation_tool = tool;
                self.save_settings();
                self.relocate_cli();
                Task::none()
            }
            Message::LogLevelSliderChanged(val) => {
                self.settings.log_level_val = val;
                GUI_LOGGER.set_level(log_level_from_slider(val));
                self.save_settings();
                Task::none()
            }
            Message::CloseToTrayToggled(v) => {
                self.settings.close_to_tray = v;
                self.save_settings();
                Task::none()
            }
            Message::NotificationsToggled(v) => {
                self.settings.notifications = v;
                self.save_settings();
                Task::none()
            }
            Message::ResetSettings => {
                self.settings = GuiSettings::default();
                self.save_settings();
                GUI_LOGGER.set_level(log_level_from_slider(self.settings.log_level_val));
                self.cli_test_result = None;
                self.relocate_cli();
                Task::none()
            }
            Message::LogAppended(raw_log) => {
                let Some((record_level, log_msg)) = parse_log_line(&raw_log) else {
                    return Task::none();
                };
                if record_level <= GUI_LOGGER.get_level() {
                    self.logs.push(format!("{} {}", level_tag(record_level), log_msg));
                    if self.logs.len() > CONSOLE_CAPACITY {
                        self.logs.remove(0);
                    }
                }
                Task::none()
            }
        }
    }

    fn start_cli_check(&self) -> Task<Message> {
        let cli = self.cli.clone();
        let program = self.settings.cli_program().to_string();
        Task::perform(
            blocking(move || match cli {
                Some(cli) => cli.version(),
                None => Err(CliError::CliNotFound { program }),
            }),
            Message::CliChecked,
        )
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subs = vec![
            iced::time::every(Duration::from_secs(1)).map(|_| Message::Tick),
        ];

        // GTK Event Loop pump (for Tray Icon on Linux)
        #[cfg(target_os = "linux")]
        subs.push(iced::time::every(Duration::from_millis(20)).map(|_| Message::GtkTick));

        // Window events
        subs.push(iced::window::close_requests().map(|_| Message::ToggleVisibility {
            from_close_request: true,
        }));
        subs.push(iced::window::close_events().map(Message::WindowClosed));

        // Log console feed
        subs.push(Subscription::run(|| {
            iced::stream::channel(
                100,
                |mut output: iced::futures::channel::mpsc::Sender<Message>| async move {
                    let (tx, mut rx) = mpsc::channel(100);
                    GUI_LOGGER.set_tx(tx);
                    while let Some(line) = rx.recv().await {
                        let _ = output.send(Message::LogAppended(line)).await;
                    }
                },
            )
        }));

        // Tray & Menu events
        subs.push(Subscription::run(|| {
            iced::stream::channel(
                10,
                |mut output: iced::futures::channel::mpsc::Sender<Message>| async move {
                    let tray_rx = TrayIconEvent::receiver();
                    let menu_rx = MenuEvent::receiver();
                    loop {
                        if let Ok(event) = tray_rx.try_recv() {
                            let _ = output.send(Message::TrayEvent(event)).await;
                        }
                        if let Ok(event) = menu_rx.try_recv() {
                            let _ = output.send(Message::MenuEvent(event)).await;
                        }
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                },
            )
        }));

        Subscription::batch(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gui_in(dir: &Path) -> PvpnGui {
        let mut gui = PvpnGui::new(CliPaths::in_dir(dir.join(".pvpn-cli")));
        gui.cli = None;
        gui
    }

    fn notice_body(gui: &PvpnGui) -> Option<&str> {
        match &gui.popup {
            Some(Popup::Notice { body, .. }) => Some(body.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn expired_notice_closes_only_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());

        let _ = gui.show_notice("Loading", "Building server list...", NOTICE_DURATION_MS);
        let first = gui.popup_seq;
        let _ = gui.show_notice("New Connection", "Connecting to a random server", NOTICE_DURATION_MS);

        let _ = gui.update(Message::PopupExpired(first));
        assert_eq!(notice_body(&gui), Some("Connecting to a random server"));

        let _ = gui.update(Message::PopupExpired(gui.popup_seq));
        assert!(gui.popup.is_none());
    }

    #[tokio::test]
    async fn confirmations_ignore_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        let _ = gui.update(Message::ExitPressed);
        let _ = gui.update(Message::PopupExpired(gui.popup_seq));
        assert_eq!(gui.popup, Some(Popup::ConfirmExit));
    }

    #[tokio::test]
    async fn country_nodes_expand_one_at_a_time() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        let _ = gui.update(Message::CountryToggled("Sweden".into()));
        let _ = gui.update(Message::CountryToggled("Iceland".into()));
        assert_eq!(gui.expanded_country.as_deref(), Some("Iceland"));
        let _ = gui.update(Message::CountryToggled("Iceland".into()));
        assert_eq!(gui.expanded_country, None);
    }

    #[tokio::test]
    async fn secure_core_needs_plus_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        gui.user_tier = 1;
        let _ = gui.update(Message::SecureCoreToggled(true));
        assert!(!gui.secure_core);

        gui.user_tier = 2;
        let _ = gui.update(Message::SecureCoreToggled(true));
        assert!(gui.secure_core);
        assert_eq!(notice_body(&gui), Some("Building server list..."));
    }

    #[tokio::test]
    async fn secure_core_while_connected_asks_first() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        gui.user_tier = 2;
        gui.monitor.record_connection(Some("CH#1".into()));

        let _ = gui.update(Message::SecureCoreToggled(true));
        assert_eq!(gui.popup, Some(Popup::ConfirmSecureCore { enable: true }));
        assert!(!gui.secure_core);

        let _ = gui.update(Message::SecureCoreCancelled);
        assert!(gui.popup.is_none());
        assert!(!gui.secure_core);

        let _ = gui.update(Message::SecureCoreToggled(true));
        let _ = gui.update(Message::SecureCoreConfirmed);
        assert!(gui.secure_core);
        assert_eq!(notice_body(&gui), Some("Rebuilding Server List..."));
    }

    #[tokio::test]
    async fn missing_profile_fields_are_listed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        let _ = gui.update(Message::UsernameChanged("someone".into()));
        let _ = gui.update(Message::UpdateProfilePressed);
        assert_eq!(
            notice_body(&gui),
            Some("Please enter missing required information:\n\nPassword")
        );
    }

    #[tokio::test]
    async fn enabling_kill_switch_warns_about_split_tunnel() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        let _ = gui.update(Message::SplitTunnelToggled(true));
        assert!(gui.popup.is_none());
        let _ = gui.update(Message::KillSwitchSelected(pvpn::profile::KillSwitch::AllowLan));
        assert_eq!(notice_body(&gui), Some(KILL_SWITCH_NOTICE));
        assert!(!gui.profile.split_tunnel);
    }

    #[tokio::test]
    async fn console_respects_user_level_and_capacity() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        GUI_LOGGER.set_level(log::LevelFilter::Info);

        let _ = gui.update(Message::LogAppended("Debug|hidden".into()));
        let _ = gui.update(Message::LogAppended("Warn|shown".into()));
        assert_eq!(gui.logs, vec!["[WRN] shown".to_string()]);

        for i in 0..CONSOLE_CAPACITY + 10 {
            let _ = gui.update(Message::LogAppended(format!("Info|line {}", i)));
        }
        assert_eq!(gui.logs.len(), CONSOLE_CAPACITY);
        assert_eq!(gui.logs.last().map(String::as_str), Some("[INF] line 509"));
    }

    const SERVERS: &str = r#"{
        "Code": 1000,
        "LogicalServers": [
            {"Name": "CH#1", "EntryCountry": "CH", "ExitCountry": "CH", "Tier": 2, "Features": 0, "Load": 20, "Score": 1.2, "City": "Zurich", "Status": 1},
            {"Name": "NL#7", "EntryCountry": "NL", "ExitCountry": "NL", "Tier": 2, "Features": 0, "Load": 44, "Score": 2.0, "City": "Amsterdam", "Status": 1},
            {"Name": "CH-NL#1", "EntryCountry": "CH", "ExitCountry": "NL", "Tier": 2, "Features": 1, "Load": 10, "Score": 0.9, "City": "Amsterdam", "Status": 1}
        ]
    }"#;

    fn server_data(tier: u8) -> ServerData {
        ServerData {
            servers: servers::parse_servers(SERVERS).unwrap(),
            tier,
            protocol: Protocol::default(),
        }
    }

    fn running(server: &str) -> Snapshot {
        Snapshot {
            process_running: true,
            connected_server: Some(server.to_string()),
        }
    }

    fn details(server: &str, secure_core: bool, ip: &str) -> ConnectionDetails {
        ConnectionDetails {
            server: server.to_string(),
            country_code: "NL".to_string(),
            country: "Netherlands".to_string(),
            protocol: Some("udp".to_string()),
            load: Some(10),
            secure_core,
            exit_ip: Some(ip.to_string()),
        }
    }

    fn collected(details: ConnectionDetails, fresh_connection: bool) -> Message {
        Message::DetailsCollected {
            details: Some(details),
            fresh_connection,
        }
    }

    #[tokio::test]
    async fn secure_core_adopted_once_servers_are_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());

        // Already connected at start-up; the server list is not there yet, so
        // the server cannot be recognised as Secure Core.
        let _ = gui.update(Message::ConnectionChecked(running("CH-NL#1")));
        let _ = gui.update(collected(details("CH-NL#1", false, "185.159.157.12"), true));
        assert!(!gui.secure_core);

        let _ = gui.update(Message::ServerDataLoaded(Ok(server_data(2))));
        assert!(!gui.secure_core);

        let _ = gui.update(Message::ConnectionChecked(running("CH-NL#1")));
        let _ = gui.update(collected(details("CH-NL#1", true, "185.159.157.12"), false));
        assert!(gui.secure_core);
        let netherlands = gui
            .server_tree
            .iter()
            .find(|c| c.name == "Netherlands")
            .unwrap();
        assert_eq!(netherlands.servers[0].name, "CH-NL#1");

        // Only once.
        let _ = gui.update(collected(details("NL#7", false, "185.159.157.13"), true));
        assert!(gui.secure_core);
    }

    #[tokio::test]
    async fn refresh_redraws_labels_without_announcing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        gui.settings.notifications = true;

        let _ = gui.update(Message::ConnectionChecked(running("CH-NL#1")));
        let _ = gui.update(collected(details("CH-NL#1", true, "185.159.157.12"), true));
        assert_eq!(
            gui.last_notification.as_deref(),
            Some("Connected to Netherlands >> CH-NL#1")
        );
        gui.last_notification = None;

        let _ = gui.update(Message::ServerDataLoaded(Ok(server_data(2))));
        let _ = gui.update(Message::ConnectionChecked(running("CH-NL#1")));
        let _ = gui.update(collected(details("CH-NL#1", true, "185.159.157.99"), false));
        assert_eq!(gui.last_notification, None);
        assert_eq!(gui.current_ip.as_deref(), Some("185.159.157.99"));
        assert!(gui.connection.is_some());
    }

    #[tokio::test]
    async fn disconnect_warns_even_before_details_arrive() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());
        gui.settings.notifications = true;

        // Start-up while disconnected is not a disconnect.
        let _ = gui.update(Message::ConnectionChecked(Snapshot::default()));
        assert_eq!(gui.last_notification, None);

        let _ = gui.update(Message::ConnectionChecked(running("CH#1")));
        assert!(gui.connection.is_none());
        let _ = gui.update(Message::ConnectionChecked(Snapshot::default()));
        assert!(!gui.is_connected());
        assert_eq!(gui.last_notification.as_deref(), Some("You are not protected!"));
    }

    #[tokio::test]
    async fn server_list_refreshes_after_deadline() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());

        // Ticks do nothing before the application is initialized.
        gui.next_server_refresh = Instant::now();
        let _ = gui.update(Message::Tick);
        assert!(!gui.refresh_in_flight);

        gui.app_initialized = true;
        let _ = gui.update(Message::Tick);
        assert!(gui.refresh_in_flight);
        assert!(gui.next_server_refresh > Instant::now() + Duration::from_secs(290));

        let _ = gui.update(Message::ServerDataLoaded(Ok(server_data(1))));
        assert!(!gui.refresh_in_flight);
        let countries: Vec<&str> = gui.server_tree.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(countries, vec!["Netherlands", "Switzerland"]);

        let _ = gui.update(Message::Tick);
        assert!(!gui.refresh_in_flight);
    }

    #[tokio::test]
    async fn close_screen_returns_to_main() {
        let tmp = tempfile::tempdir().unwrap();
        let mut gui = gui_in(tmp.path());

        let _ = gui.update(Message::ShowScreen(Screen::AppSettings));
        let _ = gui.update(Message::CloseScreen);
        assert_eq!(gui.screen, Screen::Welcome);

        gui.app_initialized = true;
        gui.profile_initialized = true;
        gui.screen = Screen::VpnSettings;
        let _ = gui.update(Message::CloseScreen);
        assert_eq!(gui.screen, Screen::Main);

        let _ = gui.update(Message::ShowScreen(Screen::Console));
        let _ = gui.update(Message::CloseScreen);
        assert_eq!(gui.screen, Screen::Main);

        // Without a profile, closing the settings quits instead.
        gui.profile_initialized = false;
        gui.screen = Screen::VpnSettings;
        let _ = gui.update(Message::CloseScreen);
        assert_eq!(gui.screen, Screen::VpnSettings);
    }

    /// A stand-in client that logs its arguments and reports a connection
    /// without an exit IP.
    #[cfg(unix)]
    fn ipless_cli(dir: &Path) -> ProtonCli {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("protonvpn");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\n[ \"$1\" = status ] && echo 'Status: Connected'\nexit 0\n",
                dir.join("calls.log").display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        ProtonCli::locate(script.to_str().unwrap(), "env").unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn missing_exit_ip_reconnects_only_new_connections() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CliPaths::in_dir(tmp.path().join(".pvpn-cli"));
        paths.ensure_dir().unwrap();
        std::fs::write(
            &paths.config_file,
            "[metadata]\nconnected_server = CH-NL#1\nconnected_proto = udp\n",
        )
        .unwrap();
        let servers = servers::parse_servers(SERVERS).unwrap();
        let cli = ipless_cli(tmp.path());
        let log = tmp.path().join("calls.log");
        let reconnects = || {
            std::fs::read_to_string(&log)
                .unwrap_or_default()
                .lines()
                .filter(|l| *l == "reconnect")
                .count()
        };

        let details = collect_details(Some(cli.clone()), &paths, &servers, true).unwrap();
        assert_eq!(details.exit_ip, None);
        assert!(details.secure_core);
        assert_eq!(reconnects(), 1);

        let details = collect_details(Some(cli), &paths, &servers, false).unwrap();
        assert_eq!(details.ip_label(), "IP: unknown");
        assert_eq!(reconnects(), 1);
    }
}
