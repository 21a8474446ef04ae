use iced::widget::{button, container};
use iced::{Border, Color, Shadow, Theme};
use pvpn::monitor::{ConnectionDetails, SessionStats, Snapshot};
use pvpn::profile::{DnsMode, KillSwitch, Plan, Protocol};
use pvpn::servers::LogicalServer;
use pvpn::CliError;
use tray_icon::{menu::MenuEvent, TrayIconEvent};

// --- Assets ---
pub const LOGO_SVG: &[u8] = include_bytes!("../assets/logo.svg");
pub const TRAY_ICON_CONNECTED: &[u8] = include_bytes!("../assets/tray-connected.svg");
pub const TRAY_ICON_DISCONNECTED: &[u8] = include_bytes!("../assets/tray-disconnected.svg");
pub const ICON_SETTINGS_SVG: &[u8] = include_bytes!("../assets/settings.svg");
pub const ICON_SLIDERS_SVG: &[u8] = include_bytes!("../assets/sliders.svg");
pub const ICON_TERMINAL_SVG: &[u8] = include_bytes!("../assets/terminal.svg");
pub const ICON_POWER_SVG: &[u8] = include_bytes!("../assets/power.svg");
pub const ICON_SHUFFLE_SVG: &[u8] = include_bytes!("../assets/shuffle.svg");
pub const ICON_SHIELD_SVG: &[u8] = include_bytes!("../assets/shield.svg");
pub const ICON_SHIELD_CHECK_SVG: &[u8] = include_bytes!("../assets/shield-check.svg");
pub const ICON_ARROW_UP_SVG: &[u8] = include_bytes!("../assets/arrow-up.svg");
pub const ICON_ARROW_DOWN_SVG: &[u8] = include_bytes!("../assets/arrow-down.svg");
pub const ICON_CLOCK_SVG: &[u8] = include_bytes!("../assets/clock.svg");
pub const ICON_COPY_SVG: &[u8] = include_bytes!("../assets/copy.svg");
pub const ICON_CHEVRON_SVG: &[u8] = include_bytes!("../assets/chevron.svg");
pub const ICON_EYE_SVG: &[u8] = include_bytes!("../assets/eye.svg");
pub const ICON_CLOSE_SVG: &[u8] = include_bytes!("../assets/close.svg");

// Colors (ProtonVPN palette)
pub const COLOR_BG: Color = Color::from_rgb(0.11, 0.11, 0.13);
pub const COLOR_SURFACE: Color = Color::from_rgb(0.16, 0.15, 0.20);
pub const COLOR_ACCENT: Color = Color::from_rgb(0.43, 0.29, 1.0); // #6D4AFF
pub const COLOR_SUCCESS: Color = Color::from_rgb(0.12, 0.66, 0.52);
pub const COLOR_WARNING: Color = Color::from_rgb(1.0, 0.60, 0.0);
pub const COLOR_DANGER: Color = Color::from_rgb(0.86, 0.20, 0.32);
pub const COLOR_TEXT: Color = Color::from_rgb(0.90, 0.90, 0.92);
pub const COLOR_TEXT_DIM: Color = Color::from_rgb(0.55, 0.55, 0.60);

/// Notices close on their own after this long unless stated otherwise.
pub const NOTICE_DURATION_MS: u64 = 1500;
pub const MISSING_FIELDS_DURATION_MS: u64 = 3000;
pub const RECONNECT_NOTICE_DURATION_MS: u64 = 2000;
pub const WELCOME_DURATION_MS: u64 = 1500;
pub const CONSOLE_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Main,
    VpnSettings,
    AppSettings,
    Console,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Notice { title: String, body: String },
    ConfirmSecureCore { enable: bool },
    ConfirmExit,
}

/// Server catalogue plus the account values that shape the tree.
#[derive(Debug, Clone)]
pub struct ServerData {
    pub servers: Vec<LogicalServer>,
    pub tier: u8,
    pub protocol: Protocol,
}

#[derive(Debug, Clone)]
pub enum Message {
    // Window & tray
    WindowOpened(iced::window::Id),
    WindowClosed(iced::window::Id),
    ToggleVisibility { from_close_request: bool },
    GtkTick,
    TrayEvent(TrayIconEvent),
    MenuEvent(MenuEvent),

    // Start-up
    CliChecked(Result<String, CliError>),
    WelcomeFinished,
    ServerDataLoaded(Result<ServerData, CliError>),

    // Polling
    Tick,
    CheckConnection,
    ConnectionChecked(Snapshot),
    /// `fresh_connection` is false when the labels are only being redrawn.
    DetailsCollected {
        details: Option<ConnectionDetails>,
        fresh_connection: bool,
    },
    DisconnectedIp(Option<String>),
    StatsUpdated(SessionStats),
    Notified,

    // Connection actions
    QuickConnectPressed,
    ConnectCountry(String),
    ConnectServer(String),
    ConnectRandom,
    DisconnectPressed,
    CommandFinished(Result<String, CliError>),
    SecureCoreToggled(bool),
    SecureCoreConfirmed,
    SecureCoreCancelled,
    CountryToggled(String),
    CopyIp,

    // Popups & navigation
    PopupExpired(u64),
    PopupDismissed,
    ExitPressed,
    ExitConfirmed,
    ShowScreen(Screen),
    CloseScreen,

    // VPN settings form
    UsernameChanged(String),
    PasswordChanged(String),
    PasswordConfirmChanged(String),
    TogglePasswordVisibility,
    PlanSelected(Plan),
    ProtocolSelected(Protocol),
    DnsSelected(DnsMode),
    CustomDnsChanged(String),
    KillSwitchSelected(KillSwitch),
    SplitTunnelToggled(bool),
    SplitTunnelIpsChanged(String),
    UpdateProfilePressed,
    ProfileSaved(Result<(), CliError>),

    // App settings
    CliPathChanged(String),
    TestCli,
    EscalationToolChanged(String),
    LogLevelSliderChanged(f32),
    CloseToTrayToggled(bool),
    NotificationsToggled(bool),
    ResetSettings,
    LogAppended(String),
}

pub fn log_level_from_slider(val: f32) -> log::LevelFilter {
    match val.round() as i32 {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        5 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

pub fn log_level_name(val: f32) -> &'static str {
    match val.round() as i32 {
        0 => "Off",
        1 => "Error",
        2 => "Warn",
        3 => "Info",
        4 => "Debug",
        5 => "Trace",
        _ => "Info",
    }
}

/// Parses the `Level|message` lines the logger sends to the console.
pub fn parse_log_line(raw: &str) -> Option<(log::Level, &str)> {
    let (level, msg) = raw.split_once('|')?;
    let level = match level {
        "Error" => log::Level::Error,
        "Warn" => log::Level::Warn,
        "Info" => log::Level::Info,
        "Debug" => log::Level::Debug,
        "Trace" => log::Level::Trace,
        _ => return None,
    };
    Some((level, msg))
}

pub fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "[ERR]",
        log::Level::Warn => "[WRN]",
        log::Level::Info => "[INF]",
        log::Level::Debug => "[DBG]",
        log::Level::Trace => "[TRC]",
    }
}

// --- Styles ---

fn filled_button(base: Color, status: button::Status) -> button::Style {
    let background = match status {
        button::Status::Hovered => Color { a: 0.85, ..base },
        button::Status::Pressed => Color { a: 0.7, ..base },
        button::Status::Disabled => Color { a: 0.35, ..base },
        button::Status::Active => base,
    };
    button::Style {
        background: Some(background.into()),
        text_color: Color::WHITE,
        border: Border {
            radius: 8.0.into(),
            ..Default::default()
        },
        shadow: Shadow::default(),
        ..Default::default()
    }
}

pub fn btn_primary(_theme: &Theme, status: button::Status) -> button::Style {
    filled_button(COLOR_ACCENT, status)
}

pub fn btn_danger(_theme: &Theme, status: button::Status) -> button::Style {
    filled_button(COLOR_DANGER, status)
}

pub fn btn_secondary(_theme: &Theme, status: button::Status) -> button::Style {
    button::Style {
        background: Some(
            match status {
                button::Status::Hovered => Color::from_rgba(1.0, 1.0, 1.0, 0.08),
                _ => Color::from_rgba(1.0, 1.0, 1.0, 0.04),
            }
            .into(),
        ),
        text_color: match status {
            button::Status::Disabled => COLOR_TEXT_DIM,
            _ => COLOR_TEXT,
        },
        border: Border {
            color: Color::from_rgb(0.25, 0.25, 0.30),
            width: 1.0,
            radius: 8.0.into(),
        },
        ..Default::default()
    }
}

pub fn btn_icon(_theme: &Theme, status: button::Status) -> button::Style {
    button::Style {
        background: Some(
            match status {
                button::Status::Hovered => Color::from_rgba(1.0, 1.0, 1.0, 0.1),
                _ => Color::TRANSPARENT,
            }
            .into(),
        ),
        text_color: COLOR_TEXT,
        border: Border {
            radius: 6.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn card(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(COLOR_SURFACE.into()),
        border: Border {
            color: Color::from_rgb(0.22, 0.21, 0.27),
            width: 1.0,
            radius: 10.0.into(),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_levels() {
        assert_eq!(log_level_from_slider(0.0), log::LevelFilter::Off);
        assert_eq!(log_level_from_slider(4.4), log::LevelFilter::Debug);
        assert_eq!(log_level_name(5.0), "Trace");
        assert_eq!(log_level_name(9.0), "Info");
    }

    #[test]
    fn log_lines() {
        assert_eq!(
            parse_log_line("Warn|Could not read passfile"),
            Some((log::Level::Warn, "Could not read passfile"))
        );
        assert_eq!(parse_log_line("Info|a|b"), Some((log::Level::Info, "a|b")));
        assert_eq!(parse_log_line("no separator"), None);
        assert_eq!(level_tag(log::Level::Error), "[ERR]");
    }
}
