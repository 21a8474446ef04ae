mod app;
mod config;
mod logger;
mod notifications;
mod tray;
mod types;
mod view;

use crate::app::PvpnGui;
use crate::tray::init_tray;
use crate::types::Message;
use clap::{Parser, ValueEnum};
use iced::Task;
use pvpn::utils::CLI_DIR_NAME;
use pvpn::CliPaths;
use std::sync::{Arc, Mutex};

/// Desktop front-end for the ProtonVPN command-line client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level written to stderr
    #[arg(short, long, value_enum, default_value_t = LogLevel::Error)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

pub(crate) fn window_settings() -> iced::window::Settings {
    iced::window::Settings {
        exit_on_close_request: false,
        size: iced::Size::new(520.0, 860.0),
        min_size: Some(iced::Size::new(420.0, 640.0)),
        ..Default::default()
    }
}

fn get_title(_: &PvpnGui, _: iced::window::Id) -> String {
    "ProtonVPN-CLI-GUI".to_string()
}

fn get_theme(gui: &PvpnGui, id: iced::window::Id) -> iced::Theme {
    gui.theme(id)
}

fn get_subscription(gui: &PvpnGui) -> iced::Subscription<Message> {
    gui.subscription()
}

pub fn main() -> iced::Result {
    let args = Args::parse();
    logger::install(args.log_level.into());

    // Ensure only one instance is running
    if let Err(e) = pvpn::utils::ensure_single_instance() {
        log::error!("{}", e);
        return Ok(());
    }

    let paths = CliPaths::locate().unwrap_or_else(|e| {
        log::warn!("{}, falling back to the working directory", e);
        CliPaths::in_dir(CLI_DIR_NAME)
    });

    #[cfg(target_os = "linux")]
    {
        // tray-icon on Linux requires GTK to be initialized first
        if let Err(e) = gtk::init() {
            log::warn!("GTK initialization failed: {}", e);
        }
    }

    let components = match init_tray() {
        Ok(components) => Some(components),
        Err(e) => {
            log::error!("Failed to create tray icon: {}", e);
            None
        }
    };
    let components = Arc::new(Mutex::new(components));

    iced::daemon(
        move || {
            let mut gui = PvpnGui::new(paths.clone());

            if let Ok(mut guard) = components.lock() {
                gui.tray = guard.take();
            }

            let (id, task) = iced::window::open(window_settings());
            gui.window_id = Some(id);
            let start = gui.start();

            (gui, Task::batch(vec![task.map(Message::WindowOpened), start]))
        },
        PvpnGui::update,
        PvpnGui::view,
    )
    .title(get_title)
    .subscription(get_subscription)
    .theme(get_theme)
    .run()
}
