use std::sync::Mutex;
use tokio::sync::mpsc;

/// Global logger: every record goes to the colored stderr logger, and
/// records from our own crates also go to the in-app console.
pub struct GuiLogger {
    pub tx: Mutex<Option<mpsc::Sender<String>>>,
    pub user_level: Mutex<log::LevelFilter>,
    pub stderr: Mutex<Option<Box<dyn log::Log>>>,
}

impl GuiLogger {
    pub fn set_tx(&self, tx: mpsc::Sender<String>) {
        if let Ok(mut guard) = self.tx.lock() {
            *guard = Some(tx);
        }
    }

    pub fn set_stderr(&self, logger: Box<dyn log::Log>) {
        if let Ok(mut guard) = self.stderr.lock() {
            *guard = Some(logger);
        }
    }

    pub fn set_level(&self, level: log::LevelFilter) {
        if let Ok(mut guard) = self.user_level.lock() {
            *guard = level;
        }
    }

    pub fn get_level(&self) -> log::LevelFilter {
        self.user_level
            .lock()
            .map(|g| *g)
            .unwrap_or(log::LevelFilter::Info)
    }
}

fn is_console_target(target: &str) -> bool {
    target.starts_with("pvpn")
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Trace
    }

    fn log(&self, record: &log::Record) {
        if let Ok(guard) = self.stderr.lock() {
            if let Some(stderr) = &*guard {
                stderr.log(record);
            }
        }

        if !is_console_target(record.target()) {
            return;
        }
        let Ok(guard) = self.tx.lock() else { return };
        if let Some(tx) = &*guard {
            let _ = tx.try_send(format!("{:?}|{}", record.level(), record.args()));
        }
    }

    fn flush(&self) {
        if let Ok(guard) = self.stderr.lock() {
            if let Some(stderr) = &*guard {
                stderr.flush();
            }
        }
    }
}

pub static GUI_LOGGER: GuiLogger = GuiLogger {
    tx: Mutex::new(None),
    user_level: Mutex::new(log::LevelFilter::Info),
    stderr: Mutex::new(None),
};

pub static LOGGER_INIT: std::sync::Once = std::sync::Once::new();

/// Installs [`GUI_LOGGER`] with the given stderr level. Safe to call twice.
pub fn install(stderr_level: log::LevelFilter) {
    GUI_LOGGER.set_stderr(Box::new(pvpn::logger::stderr_logger(stderr_level)));
    LOGGER_INIT.call_once(|| {
        let _ = log::set_logger(&GUI_LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
}
