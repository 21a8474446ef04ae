use crate::error::CliError;
use fd_lock::{RwLock, RwLockWriteGuard};
use once_cell::sync::Lazy;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the directory the CLI keeps its state in, relative to the home directory.
pub const CLI_DIR_NAME: &str = ".pvpn-cli";

/// Platform-relative path from the home directory to the GUI data directory.
const APP_DATA_SUBPATH: &str = ".local/share/pvpn-gui";

/// On-disk layout of the ProtonVPN CLI's state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliPaths {
    pub dir: PathBuf,
    pub config_file: PathBuf,
    pub passfile: PathBuf,
    pub server_info: PathBuf,
    pub split_tunnel_file: PathBuf,
}

impl CliPaths {
    /// Layout rooted at an arbitrary directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config_file: dir.join("pvpn-cli.cfg"),
            passfile: dir.join("pvpnpass"),
            server_info: dir.join("serverinfo.json"),
            split_tunnel_file: dir.join("split_tunnel.txt"),
            dir,
        }
    }

    /// Layout for the invoking user.
    ///
    /// When started through `sudo` the CLI keeps using the invoking user's
    /// home directory, so we follow `SUDO_USER` the same way.
    pub fn locate() -> Result<Self, CliError> {
        Ok(Self::in_dir(invoking_user_home()?.join(CLI_DIR_NAME)))
    }

    /// True when the directory, the config file and the passfile all exist.
    pub fn has_required_files(&self) -> bool {
        self.dir.is_dir() && self.config_file.is_file() && self.passfile.is_file()
    }

    /// Creates the state directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), CliError> {
        if !self.dir.is_dir() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| CliError::io(format!("Creating {}", self.dir.display()), e))?;
            log::debug!("Config directory created at {:?}", self.dir);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn invoking_user_home() -> Result<PathBuf, CliError> {
    if let Ok(sudo_user) = env::var("SUDO_USER") {
        match nix::unistd::User::from_name(&sudo_user) {
            Ok(Some(user)) => return Ok(user.dir),
            Ok(None) => log::warn!("SUDO_USER '{}' not found in passwd database", sudo_user),
            Err(e) => log::warn!("Failed to look up SUDO_USER '{}': {}", sudo_user, e),
        }
    }
    home_from_env()
}

#[cfg(not(unix))]
fn invoking_user_home() -> Result<PathBuf, CliError> {
    home_from_env()
}

fn home_from_env() -> Result<PathBuf, CliError> {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .map_err(|_| CliError::MissingValue {
            section: "environment".to_string(),
            key: "HOME".to_string(),
        })
}

/// Hands a file created while running as root back to the user who ran `sudo`.
#[cfg(unix)]
pub fn change_file_owner(path: &Path) -> Result<(), CliError> {
    if !is_root() {
        return Ok(());
    }
    let Ok(sudo_user) = env::var("SUDO_USER") else {
        return Ok(());
    };
    let user = match nix::unistd::User::from_name(&sudo_user) {
        Ok(Some(user)) => user,
        _ => return Ok(()),
    };
    nix::unistd::chown(path, Some(user.uid), Some(user.gid)).map_err(|e| CliError::Io {
        context: format!("Changing owner of {}", path.display()),
        message: e.to_string(),
    })
}

#[cfg(not(unix))]
pub fn change_file_owner(_path: &Path) -> Result<(), CliError> {
    Ok(())
}

/// Returns true when the process runs with an effective uid of 0.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Under `sudo` this is the invoking user's home, like [`CliPaths::locate`].
fn app_data_path() -> Result<PathBuf, CliError> {
    Ok(invoking_user_home()?.join(APP_DATA_SUBPATH))
}

/// Returns the GUI's data directory (`~/.local/share/pvpn-gui`).
///
/// Creates the directory if it does not already exist.
pub fn get_app_data_dir() -> Result<PathBuf, CliError> {
    let dir = app_data_path()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CliError::io(format!("Creating {}", dir.display()), e))?;
        log::info!("App data directory created at: {:?}", dir);
    }
    Ok(dir)
}

// Stores the write guard to keep the lock held for the process lifetime.
static INSTANCE_LOCK: Lazy<Mutex<Option<RwLockWriteGuard<'static, File>>>> =
    Lazy::new(|| Mutex::new(None));

/// Ensures that only one instance of the application is running.
/// Returns an error if another instance is already active.
pub fn ensure_single_instance() -> Result<(), CliError> {
    let lock_path = get_app_data_dir()?.join("pvpn-gui.lock");
    lock_file(&lock_path)
}

fn lock_file(lock_path: &Path) -> Result<(), CliError> {
    let file = File::create(lock_path)
        .map_err(|e| CliError::io(format!("Creating {}", lock_path.display()), e))?;
    // Leak the RwLock to get a 'static reference so the guard can outlive this function.
    let lock_ref: &'static mut RwLock<File> = Box::leak(Box::new(RwLock::new(file)));

    match lock_ref.try_write() {
        Ok(guard) => {
            if let Ok(mut slot) = INSTANCE_LOCK.lock() {
                *slot = Some(guard);
            }
            Ok(())
        }
        Err(_) => Err(CliError::Io {
            context: "Single instance".to_string(),
            message: "Another instance of pvpn-gui is already running.".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_dir() {
        let paths = CliPaths::in_dir("/home/user/.pvpn-cli");
        assert_eq!(
            paths.config_file,
            PathBuf::from("/home/user/.pvpn-cli/pvpn-cli.cfg")
        );
        assert_eq!(paths.passfile, PathBuf::from("/home/user/.pvpn-cli/pvpnpass"));
        assert_eq!(
            paths.server_info,
            PathBuf::from("/home/user/.pvpn-cli/serverinfo.json")
        );
    }

    #[test]
    fn required_files_need_config_and_passfile() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CliPaths::in_dir(tmp.path().join(CLI_DIR_NAME));
        assert!(!paths.has_required_files());

        paths.ensure_dir().unwrap();
        std::fs::write(&paths.config_file, "[USER]\n").unwrap();
        assert!(!paths.has_required_files());

        std::fs::write(&paths.passfile, "user\npass").unwrap();
        assert!(paths.has_required_files());
    }

    #[cfg(unix)]
    #[test]
    fn app_data_follows_sudo_user() {
        let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::getuid()) else {
            return;
        };
        let tmp = tempfile::tempdir().unwrap();
        let saved_home = env::var_os("HOME");
        let saved_sudo = env::var_os("SUDO_USER");
        env::set_var("HOME", tmp.path());
        env::set_var("SUDO_USER", &user.name);

        let app_data = app_data_path();
        let cli_dir = CliPaths::locate().map(|p| p.dir);

        match saved_home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
        match saved_sudo {
            Some(sudo) => env::set_var("SUDO_USER", sudo),
            None => env::remove_var("SUDO_USER"),
        }

        assert_eq!(app_data.unwrap(), user.dir.join(APP_DATA_SUBPATH));
        assert_eq!(cli_dir.unwrap(), user.dir.join(CLI_DIR_NAME));
    }
}
