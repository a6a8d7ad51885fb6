use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub units: UnitsConfig,
    #[serde(default)]
    pub share: ShareConfig,
    #[serde(default)]
    pub vpn: VpnConfig,
    #[serde(default)]
    pub dotfiles: DotfilesConfig,
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitsConfig {
    #[serde(default = "default_mount_unit")]
    pub mount: String,
    #[serde(default = "default_automount_unit")]
    pub automount: String,
    #[serde(default = "default_systemd_dir")]
    pub systemd_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShareConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_share_name")]
    pub name: String,
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default = "default_mount_options")]
    pub mount_options: String,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VpnConfig {
    #[serde(default = "default_vpn_command")]
    pub command: String,
    #[serde(default = "default_vpn_daemon_unit")]
    pub daemon_unit: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DotfilesConfig {
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,
    #[serde(default = "default_dotfiles")]
    pub files: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: UnitsConfig::default(),
            share: ShareConfig::default(),
            vpn: VpnConfig::default(),
            dotfiles: DotfilesConfig::default(),
            source_dir: default_source_dir(),
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            mount: default_mount_unit(),
            automount: default_automount_unit(),
            systemd_dir: default_systemd_dir(),
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            name: default_share_name(),
            mount_point: default_mount_point(),
            credentials_file: default_credentials_file(),
            mount_options: default_mount_options(),
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            command: default_vpn_command(),
            daemon_unit: default_vpn_daemon_unit(),
        }
    }
}

impl Default for DotfilesConfig {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            files: default_dotfiles(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_units(&self.units)?;
        validate_share(&self.share)?;
        validate_vpn(&self.vpn)?;
        validate_dotfiles(&self.dotfiles)?;
        if !self.source_dir.is_absolute() {
            return Err(ConfigError::Validation(
                "source_dir must be an absolute path".to_string(),
            ));
        }
        if self.source_dir == self.dotfiles.home_dir {
            return Err(ConfigError::Validation(
                "source_dir must differ from dotfiles.home_dir".to_string(),
            ));
        }
        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }

    /// Location of a unit file as installed under the systemd directory.
    pub fn installed_unit_path(&self, unit: &str) -> PathBuf {
        self.units.systemd_dir.join(unit)
    }

    /// Location of a unit file as shipped next to the dotfiles.
    pub fn source_unit_path(&self, unit: &str) -> PathBuf {
        self.source_dir.join("systemd").join(unit)
    }
}

fn validate_units(cfg: &UnitsConfig) -> Result<(), ConfigError> {
    if !cfg.mount.ends_with(".mount") || cfg.mount.len() == ".mount".len() {
        return Err(ConfigError::Validation(format!(
            "units.mount '{}' must be a systemd .mount unit name",
            cfg.mount
        )));
    }
    if !cfg.automount.ends_with(".automount") || cfg.automount.len() == ".automount".len() {
        return Err(ConfigError::Validation(format!(
            "units.automount '{}' must be a systemd .automount unit name",
            cfg.automount
        )));
    }
    if !cfg.systemd_dir.is_absolute() {
        return Err(ConfigError::Validation(
            "units.systemd_dir must be an absolute path".to_string(),
        ));
    }
    Ok(())
}

fn validate_share(cfg: &ShareConfig) -> Result<(), ConfigError> {
    if cfg.server.trim().is_empty() {
        return Err(ConfigError::Validation(
            "share.server must not be empty".to_string(),
        ));
    }
    if cfg.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "share.name must not be empty".to_string(),
        ));
    }
    if !cfg.mount_point.is_absolute() {
        return Err(ConfigError::Validation(
            "share.mount_point must be an absolute path".to_string(),
        ));
    }
    if !cfg.credentials_file.is_absolute() {
        return Err(ConfigError::Validation(
            "share.credentials_file must be an absolute path".to_string(),
        ));
    }
    if cfg.ping_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "share.ping_timeout_secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_vpn(cfg: &VpnConfig) -> Result<(), ConfigError> {
    if cfg.command.trim().is_empty() {
        return Err(ConfigError::Validation(
            "vpn.command must not be empty".to_string(),
        ));
    }
    if cfg.daemon_unit.trim().is_empty() {
        return Err(ConfigError::Validation(
            "vpn.daemon_unit must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_dotfiles(cfg: &DotfilesConfig) -> Result<(), ConfigError> {
    if !cfg.home_dir.is_absolute() {
        return Err(ConfigError::Validation(
            "dotfiles.home_dir must be an absolute path; set it when no home directory is known"
                .to_string(),
        ));
    }
    let mut names = HashSet::new();
    for file in &cfg.files {
        if file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "dotfiles.files[*] must not be empty".to_string(),
            ));
        }
        if Path::new(file).is_absolute() {
            return Err(ConfigError::Validation(format!(
                "dotfile '{file}' must be relative to the home directory"
            )));
        }
        if !names.insert(file.as_str()) {
            return Err(ConfigError::Validation(format!(
                "dotfile '{file}' is listed more than once"
            )));
        }
    }
    Ok(())
}

fn default_mount_unit() -> String {
    r"mnt-truenas\x2dtailnet-brents\x2ddata.mount".to_string()
}

fn default_automount_unit() -> String {
    r"mnt-truenas\x2dtailnet-brents\x2ddata.automount".to_string()
}

fn default_systemd_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_server() -> String {
    "truenas-scale".to_string()
}

fn default_share_name() -> String {
    "brents-data".to_string()
}

fn default_mount_point() -> PathBuf {
    PathBuf::from("/mnt/truenas-tailnet/brents-data")
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("/etc/smb-creds")
}

fn default_mount_options() -> String {
    "vers=3.0,uid=1000,gid=1000".to_string()
}

const fn default_ping_timeout_secs() -> u64 {
    2
}

fn default_vpn_command() -> String {
    "tailscale".to_string()
}

fn default_vpn_daemon_unit() -> String {
    "tailscaled.service".to_string()
}

/// Empty when no home directory is known; `validate` then rejects it.
fn default_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default()
}

fn default_dotfiles() -> Vec<String> {
    [
        ".bashrc",
        ".gitconfig",
        ".gitignore_global",
        ".justfile",
        ".tmux.conf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// The directory holding the installed binary, next to which the dotfiles
/// and `systemd/` sources live.
fn default_source_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        Config::default()
            .validate()
            .expect("built-in defaults must validate");
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("example parses");
        cfg.validate().expect("example validates");
        assert_eq!(cfg.share.server, "truenas-scale");
        assert_eq!(cfg.share.ping_timeout_secs, 2);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "share:\n  server: nas.tailnet\n").unwrap();

        let cfg = Config::load_from_file(file.path()).expect("partial config loads");
        assert_eq!(cfg.share.server, "nas.tailnet");
        assert_eq!(cfg.share.name, "brents-data");
        assert_eq!(cfg.units.mount, r"mnt-truenas\x2dtailnet-brents\x2ddata.mount");
        assert_eq!(cfg.dotfiles.files.len(), 5);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/tailmount.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "share: [unterminated").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_wrong_unit_suffix() {
        let mut cfg = Config::default();
        cfg.units.automount = "share.mount".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_ping_timeout() {
        let mut cfg = Config::default();
        cfg.share.ping_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_dotfiles() {
        let mut cfg = Config::default();
        cfg.dotfiles.files.push(".bashrc".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_home_dir() {
        let mut cfg = Config::default();
        cfg.dotfiles.home_dir = PathBuf::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.dotfiles.home_dir = PathBuf::from("~");
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_source_dir_equal_to_home() {
        let mut cfg = Config::default();
        cfg.dotfiles.home_dir = PathBuf::from("/home/me");
        cfg.source_dir = PathBuf::from("/home/me");
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn default_source_dir_is_the_binary_directory() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(default_source_dir(), exe.parent().unwrap());
    }

    #[test]
    fn unit_paths_join_directories() {
        let mut cfg = Config::default();
        cfg.source_dir = PathBuf::from("/home/me/dotfiles");
        assert_eq!(
            cfg.installed_unit_path("a.mount"),
            PathBuf::from("/etc/systemd/system/a.mount")
        );
        assert_eq!(
            cfg.source_unit_path("a.mount"),
            PathBuf::from("/home/me/dotfiles/systemd/a.mount")
        );
    }
}
