use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use toml::Table;

use crate::default_config::DEFAULT_CONFIG_TOML;

const COCKPIT_DIR: &str = ".config/cp-cockpit";

pub fn read_text_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

pub fn home_dir() -> io::Result<PathBuf> {
    match env::var_os("HOME") {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
        _ => Err(io::Error::new(io::ErrorKind::NotFound, "HOME is not set")),
    }
}

pub fn cockpit_dir() -> io::Result<PathBuf> {
    let dir = home_dir()?.join(COCKPIT_DIR);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_file_path() -> io::Result<PathBuf> {
    Ok(cockpit_dir()?.join("config.toml"))
}

pub fn theme_file_path() -> io::Result<PathBuf> {
    Ok(cockpit_dir()?.join("theme.toml"))
}

pub fn log_file_path() -> io::Result<PathBuf> {
    Ok(cockpit_dir()?.join("cockpit.log"))
}

/// Tops up the config file at `config_file` with missing defaults, keeping
/// user values. The file is rewritten only when the merged text differs.
pub fn ensure_default_config(config_file: &Path) -> io::Result<String> {
    let current = match read_text_file(config_file) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(err),
    };
    let merged = merge_default_config_with_user_overrides(current.as_deref())?;
    if current.as_deref() != Some(merged.as_str()) {
        write_text_file_atomic(config_file, &merged)?;
    }
    Ok(merged)
}

pub fn merge_default_config_with_user_overrides(user_text: Option<&str>) -> io::Result<String> {
    let mut table = parse_table(DEFAULT_CONFIG_TOML)?;
    if let Some(text) = user_text {
        overlay_table(&mut table, parse_table(text)?);
    }
    toml::to_string_pretty(&table).map_err(io::Error::other)
}

fn parse_table(text: &str) -> io::Result<Table> {
    text.parse::<Table>()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Nested tables merge key by key; any other user value replaces the default.
fn overlay_table(base: &mut Table, user: Table) {
    for (key, user_value) in user {
        match (base.get_mut(&key), user_value) {
            (Some(toml::Value::Table(base_inner)), toml::Value::Table(user_inner)) => {
                overlay_table(base_inner, user_inner);
            }
            (_, user_value) => {
                base.insert(key, user_value);
            }
        }
    }
}

/// Writes through a sibling temp file created owner-only, then renames it
/// over `path`.
fn write_text_file_atomic(path: &Path, text: &str) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ));
    };
    fs::create_dir_all(parent)?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".tmp-{}", std::process::id()));
    let tmp = parent.join(tmp_name);

    let result = (|| {
        let mut file = owner_only_options().open(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(unix)]
fn owner_only_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true).mode(0o600);
    options
}

#[cfg(not(unix))]
fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    options
}
