//! Credential profile loading
//!
//! NIOS tools read an INI file with a `[DEFAULT]` section and one section
//! per grid/credential profile:
//!
//! ```ini
//! [DEFAULT]
//! url = https://gm.example.com/wapi/v2.10/
//! valid_cert = False
//!
//! [alice]
//! userid = alice
//! password = jabberwocky
//! ```
//!
//! BloxOne tools read a `[BloxOne]` section holding `url`, `api_version`
//! and `api_key`.
//!
//! File location priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent default in the home directory

use crate::{Error, Result};
use ini::{Ini, ParseOption, Properties};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the NIOS credentials file
pub const GRID_CONFIG_ENV: &str = "INFOBLOX_CONFIG_FILE";

/// Environment variable naming the BloxOne credentials file
pub const BLOXONE_CONFIG_ENV: &str = "BLOXONE_CONFIG_FILE";

const DEFAULT_SECTION: &str = "DEFAULT";
const BLOXONE_SECTION: &str = "BloxOne";

const DEFAULT_GRID_URL: &str = "https://gm.example.com/wapi/v1.1/";
const DEFAULT_USERID: &str = "admin";
const DEFAULT_PASSWORD: &str = "infoblox";
const DEFAULT_BLOXONE_URL: &str = "https://csp.infoblox.com";
const DEFAULT_BLOXONE_API_VERSION: &str = "v1";

/// Resolved WAPI connection settings for one profile
#[derive(Clone, PartialEq, Eq)]
pub struct GridProfile {
    /// WAPI base URL, e.g. `https://gm.example.com/wapi/v2.10/`
    pub url: String,
    /// Whether the grid master presents a certificate we can verify
    pub valid_cert: bool,
    pub userid: String,
    pub password: String,
}

impl fmt::Debug for GridProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridProfile")
            .field("url", &self.url)
            .field("valid_cert", &self.valid_cert)
            .field("userid", &self.userid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolved BloxOne connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct BloxOneProfile {
    /// Cloud services portal URL, e.g. `https://csp.infoblox.com`
    pub url: String,
    pub api_version: String,
    pub api_key: String,
}

impl fmt::Debug for BloxOneProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloxOneProfile")
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Location of the NIOS credentials file.
///
/// A non-blank explicit path wins, then `INFOBLOX_CONFIG_FILE`, then
/// `~\infoblox.ini` on Windows or `~/.infoblox` elsewhere.
pub fn grid_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_path(
        explicit,
        GRID_CONFIG_ENV,
        if cfg!(windows) { "infoblox.ini" } else { ".infoblox" },
    )
}

/// Location of the BloxOne credentials file.
///
/// A non-blank explicit path wins, then `BLOXONE_CONFIG_FILE`, then
/// `~\bloxone.ini` on Windows or `~/.bloxone.ini` elsewhere.
pub fn bloxone_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_path(
        explicit,
        BLOXONE_CONFIG_ENV,
        if cfg!(windows) { "bloxone.ini" } else { ".bloxone.ini" },
    )
}

fn resolve_config_path(
    explicit: Option<&Path>,
    env_var_name: &str,
    default_file_name: &str,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = explicit {
        if !path.as_os_str().to_string_lossy().trim().is_empty() {
            return Ok(path.to_path_buf());
        }
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            debug!("Using {} from {}", value, env_var_name);
            return expand_home(&value);
        }
    }

    // Priority 3: OS-dependent default
    dirs::home_dir()
        .map(|home| home.join(default_file_name))
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(value: &str) -> Result<PathBuf> {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return Ok(PathBuf::from(value)),
    };
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    let rest = rest.trim_start_matches(|c| c == '/' || c == '\\');
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// Load one WAPI profile from a NIOS credentials file.
///
/// With no profile name the first section other than `DEFAULT` is used.
/// Keys missing from the profile fall back to `DEFAULT`, then to built-in
/// defaults.
pub fn load_grid_profile(path: &Path, profile: Option<&str>) -> Result<GridProfile> {
    let ini = read_ini(path)?;

    let section_name = match profile {
        Some(name) => {
            if name == DEFAULT_SECTION || ini.section(Some(name)).is_none() {
                return Err(Error::Config(format!(
                    "No profile section \"{}\" in Infoblox configuration file \"{}\"",
                    name,
                    path.display()
                )));
            }
            name.to_string()
        }
        None => ini
            .sections()
            .flatten()
            .find(|name| *name != DEFAULT_SECTION)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Config(format!(
                    "No non-DEFAULT section in Infoblox configuration file \"{}\"",
                    path.display()
                ))
            })?,
    };
    debug!("Using profile [{}] from {}", section_name, path.display());

    let section = ini.section(Some(section_name.as_str()));
    let defaults = ini.section(Some(DEFAULT_SECTION));
    let lookup = |key: &str| layered_get(section, defaults, key);

    let valid_cert = match lookup("valid_cert") {
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            Error::Config(format!(
                "Not a boolean: valid_cert = {} in profile [{}]",
                raw, section_name
            ))
        })?,
        None => false,
    };

    Ok(GridProfile {
        url: lookup("url").unwrap_or(DEFAULT_GRID_URL).to_string(),
        valid_cert,
        userid: lookup("userid").unwrap_or(DEFAULT_USERID).to_string(),
        password: lookup("password").unwrap_or(DEFAULT_PASSWORD).to_string(),
    })
}

/// Load the `[BloxOne]` section of a BloxOne credentials file
pub fn load_bloxone_profile(path: &Path) -> Result<BloxOneProfile> {
    let ini = read_ini(path)?;
    let section = ini.section(Some(BLOXONE_SECTION)).ok_or_else(|| {
        Error::Config(format!(
            "No [{}] section in BloxOne configuration file \"{}\"",
            BLOXONE_SECTION,
            path.display()
        ))
    })?;

    let api_key = get_key(section, "api_key")
        .map(strip_quotes)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            Error::Config(format!(
                "No api_key in BloxOne configuration file \"{}\"",
                path.display()
            ))
        })?;

    Ok(BloxOneProfile {
        url: get_key(section, "url")
            .map(strip_quotes)
            .unwrap_or(DEFAULT_BLOXONE_URL)
            .trim_end_matches('/')
            .to_string(),
        api_version: get_key(section, "api_version")
            .map(strip_quotes)
            .unwrap_or(DEFAULT_BLOXONE_API_VERSION)
            .to_string(),
        api_key: api_key.to_string(),
    })
}

fn read_ini(path: &Path) -> Result<Ini> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    // Passwords and Windows paths may contain backslashes and quotes; take
    // values verbatim.
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    Ini::load_from_str_opt(&text, options).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn layered_get<'a>(
    section: Option<&'a Properties>,
    defaults: Option<&'a Properties>,
    key: &str,
) -> Option<&'a str> {
    section
        .and_then(|s| get_key(s, key))
        .or_else(|| defaults.and_then(|d| get_key(d, key)))
}

/// Key lookup ignoring ASCII case; `URL` and `url` name the same option
fn get_key<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

/// INI boolean spellings: 1/yes/true/on and 0/no/false/off
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "yes", "True", "ON", " true "] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "No", "FALSE", "off"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("abc"), "abc");
        assert_eq!(strip_quotes("'abc\""), "'abc\"");
        assert_eq!(strip_quotes("'"), "'");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/etc/infoblox").unwrap(), PathBuf::from("/etc/infoblox"));
        assert_eq!(expand_home("~alice/x").unwrap(), PathBuf::from("~alice/x"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~").unwrap(), home);
            assert_eq!(expand_home("~/grid.ini").unwrap(), home.join("grid.ini"));
        }
    }

    #[test]
    fn test_profile_debug_redacts_secrets() {
        let grid = GridProfile {
            url: DEFAULT_GRID_URL.to_string(),
            valid_cert: false,
            userid: "alice".to_string(),
            password: "jabberwocky".to_string(),
        };
        let shown = format!("{:?}", grid);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("jabberwocky"));

        let b1 = BloxOneProfile {
            url: DEFAULT_BLOXONE_URL.to_string(),
            api_version: "v1".to_string(),
            api_key: "sekrit".to_string(),
        };
        assert!(!format!("{:?}", b1).contains("sekrit"));
    }
}
