// Local configuration: JSON key store + first-run state
//
// Config:  $IND_CONFIG or ~/.config/ind/.config.json
// State:   $XDG_CONFIG_HOME/ind/state.json (fallback ~/.config/ind/state.json)

use crate::utils::try_parse;
use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const FIRST_RUN_MESSAGE: &str = "Recommended post-install: 1) ind autocomplete";
const FIRST_RUN_KEY: &str = "first_run_notice_shown_for";

/// Keys the API clients look up
pub const SEER_API_KEY: &str = "SEER_API_KEY";
pub const USPTO_API_KEY: &str = "USPTO_API_KEY";
pub const NCBI_EMAIL: &str = "NCBI_EMAIL";
pub const NCBI_API_KEY: &str = "NCBI_API_KEY";
pub const OPENFDA_API_KEY: &str = "OPENFDA_API_KEY";

// ============================================================================
// PATHS
// ============================================================================

pub(crate) fn home_dir() -> Result<PathBuf> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set; cannot locate ~/.config/ind"))
}

/// Base directory for ind's files (~/.config/ind)
pub fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("ind"))
}

pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os("IND_CONFIG").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join(".config.json"))
}

pub fn default_state_path() -> Result<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME").filter(|p| !p.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => home_dir()?.join(".config"),
    };
    Ok(base.join("ind").join("state.json"))
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{} must contain a JSON object", path.display())),
    }
}

fn write_json_object(path: &Path, map: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(map)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// CONFIG STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl ConfigStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let values = read_json_object(path)?;
        Ok(ConfigStore {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn open_default() -> Result<Self> {
        ConfigStore::open(&default_config_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// String form of a value (numbers included), `None` for null/empty
    pub fn get_str(&self, id: &str) -> Option<String> {
        match self.values.get(id)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Parse `raw` as a literal and persist it under `id`
    pub fn set(&mut self, id: &str, raw: &str) -> Result<Value> {
        let value = try_parse(raw);
        self.set_value(id, value.clone())?;
        Ok(value)
    }

    pub fn set_value(&mut self, id: &str, value: Value) -> Result<()> {
        self.values.insert(id.to_string(), value);
        self.save()
    }

    /// Remove `id`; returns whether it existed
    pub fn del(&mut self, id: &str) -> Result<bool> {
        let existed = self.values.remove(id).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    pub fn save(&self) -> Result<()> {
        write_json_object(&self.path, &self.values)
    }
}

/// First non-empty of: explicit value, environment variable, config key
pub fn resolve_with(
    explicit: Option<&str>,
    env_var: &str,
    store: Option<&ConfigStore>,
    key: &str,
) -> Option<String> {
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    if let Ok(v) = env::var(env_var) {
        if !v.trim().is_empty() {
            return Some(v.trim().to_string());
        }
    }
    store.and_then(|s| s.get_str(key))
}

/// `resolve_with` against the default config file
pub fn resolve_credential(explicit: Option<&str>, env_var: &str, key: &str) -> Option<String> {
    let store = match ConfigStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            debug!("config unavailable while resolving {}: {:#}", key, e);
            None
        }
    };
    resolve_with(explicit, env_var, store.as_ref(), key)
}

// ============================================================================
// FIRST-RUN NOTICE
// ============================================================================

/// Returns the notice once per `version`, recording it in the state file
pub fn first_run_notice(state_path: &Path, version: &str) -> Result<Option<&'static str>> {
    let mut state = read_json_object(state_path)?;
    if state.get(FIRST_RUN_KEY).and_then(Value::as_str) == Some(version) {
        return Ok(None);
    }
    state.insert(FIRST_RUN_KEY.to_string(), Value::String(version.to_string()));
    write_json_object(state_path, &state)?;
    Ok(Some(FIRST_RUN_MESSAGE))
}

/// Honors IND_NO_FIRST_RUN=1; never fails the caller
pub fn maybe_first_run_notice(version: &str) -> Option<&'static str> {
    if env::var("IND_NO_FIRST_RUN").map(|v| v == "1").unwrap_or(false) {
        return None;
    }
    let path = default_state_path().ok()?;
    match first_run_notice(&path, version) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("first-run state not recorded: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::open(&dir.path().join("cfg").join(".config.json")).unwrap()
    }

    #[test]
    fn test_set_get_del_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(store.get("SEER_API_KEY").is_none());

        let v = store.set("SEER_API_KEY", "abc123").unwrap();
        assert_eq!(v, json!("abc123"));
        store.set("retries", "5").unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("SEER_API_KEY"), Some(&json!("abc123")));
        assert_eq!(reopened.get("retries"), Some(&json!(5)));
        assert_eq!(reopened.get_str("retries").as_deref(), Some("5"));

        assert!(store.del("SEER_API_KEY").unwrap());
        assert!(!store.del("SEER_API_KEY").unwrap());
        assert!(store_in(&dir).get("SEER_API_KEY").is_none());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1,2]").unwrap();
        assert!(ConfigStore::open(&path).is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_then_store() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set("IND_TEST_ONLY_KEY", "from-config").unwrap();

        let explicit = resolve_with(Some("cli"), "IND_TEST_ONLY_UNSET_VAR", Some(&store), "IND_TEST_ONLY_KEY");
        assert_eq!(explicit.as_deref(), Some("cli"));

        let fallback = resolve_with(Some("  "), "IND_TEST_ONLY_UNSET_VAR", Some(&store), "IND_TEST_ONLY_KEY");
        assert_eq!(fallback.as_deref(), Some("from-config"));

        assert!(resolve_with(None, "IND_TEST_ONLY_UNSET_VAR", None, "x").is_none());
    }

    #[test]
    fn test_first_run_notice_once_per_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ind").join("state.json");

        assert_eq!(first_run_notice(&path, "0.1.0").unwrap(), Some(FIRST_RUN_MESSAGE));
        assert_eq!(first_run_notice(&path, "0.1.0").unwrap(), None);
        assert_eq!(first_run_notice(&path, "0.2.0").unwrap(), Some(FIRST_RUN_MESSAGE));

        let state: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(state[FIRST_RUN_KEY], "0.2.0");
    }
}
