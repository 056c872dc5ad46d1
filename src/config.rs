/*
 * Responsibility
 * - 設定の読み込み (JSON ファイル → 環境変数の順で上書き)
 * - merge_with_fallback: 右側のソースを優先する deep merge
 * - 型付き Config への変換 (不正値なら起動失敗)
 *
 * Notes
 * - identity provider / allow-list の設定が欠けていても起動は失敗させない。
 *   それぞれの upstream client がリクエスト時に Configuration error (500) を返す。
 */
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["config/default.json", "config/config.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// How the allow-list fetch authenticates against the blob store.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageAuth {
    /// No `Authorization` header (public objects, local emulators).
    Anonymous,
    /// Fixed bearer token.
    Static(String),
    /// Token from the GCE metadata server's default service account.
    Metadata,
}

impl std::fmt::Debug for StorageAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the token
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Static(_) => f.write_str("Static(..)"),
            Self::Metadata => f.write_str("Metadata"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StorageAuthMode {
    #[default]
    None,
    Metadata,
}

/// Raw, merged settings as they appear in the JSON config files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Settings {
    port: Option<u16>,
    cors_allowed_origins: Vec<String>,
    identity_provider_url: Option<String>,
    allowlist_container: Option<String>,
    allowlist_object_name: Option<String>,
    request_timeout_ms: Option<u64>,
    test_mode: bool,
    workspace_service_url: Option<String>,
    storage_url: Option<String>,
    storage_auth: StorageAuthMode,
    storage_token: Option<String>,
}

/// Settings consumed by the auth pipeline and its upstream clients.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub identity_provider_url: Option<String>,
    pub allowlist_container: Option<String>,
    pub allowlist_object_name: Option<String>,
    /// Outbound call timeout; `None` means [`DEFAULT_REQUEST_TIMEOUT_MS`].
    pub request_timeout_ms: Option<u64>,
    /// Always rejects with 501 when set.
    pub test_mode: bool,
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub auth: StorageAuth,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub workspace_service_url: Option<String>,
}

impl Config {
    /// Load `config/default.json`, then `config/config.json` (or the
    /// comma-separated `CONFIG_FILES`), then environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let files: Vec<PathBuf> = match std::env::var("CONFIG_FILES") {
            Ok(raw) => split_list(&raw).into_iter().map(PathBuf::from).collect(),
            Err(_) => DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).collect(),
        };

        let mut layers = load_config_files(&files)?;
        layers.push(env_layer(|key| std::env::var(key).ok())?);

        Self::from_value(merge_with_fallback(&layers), AppEnv::from_env())
    }

    pub fn from_value(value: Value, app_env: AppEnv) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_value(value).map_err(ConfigError::Shape)?;

        let port = settings.port.unwrap_or(3000);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        if settings.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("requestTimeoutMs"));
        }

        let storage_auth = match (settings.storage_token, settings.storage_auth) {
            (Some(token), _) if !token.trim().is_empty() => StorageAuth::Static(token),
            (_, StorageAuthMode::Metadata) => StorageAuth::Metadata,
            (_, StorageAuthMode::None) => StorageAuth::Anonymous,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins: settings.cors_allowed_origins,
            auth: AuthConfig {
                identity_provider_url: non_blank(settings.identity_provider_url),
                allowlist_container: non_blank(settings.allowlist_container),
                allowlist_object_name: non_blank(settings.allowlist_object_name),
                request_timeout_ms: settings.request_timeout_ms,
                test_mode: settings.test_mode,
            },
            storage: StorageConfig {
                url: non_blank(settings.storage_url)
                    .unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string()),
                auth: storage_auth,
            },
            workspace_service_url: non_blank(settings.workspace_service_url),
        })
    }
}

/// Deep-merge config objects left to right; the rightmost value wins.
///
/// Objects merge key by key and arrays merge index by index (recursively),
/// so `[1, 2, 3]` merged with `[9]` is `[9, 2, 3]`. Any other value,
/// including `null`, replaces what was there.
pub fn merge_with_fallback(configs: &[Value]) -> Value {
    let mut merged = Value::Object(Map::new());
    for config in configs {
        merge_into(&mut merged, config);
    }
    merged
}

fn merge_into(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (i, value) in source.iter().enumerate() {
                match target.get_mut(i) {
                    Some(existing) => merge_into(existing, value),
                    None => target.push(value.clone()),
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Read each file as a JSON object. Missing files are skipped with a warning.
pub fn load_config_files<P: AsRef<Path>>(files: &[P]) -> Result<Vec<Value>, ConfigError> {
    let mut layers = Vec::with_capacity(files.len());

    for path in files {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found; skipping");
                continue;
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        layers.push(value);
    }

    Ok(layers)
}

/// Environment overrides as a config layer.
fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Result<Value, ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut layer = Map::new();

    let strings = [
        ("IDENTITY_PROVIDER_URL", "identityProviderUrl"),
        ("ALLOWLIST_CONTAINER", "allowlistContainer"),
        ("ALLOWLIST_OBJECT_NAME", "allowlistObjectName"),
        ("WORKSPACE_SERVICE_URL", "workspaceServiceUrl"),
        ("STORAGE_URL", "storageUrl"),
        ("STORAGE_AUTH", "storageAuth"),
        ("STORAGE_TOKEN", "storageToken"),
    ];
    for (env, key) in strings {
        if let Some(v) = get(env) {
            layer.insert(key.to_string(), Value::String(v));
        }
    }

    if let Some(v) = get("PORT") {
        let port: u16 = v.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?;
        layer.insert("port".to_string(), Value::from(port));
    }

    if let Some(v) = get("REQUEST_TIMEOUT_MS") {
        let ms: u64 = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_MS"))?;
        layer.insert("requestTimeoutMs".to_string(), Value::from(ms));
    }

    if let Some(v) = get("TEST_MODE") {
        let on = match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => return Err(ConfigError::Invalid("TEST_MODE")),
        };
        layer.insert("testMode".to_string(), Value::Bool(on));
    }

    if let Some(v) = get("CORS_ALLOWED_ORIGINS") {
        let origins = split_list(&v).into_iter().map(Value::String).collect();
        layer.insert("corsAllowedOrigins".to_string(), Value::Array(origins));
    }

    Ok(Value::Object(layer))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn merge_keeps_union_and_prefers_rightmost() {
        let defaults = json!({
            "one": "default-111",
            "two": "default-222",
            "three": "default-333",
            "four": "default-444",
        });
        let env = json!({
            "one": "env-111",
            "three": "env-333",
            "five": "env-555",
        });

        let actual = merge_with_fallback(&[defaults, env]);

        assert_eq!(
            actual,
            json!({
                "one": "env-111",
                "two": "default-222",
                "three": "env-333",
                "four": "default-444",
                "five": "env-555",
            })
        );
    }

    #[test]
    fn merge_is_deep_for_nested_objects() {
        let left = json!({"nested": {"a": 1, "b": 2}, "list": [1, 2, 3]});
        let right = json!({"nested": {"b": 20, "c": 30}, "list": [9]});

        let actual = merge_with_fallback(&[left, right]);

        assert_eq!(
            actual,
            json!({"nested": {"a": 1, "b": 20, "c": 30}, "list": [9, 2, 3]})
        );
    }

    #[test]
    fn merge_combines_arrays_index_by_index() {
        let actual = merge_with_fallback(&[
            json!({"list": [1, 2]}),
            json!({"list": [10]}),
            json!({"list": [null, 20, 30], "rows": [{"a": 1}]}),
            json!({"rows": [{"b": 2}]}),
        ]);

        assert_eq!(
            actual,
            json!({"list": [null, 20, 30], "rows": [{"a": 1, "b": 2}]})
        );
    }

    #[test]
    fn merge_replaces_values_of_a_different_shape() {
        let actual = merge_with_fallback(&[
            json!({"list": [1, 2], "obj": {"a": 1}, "gone": 1}),
            json!({"list": "flat", "obj": [1], "gone": null}),
        ]);

        assert_eq!(actual, json!({"list": "flat", "obj": [1], "gone": null}));
    }

    #[test]
    fn merge_of_nothing_is_an_empty_object() {
        assert_eq!(merge_with_fallback(&[]), json!({}));
    }

    #[test]
    fn from_value_applies_defaults() {
        let config = Config::from_value(json!({}), AppEnv::Development).unwrap();

        assert_eq!(config.addr.port(), 3000);
        assert!(!config.auth.test_mode);
        assert_eq!(config.auth.request_timeout(), Duration::from_millis(60_000));
        assert_eq!(config.storage.url, DEFAULT_STORAGE_URL);
        assert_eq!(config.storage.auth, StorageAuth::Anonymous);
        assert!(config.auth.identity_provider_url.is_none());
    }

    #[test]
    fn from_value_reads_camel_case_keys() {
        let config = Config::from_value(
            json!({
                "port": 8080,
                "identityProviderUrl": "http://sam.local",
                "allowlistContainer": "bucket",
                "allowlistObjectName": "allow.json",
                "requestTimeoutMs": 1500,
                "testMode": true,
                "storageAuth": "metadata",
            }),
            AppEnv::Production,
        )
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(
            config.auth.identity_provider_url.as_deref(),
            Some("http://sam.local")
        );
        assert_eq!(config.auth.allowlist_container.as_deref(), Some("bucket"));
        assert_eq!(
            config.auth.allowlist_object_name.as_deref(),
            Some("allow.json")
        );
        assert_eq!(config.auth.request_timeout(), Duration::from_millis(1500));
        assert!(config.auth.test_mode);
        assert_eq!(config.storage.auth, StorageAuth::Metadata);
    }

    #[test]
    fn blank_settings_count_as_missing() {
        let config = Config::from_value(
            json!({"allowlistContainer": "  ", "identityProviderUrl": ""}),
            AppEnv::Development,
        )
        .unwrap();

        assert!(config.auth.allowlist_container.is_none());
        assert!(config.auth.identity_provider_url.is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_value(json!({"requestTimeoutMs": 0}), AppEnv::Development)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("requestTimeoutMs")));
    }

    #[test]
    fn storage_token_wins_over_mode() {
        let config = Config::from_value(
            json!({"storageAuth": "metadata", "storageToken": "tok"}),
            AppEnv::Development,
        )
        .unwrap();
        assert_eq!(config.storage.auth, StorageAuth::Static("tok".into()));
    }

    #[test]
    fn env_layer_converts_types() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("TEST_MODE", "true"),
            ("REQUEST_TIMEOUT_MS", "250"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("IDENTITY_PROVIDER_URL", "http://sam.local"),
            ("ALLOWLIST_CONTAINER", ""),
        ]);

        let layer = env_layer(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(
            layer,
            json!({
                "port": 9000,
                "testMode": true,
                "requestTimeoutMs": 250,
                "corsAllowedOrigins": ["https://a.example", "https://b.example"],
                "identityProviderUrl": "http://sam.local",
            })
        );
    }

    #[test]
    fn env_layer_rejects_bad_numbers() {
        let err = env_layer(|k| (k == "PORT").then(|| "not-a-port".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT")));
    }

    #[test]
    fn env_overrides_file_values() {
        let file = json!({"identityProviderUrl": "http://from-file", "testMode": true});
        let env = env_layer(|k| match k {
            "IDENTITY_PROVIDER_URL" => Some("http://from-env".to_string()),
            "TEST_MODE" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();

        let config =
            Config::from_value(merge_with_fallback(&[file, env]), AppEnv::Development).unwrap();

        assert_eq!(
            config.auth.identity_provider_url.as_deref(),
            Some("http://from-env")
        );
        assert!(!config.auth.test_mode);
    }

    #[test]
    fn load_config_files_skips_missing_and_rejects_malformed() {
        let dir = std::env::temp_dir().join(format!("archive-gateway-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.json");
        let bad = dir.join("bad.json");
        std::fs::write(&good, r#"{"testMode": true}"#).unwrap();
        std::fs::write(&bad, "this is not { valid json! [").unwrap();

        let layers = load_config_files(&[good.clone(), dir.join("missing.json")]).unwrap();
        assert_eq!(layers, vec![json!({"testMode": true})]);

        let err = load_config_files(&[good, bad]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn app_env_parses_aliases() {
        assert!(AppEnv::parse("PROD").is_production());
        assert!(AppEnv::parse("production").is_production());
        assert!(!AppEnv::parse("staging").is_production());
    }
}
