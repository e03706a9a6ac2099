use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Where the local table/blob/queue/file-share emulation keeps its files.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_root: default_data_root() }
    }
}

fn default_data_root() -> String { "data".to_string() }

/// `CONFIG_PATH`, or `config.toml` in the working directory.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn is_missing_file(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

impl AppConfig {
    /// [`AppConfig::load_or_env_from`] over [`config_path`].
    pub fn load_or_env() -> Result<Self> {
        Self::load_or_env_from(&config_path())
    }

    /// Config from `path` when it exists, otherwise from environment variables.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_env_from(path: &str) -> Result<Self> {
        let mut cfg = match load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => Self::from_env(),
            Err(e) => return Err(e.context(format!("failed to load {path}"))),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// `SERVER_HOST`, `SERVER_PORT`, `TOKIO_WORKER_THREADS`, `STORAGE_ROOT`.
    pub fn from_env() -> Self {
        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8081);
        let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());
        let data_root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| default_data_root());
        Self {
            server: ServerConfig { host, port, worker_threads },
            storage: StorageConfig { data_root },
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.normalize_from_env();
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    /// `STORAGE_ROOT` overrides an empty `storage.data_root`.
    pub fn normalize_from_env(&mut self) {
        if self.data_root.trim().is_empty() {
            if let Ok(root) = std::env::var("STORAGE_ROOT") {
                self.data_root = root;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_root.trim().is_empty() {
            return Err(anyhow!("storage.data_root is empty; set it in config.toml or STORAGE_ROOT"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            worker_threads = 2

            [storage]
            data_root = "/var/lib/abc"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.worker_threads, Some(2));
        assert_eq!(cfg.storage.data_root, "/var/lib/abc");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut cfg = parse("").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.data_root, "data");
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut cfg = parse("[server]\nhost = \"\"\nport = 0\n").unwrap();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn zero_worker_threads_normalized() {
        let mut cfg = parse("[server]\nhost = \" \"\nport = 80\nworker_threads = 0\n").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.worker_threads, Some(4));
    }

    fn temp_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("abc_configs_{}_{name}.toml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let path = temp_config("malformed", "[server]\nport = \"not a number\"\n");
        let res = AppConfig::load_or_env_from(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        let err = res.unwrap_err();
        assert!(!is_missing_file(&err));
        assert!(err.to_string().contains("failed to load"));
    }

    #[test]
    fn existing_config_file_wins_over_env() {
        let path = temp_config("valid", "[server]\nhost = \"0.0.0.0\"\nport = 9100\n");
        let cfg = AppConfig::load_or_env_from(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.unwrap().server.port, 9100);
    }

    #[test]
    fn missing_config_file_falls_back_to_env() {
        let missing = std::env::temp_dir().join(format!("abc_configs_{}_absent.toml", std::process::id()));
        let cfg = AppConfig::load_or_env_from(missing.to_str().unwrap()).unwrap();
        assert!(cfg.server.port > 0);
        assert!(!cfg.storage.data_root.trim().is_empty());
    }
}
