use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
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
        Self { host: "127.0.0.1".into(), port: 5000, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: String::new(), key_prefix: default_key_prefix() }
    }
}

fn default_key_prefix() -> String {
    "record:".to_string()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 归一化 server
        self.server.normalize()?;
        // 归一化 redis（支持从环境变量填充 URL）
        self.redis.normalize_from_env();
        self.redis.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port 必须在 1..=65535 范围内"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl RedisConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供 URL，则尝试从环境变量填充，最后回退到本地默认端口
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("REDIS_URL") {
                self.url = url;
            }
        }
        if self.url.trim().is_empty() {
            self.url = "redis://127.0.0.1:6379".to_string();
        }
        // 记录键前缀统一以 ':' 结尾
        if !self.key_prefix.is_empty() && !self.key_prefix.ends_with(':') {
            self.key_prefix.push(':');
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("redis://") || lower.starts_with("rediss://")) {
            return Err(anyhow!("redis.url 必须以 redis:// 或 rediss:// 开头"));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(anyhow!("redis.key_prefix 不能为空"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_normalize_cleanly() {
        let mut cfg = AppConfig::default();
        cfg.normalize_and_validate().expect("defaults should validate");
        assert_eq!(cfg.server.port, 5000);
        assert!(!cfg.redis.url.is_empty());
        assert_eq!(cfg.redis.key_prefix, "record:");
    }

    #[test]
    fn key_prefix_gains_trailing_colon() {
        let mut cfg = AppConfig::default();
        cfg.redis.key_prefix = "student".into();
        cfg.normalize_and_validate().expect("validate");
        assert_eq!(cfg.redis.key_prefix, "student:");
    }

    #[test]
    fn rejects_non_redis_url() {
        let mut cfg = AppConfig::default();
        cfg.redis.url = "postgresql://localhost".into();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
