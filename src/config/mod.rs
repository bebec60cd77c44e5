/// 粒子系统配置
///
/// 提供TOML/JSON配置文件、环境变量覆盖和日志初始化
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 默认剔除半径：12 个地图块，每块 16 个节点
pub const DEFAULT_CULL_RADIUS: f32 = 16.0 * 12.0;

/// 粒子系统主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// 发射器不生成距离玩家超过该半径（节点单位）的粒子
    #[serde(default = "default_cull_radius")]
    pub cull_radius: f32,

    /// 随机数种子；`None` 时使用系统熵
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_cull_radius() -> f32 {
    DEFAULT_CULL_RADIUS
}

impl_default!(ParticleConfig {
    cull_radius: DEFAULT_CULL_RADIUS,
    seed: None,
    logging: LoggingConfig::default(),
});

impl ParticleConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用固定种子，模拟结果可复现
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PARTICLES_CULL_RADIUS") {
            if let Ok(radius) = val.parse() {
                self.cull_radius = radius;
            }
        }
        if let Ok(val) = env::var("PARTICLES_SEED") {
            if let Ok(seed) = val.parse() {
                self.seed = Some(seed);
            }
        }
        if let Ok(val) = env::var("PARTICLES_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.cull_radius.is_finite() || self.cull_radius <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "cull_radius must be a positive number, got {}",
                self.cull_radius
            )));
        }
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particles.toml
    /// 2. ./particles.json
    /// 3. ~/.config/particle_engine/particles.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("particles.toml") {
            tracing::info!(target: "particles", "Loaded config from particles.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("particles.json") {
            tracing::info!(target: "particles", "Loaded config from particles.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("particle_engine")
                .join("particles.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "particles", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "particles", "Using default particle configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 解析级别名称（不区分大小写）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 初始化日志订阅者
///
/// 已有全局订阅者或关闭了控制台输出时返回 `false`。
pub fn init_logging(config: &LoggingConfig) -> bool {
    if !config.log_to_console {
        return false;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParticleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cull_radius, 192.0);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ParticleConfig::default().with_seed(42);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ParticleConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_json_serialization() {
        let config = ParticleConfig::default();
        let json_str = serde_json::to_string(&config).unwrap();
        let parsed = ParticleConfig::from_json_str(&json_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ParticleConfig::from_toml_str("seed = 7\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.cull_radius, DEFAULT_CULL_RADIUS);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("particles.toml");
        let config = ParticleConfig {
            cull_radius: 64.0,
            ..Default::default()
        };
        config.save_toml(&path).unwrap();
        assert_eq!(ParticleConfig::from_toml_file(&path).unwrap(), config);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ParticleConfig::from_json_file(&missing),
            Err(ConfigError::FileError(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ParticleConfig {
            cull_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ParticleConfig::from_toml_str("cull_radius = \"far\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
        let silent = LoggingConfig {
            log_to_console: false,
            ..Default::default()
        };
        assert!(!init_logging(&silent));
        tracing::info!(target: "particles", "logging initialized");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("PARTICLES_CULL_RADIUS", "48");
        env::set_var("PARTICLES_SEED", "9");
        env::set_var("PARTICLES_LOG_LEVEL", "Debug");
        let mut config = ParticleConfig::default();
        config.apply_env_overrides();
        env::remove_var("PARTICLES_CULL_RADIUS");
        env::remove_var("PARTICLES_SEED");
        env::remove_var("PARTICLES_LOG_LEVEL");

        assert_eq!(config.cull_radius, 48.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }
}
