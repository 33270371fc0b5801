use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "VPQUERY_CONFIG";

/// 容差绝对值低于该值时视为未请求偏移。
pub const DEFAULT_TOLERANCE_EPSILON: f64 = 0.1;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `VPQUERY_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let cwd = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(&cwd)
    }

    /// 在指定目录下寻找 `config/default.toml`，不读取环境变量。
    pub fn discover_in(root: &Path) -> Result<Self, ConfigError> {
        let default_path = root.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 范围查询的默认参数。
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "QueryConfig::default_epsilon")]
    pub tolerance_epsilon: f64,
    #[serde(default)]
    pub default_tolerance: f64,
    /// 实体类型名（如 `"LINE"`）；为空表示不过滤。
    #[serde(default)]
    pub entity_kinds: Vec<String>,
}

impl QueryConfig {
    fn default_epsilon() -> f64 {
        DEFAULT_TOLERANCE_EPSILON
    }

    /// 负数或非有限的阈值回退到默认值。
    pub fn effective_epsilon(&self) -> f64 {
        if self.tolerance_epsilon.is_finite() && self.tolerance_epsilon >= 0.0 {
            self.tolerance_epsilon
        } else {
            DEFAULT_TOLERANCE_EPSILON
        }
    }

    /// 非有限的默认容差按 0 处理。
    pub fn effective_default_tolerance(&self) -> f64 {
        if self.default_tolerance.is_finite() {
            self.default_tolerance
        } else {
            0.0
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            tolerance_epsilon: Self::default_epsilon(),
            default_tolerance: 0.0,
            entity_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
