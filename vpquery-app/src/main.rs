use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use vpquery_config::{AppConfig, ConfigError};

mod cli;

use cli::{QueryOptions, QueryTarget};

#[derive(Parser, Debug)]
#[command(name = "vpquery", about = "视口/块边界范围查询演示")]
struct Cli {
    /// 配置文件路径，缺省时按 VPQUERY_CONFIG 与 ./config/default.toml 查找。
    #[arg(long)]
    config: Option<PathBuf>,

    /// 边界偏移容差，正值外扩，负值内缩。
    #[arg(long, allow_negative_numbers = true)]
    tolerance: Option<f64>,

    /// 仅选择指定类型的实体（如 LINE、CIRCLE），可重复。
    #[arg(long = "kind", value_name = "NAME")]
    kinds: Vec<String>,

    /// 以 JSON 输出结果。
    #[arg(long)]
    json: bool,

    /// 查询指定视口（十六进制句柄）。
    #[arg(long, value_name = "HANDLE", conflicts_with = "block")]
    viewport: Option<String>,

    /// 查询指定块参照（十六进制句柄）。
    #[arg(long, value_name = "HANDLE")]
    block: Option<String>,
}

impl Cli {
    fn into_options(self) -> (Option<PathBuf>, QueryOptions) {
        let target = match (self.viewport, self.block) {
            (Some(handle), _) => Some(QueryTarget::Viewport(handle)),
            (None, Some(handle)) => Some(QueryTarget::Block(handle)),
            (None, None) => None,
        };
        let options = QueryOptions {
            tolerance: self.tolerance,
            kinds: self.kinds,
            json: self.json,
            target,
        };
        (self.config, options)
    }
}

fn main() {
    let (config_override, options) = Cli::parse().into_options();

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动 vpquery");

    if let Err(err) = cli::run(&config, &options) {
        error!(error = %err, "执行范围查询失败");
        eprintln!("错误：{err}");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出留给查询结果
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
