//! 配置系统模块
//!
//! 统一处理 TOML 配置文件、环境变量、命令行参数

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config as ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 命令行参数
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "patientor")]
#[command(about = "患者登记、飞行日记与健康计算器服务")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// 数据库 URL
    #[arg(short, long)]
    pub database_url: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 支持的命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 运行 HTTP 服务
    Serve,
    /// 计算 BMI 分类
    Bmi {
        /// 身高（厘米）
        height: String,
        /// 体重（千克）
        weight: String,
    },
    /// 计算运动量评分
    Exercises {
        /// 每日目标小时数
        target: String,
        /// 每日运动小时数
        #[arg(required = true)]
        hours: Vec<String>,
    },
    /// 打印当前生效的配置
    PrintConfig,
    /// 重置配置
    ResetConfig,
    /// 生成 shell 自动补全脚本
    Completions {
        /// 目标 shell
        shell: clap_complete::Shell,
    },
}

/// 日志级别
#[derive(clap::ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 数据配置
    pub data: DataConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否允许跨域请求
    pub cors: bool,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库 URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时（秒）
    pub connect_timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
    /// 日志输出目录
    pub directory: Option<PathBuf>,
}

/// 日志格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 简洁格式
    Compact,
    /// 详细格式
    Full,
    /// JSON 格式
    Json,
}

/// 数据配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// 启动时向空表写入内置示例数据
    pub seed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            connect_timeout: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            directory: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

impl Config {
    /// 使用指定的 CLI 参数加载配置
    pub fn load_with_cli(cli: Cli) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. 首先加载默认配置
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // 2. 加载系统配置文件
        if let Some(system_config) = Self::get_system_config_path() {
            if system_config.exists() {
                builder = builder.add_source(File::from(system_config));
            }
        }

        // 3. 加载用户配置文件
        if let Some(user_config) = Self::get_user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config));
            }
        }

        // 4. 加载指定的配置文件
        if let Some(config_path) = cli.config {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            } else {
                return Err(anyhow!("配置文件不存在: {}", config_path.display()));
            }
        }

        // 5. 加载环境变量（前缀 PATIENTOR_）
        builder = builder.add_source(
            Environment::with_prefix("PATIENTOR")
                .prefix_separator("_")
                .separator("__"),
        );

        // 6. 构建配置
        let mut config: Config = builder.build()?.try_deserialize()?;

        // 7. 应用命令行参数覆盖
        if let Some(log_level) = cli.log_level {
            config.logging.level = log_level;
        }

        if let Some(database_url) = cli.database_url {
            config.database.url = database_url;
        }

        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // 8. 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 获取系统配置文件路径
    pub fn get_system_config_path() -> Option<PathBuf> {
        Some(PathBuf::from("/etc/patientor/config.toml"))
    }

    /// 获取用户配置文件路径
    pub fn get_user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "patientor").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 生成 TOML 文本
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| anyhow!("序列化配置失败: {}", e))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置
    fn validate(&self) -> Result<()> {
        // 验证数据库 URL
        if self.database.url.is_empty() {
            return Err(anyhow!("数据库 URL 不能为空"));
        }

        // 验证日志目录
        if let Some(log_dir) = &self.logging.directory {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
        }

        // 验证网络配置
        if self.server.port == 0 {
            return Err(anyhow!("监听端口不能为 0"));
        }

        Ok(())
    }

    /// 初始化日志系统
    ///
    /// 配置了日志目录时返回文件写入器的 guard，调用方需要一直持有它
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let level_filter = EnvFilter::builder()
            .with_default_directive(Level::from(self.logging.level.clone()).into())
            .from_env_lossy();

        let (file_layer, guard) = match &self.logging.directory {
            Some(log_dir) => {
                std::fs::create_dir_all(log_dir)?;
                let file_appender = tracing_appender::rolling::daily(log_dir, "patientor.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
                (Some(file_layer), Some(guard))
            }
            None => (None, None),
        };

        let registry = tracing_subscriber::registry()
            .with(level_filter)
            .with(file_layer);

        // 根据格式选择不同的终端输出层
        match self.logging.format {
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
            LogFormat::Full => registry.with(fmt::layer()).try_init()?,
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true).with_level(true))
                .try_init()?,
        }

        tracing::info!("日志系统已初始化，级别: {:?}", self.logging.level);
        Ok(guard)
    }
}
