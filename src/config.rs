use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 默认配置文件路径（可通过 `APP_CONFIG_PATH` 覆盖）
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 调试模式：提升默认日志级别（不会向调用方暴露内部错误细节）
    #[serde(default = "ServerConfig::default_debug")]
    pub debug: bool,
}

impl ServerConfig {
    fn default_debug() -> bool {
        true
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
    /// 日志格式：full | compact
    pub format: String,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀（为空时挂载在根路径）
    #[serde(default)]
    pub prefix: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allowed_methods: vec!["POST".to_string()],
            max_age_secs: None,
        }
    }
}

/// 上传文件的落盘方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// 以内容 SHA-256 作为文件名长期保留（相同内容落到同一路径）
    #[default]
    ContentAddressed,
    /// 每个请求独占一个临时目录，请求结束后自动清理
    Ephemeral,
}

/// 上传存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 上传工作目录
    #[serde(default = "StorageConfig::default_upload_dir")]
    pub upload_dir: String,
    /// 落盘方式
    #[serde(default)]
    pub mode: StorageMode,
    /// 单次请求体上限（字节）
    #[serde(default = "StorageConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    fn default_upload_dir() -> String {
        "uploads".to_string()
    }
    fn default_max_upload_bytes() -> usize {
        20 * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: Self::default_upload_dir(),
            mode: StorageMode::default(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

/// 转换配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// JPEG 质量 1-100（默认 75，与编码器默认值一致）
    #[serde(default = "ConversionConfig::default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// 是否启用转换结果缓存
    #[serde(default = "ConversionConfig::default_cache_enabled")]
    pub cache_enabled: bool,
    /// 缓存最大容量（字节），按结果字节大小加权
    #[serde(default = "ConversionConfig::default_cache_max_bytes")]
    pub cache_max_bytes: u64,
    /// 缓存 TTL（秒）
    #[serde(default = "ConversionConfig::default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl ConversionConfig {
    fn default_jpeg_quality() -> u8 {
        75
    }
    fn default_cache_enabled() -> bool {
        true
    }
    fn default_cache_max_bytes() -> u64 {
        64 * 1024 * 1024
    }
    fn default_cache_ttl() -> u64 {
        300
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Self::default_jpeg_quality(),
            cache_enabled: Self::default_cache_enabled(),
            cache_max_bytes: Self::default_cache_max_bytes(),
            cache_ttl_secs: Self::default_cache_ttl(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 上传存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 转换配置
    #[serde(default)]
    pub conversion: ConversionConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 加载配置：内置默认值 → 配置文件（可选）→ 环境变量覆盖
    ///
    /// 环境变量形如 `APP_STORAGE__UPLOAD_DIR`，段与键之间使用双下划线。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件（不存在时使用默认值）", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&Self::default())?)
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            "配置加载完成: upload_dir = {}, mode = {:?}, jpeg_quality = {}",
            config.storage.upload_dir,
            config.storage.mode,
            config.conversion.jpeg_quality
        );

        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.conversion.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "conversion.jpeg_quality 必须在 1-100 范围内，当前为 {}",
                self.conversion.jpeg_quality
            )));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "storage.max_upload_bytes 必须大于 0".to_string(),
            ));
        }
        if self.storage.upload_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "storage.upload_dir 不能为空".to_string(),
            ));
        }
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        std::env::var_os("APP_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 监听地址是否为本机回环
    pub fn is_loopback(&self) -> bool {
        if self.server.host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        self.server
            .host
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
    }

    /// 获取上传工作目录
    pub fn upload_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.upload_dir)
    }

    /// 未设置 RUST_LOG 时使用的默认过滤规则
    pub fn default_log_filter(&self) -> String {
        let level = if self.server.debug {
            "debug"
        } else {
            self.logging.level.as_str()
        };
        format!("convert_backend={level},tower_http={level}")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                debug: ServerConfig::default_debug(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "full".to_string(),
            },
            api: ApiConfig {
                prefix: String::new(),
            },
            cors: CorsConfig::default(),
            storage: StorageConfig::default(),
            conversion: ConversionConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}
