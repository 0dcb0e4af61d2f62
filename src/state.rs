use std::sync::Arc;

use crate::config::AppConfig;
use crate::features::convert::ConvertService;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// PNG → JPEG 转换服务
    pub converter: Arc<ConvertService>,
}

impl AppState {
    pub fn new(converter: ConvertService) -> Self {
        Self {
            converter: Arc::new(converter),
        }
    }

    /// 按配置构建全部共享状态
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ConvertService::from_config(config))
    }
}
