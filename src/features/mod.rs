/// PNG → JPEG 转换
pub mod convert;

/// 健康检查
pub mod health;
