use crate::config::{AppConfig, StorageMode};
use crate::error::AppError;
use crate::features::convert::UploadStore;

/// 执行启动检查
///
/// 1. 检查并创建上传工作目录
/// 2. 确认目录可写
/// 3. 对不适合公开暴露的配置给出告警
pub async fn run_startup_checks(config: &AppConfig, store: &UploadStore) -> Result<(), AppError> {
    tracing::info!("开始执行启动检查...");

    ensure_upload_dir(store)?;
    ensure_writable(store)?;
    warn_risky_settings(config, store);

    tracing::info!("启动检查完成");
    Ok(())
}

/// 确保上传目录存在
fn ensure_upload_dir(store: &UploadStore) -> Result<(), AppError> {
    let root = store.root();

    if root.is_dir() {
        tracing::info!("上传目录已存在: {:?}", root);
        return Ok(());
    }
    if root.exists() {
        return Err(AppError::Internal(format!(
            "上传路径已存在但不是目录: {}",
            root.display()
        )));
    }

    tracing::warn!("未找到上传目录，正在创建: {:?}", root);
    store
        .ensure_root()
        .map_err(|e| AppError::Internal(format!("创建上传目录失败: {e}")))?;
    tracing::info!("上传目录创建成功");
    Ok(())
}

/// 在目录内创建并立即删除一个探测文件
fn ensure_writable(store: &UploadStore) -> Result<(), AppError> {
    tempfile::NamedTempFile::new_in(store.root())
        .map(drop)
        .map_err(|e| {
            AppError::Internal(format!(
                "上传目录不可写 {}: {e}",
                store.root().display()
            ))
        })
}

fn warn_risky_settings(config: &AppConfig, store: &UploadStore) {
    if store.mode() == StorageMode::ContentAddressed {
        tracing::info!("上传与转换结果将长期保留在 {:?}（无自动清理）", store.root());
    }
    if config.server.debug && !config.is_loopback() {
        tracing::warn!(
            "debug 模式下监听非本机地址 {}，不建议对外暴露",
            config.server_addr()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn startup_creates_missing_upload_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("nested").join("uploads");
        let store = UploadStore::new(&root, StorageMode::ContentAddressed);

        run_startup_checks(&AppConfig::default(), &store)
            .await
            .expect("startup checks");
        assert!(root.is_dir());

        // 幂等
        run_startup_checks(&AppConfig::default(), &store)
            .await
            .expect("second run");
    }

    #[tokio::test]
    async fn startup_rejects_file_in_place_of_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("uploads");
        std::fs::write(&root, b"not a dir").expect("write file");
        let store = UploadStore::new(&root, StorageMode::Ephemeral);

        let err = run_startup_checks(&AppConfig::default(), &store)
            .await
            .expect_err("should fail");
        assert!(matches!(err, AppError::Internal(_)));
    }
}
