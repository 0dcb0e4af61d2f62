use std::time::{Duration, Instant};

use axum::body::Bytes;
use moka::future::Cache;

use crate::config::AppConfig;
use crate::error::AppError;

use super::codec::{self, JpegOptions};
use super::storage::{self, UploadStore};
use super::types::{ConvertedFile, UploadedFile};

/// 转换服务：暂存上传 → 解码/编码 → 读回结果，并可选缓存结果字节
pub struct ConvertService {
    store: UploadStore,
    options: JpegOptions,
    cache: Option<Cache<String, Bytes>>,
}

impl ConvertService {
    pub fn new(
        store: UploadStore,
        options: JpegOptions,
        cache: Option<Cache<String, Bytes>>,
    ) -> Self {
        Self {
            store,
            options,
            cache,
        }
    }

    /// 按配置构建（缓存容量按结果字节数加权）
    pub fn from_config(config: &AppConfig) -> Self {
        let conv = &config.conversion;
        let cache = conv.cache_enabled.then(|| {
            Cache::builder()
                .weigher(|_k: &String, v: &Bytes| u32::try_from(v.len()).unwrap_or(u32::MAX))
                .max_capacity(conv.cache_max_bytes)
                .time_to_live(Duration::from_secs(conv.cache_ttl_secs))
                .build()
        });
        Self::new(
            UploadStore::new(config.upload_path(), config.storage.mode),
            JpegOptions {
                quality: conv.jpeg_quality,
            },
            cache,
        )
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// 转换一个上传文件。
    ///
    /// 不支持的格式在落盘前即被拒绝；暂存目录在任意退出路径上都会随 guard 释放。
    pub async fn convert(&self, upload: UploadedFile) -> Result<ConvertedFile, AppError> {
        let t_total = Instant::now();
        let format = upload.format()?;
        let download_name = upload.download_name();
        let digest = storage::content_digest(&upload.bytes);
        let cache_key = format!("{digest}:q{}", self.options.quality);

        if let Some(cache) = &self.cache
            && let Some(bytes) = cache.get(&cache_key).await
        {
            tracing::info!(
                "转换缓存命中: {} -> {} (digest={})",
                upload.client_filename,
                download_name,
                digest
            );
            return Ok(ConvertedFile {
                download_name,
                unicode_name: upload.unicode_download_name(),
                bytes,
                digest,
                cache_hit: true,
            });
        }

        let store = self.store.clone();
        let options = self.options;
        let input = upload.bytes.clone();
        let stage_digest = digest.clone();
        let (staged, output) = tokio::task::spawn_blocking(move || {
            let staged = store.stage(&input, format, &stage_digest)?;
            let output = codec::convert_to_jpeg(staged.input_path(), &options)?;
            Ok::<_, AppError>((staged, output))
        })
        .await??;

        let bytes = Bytes::from(storage::read_output(&output).await?);
        drop(staged);

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, bytes.clone()).await;
        }

        tracing::info!(
            "转换完成: {} -> {} (digest={}, {} -> {} bytes, {}ms)",
            upload.client_filename,
            download_name,
            digest,
            upload.bytes.len(),
            bytes.len(),
            t_total.elapsed().as_millis()
        );

        Ok(ConvertedFile {
            download_name,
            unicode_name: upload.unicode_download_name(),
            bytes,
            digest,
            cache_hit: false,
        })
    }
}
