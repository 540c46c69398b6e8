//! # ファイルシステム WASMソース
//!
//! ローカルファイルからWASMバイナリを読み込む。

use std::future::Future;
use std::pin::Pin;

use super::{check_preamble, WasmBinary, WasmSource};
use crate::error::LoadError;
use crate::locator::WasmLocator;

/// ローカルファイルからWASMバイナリを読み込むソース。
pub struct FileSource {
    max_bytes: usize,
}

impl FileSource {
    /// # 引数
    /// - `max_bytes`: 読み込むファイルの最大サイズ
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl WasmSource for FileSource {
    fn fetch<'a>(
        &'a self,
        locator: &'a WasmLocator,
    ) -> Pin<Box<dyn Future<Output = Result<WasmBinary, LoadError>> + Send + 'a>> {
        Box::pin(async move {
            let WasmLocator::File(path) = locator else {
                return Err(LoadError::InvalidLocator {
                    locator: locator.uri(),
                    reason: "ファイルパスではありません".to_string(),
                });
            };
            let uri = locator.uri();

            let metadata = tokio::fs::metadata(path).await.map_err(|e| LoadError::Fetch {
                uri: uri.clone(),
                reason: e.to_string(),
            })?;
            if metadata.len() > self.max_bytes as u64 {
                return Err(LoadError::TooLarge {
                    uri,
                    limit: self.max_bytes,
                });
            }

            let bytes = tokio::fs::read(path).await.map_err(|e| LoadError::Fetch {
                uri: uri.clone(),
                reason: e.to_string(),
            })?;
            check_preamble(&bytes, &uri)?;

            Ok(WasmBinary::new(bytes, uri))
        })
    }
}
