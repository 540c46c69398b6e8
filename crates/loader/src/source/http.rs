//! # HTTP WASMソース
//!
//! URL経由でWASMバイナリをストリーミング取得する。
//!
//! レスポンスボディはチャンク単位で受信し、先頭8バイトが揃った時点で
//! プリアンブルを検査する。WASM以外のペイロードは全体を受信する前に失敗する。

use std::future::Future;
use std::pin::Pin;

use reqwest::header::CONTENT_TYPE;

use super::{check_preamble, WasmBinary, WasmSource, WASM_PREAMBLE_LEN};
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::locator::WasmLocator;

/// WASMのMIMEタイプ
pub const WASM_MIME: &str = "application/wasm";

/// URL経由でWASMバイナリを取得するソース。
pub struct HttpSource {
    client: reqwest::Client,
    max_bytes: usize,
    require_wasm_mime: bool,
}

impl HttpSource {
    /// 設定からHTTPクライアントを構築する。
    pub fn new(config: &LoaderConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| LoadError::Fetch {
                uri: "-".to_string(),
                reason: format!("HTTPクライアントの構築に失敗: {e}"),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// 既存のクライアントを使用する。
    pub fn with_client(client: reqwest::Client, config: &LoaderConfig) -> Self {
        Self {
            client,
            max_bytes: config.max_wasm_bytes,
            require_wasm_mime: config.require_wasm_mime,
        }
    }
}

impl WasmSource for HttpSource {
    fn fetch<'a>(
        &'a self,
        locator: &'a WasmLocator,
    ) -> Pin<Box<dyn Future<Output = Result<WasmBinary, LoadError>> + Send + 'a>> {
        Box::pin(async move {
            let WasmLocator::Http(url) = locator else {
                return Err(LoadError::InvalidLocator {
                    locator: locator.uri(),
                    reason: "HTTP(S) URLではありません".to_string(),
                });
            };
            let uri = url.to_string();

            let mut response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| request_error(e, &uri))?;

            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::HttpStatus {
                    status: status.as_u16(),
                    uri,
                });
            }

            if self.require_wasm_mime {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                let mime = content_type.split(';').next().unwrap_or_default().trim();
                if !mime.eq_ignore_ascii_case(WASM_MIME) {
                    return Err(LoadError::UnexpectedContentType {
                        uri,
                        content_type: content_type.to_string(),
                    });
                }
            }

            if let Some(len) = response.content_length() {
                if len > self.max_bytes as u64 {
                    return Err(LoadError::TooLarge {
                        uri,
                        limit: self.max_bytes,
                    });
                }
            }

            let mut bytes = Vec::new();
            let mut preamble_checked = false;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| request_error(e, &uri))?
            {
                bytes.extend_from_slice(&chunk);
                if bytes.len() > self.max_bytes {
                    return Err(LoadError::TooLarge {
                        uri,
                        limit: self.max_bytes,
                    });
                }
                if !preamble_checked && bytes.len() >= WASM_PREAMBLE_LEN {
                    check_preamble(&bytes, &uri)?;
                    preamble_checked = true;
                }
            }

            // 8バイト未満のボディ
            if !preamble_checked {
                check_preamble(&bytes, &uri)?;
            }

            tracing::debug!(uri = %uri, bytes = bytes.len(), "WASMバイナリを受信しました");
            Ok(WasmBinary::new(bytes, uri))
        })
    }
}

fn request_error(err: reqwest::Error, uri: &str) -> LoadError {
    if err.is_timeout() {
        LoadError::Timeout {
            uri: uri.to_string(),
        }
    } else {
        LoadError::Fetch {
            uri: uri.to_string(),
            reason: err.to_string(),
        }
    }
}
