//! # WASMバイナリソース
//!
//! WASMバイナリの取得を抽象化する。
//!
//! ## ソース実装
//! - `FileSource`: ローカルファイルから読み込む
//! - `HttpSource`: HTTP(S)でストリーミング取得する
//! - `Fetcher`: ロケーターの種類に応じて上記を振り分ける（既定）

pub mod file;
pub mod http;

pub use file::FileSource;
pub use http::HttpSource;

use std::future::Future;
use std::pin::Pin;

use sha2::{Digest, Sha256};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::locator::WasmLocator;

/// WASMのマジックナンバー
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// サポートするバイナリフォーマットのバージョン（1）
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// プリアンブル（マジック + バージョン）の長さ
pub const WASM_PREAMBLE_LEN: usize = 8;

/// WASMバイナリの取得結果。
#[derive(Debug, Clone)]
pub struct WasmBinary {
    /// WASMバイナリデータ
    pub bytes: Vec<u8>,
    /// ソースURI
    pub source: String,
    /// バイナリのSHA-256（16進小文字）
    pub sha256: String,
}

impl WasmBinary {
    pub fn new(bytes: Vec<u8>, source: String) -> Self {
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            bytes,
            source,
            sha256,
        }
    }
}

/// WASMバイナリを取得するトレイト。
///
/// ファイルシステム、HTTP、その他のソースに対応可能。
pub trait WasmSource: Send + Sync {
    /// ロケーターが指すWASMバイナリを取得する。
    fn fetch<'a>(
        &'a self,
        locator: &'a WasmLocator,
    ) -> Pin<Box<dyn Future<Output = Result<WasmBinary, LoadError>> + Send + 'a>>;
}

/// プリアンブルを検査する。`bytes`は少なくとも先頭8バイトを含むこと。
pub(crate) fn check_preamble(bytes: &[u8], uri: &str) -> Result<(), LoadError> {
    if bytes.len() < WASM_PREAMBLE_LEN
        || bytes[..4] != WASM_MAGIC
        || bytes[4..WASM_PREAMBLE_LEN] != WASM_VERSION
    {
        return Err(LoadError::NotWasm {
            uri: uri.to_string(),
        });
    }
    Ok(())
}

/// ロケーターの種類でファイル/HTTPを振り分ける既定のソース。
pub struct Fetcher {
    file: FileSource,
    http: HttpSource,
}

impl Fetcher {
    pub fn new(config: &LoaderConfig) -> Result<Self, LoadError> {
        Ok(Self {
            file: FileSource::new(config.max_wasm_bytes),
            http: HttpSource::new(config)?,
        })
    }
}

impl WasmSource for Fetcher {
    fn fetch<'a>(
        &'a self,
        locator: &'a WasmLocator,
    ) -> Pin<Box<dyn Future<Output = Result<WasmBinary, LoadError>> + Send + 'a>> {
        match locator {
            WasmLocator::File(_) => self.file.fetch(locator),
            WasmLocator::Http(_) => self.http.fetch(locator),
        }
    }
}
