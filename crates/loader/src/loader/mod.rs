//! # WASMローダー
//!
//! パス/URLからWASMバイナリを取得し、インポートオブジェクトに対して
//! インスタンス化した結果をコールバックに渡す。
//!
//! - 成功時: コールバックを1回だけ呼び出す
//! - 失敗時: コールバックを呼ばず、返却した非同期処理が `Err` で完了する
//!
//! 呼び出しごとに独立した取得・インスタンス化を行う（キャッシュ・重複排除なし）。


use std::sync::Arc;

use tokio::task::JoinHandle;
use tsl_wasm_host::{instantiate, ImportObject, WasmInstance};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::locator::WasmLocator;
use crate::source::{Fetcher, WasmBinary, WasmSource};

/// インスタンス化の結果。
pub struct LoadedModule {
    /// 取得元URI
    pub source: String,
    /// WASMバイナリのSHA-256（16進小文字）
    pub sha256: String,
    /// コンパイル済みモジュールとインスタンス
    pub instance: WasmInstance,
}

impl LoadedModule {
    pub fn exports(&self) -> Vec<String> {
        self.instance.exports()
    }
}

/// WASMローダー。
///
/// クローンは同じ設定・インポートオブジェクト・ソースを共有する。
#[derive(Clone)]
pub struct WasmLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    config: LoaderConfig,
    imports: Arc<ImportObject>,
    source: Box<dyn WasmSource>,
}

impl WasmLoader {
    /// 既定のソース（ファイル + HTTP）でローダーを作成する。
    ///
    /// # 引数
    /// - `config`: ローダー設定
    /// - `imports`: ランタイムシムが構築したインポートオブジェクト
    pub fn new(config: LoaderConfig, imports: Arc<ImportObject>) -> Result<Self, LoadError> {
        let source = Fetcher::new(&config)?;
        Ok(Self::with_source(config, imports, Box::new(source)))
    }

    /// 任意のソースでローダーを作成する。
    pub fn with_source(
        config: LoaderConfig,
        imports: Arc<ImportObject>,
        source: Box<dyn WasmSource>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                config,
                imports,
                source,
            }),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// インスタンス化に使用するインポートオブジェクト
    pub fn import_object(&self) -> &Arc<ImportObject> {
        &self.inner.imports
    }

    /// WASMバイナリを取得し、インスタンス化する。
    ///
    /// コンパイル・インスタンス化はCPU負荷が高いため、ブロッキングワーカー上で実行する。
    pub async fn instantiate_streaming(&self, path: &str) -> Result<LoadedModule, LoadError> {
        let locator = WasmLocator::resolve(path, &self.inner.config)?;
        tracing::debug!(source = %locator, "WASMバイナリを取得します");

        let WasmBinary {
            bytes,
            source,
            sha256,
        } = self.inner.source.fetch(&locator).await?;

        let imports = self.inner.imports.clone();
        let limits = self.inner.config.limits;
        let instance = tokio::task::spawn_blocking(move || instantiate(&imports, &bytes, limits))
            .await
            .map_err(|e| LoadError::Join(e.to_string()))??;

        tracing::info!(
            source = %source,
            sha256 = %sha256,
            exports = instance.exports().len(),
            "WASMモジュールをインスタンス化しました"
        );

        Ok(LoadedModule {
            source,
            sha256,
            instance,
        })
    }

    /// WASMをロードし、成功時にコールバックを1回呼び出す。
    ///
    /// tokioランタイム上で呼び出すこと。返却した`JoinHandle`を待てば
    /// 成否を受け取れる。待たずに破棄してもロードは継続する。
    pub fn load_wasm<F>(&self, path: &str, callback: F) -> JoinHandle<Result<(), LoadError>>
    where
        F: FnOnce(LoadedModule) + Send + 'static,
    {
        let loader = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            match loader.instantiate_streaming(&path).await {
                Ok(loaded) => {
                    callback(loaded);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "WASMのロードに失敗しました");
                    Err(e)
                }
            }
        })
    }
}
