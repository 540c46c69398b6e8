//! # TSL WASM実行環境
//!
//! TSLインタプリタのWASMバイナリをwasmtimeで直接インスタンス化する。
//!
//! ## 安全性確保
//! - Fuel制限: 命令実行数の上限（start関数の無限ループ防止）
//! - Memory制限: リニアメモリ使用量の上限（OOM防止）
//! - catch_unwind: パニックをキャッチし、呼び出し元への影響を遮断
//!
//! ## 構成
//! - [`ImportObject`]: ランタイムシムが構築するインポートオブジェクト（構築後は不変）
//! - [`RuntimeShim`]: インポートオブジェクトを供給する外部コラボレーター
//! - [`GoRuntimeShim`]: Goツールチェーンが生成するWASM向けの `gojs` ランタイム関数
//! - [`instantiate`]: コンパイル + リンク + インスタンス化

pub mod gojs;
pub mod imports;
pub mod instance;

pub use gojs::GoRuntimeShim;
pub use imports::{ImportBuilder, ImportName, ImportObject, RuntimeShim};
pub use instance::{instantiate, HostState, WasmInstance};

/// WASM実行環境のエラー型
#[derive(Debug, thiserror::Error)]
pub enum WasmError {
    /// wasmtimeエンジンの構築エラー
    #[error("WASMエンジンの構築に失敗: {0}")]
    EngineError(String),
    /// WASMモジュールのコンパイルエラー
    #[error("WASMコンパイルエラー: {0}")]
    CompileError(String),
    /// リンク・インスタンス化エラー（インポート不足、start関数のトラップ等）
    #[error("WASMインスタンス化エラー: {0}")]
    InstantiateError(String),
    /// WASMモジュールの実行エラー
    #[error("WASM実行エラー: {0}")]
    ExecutionError(String),
    /// Fuel制限超過
    #[error("Fuel制限を超過しました")]
    FuelExhausted,
    /// WASMパニック
    #[error("WASMモジュールがパニックしました: {0}")]
    Panic(String),
    /// ホスト関数エラー
    #[error("ホスト関数エラー: {0}")]
    HostFunctionError(String),
    /// エクスポートが存在しない、または型が一致しない
    #[error("エクスポートが見つかりません: {0}")]
    ExportNotFound(String),
}

/// インスタンスごとのリソース制限。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLimits {
    /// Fuel制限（命令実行数の上限）
    pub fuel_limit: u64,
    /// Memory制限（バイト）
    pub memory_limit: usize,
}

impl Default for HostLimits {
    fn default() -> Self {
        Self {
            fuel_limit: 100_000_000,         // 1億命令
            memory_limit: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Fuel計測を有効にしたwasmtimeエンジンを作成する。
///
/// エンジンはコンパイル設定のみを保持し、インスタンス間で共有してよい。
pub fn new_engine() -> Result<wasmtime::Engine, WasmError> {
    let mut config = wasmtime::Config::new();
    config.consume_fuel(true);
    wasmtime::Engine::new(&config).map_err(|e| WasmError::EngineError(e.to_string()))
}

/// wasmtimeのエラーをWasmErrorに変換する。Fuel切れのトラップは専用のバリアントにする。
pub(crate) fn classify_trap(err: wasmtime::Error, wrap: fn(String) -> WasmError) -> WasmError {
    if matches!(
        err.downcast_ref::<wasmtime::Trap>(),
        Some(wasmtime::Trap::OutOfFuel)
    ) {
        return WasmError::FuelExhausted;
    }
    wrap(format!("{err:#}"))
}
