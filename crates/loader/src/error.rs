//! # ローダーエラー型
//!
//! 「リソースが利用できない、または不正」の一系統のみ。
//! ローカルでは回復せず、呼び出し元の非同期処理にそのまま返す。

use tsl_wasm_host::WasmError;

/// WASMロードのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// パス/URLを解釈できない
    #[error("WASMロケーターが不正です ({locator}): {reason}")]
    InvalidLocator { locator: String, reason: String },
    /// 読み込み・通信の失敗（ファイルが存在しない、接続失敗等）
    #[error("WASMバイナリの読み込みに失敗 ({uri}): {reason}")]
    Fetch { uri: String, reason: String },
    /// HTTPステータスが成功以外
    #[error("WASM取得でHTTPエラー: ステータス {status} ({uri})")]
    HttpStatus { status: u16, uri: String },
    /// Content-Typeが application/wasm ではない
    #[error("WASM取得: Content-Typeが application/wasm ではありません ({uri}): {content_type}")]
    UnexpectedContentType { uri: String, content_type: String },
    /// サイズ上限超過
    #[error("WASMバイナリがサイズ上限 {limit} バイトを超えています ({uri})")]
    TooLarge { uri: String, limit: usize },
    /// WASMのプリアンブル（`\0asm` + バージョン1）がない
    #[error("WASMバイナリではありません ({uri})")]
    NotWasm { uri: String },
    /// 取得がタイムアウトした
    #[error("WASM取得がタイムアウトしました ({uri})")]
    Timeout { uri: String },
    /// コンパイル・インスタンス化の失敗
    #[error(transparent)]
    Wasm(#[from] WasmError),
    /// インスタンス化タスクの異常終了
    #[error("インスタンス化タスクが異常終了しました: {0}")]
    Join(String),
}
