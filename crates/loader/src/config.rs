//! # ローダー設定

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tsl_wasm_host::HostLimits;

/// ローダーの設定。
///
/// ライブラリは環境変数を直接読まない。CLI等の呼び出し側が構築して渡す。
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// 相対パスの解決先ディレクトリ（`base_url`未設定時）
    pub base_dir: PathBuf,
    /// 相対パスの解決先URL。設定時は相対パスもHTTPで取得する
    pub base_url: Option<Url>,
    /// HTTP取得全体のタイムアウト
    pub fetch_timeout: Duration,
    /// WASMバイナリの最大サイズ（バイト）
    pub max_wasm_bytes: usize,
    /// HTTPレスポンスのContent-Typeに application/wasm を要求するか
    pub require_wasm_mime: bool,
    /// インスタンスごとのFuel・Memory制限
    pub limits: HostLimits,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            base_url: None,
            fetch_timeout: Duration::from_secs(120),
            max_wasm_bytes: 64 * 1024 * 1024, // 64MB
            require_wasm_mime: true,
            limits: HostLimits::default(),
        }
    }
}
