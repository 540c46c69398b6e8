//! # TSL WASMローダー
//!
//! WASMバイナリを取得し、ランタイムシムが供給するインポートオブジェクトに対して
//! インスタンス化した結果を呼び出し元のコールバックに渡す。
//!
//! ## 処理の流れ
//! 1. パス/URLを [`WasmLocator`] に解決する
//! 2. [`WasmSource`] でバイナリを取得する（ファイルまたはHTTP）
//! 3. ブロッキングワーカー上でコンパイル・インスタンス化する
//! 4. 成功時のみコールバックを1回だけ呼び出す
//!
//! 失敗時はコールバックを呼ばず、返された非同期処理が `Err` で完了する。
//! リトライ・キャッシュ・重複排除は行わない。

pub mod config;
pub mod error;
pub mod loader;
pub mod locator;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::LoaderConfig;
pub use error::LoadError;
pub use loader::{LoadedModule, WasmLoader};
pub use locator::WasmLocator;
pub use source::{FileSource, Fetcher, HttpSource, WasmBinary, WasmSource};
