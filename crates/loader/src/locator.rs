//! # WASMロケーター
//!
//! 呼び出し元が渡すパス/URL文字列を取得先に解決する。
//!
//! - `http://` / `https://` はそのままURLとして扱う
//! - `file://` はファイルパスとして扱う
//! - それ以外は相対/絶対パス。`base_url`が設定されていればURLとして結合する
//!   （ブラウザのfetchがドキュメントのベースURLで解決するのと同じ）

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::config::LoaderConfig;
use crate::error::LoadError;

/// 解決済みの取得先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WasmLocator {
    /// ローカルファイル
    File(PathBuf),
    /// HTTP(S) URL
    Http(Url),
}

impl WasmLocator {
    /// 入力文字列を設定に従って解決する。
    pub fn resolve(input: &str, config: &LoaderConfig) -> Result<Self, LoadError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "空のパスです"));
        }

        // 1文字のスキームはWindowsのドライブレターとみなしてパス扱いにする
        if let Ok(url) = Url::parse(input) {
            if url.scheme().len() > 1 {
                return match url.scheme() {
                    "http" | "https" => Ok(WasmLocator::Http(url)),
                    // パーセントエンコードの復号と `localhost` ホストの除去は to_file_path に任せる
                    "file" => url
                        .to_file_path()
                        .map(WasmLocator::File)
                        .map_err(|()| invalid(input, "ローカルファイルを指すfile URLではありません")),
                    other => Err(invalid(input, &format!("未対応のスキーム: {other}"))),
                };
            }
        }

        if let Some(base) = &config.base_url {
            let url = base
                .join(input)
                .map_err(|e| invalid(input, &format!("ベースURLとの結合に失敗: {e}")))?;
            return Ok(WasmLocator::Http(url));
        }

        let path = Path::new(input);
        if path.is_absolute() {
            Ok(WasmLocator::File(path.to_path_buf()))
        } else {
            Ok(WasmLocator::File(config.base_dir.join(path)))
        }
    }

    /// ログ・結果に記録するソースURI
    pub fn uri(&self) -> String {
        match self {
            WasmLocator::File(path) => format!("file://{}", path.display()),
            WasmLocator::Http(url) => url.to_string(),
        }
    }
}

impl fmt::Display for WasmLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

fn invalid(locator: &str, reason: &str) -> LoadError {
    LoadError::InvalidLocator {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_dir(dir: &str) -> LoaderConfig {
        LoaderConfig {
            base_dir: PathBuf::from(dir),
            ..LoaderConfig::default()
        }
    }

    #[test]
    fn test_relative_path_joins_base_dir() {
        let config = config_with_dir("/srv/wasm");
        let locator = WasmLocator::resolve("./tsl.wasm", &config).unwrap();
        assert_eq!(locator, WasmLocator::File(PathBuf::from("/srv/wasm/./tsl.wasm")));
    }

    #[test]
    fn test_absolute_path_kept() {
        let config = config_with_dir("/srv/wasm");
        let locator = WasmLocator::resolve("/opt/tsl.wasm", &config).unwrap();
        assert_eq!(locator, WasmLocator::File(PathBuf::from("/opt/tsl.wasm")));
        assert_eq!(locator.uri(), "file:///opt/tsl.wasm");
    }

    #[test]
    fn test_file_scheme() {
        let locator = WasmLocator::resolve("file:///tmp/tsl.wasm", &LoaderConfig::default()).unwrap();
        assert_eq!(locator, WasmLocator::File(PathBuf::from("/tmp/tsl.wasm")));
    }

    #[test]
    fn test_file_scheme_decodes_percent_escapes() {
        let config = config_with_dir("/srv/wasm");
        let locator = WasmLocator::resolve("file:///tmp/my%20app.wasm", &config).unwrap();
        assert_eq!(locator, WasmLocator::File(PathBuf::from("/tmp/my app.wasm")));
    }

    #[test]
    fn test_file_scheme_with_localhost() {
        let config = config_with_dir("/srv/wasm");
        let locator = WasmLocator::resolve("file://localhost/tmp/app.wasm", &config).unwrap();
        assert_eq!(locator, WasmLocator::File(PathBuf::from("/tmp/app.wasm")));
    }

    #[test]
    fn test_file_scheme_with_remote_host() {
        let result = WasmLocator::resolve("file://fileserver/share/app.wasm", &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::InvalidLocator { .. })));
    }

    #[test]
    fn test_http_url() {
        let locator =
            WasmLocator::resolve("https://cdn.example.com/tsl.wasm", &LoaderConfig::default())
                .unwrap();
        assert_eq!(
            locator,
            WasmLocator::Http(Url::parse("https://cdn.example.com/tsl.wasm").unwrap())
        );
    }

    #[test]
    fn test_relative_path_joins_base_url() {
        let config = LoaderConfig {
            base_url: Some(Url::parse("http://localhost:8080/static/").unwrap()),
            ..LoaderConfig::default()
        };
        let locator = WasmLocator::resolve("./app.wasm", &config).unwrap();
        assert_eq!(locator.uri(), "http://localhost:8080/static/app.wasm");
    }

    #[test]
    fn test_unsupported_scheme() {
        let result = WasmLocator::resolve("ftp://example.com/tsl.wasm", &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::InvalidLocator { .. })));
    }

    #[test]
    fn test_empty_input() {
        let result = WasmLocator::resolve("  ", &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::InvalidLocator { .. })));
    }
}
