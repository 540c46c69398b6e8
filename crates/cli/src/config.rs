//! # 環境変数からの設定読み込み
//!
//! | 変数 | 既定値 |
//! |---|---|
//! | `TSL_WASM_DIR` | `.` |
//! | `TSL_WASM_BASE_URL` | 未設定（相対パスはファイルとして解決） |
//! | `TSL_WASM_FETCH_TIMEOUT_SECS` | `120` |
//! | `TSL_WASM_MAX_BYTES` | `67108864` |
//! | `TSL_WASM_REQUIRE_MIME` | `true` |
//! | `TSL_WASM_FUEL_LIMIT` | `100000000` |
//! | `TSL_WASM_MEMORY_LIMIT` | `67108864` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use tsl_wasm_loader::LoaderConfig;

/// 環境変数からローダー設定を構築する。
pub fn loader_config_from_env() -> anyhow::Result<LoaderConfig> {
    loader_config_from(|key| std::env::var(key).ok())
}

/// 任意の変数ルックアップから設定を構築する。
pub(crate) fn loader_config_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<LoaderConfig> {
    let mut config = LoaderConfig::default();

    if let Some(dir) = lookup("TSL_WASM_DIR") {
        config.base_dir = PathBuf::from(dir);
    }
    if let Some(base_url) = lookup("TSL_WASM_BASE_URL") {
        let mut url = Url::parse(&base_url)
            .with_context(|| format!("TSL_WASM_BASE_URLが不正です: {base_url}"))?;
        // 末尾スラッシュがないと最後のセグメントが置き換えられる
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        config.base_url = Some(url);
    }
    if let Some(secs) = parse_var::<u64>(&lookup, "TSL_WASM_FETCH_TIMEOUT_SECS")? {
        config.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(max) = parse_var::<usize>(&lookup, "TSL_WASM_MAX_BYTES")? {
        config.max_wasm_bytes = max;
    }
    if let Some(require) = parse_var::<bool>(&lookup, "TSL_WASM_REQUIRE_MIME")? {
        config.require_wasm_mime = require;
    }
    if let Some(fuel) = parse_var::<u64>(&lookup, "TSL_WASM_FUEL_LIMIT")? {
        config.limits.fuel_limit = fuel;
    }
    if let Some(memory) = parse_var::<usize>(&lookup, "TSL_WASM_MEMORY_LIMIT")? {
        config.limits.memory_limit = memory;
    }

    Ok(config)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key}の値が不正です ({raw}): {e}"))
        })
        .transpose()
}
