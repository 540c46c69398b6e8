//! # TSL WASM CLI
//!
//! WASMバイナリを取得・インスタンス化し、エクスポートを表示する。
//! 設定は環境変数から読み込む（`config.rs`参照）。

mod config;
mod report;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tsl_wasm_host::{GoRuntimeShim, ImportObject};
use tsl_wasm_loader::WasmLoader;

use crate::report::{ImportsReport, ModuleReport};

#[derive(Parser)]
#[command(name = "tsl-wasm", version, about = "TSL WASMバイナリのロード・インスタンス化")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// WASMをロードし、エクスポートを表示する
    Load {
        /// WASMのパスまたはURL
        path: String,
        /// インスタンス化後に呼び出す引数なしのエクスポート関数
        #[arg(long)]
        invoke: Option<String>,
        /// JSONで出力する
        #[arg(long)]
        json: bool,
    },
    /// ランタイムシムが提供するインポートを表示する
    Imports {
        /// JSONで出力する
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdoutはレポート出力に使うため、ログはstderrへ
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let engine = tsl_wasm_host::new_engine()?;
    let imports = Arc::new(ImportObject::from_shim(&engine, &GoRuntimeShim)?);

    match cli.command {
        Command::Imports { json } => {
            let report = ImportsReport::from_imports(&imports);
            print_report(&report, json)?;
        }
        Command::Load { path, invoke, json } => {
            let config = config::loader_config_from_env()?;
            let loader = WasmLoader::new(config, imports)?;

            let (tx, rx) = oneshot::channel();
            loader
                .load_wasm(&path, move |loaded| {
                    let _ = tx.send(loaded);
                })
                .await??;
            let mut loaded = rx.await?;

            if let Some(name) = &invoke {
                tracing::info!(export = %name, "エクスポート関数を呼び出します");
                loaded.instance.call::<(), ()>(name, ())?;
            }

            let report = ModuleReport::from_loaded(&loaded, invoke);
            print_report(&report, json)?;
        }
    }

    Ok(())
}

fn print_report<R>(report: &R, json: bool) -> anyhow::Result<()>
where
    R: serde::Serialize + std::fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
