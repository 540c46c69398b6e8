//! # インポートオブジェクト
//!
//! WASMモジュールがインスタンス化時に要求するホスト関数群。
//! ランタイムシム（[`RuntimeShim`]）が一度だけ構築し、以後は読み取り専用で共有する。

use serde::Serialize;
use wasmtime::{Engine, IntoFunc, Linker};

use crate::instance::HostState;
use crate::WasmError;

/// インポートオブジェクトが定義する1エントリ（`module`名前空間の`name`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImportName {
    pub module: String,
    pub name: String,
}

/// インポートオブジェクトを供給するランタイムシム。
///
/// ローダーはシムの中身を解釈しない。`register`で定義された関数群を
/// そのままインスタンス化に使用する。
pub trait RuntimeShim: Send + Sync {
    /// シム名（ログ・レポート用）
    fn name(&self) -> &str;

    /// ホスト関数をインポートオブジェクトに登録する。
    fn register(&self, imports: &mut ImportBuilder) -> Result<(), WasmError>;
}

/// [`RuntimeShim::register`]に渡されるビルダー。
/// 登録したインポート名を記録する。
pub struct ImportBuilder {
    linker: Linker<HostState>,
    names: Vec<ImportName>,
}

impl ImportBuilder {
    /// ホスト関数を `module.name` として登録する。
    pub fn func_wrap<Params, Args>(
        &mut self,
        module: &str,
        name: &str,
        func: impl IntoFunc<HostState, Params, Args>,
    ) -> Result<&mut Self, WasmError> {
        self.linker
            .func_wrap(module, name, func)
            .map_err(|e| WasmError::HostFunctionError(format!("{module}.{name}: {e}")))?;
        self.names.push(ImportName {
            module: module.to_string(),
            name: name.to_string(),
        });
        Ok(self)
    }
}

/// 構築済みのインポートオブジェクト。
///
/// 構築後に変更する手段は持たない。複数のインスタンス化で共有される。
pub struct ImportObject {
    engine: Engine,
    linker: Linker<HostState>,
    shim_name: String,
    names: Vec<ImportName>,
}

impl ImportObject {
    /// ランタイムシムからインポートオブジェクトを構築する。
    pub fn from_shim(engine: &Engine, shim: &dyn RuntimeShim) -> Result<Self, WasmError> {
        let mut builder = ImportBuilder {
            linker: Linker::new(engine),
            names: Vec::new(),
        };
        shim.register(&mut builder)?;

        tracing::debug!(
            shim = shim.name(),
            imports = builder.names.len(),
            "インポートオブジェクトを構築しました"
        );

        Ok(Self {
            engine: engine.clone(),
            linker: builder.linker,
            shim_name: shim.name().to_string(),
            names: builder.names,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn linker(&self) -> &Linker<HostState> {
        &self.linker
    }

    /// 供給元シムの名前
    pub fn shim_name(&self) -> &str {
        &self.shim_name
    }

    /// 定義済みインポートの一覧（登録順）
    pub fn names(&self) -> &[ImportName] {
        &self.names
    }

    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.module == module && n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvShim;

    impl RuntimeShim for EnvShim {
        fn name(&self) -> &str {
            "env-test"
        }

        fn register(&self, imports: &mut ImportBuilder) -> Result<(), WasmError> {
            imports
                .func_wrap("env", "answer", || -> i32 { 42 })?
                .func_wrap("env", "ignore", |_: i32| {})?;
            Ok(())
        }
    }

    #[test]
    fn test_from_shim_records_names() {
        let engine = crate::new_engine().unwrap();
        let imports = ImportObject::from_shim(&engine, &EnvShim).unwrap();

        assert_eq!(imports.shim_name(), "env-test");
        assert_eq!(imports.names().len(), 2);
        assert!(imports.contains("env", "answer"));
        assert!(imports.contains("env", "ignore"));
        assert!(!imports.contains("env", "missing"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        struct DupShim;
        impl RuntimeShim for DupShim {
            fn name(&self) -> &str {
                "dup"
            }
            fn register(&self, imports: &mut ImportBuilder) -> Result<(), WasmError> {
                imports.func_wrap("env", "f", || {})?;
                imports.func_wrap("env", "f", || {})?;
                Ok(())
            }
        }

        let engine = crate::new_engine().unwrap();
        let result = ImportObject::from_shim(&engine, &DupShim);
        assert!(matches!(result, Err(WasmError::HostFunctionError(_))));
    }
}
