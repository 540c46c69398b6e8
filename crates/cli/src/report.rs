//! # 出力レポート

use std::fmt;

use serde::Serialize;
use tsl_wasm_host::{ImportName, ImportObject};
use tsl_wasm_loader::LoadedModule;

/// `load` サブコマンドの結果。
#[derive(Debug, Serialize)]
pub struct ModuleReport {
    pub source: String,
    pub sha256: String,
    pub exports: Vec<String>,
    pub invoked: Option<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub remaining_fuel: Option<u64>,
}

impl ModuleReport {
    pub fn from_loaded(loaded: &LoadedModule, invoked: Option<String>) -> Self {
        let state = loaded.instance.host_state();
        Self {
            source: loaded.source.clone(),
            sha256: loaded.sha256.clone(),
            exports: loaded.exports(),
            invoked,
            exit_code: state.exit_code(),
            stdout: String::from_utf8_lossy(state.stdout()).into_owned(),
            stderr: String::from_utf8_lossy(state.stderr()).into_owned(),
            remaining_fuel: loaded.instance.remaining_fuel(),
        }
    }
}

impl fmt::Display for ModuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source:  {}", self.source)?;
        writeln!(f, "sha256:  {}", self.sha256)?;
        writeln!(f, "exports: {}", self.exports.join(", "))?;
        if let Some(name) = &self.invoked {
            writeln!(f, "invoked: {name}")?;
            if let Some(code) = self.exit_code {
                writeln!(f, "exit:    {code}")?;
            }
            if !self.stdout.is_empty() {
                write!(f, "{}", self.stdout)?;
            }
            if !self.stderr.is_empty() {
                write!(f, "{}", self.stderr)?;
            }
        }
        Ok(())
    }
}

/// `imports` サブコマンドの結果。
#[derive(Debug, Serialize)]
pub struct ImportsReport {
    pub shim: String,
    pub imports: Vec<ImportName>,
}

impl ImportsReport {
    pub fn from_imports(imports: &ImportObject) -> Self {
        Self {
            shim: imports.shim_name().to_string(),
            imports: imports.names().to_vec(),
        }
    }
}

impl fmt::Display for ImportsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shim: {}", self.shim)?;
        for import in &self.imports {
            writeln!(f, "  {}.{}", import.module, import.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsl_wasm_host::{instantiate, GoRuntimeShim, HostLimits};

    fn go_imports() -> ImportObject {
        let engine = tsl_wasm_host::new_engine().unwrap();
        ImportObject::from_shim(&engine, &GoRuntimeShim).unwrap()
    }

    #[test]
    fn test_module_report() {
        let imports = go_imports();
        let wasm = wat::parse_str(
            r#"(module
                 (import "gojs" "runtime.wasmWrite" (func $write (param i32)))
                 (memory (export "mem") 1)
                 (data (i32.const 8) "\01\00\00\00\00\00\00\00" "\64\00\00\00\00\00\00\00" "\03\00\00\00")
                 (data (i32.const 100) "[]\n")
                 (func (export "main") (call $write (i32.const 0))))"#,
        )
        .unwrap();
        let mut loaded = LoadedModule {
            source: "file:///tmp/tsl.wasm".to_string(),
            sha256: "00".repeat(32),
            instance: instantiate(&imports, &wasm, HostLimits::default()).unwrap(),
        };
        loaded.instance.call::<(), ()>("main", ()).unwrap();

        let report = ModuleReport::from_loaded(&loaded, Some("main".to_string()));
        assert_eq!(report.stdout, "[]\n");
        assert!(report.exports.contains(&"main".to_string()));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "file:///tmp/tsl.wasm");
        assert_eq!(json["invoked"], "main");
        assert!(json["exit_code"].is_null());

        let text = report.to_string();
        assert!(text.contains("invoked: main"));
        assert!(text.ends_with("[]\n"));
    }

    #[test]
    fn test_imports_report() {
        let report = ImportsReport::from_imports(&go_imports());
        assert_eq!(report.shim, "go-runtime");
        assert!(report.to_string().contains("  gojs.runtime.wasmWrite\n"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["imports"][0]["module"], "gojs");
    }
}
