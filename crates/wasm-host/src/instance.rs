//! # WASMインスタンス
//!
//! コンパイル済みモジュールとそのインスタンス、専用のStoreをまとめて保持する。
//! インスタンス化ごとに新しいStoreを作成するため、インスタンス間で状態は共有されない。

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use wasmtime::{Instance, Module, Store, StoreLimits, StoreLimitsBuilder, WasmParams, WasmResults};

use crate::imports::ImportObject;
use crate::{classify_trap, HostLimits, WasmError};

/// ホスト関数がアクセスするインスタンスごとの状態。
pub struct HostState {
    limits: StoreLimits,
    started: Instant,
    pub(crate) exit_code: Option<i32>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) next_timeout_id: i32,
    pub(crate) pending_timeouts: BTreeSet<i32>,
}

impl HostState {
    fn new(limits: &HostLimits) -> Self {
        Self {
            limits: StoreLimitsBuilder::new()
                .memory_size(limits.memory_limit)
                .build(),
            started: Instant::now(),
            exit_code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            next_timeout_id: 1,
            pending_timeouts: BTreeSet::new(),
        }
    }

    /// Store作成時刻（単調時計の原点）
    pub fn started(&self) -> Instant {
        self.started
    }

    /// `runtime.wasmExit`で通知された終了コード
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// fd 1 への書き込み
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// fd 2 への書き込み
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// 未解除のタイマーID
    pub fn pending_timeouts(&self) -> impl Iterator<Item = i32> + '_ {
        self.pending_timeouts.iter().copied()
    }
}

/// インスタンス化済みWASMモジュール。
pub struct WasmInstance {
    module: Module,
    instance: Instance,
    store: Store<HostState>,
}

impl WasmInstance {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn store(&self) -> &Store<HostState> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    pub fn host_state(&self) -> &HostState {
        self.store.data()
    }

    /// エクスポート名の一覧（モジュールでの宣言順）
    pub fn exports(&self) -> Vec<String> {
        self.module
            .exports()
            .map(|export| export.name().to_string())
            .collect()
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.module.get_export(name).is_some()
    }

    /// 残りFuel
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }

    /// エクスポート関数を型付きで呼び出す。
    pub fn call<Params, Results>(
        &mut self,
        name: &str,
        params: Params,
    ) -> Result<Results, WasmError>
    where
        Params: WasmParams,
        Results: WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<Params, Results>(&mut self.store, name)
            .map_err(|e| WasmError::ExportNotFound(format!("{name}: {e}")))?;
        func.call(&mut self.store, params)
            .map_err(|e| classify_trap(e, WasmError::ExecutionError))
    }

    /// エクスポートされたメモリから`len`バイトを読み出す。
    pub fn read_memory(
        &mut self,
        memory_name: &str,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>, WasmError> {
        let memory = self
            .instance
            .get_memory(&mut self.store, memory_name)
            .ok_or_else(|| WasmError::ExportNotFound(memory_name.to_string()))?;
        let mut buf = vec![0u8; len];
        memory
            .read(&self.store, offset, &mut buf)
            .map_err(|e| WasmError::ExecutionError(format!("メモリ読み出し ({memory_name}): {e}")))?;
        Ok(buf)
    }
}

/// WASMバイナリをコンパイルし、インポートオブジェクトに対してインスタンス化する。
///
/// catch_unwindによりパニックを遮断する。
///
/// # 引数
/// - `imports`: ランタイムシムが構築したインポートオブジェクト（変更しない）
/// - `wasm_bytes`: WASMバイナリ（テキスト形式は受け付けない）
/// - `limits`: このインスタンスのFuel・Memory制限
pub fn instantiate(
    imports: &ImportObject,
    wasm_bytes: &[u8],
    limits: HostLimits,
) -> Result<WasmInstance, WasmError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        instantiate_inner(imports, wasm_bytes, &limits)
    }));

    match result {
        Ok(inner) => inner,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "インスタンス化中にパニックが発生しました".to_string());
            Err(WasmError::Panic(msg))
        }
    }
}

fn instantiate_inner(
    imports: &ImportObject,
    wasm_bytes: &[u8],
    limits: &HostLimits,
) -> Result<WasmInstance, WasmError> {
    let module = Module::from_binary(imports.engine(), wasm_bytes)
        .map_err(|e| WasmError::CompileError(format!("{e:#}")))?;

    let mut store = Store::new(imports.engine(), HostState::new(limits));
    store.limiter(|state| &mut state.limits);
    store
        .set_fuel(limits.fuel_limit)
        .map_err(|e| WasmError::EngineError(e.to_string()))?;

    let instance = imports
        .linker()
        .instantiate(&mut store, &module)
        .map_err(|e| classify_trap(e, WasmError::InstantiateError))?;

    Ok(WasmInstance {
        module,
        instance,
        store,
    })
}
