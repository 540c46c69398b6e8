//! # Goランタイムシム
//!
//! Goツールチェーン（`GOOS=js GOARCH=wasm`）が生成するWASMは `gojs` 名前空間の
//! ランタイム関数をインポートする。ここでは `syscall/js` 以外のランタイム関数を提供する。
//!
//! 各関数はGoのスタックポインタ `sp` を1引数で受け取り、引数・戻り値は
//! エクスポートメモリ `mem` 上の `sp + 8` 以降にリトルエンディアンで配置される。
//!
//! `syscall/js.*` は提供しない。これをインポートするモジュールはリンク時に失敗する。

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use wasmtime::{Caller, Memory};

use crate::imports::{ImportBuilder, RuntimeShim};
use crate::instance::HostState;
use crate::WasmError;

/// インポート名前空間
pub const GO_IMPORT_MODULE: &str = "gojs";

/// Goが公開するリニアメモリのエクスポート名
pub const GO_MEMORY_EXPORT: &str = "mem";

/// Go WASM向けランタイムシム。
#[derive(Debug, Default, Clone, Copy)]
pub struct GoRuntimeShim;

impl RuntimeShim for GoRuntimeShim {
    fn name(&self) -> &str {
        "go-runtime"
    }

    fn register(&self, imports: &mut ImportBuilder) -> Result<(), WasmError> {
        imports
            .func_wrap(GO_IMPORT_MODULE, "runtime.wasmExit", wasm_exit)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.wasmWrite", wasm_write)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.resetMemoryDataView", |_sp: i32| {})?
            .func_wrap(GO_IMPORT_MODULE, "runtime.nanotime1", nanotime1)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.walltime", walltime)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.scheduleTimeoutEvent", schedule_timeout_event)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.clearTimeoutEvent", clear_timeout_event)?
            .func_wrap(GO_IMPORT_MODULE, "runtime.getRandomData", get_random_data)?
            .func_wrap(GO_IMPORT_MODULE, "debug", |value: i32| {
                tracing::debug!(value, "gojs debug");
            })?;
        Ok(())
    }
}

// ───── ホスト関数 ─────

fn wasm_exit(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let code = get_i32(&mut caller, arg(sp, 8))?;
    tracing::debug!(code, "Goランタイムが終了しました");
    caller.data_mut().exit_code = Some(code);
    Ok(())
}

fn wasm_write(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let fd = get_i64(&mut caller, arg(sp, 8))?;
    let ptr = to_usize(get_i64(&mut caller, arg(sp, 16))?)?;
    let len = get_i32(&mut caller, arg(sp, 24))? as u32 as usize;
    let bytes = read_bytes(&mut caller, ptr, len)?;

    let state = caller.data_mut();
    match fd {
        1 => state.stdout.extend_from_slice(&bytes),
        2 => state.stderr.extend_from_slice(&bytes),
        other => {
            return Err(wasmtime::Error::msg(format!(
                "runtime.wasmWrite: 未対応のfd {other}"
            )))
        }
    }
    Ok(())
}

fn nanotime1(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let nanos = caller.data().started().elapsed().as_nanos();
    set_i64(&mut caller, arg(sp, 8), i64::try_from(nanos).unwrap_or(i64::MAX))
}

fn walltime(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| wasmtime::Error::msg(format!("runtime.walltime: {e}")))?;
    set_i64(&mut caller, arg(sp, 8), now.as_secs() as i64)?;
    set_i32(&mut caller, arg(sp, 16), now.subsec_nanos() as i32)
}

/// イベントループを持たないため、タイマーは発火しない。IDの払い出しと記録のみ行う。
fn schedule_timeout_event(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let delay_ms = get_i64(&mut caller, arg(sp, 8))?;
    let state = caller.data_mut();
    let id = state.next_timeout_id;
    state.next_timeout_id = state.next_timeout_id.wrapping_add(1);
    state.pending_timeouts.insert(id);
    tracing::trace!(id, delay_ms, "タイマーを登録しました");
    set_i32(&mut caller, arg(sp, 16), id)
}

fn clear_timeout_event(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let id = get_i32(&mut caller, arg(sp, 8))?;
    caller.data_mut().pending_timeouts.remove(&id);
    Ok(())
}

fn get_random_data(mut caller: Caller<'_, HostState>, sp: i32) -> wasmtime::Result<()> {
    let ptr = to_usize(get_i64(&mut caller, arg(sp, 8))?)?;
    let len = to_usize(get_i64(&mut caller, arg(sp, 16))?)?;
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    go_memory(&mut caller)?.write(&mut caller, ptr, &buf)?;
    Ok(())
}

// ───── メモリアクセス ─────

fn arg(sp: i32, offset: usize) -> usize {
    sp as u32 as usize + offset
}

fn to_usize(value: i64) -> wasmtime::Result<usize> {
    usize::try_from(value).map_err(|_| wasmtime::Error::msg(format!("不正なアドレス: {value}")))
}

fn go_memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    caller
        .get_export(GO_MEMORY_EXPORT)
        .and_then(|export| export.into_memory())
        .ok_or_else(|| {
            wasmtime::Error::msg(format!(
                "メモリエクスポート `{GO_MEMORY_EXPORT}` がありません"
            ))
        })
}

fn read_bytes(
    caller: &mut Caller<'_, HostState>,
    addr: usize,
    len: usize,
) -> wasmtime::Result<Vec<u8>> {
    let memory = go_memory(caller)?;
    let mut buf = vec![0u8; len];
    memory.read(&*caller, addr, &mut buf)?;
    Ok(buf)
}

fn get_i32(caller: &mut Caller<'_, HostState>, addr: usize) -> wasmtime::Result<i32> {
    let mut buf = [0u8; 4];
    go_memory(caller)?.read(&*caller, addr, &mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn get_i64(caller: &mut Caller<'_, HostState>, addr: usize) -> wasmtime::Result<i64> {
    let mut buf = [0u8; 8];
    go_memory(caller)?.read(&*caller, addr, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn set_i32(caller: &mut Caller<'_, HostState>, addr: usize, value: i32) -> wasmtime::Result<()> {
    go_memory(caller)?.write(&mut *caller, addr, &value.to_le_bytes())?;
    Ok(())
}

fn set_i64(caller: &mut Caller<'_, HostState>, addr: usize, value: i64) -> wasmtime::Result<()> {
    go_memory(caller)?.write(&mut *caller, addr, &value.to_le_bytes())?;
    Ok(())
}
