//! # テスト用共通ヘルパー
//!
//! ソース・ローダーのテストで共有するモックHTTPサーバーと一時ディレクトリ。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// モックサーバーが返すレスポンス。
#[derive(Clone)]
pub struct MockResponse {
    content_type: String,
    body: Vec<u8>,
}

impl MockResponse {
    pub fn new(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.to_string(),
            body,
        }
    }

    /// `application/wasm` で返す
    pub fn wasm(body: Vec<u8>) -> Self {
        Self::new("application/wasm", body)
    }
}

/// 起動済みモックサーバー。
pub struct MockServer {
    pub port: u16,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    /// 受け付けたリクエスト数（登録パスのみ）
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// テスト用モックHTTPサーバーを起動し、指定パスで指定レスポンスを返す。
/// 未登録のパスは404になる。
pub async fn start_mock_server(routes: Vec<(&str, MockResponse)>) -> MockServer {
    use axum::http::header::CONTENT_TYPE;
    use axum::routing::get;

    let hits = Arc::new(AtomicUsize::new(0));
    let mut app = axum::Router::new();
    for (path, response) in routes {
        let hits = hits.clone();
        app = app.route(
            path,
            get(move || {
                let r = response.clone();
                hits.fetch_add(1, Ordering::SeqCst);
                async move { ([(CONTENT_TYPE, r.content_type)], r.body) }
            }),
        );
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    MockServer { port, hits }
}

/// ヘッダーとボディの先頭`prefix`だけを送り、`stall`の間応答を止めるHTTPサーバーを起動する。
/// Content-Lengthは`prefix`より大きく宣言するため、クライアントは残りを待ち続ける。
pub async fn start_stalling_server(prefix: Vec<u8>, stall: std::time::Duration) -> u16 {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let prefix = prefix.clone();
            tokio::spawn(async move {
                // リクエストヘッダーを読み捨てる
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;

                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/wasm\r\nContent-Length: {}\r\n\r\n",
                    prefix.len() + 1024
                );
                stream.write_all(header.as_bytes()).await.unwrap();
                stream.write_all(&prefix).await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(stall).await;
            });
        }
    });
    port
}

/// テスト終了時に削除される一時ディレクトリ。
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("tsl-wasm-loader-{:016x}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// ファイルを書き込み、そのパスを返す。
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
