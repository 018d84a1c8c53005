#![allow(dead_code)]

use axum::{
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    routing::get,
    serve, Router,
};
use prereq::{FetchConfig, Fetcher};
use std::io::Write;
use tokio::net::TcpListener;

pub const BODY: &[u8] = b"the quick brown fox jumps over the lazy dog\n";
// md5 of BODY
pub const BODY_MD5: &str = "1e280e1713df124d35709cf6138d9f91";

pub struct TestHttpServer {
    base: String,
}

impl TestHttpServer {
    /// Serves `/good.bin`, `/bundle.zip`, `/missing.bin` (404), `/broken.bin` (500)
    /// and `/agent`, which echoes the request's User-Agent.
    pub async fn spawn(zip_body: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let router = Router::new()
            .route("/good.bin", get(|| async { BODY.to_vec() }))
            .route(
                "/bundle.zip",
                get(move || {
                    let zip_body = zip_body.clone();
                    async move { zip_body }
                }),
            )
            .route("/missing.bin", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/broken.bin",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/agent",
                get(|headers: HeaderMap| async move {
                    headers
                        .get(USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            );

        tokio::spawn(async move {
            let _ = serve(listener, router).await;
        });

        Self {
            base: format!("http://{addr}"),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/gone.bin")
}

pub fn test_fetcher() -> Fetcher {
    Fetcher::new(FetchConfig {
        use_system_proxy: false,
        ..FetchConfig::default()
    })
    .unwrap()
}

pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
