//! 빌드 결과 정적 서버
//!
//! BUILD_URL prefix 아래에서 build 디렉터리 파일을 내려준다.
//! ETag / Last-Modified 로 조건부 GET 을 지원하고, prefix 자체는 빌드 목록 JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::PackError;
use crate::snapshot::list_builds;
use crate::utils::resolve_under_root;

/// 요청 헤더 최대 줄 수
const MAX_HEADER_LINES: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// 헤더 이름은 소문자
    pub headers: HashMap<String, String>,
}

impl Request {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![
                ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ],
            body: Vec::new(),
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.body = body;
        self.header("Content-Type", content_type)
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 상태줄 + 헤더 + (HEAD 가 아니면) 본문
    pub fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (k, v) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", k, v));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");

        let mut out = head.into_bytes();
        if include_body {
            out.extend_from_slice(&self.body);
        }
        out
    }
}

/// RFC 7231 HTTP-date
pub fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `"<mtime hex>-<size hex>"`
pub fn etag(mtime_secs: u64, size: u64) -> String {
    format!("\"{:x}-{:x}\"", mtime_secs, size)
}

fn content_type(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("dot") => "text/vnd.graphviz; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub struct StaticServer {
    root: PathBuf,
    prefix: String,
    graph_ext: String,
}

impl StaticServer {
    /// prefix 는 항상 `/.../` 형태로 맞춘다
    pub fn new(root: impl Into<PathBuf>, prefix: &str, graph_ext: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        Self {
            root: root.into(),
            prefix,
            graph_ext: graph_ext.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn handle(&self, req: &Request) -> Response {
        if req.method != "GET" && req.method != "HEAD" {
            return Response::new(405).header("Allow", "GET, HEAD");
        }

        let path = req.path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        let listing_path = self.prefix.trim_end_matches('/');
        if path == self.prefix || (!listing_path.is_empty() && path == listing_path) {
            return self.listing();
        }

        let Some(rest) = path.strip_prefix(self.prefix.as_str()) else {
            return Response::new(404);
        };
        let rest = match urlencoding::decode(rest) {
            Ok(r) => r.into_owned(),
            Err(_) => return Response::new(400),
        };

        let file = match resolve_under_root(&self.root, &rest) {
            Ok(p) if p.is_file() => p,
            Ok(_) => return Response::new(404),
            Err(e) => {
                debug!(path = %rest, error = %e, "not served");
                return Response::new(404);
            }
        };

        match self.serve_file(&file, req) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "read failed");
                Response::new(500)
            }
        }
    }

    fn listing(&self) -> Response {
        let body = list_builds(&self.root, &self.prefix, &self.graph_ext)
            .and_then(|entries| Ok(serde_json::to_vec_pretty(&entries)?));
        match body {
            Ok(bytes) => Response::new(200).body("application/json; charset=utf-8", bytes),
            Err(e) => {
                warn!(error = %e, "build listing failed");
                Response::new(500)
            }
        }
    }

    fn serve_file(&self, file: &std::path::Path, req: &Request) -> Result<Response, PackError> {
        let meta = std::fs::metadata(file)?;
        let mtime_secs = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let tag = etag(mtime_secs, meta.len());
        let last_modified = DateTime::<Utc>::from_timestamp(mtime_secs as i64, 0)
            .map(http_date)
            .unwrap_or_default();

        let not_modified = match req.header("if-none-match") {
            Some(inm) => inm.split(',').any(|t| t.trim() == tag || t.trim() == "*"),
            None => req
                .header("if-modified-since")
                .and_then(parse_http_date)
                .map(|since| since.timestamp() >= mtime_secs as i64)
                .unwrap_or(false),
        };

        let base = |status| {
            Response::new(status)
                .header("ETag", tag.clone())
                .header("Last-Modified", last_modified.clone())
        };

        if not_modified {
            return Ok(base(304));
        }

        let bytes = std::fs::read(file)?;
        Ok(base(200).body(content_type(file), bytes))
    }

    /// bind 후 Ctrl-C 까지 연결 처리
    pub async fn serve(self, bind_addr: &str) -> Result<(), PackError> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!(addr = bind_addr, prefix = %self.prefix, root = %self.root.display(), "build server listening");

        let server = Arc::new(self);
        loop {
            let (stream, addr) = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };

            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    debug!(%addr, error = %e, "connection error");
                }
            });
        }
    }

    async fn handle_connection(&self, stream: tokio::net::TcpStream) -> std::io::Result<()> {
        let (reader_half, mut writer_half) = stream.into_split();
        let mut reader = BufReader::new(reader_half);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            writer_half
                .write_all(&Response::new(400).to_bytes(true))
                .await?;
            return writer_half.shutdown().await;
        };
        let mut req = Request::new(method, path);

        // 헤더 (빈 줄까지)
        for _ in 0..MAX_HEADER_LINES {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                req.headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
            }
        }

        let resp = self.handle(&req);
        debug!(method = %req.method, path = %req.path, status = resp.status, "request");

        writer_half
            .write_all(&resp.to_bytes(req.method != "HEAD"))
            .await?;
        writer_half.shutdown().await
    }
}
