use std::{
    io::{self, Write},
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, Version},
    middleware::Next,
};
use tokio::sync::mpsc;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{
    app::{get_client_ip, AppState},
    config::{Environment, SiteConfig},
};

const DEV_CONSOLE_FILTER: &str = "access_log=info,portfolio_site=debug,info";

/// Batched writer for production: lines accumulate in memory and a background
/// task appends them to the file every `flush_interval`.
struct BufferedFileWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
    tx: mpsc::UnboundedSender<()>,
}

impl BufferedFileWriter {
    fn new(path: PathBuf, flush_interval: Duration) -> io::Result<Self> {
        ensure_parent(&path)?;

        let buffer = Arc::new(Mutex::new(Vec::with_capacity(8192)));
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let task_buffer = Arc::clone(&buffer);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => append_pending(&task_buffer, &path),
                    msg = rx.recv() => {
                        if msg.is_none() {
                            // every writer dropped
                            append_pending(&task_buffer, &path);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self { buffer, tx })
    }
}

fn append_pending(buffer: &Mutex<Vec<u8>>, path: &Path) {
    let data = match buffer.lock() {
        Ok(mut buf) if !buf.is_empty() => std::mem::take(&mut *buf),
        _ => return,
    };
    if let Ok(mut file) = open_append(path) {
        let _ = file.write_all(&data);
    }
}

impl Write for BufferedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::other("access log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.tx.send(());
        Ok(())
    }
}

impl Clone for BufferedFileWriter {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            tx: self.tx.clone(),
        }
    }
}

/// Appends on every write; used in development so the log is tailable.
#[derive(Clone)]
struct ImmediateFileWriter {
    path: PathBuf,
}

impl ImmediateFileWriter {
    fn new(path: PathBuf) -> io::Result<Self> {
        ensure_parent(&path)?;
        Ok(Self { path })
    }
}

impl Write for ImmediateFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        open_append(&self.path)?.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn open_append(path: &Path) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

#[derive(Clone)]
enum AccessLogWriter {
    Immediate(ImmediateFileWriter),
    Buffered(BufferedFileWriter),
}

impl Write for AccessLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            AccessLogWriter::Immediate(w) => w.write(buf),
            AccessLogWriter::Buffered(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            AccessLogWriter::Immediate(w) => w.flush(),
            AccessLogWriter::Buffered(w) => w.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for AccessLogWriter {
    type Writer = AccessLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global subscriber. Must run inside the tokio runtime because
/// the production writer spawns its flush task.
pub fn init(config: &SiteConfig) -> anyhow::Result<()> {
    let (writer, console_filter) = match config.environment {
        // Console (all logs) + file (immediate write)
        Environment::Dev => (
            AccessLogWriter::Immediate(ImmediateFileWriter::new(config.log_file.clone())?),
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEV_CONSOLE_FILTER)),
        ),
        // Console (errors only) + file (batched)
        Environment::Prod => (
            AccessLogWriter::Buffered(BufferedFileWriter::new(
                config.log_file.clone(),
                config.log_flush_interval,
            )?),
            EnvFilter::new("error"),
        ),
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(false)
        .with_level(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new("access_log=info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(environment = ?config.environment, "logging initialized");
    Ok(())
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/?",
    }
}

/// Logs `"METHOD /path HTTP/1.1" STATUS CONTENT_LENGTH IP "User-Agent" LATENCYms`.
pub async fn access_log_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let version = request.version();
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let ip = get_client_ip(request.headers(), &addr, state.config.trust_proxy);

    let response = next.run(request).await;

    let content_length = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info!(
        target: "access_log",
        "\"{} {} {}\" {} {} {} \"{}\" {}ms",
        method,
        path,
        version_label(version),
        response.status().as_u16(),
        content_length,
        ip,
        user_agent,
        start.elapsed().as_millis()
    );

    response
}
