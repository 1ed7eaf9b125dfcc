//! MJPEG streaming server.
//!
//! Hand-rolled HTTP over `TcpListener`, no framework. The accept loop runs
//! nonblocking on its own thread; each accepted connection gets a thread of
//! its own so a slow viewer never stalls the others. Routes:
//!
//! - `/`       minimal HTML page embedding the live feed
//! - `/feed`   `multipart/x-mixed-replace` MJPEG stream
//! - `/health` liveness probe
//!
//! The feed loop blocks on the mailbox condvar with a short timeout so it
//! can notice shutdown, and only ships frames with a newer sequence number
//! than the one it last wrote. Viewers that connect mid-run start from the
//! current frame; frames published while a viewer is busy writing are
//! dropped, never queued.

use std::collections::HashMap;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::mailbox::FrameMailbox;
use crate::MotionError;

const MAX_REQUEST_BYTES: usize = 8192;
/// Boundary string between MJPEG parts.
const PART_BOUNDARY: &str = "frame";
/// How long a feed writer blocks on the mailbox before re-checking shutdown.
const FEED_WAIT: Duration = Duration::from_millis(500);

const INDEX_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>motion-sentry</title></head>\n<body>\n<h1>Live feed</h1>\n<img src=\"/feed\" alt=\"live camera feed\">\n</body>\n</html>\n";

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub addr: String,
    /// JPEG quality for streamed frames, 1-100.
    pub jpeg_quality: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug)]
pub struct StreamHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Stop accepting connections and join the accept thread. Live feed
    /// connections notice the flag within one mailbox wait and close on
    /// their own.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("stream server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct StreamServer {
    cfg: StreamConfig,
    mailbox: Arc<FrameMailbox>,
}

impl StreamServer {
    pub fn new(cfg: StreamConfig, mailbox: Arc<FrameMailbox>) -> Self {
        Self { cfg, mailbox }
    }

    pub fn spawn(self) -> Result<StreamHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        log::info!("stream server listening on http://{}", addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg.clone();
        let mailbox = self.mailbox.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, cfg, mailbox, shutdown_thread) {
                log::error!("stream server stopped: {}", err);
            }
        });

        Ok(StreamHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(
    listener: TcpListener,
    cfg: StreamConfig,
    mailbox: Arc<FrameMailbox>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                log::debug!("viewer connected from {}", peer);
                let cfg = cfg.clone();
                let mailbox = mailbox.clone();
                let shutdown = shutdown.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &cfg, &mailbox, &shutdown) {
                        log::debug!("viewer {} disconnected: {}", peer, err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    cfg: &StreamConfig,
    mailbox: &FrameMailbox,
    shutdown: &AtomicBool,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    if request.method != "GET" {
        write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
        return Ok(());
    }
    match request.path.as_str() {
        "/" => write_response(&mut stream, 200, "text/html; charset=utf-8", INDEX_PAGE.as_bytes()),
        "/health" => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        "/feed" => stream_feed(&mut stream, cfg, mailbox, shutdown),
        _ => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
    }
}

/// Write the multipart header, then ship each newer frame as a JPEG part
/// until the viewer hangs up or the server shuts down.
fn stream_feed(
    stream: &mut TcpStream,
    cfg: &StreamConfig,
    mailbox: &FrameMailbox,
    shutdown: &AtomicBool,
) -> Result<()> {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={boundary}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        boundary = PART_BOUNDARY
    );
    stream.write_all(header.as_bytes())?;

    let mut last_seq = 0u64;
    while !shutdown.load(Ordering::SeqCst) {
        let (frame, seq) = match mailbox.wait_newer(last_seq, FEED_WAIT) {
            Some(published) => published,
            None => continue,
        };
        last_seq = seq;
        let jpeg = match frame.encode_jpeg(cfg.jpeg_quality) {
            Ok(bytes) => bytes,
            Err(err @ MotionError::Encoding(_)) => {
                log::warn!("frame skipped: {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let part_header = format!(
            "--{boundary}\r\nContent-Type: image/jpeg\r\nContent-Length: {len}\r\n\r\n",
            boundary = PART_BOUNDARY,
            len = jpeg.len()
        );
        stream.write_all(part_header.as_bytes())?;
        stream.write_all(&jpeg)?;
        stream.write_all(b"\r\n")?;
    }
    Ok(())
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    use std::io::Read;
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}
