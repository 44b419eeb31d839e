//! Wire codec (component C2): request serialization, response parsing,
//! chunked/length/close body framing, and gzip/deflate decompression.

pub mod sse;

use crate::connection::Connection;
use crate::error::HttpError;
use crate::headers::HeaderMap;
use crate::request::{Method, Request};
use crate::url::{Origin, UrlInfo};
use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder};
use std::io::Read;
use tokio::time::Instant;

/// Default header block cap, enforced while scanning for the CRLFCRLF
/// terminator, before any header is parsed.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Build the on-wire request bytes: request line, headers in order (with
/// defaults injected only if the caller did not already set them,
/// case-insensitively), blank line, body.
#[must_use]
pub fn serialize_request(
    request: &Request,
    url: &UrlInfo,
    user_agent: &str,
    enable_compression: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + request.body.as_ref().map_or(0, Bytes::len));

    out.extend_from_slice(request.method.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(url.path_and_query.as_bytes());
    out.extend_from_slice(b" HTTP/1.1\r\n");

    let mut headers = request.headers.clone();
    if !headers.contains("host") {
        headers.append("Host", format_host_header(url));
    }
    if !headers.contains("user-agent") {
        headers.append("User-Agent", user_agent);
    }
    if !headers.contains("accept") {
        headers.append("Accept", "*/*");
    }
    if !headers.contains("connection") {
        headers.append("Connection", "keep-alive");
    }
    if enable_compression && !headers.contains("accept-encoding") {
        headers.append("Accept-Encoding", "gzip, deflate");
    }
    if !headers.contains("content-length") {
        if let Some(body) = &request.body {
            headers.append("Content-Length", body.len().to_string());
        }
    }

    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");

    if let Some(body) = &request.body {
        out.extend_from_slice(body);
    }

    out
}

fn format_host_header(url: &UrlInfo) -> String {
    if url.port == url.scheme.default_port() {
        url.host.clone()
    } else {
        format!("{}:{}", url.host, url.port)
    }
}

/// A parsed response head, before body framing is applied.
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
}

/// The two deadlines a response read is bounded by: an overall wall-clock
/// cutoff for the attempt (`request_timeout`, or effectively infinite),
/// and a `read_timeout` inactivity bound that is recomputed from "now" on
/// every read so it resets on each successful read rather than counting
/// down from the start of the response.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub overall: Instant,
    pub read_timeout: std::time::Duration,
}

impl Deadlines {
    #[must_use]
    pub fn new(overall: Instant, read_timeout: std::time::Duration) -> Self {
        Deadlines { overall, read_timeout }
    }

    /// The deadline for the next single read: whichever of the overall
    /// cutoff or a fresh inactivity window comes first.
    fn next_read(&self) -> Instant {
        std::cmp::min(self.overall, Instant::now() + self.read_timeout)
    }
}

/// Buffers bytes read from a `Connection` so header scanning and body
/// framing can share one read loop without losing over-read bytes.
struct ReadCursor<'c> {
    conn: &'c mut Connection,
    buf: Vec<u8>,
    pos: usize,
}

impl<'c> ReadCursor<'c> {
    fn new(conn: &'c mut Connection) -> Self {
        ReadCursor {
            conn,
            buf: Vec::new(),
            pos: 0,
        }
    }

    fn remaining(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    async fn fill_more(&mut self, deadlines: &Deadlines) -> Result<usize, HttpError> {
        let mut tmp = [0u8; 8192];
        let n = self.conn.read_some(&mut tmp, deadlines.next_read()).await?;
        self.buf.extend_from_slice(&tmp[..n]);
        Ok(n)
    }

    /// Read until CRLFCRLF is found, bounded by `max_bytes`. Leaves any
    /// bytes after the terminator in the cursor for the body reader.
    async fn read_header_block(&mut self, max_bytes: usize, deadlines: &Deadlines) -> Result<Vec<u8>, HttpError> {
        loop {
            if let Some(idx) = find_subslice(self.remaining(), b"\r\n\r\n") {
                let head = self.remaining()[..idx].to_vec();
                self.pos += idx + 4;
                return Ok(head);
            }
            if self.remaining().len() > max_bytes {
                return Err(HttpError::protocol("response header block exceeded max_header_bytes"));
            }
            let n = self.fill_more(deadlines).await?;
            if n == 0 {
                return Err(HttpError::protocol("connection closed before response headers completed"));
            }
        }
    }

    async fn read_exact(&mut self, n: usize, max_bytes: usize, deadlines: &Deadlines) -> Result<Bytes, HttpError> {
        if n > max_bytes {
            return Err(HttpError::BodyTooLarge { limit: max_bytes, actual: n });
        }
        while self.remaining().len() < n {
            let read = self.fill_more(deadlines).await?;
            if read == 0 {
                return Err(HttpError::protocol("connection closed before body completed"));
            }
        }
        let bytes = Bytes::copy_from_slice(&self.remaining()[..n]);
        self.pos += n;
        Ok(bytes)
    }

    /// Read one CRLF-terminated line (used for chunk-size lines).
    async fn read_line(&mut self, deadlines: &Deadlines) -> Result<Vec<u8>, HttpError> {
        loop {
            if let Some(idx) = find_subslice(self.remaining(), b"\r\n") {
                let line = self.remaining()[..idx].to_vec();
                self.pos += idx + 2;
                return Ok(line);
            }
            let n = self.fill_more(deadlines).await?;
            if n == 0 {
                return Err(HttpError::protocol("connection closed mid chunk framing"));
            }
        }
    }

    async fn read_to_close(&mut self, max_bytes: usize, deadlines: &Deadlines) -> Result<Bytes, HttpError> {
        let mut out = self.remaining().to_vec();
        self.pos = self.buf.len();
        loop {
            if out.len() > max_bytes {
                return Err(HttpError::BodyTooLarge { limit: max_bytes, actual: out.len() });
            }
            let before = self.buf.len();
            let n = self.fill_more(deadlines).await?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&self.buf[before..]);
            self.pos = self.buf.len();
        }
        Ok(Bytes::from(out))
    }

    /// Return whatever bytes are already buffered, filling once from the
    /// socket first if the buffer is empty. Returns an empty `Bytes` only
    /// at EOF. Used by streaming reads (SSE) that must not block waiting
    /// for a full frame to arrive.
    async fn next_available(&mut self, max_bytes: usize, deadlines: &Deadlines) -> Result<Bytes, HttpError> {
        if self.remaining().is_empty() {
            self.fill_more(deadlines).await?;
        }
        let take = self.remaining().len().min(max_bytes);
        let out = Bytes::copy_from_slice(&self.remaining()[..take]);
        self.pos += take;
        Ok(out)
    }
}

/// Per-frame-mode state for `ResponseStream`.
enum StreamState {
    Chunked,
    ContentLength(usize),
    UntilClose,
    Done,
}

/// A response body consumed incrementally, frame-aware, used by the SSE
/// streaming path instead of the fully-buffering `read_response`. Never
/// decompresses (SSE bodies are sent as `identity` in practice).
pub struct ResponseStream<'c> {
    cursor: ReadCursor<'c>,
    state: StreamState,
}

impl<'c> ResponseStream<'c> {
    /// Read the next frame-decoded chunk of body bytes, or `None` at the
    /// end of the body (zero-size chunk, `Content-Length` exhausted, or
    /// connection close for until-close framing).
    pub async fn next_chunk(&mut self, max_body_bytes: usize, deadlines: &Deadlines) -> Result<Option<Bytes>, HttpError> {
        match &mut self.state {
            StreamState::Done => Ok(None),
            StreamState::UntilClose => {
                let chunk = self.cursor.next_available(8192, deadlines).await?;
                if chunk.is_empty() {
                    self.state = StreamState::Done;
                    Ok(None)
                } else {
                    Ok(Some(chunk))
                }
            }
            StreamState::ContentLength(remaining) => {
                if *remaining == 0 {
                    self.state = StreamState::Done;
                    return Ok(None);
                }
                let chunk = self.cursor.next_available(*remaining, deadlines).await?;
                if chunk.is_empty() {
                    return Err(HttpError::protocol("connection closed before body completed"));
                }
                *remaining -= chunk.len();
                if *remaining == 0 {
                    self.state = StreamState::Done;
                }
                Ok(Some(chunk))
            }
            StreamState::Chunked => {
                let size_line = self.cursor.read_line(deadlines).await?;
                let size = parse_chunk_size(&size_line)?;
                if size == 0 {
                    loop {
                        let trailer_line = self.cursor.read_line(deadlines).await?;
                        if trailer_line.is_empty() {
                            break;
                        }
                    }
                    self.state = StreamState::Done;
                    return Ok(None);
                }
                let data = self.cursor.read_exact(size, max_body_bytes, deadlines).await?;
                let crlf = self.cursor.read_line(deadlines).await?;
                if !crlf.is_empty() {
                    return Err(HttpError::protocol("expected CRLF after chunk data"));
                }
                Ok(Some(data))
            }
        }
    }
}

/// Read a response head and hand back a frame-aware body stream, for
/// callers (the SSE path) that must act on bytes as they arrive rather
/// than waiting for the whole body.
pub async fn read_response_head(
    conn: &mut Connection,
    max_header_bytes: usize,
    deadlines: &Deadlines,
) -> Result<(ResponseHead, ResponseStream<'_>), HttpError> {
    let mut cursor = ReadCursor::new(conn);
    let raw_head = cursor.read_header_block(max_header_bytes, deadlines).await?;
    let head = parse_head(&raw_head)?;
    let state = match determine_framing(&head.headers)? {
        BodyFraming::Chunked => StreamState::Chunked,
        BodyFraming::ContentLength(n) => StreamState::ContentLength(n),
        BodyFraming::UntilClose => StreamState::UntilClose,
    };
    Ok((head, ResponseStream { cursor, state }))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_head(raw: &[u8]) -> Result<ResponseHead, HttpError> {
    let text = std::str::from_utf8(raw).map_err(|_| HttpError::protocol("response head is not valid utf-8"))?;
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();

    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().ok_or_else(|| HttpError::protocol("missing status line"))?;
    let status: u16 = parts
        .next()
        .ok_or_else(|| HttpError::protocol("missing status code"))?
        .parse()
        .map_err(|_| HttpError::protocol("status code is not numeric"))?;
    let reason = parts.next().unwrap_or("").to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let idx = line
            .find(':')
            .ok_or_else(|| HttpError::protocol(format!("malformed header line: {line:?}")))?;
        let name = &line[..idx];
        let value = &line[idx + 1..];
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.append(name, value);
    }

    Ok(ResponseHead { status, reason, headers })
}

enum BodyFraming {
    Chunked,
    ContentLength(usize),
    UntilClose,
}

fn determine_framing(headers: &HeaderMap) -> Result<BodyFraming, HttpError> {
    if let Some(te) = headers.get("transfer-encoding") {
        if te.eq_ignore_ascii_case("chunked") {
            return Ok(BodyFraming::Chunked);
        }
    }
    if let Some(len) = headers.get("content-length") {
        let len: usize = len
            .trim()
            .parse()
            .map_err(|_| HttpError::protocol(format!("invalid content-length: {len:?}")))?;
        return Ok(BodyFraming::ContentLength(len));
    }
    Ok(BodyFraming::UntilClose)
}

/// Parse a chunk-size line (hex digits, optional `;`-delimited extensions
/// which are discarded).
fn parse_chunk_size(line: &[u8]) -> Result<usize, HttpError> {
    let size_str = std::str::from_utf8(line).map_err(|_| HttpError::protocol("chunk size line is not utf-8"))?;
    let size_str = size_str.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size_str, 16).map_err(|_| HttpError::protocol(format!("invalid chunk size: {size_str:?}")))
}

async fn read_chunked_body(cursor: &mut ReadCursor<'_>, max_bytes: usize, deadlines: &Deadlines) -> Result<Bytes, HttpError> {
    let mut out = Vec::new();
    loop {
        let size_line = cursor.read_line(deadlines).await?;
        let size = parse_chunk_size(&size_line)?;

        if size == 0 {
            // Trailers, discarded up to the terminating blank line.
            loop {
                let trailer_line = cursor.read_line(deadlines).await?;
                if trailer_line.is_empty() {
                    break;
                }
            }
            break;
        }

        if out.len() + size > max_bytes {
            return Err(HttpError::BodyTooLarge { limit: max_bytes, actual: out.len() + size });
        }

        let chunk = cursor.read_exact(size, max_bytes, deadlines).await?;
        out.extend_from_slice(&chunk);

        let crlf = cursor.read_line(deadlines).await?;
        if !crlf.is_empty() {
            return Err(HttpError::protocol("expected CRLF after chunk data"));
        }
    }
    Ok(Bytes::from(out))
}

fn decompress(body: &[u8], encoding: &str, max_bytes: usize) -> Result<Bytes, HttpError> {
    match encoding.to_ascii_lowercase().as_str() {
        "" | "identity" => Ok(Bytes::copy_from_slice(body)),
        "gzip" => decode_with(GzDecoder::new(body), max_bytes, "gzip"),
        "deflate" => decode_with(DeflateDecoder::new(body), max_bytes, "deflate"),
        other => Err(HttpError::DecodeError {
            encoding: other.to_string(),
            reason: "unrecognized content-encoding".to_string(),
        }),
    }
}

fn decode_with<R: Read>(mut decoder: R, max_bytes: usize, encoding: &str) -> Result<Bytes, HttpError> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = decoder.read(&mut chunk).map_err(|e| HttpError::DecodeError {
            encoding: encoding.to_string(),
            reason: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        if out.len() + n > max_bytes {
            return Err(HttpError::BodyTooLarge {
                limit: max_bytes,
                actual: out.len() + n,
            });
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(Bytes::from(out))
}

/// Outcome of reading one full response: the parsed response parts plus
/// whether the connection should be considered reusable afterward (no
/// `Connection: close`, and framing did not require reading to EOF).
pub struct RawResponse {
    pub head: ResponseHead,
    pub body: Bytes,
    pub connection_reusable: bool,
}

/// Read and fully decode one response (head + framed + decompressed
/// body) from `conn`. `max_body_bytes` is enforced after decompression,
/// incrementally as inflated bytes are produced.
pub async fn read_response(
    conn: &mut Connection,
    max_header_bytes: usize,
    max_body_bytes: usize,
    deadlines: &Deadlines,
) -> Result<RawResponse, HttpError> {
    let mut cursor = ReadCursor::new(conn);
    let raw_head = cursor.read_header_block(max_header_bytes, deadlines).await?;
    let head = parse_head(&raw_head)?;

    let framing = determine_framing(&head.headers)?;
    let (raw_body, reached_eof) = match framing {
        BodyFraming::Chunked => (read_chunked_body(&mut cursor, max_body_bytes, deadlines).await?, false),
        BodyFraming::ContentLength(n) => (cursor.read_exact(n, max_body_bytes, deadlines).await?, false),
        BodyFraming::UntilClose => (cursor.read_to_close(max_body_bytes, deadlines).await?, true),
    };

    let body = match head.headers.get("content-encoding") {
        Some(enc) if !enc.is_empty() => decompress(&raw_body, enc, max_body_bytes)?,
        _ => raw_body,
    };

    let server_wants_close = head
        .headers
        .get("connection")
        .is_some_and(|v| v.eq_ignore_ascii_case("close"));

    let connection_reusable = !reached_eof && !server_wants_close;

    Ok(RawResponse {
        head,
        body,
        connection_reusable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::Scheme;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn make_request(method: Method, url: &str) -> Request {
        Request::new(method, url)
    }

    #[test]
    fn serialize_request_injects_default_headers() {
        let req = make_request(Method::Get, "http://example.com/a");
        let url = UrlInfo::parse("http://example.com/a").unwrap();
        let bytes = serialize_request(&req, &url, "corehttp/0.1", true);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("GET /a HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.contains("User-Agent: corehttp/0.1\r\n"));
        assert!(text.contains("Accept: */*\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.contains("Accept-Encoding: gzip, deflate\r\n"));
    }

    #[test]
    fn serialize_request_does_not_override_user_headers() {
        let mut req = make_request(Method::Get, "http://example.com/a");
        req.headers.append("Connection", "close");
        let url = UrlInfo::parse("http://example.com/a").unwrap();
        let bytes = serialize_request(&req, &url, "ua", false);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("keep-alive"));
    }

    #[test]
    fn serialize_request_sets_content_length_for_body() {
        let mut req = make_request(Method::Post, "http://example.com/a");
        req.body = Some(Bytes::from_static(b"hello"));
        let url = UrlInfo::parse("http://example.com/a").unwrap();
        let bytes = serialize_request(&req, &url, "ua", false);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn host_header_omits_default_port() {
        let url = UrlInfo::parse("https://example.com:443/a").unwrap();
        assert_eq!(format_host_header(&url), "example.com");
        let url2 = UrlInfo::parse("https://example.com:8443/a").unwrap();
        assert_eq!(format_host_header(&url2), "example.com:8443");
    }

    #[test]
    fn parse_head_splits_status_and_headers() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A: 1\r\nX-A: 2\r\n";
        let head = parse_head(raw).unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.reason, "OK");
        assert_eq!(head.headers.get("x-a"), Some("2"));
    }

    async fn serve_once(response_bytes: &'static [u8]) -> (Origin, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response_bytes).await;
        });
        (
            Origin {
                scheme: Scheme::Http,
                host: addr.ip().to_string(),
                port: addr.port(),
            },
            handle,
        )
    }

    #[tokio::test]
    async fn reads_chunked_body() {
        let response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n";
        let (origin, _h) = serve_once(response).await;
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        let deadlines = Deadlines::new(deadline, Duration::from_secs(2));
        let resp = read_response(&mut conn, DEFAULT_MAX_HEADER_BYTES, 1 << 20, &deadlines).await.unwrap();
        assert_eq!(resp.body, Bytes::from_static(b"Hello World"));
    }

    #[tokio::test]
    async fn reads_content_length_body() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let (origin, _h) = serve_once(response).await;
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        let deadlines = Deadlines::new(deadline, Duration::from_secs(2));
        let resp = read_response(&mut conn, DEFAULT_MAX_HEADER_BYTES, 1 << 20, &deadlines).await.unwrap();
        assert_eq!(resp.body, Bytes::from_static(b"hello"));
        assert!(resp.connection_reusable);
    }

    #[tokio::test]
    async fn connection_close_header_marks_not_reusable() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi";
        let (origin, _h) = serve_once(response).await;
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        let deadlines = Deadlines::new(deadline, Duration::from_secs(2));
        let resp = read_response(&mut conn, DEFAULT_MAX_HEADER_BYTES, 1 << 20, &deadlines).await.unwrap();
        assert!(!resp.connection_reusable);
    }

    #[tokio::test]
    async fn oversized_header_block_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let mut head = b"HTTP/1.1 200 OK\r\n".to_vec();
            head.extend(std::iter::repeat(b'a').take(200_000));
            let _ = stream.write_all(&head).await;
        });
        let origin = Origin {
            scheme: Scheme::Http,
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        let deadlines = Deadlines::new(deadline, Duration::from_secs(2));
        let result = read_response(&mut conn, 1024, 1 << 20, &deadlines).await;
        assert!(result.is_err());
    }

    #[test]
    fn decompress_identity_is_noop() {
        let body = b"hello";
        let out = decompress(body, "identity", 1024).unwrap();
        assert_eq!(out, Bytes::from_static(body));
    }

    #[test]
    fn decompress_unknown_encoding_errors() {
        let err = decompress(b"x", "br", 1024).unwrap_err();
        assert!(matches!(err, HttpError::DecodeError { .. }));
    }

    #[tokio::test]
    async fn response_stream_yields_chunked_frames_incrementally() {
        let response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n";
        let (origin, _h) = serve_once(response).await;
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        let deadlines = Deadlines::new(deadline, Duration::from_secs(2));
        let (head, mut stream) = read_response_head(&mut conn, DEFAULT_MAX_HEADER_BYTES, &deadlines).await.unwrap();
        assert_eq!(head.status, 200);

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next_chunk(1 << 20, &deadlines).await.unwrap() {
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"Hello World");
    }

    #[test]
    fn decompress_gzip_round_trip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello world").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(&compressed, "gzip", 1024).unwrap();
        assert_eq!(out, Bytes::from_static(b"hello world"));
    }
}
