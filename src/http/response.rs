//! Response parsing
//!
//! This module handles:
//! - Reading the header block up to the `\r\n\r\n` terminator
//! - Extracting the headers the crawler cares about
//! - Chunked and `Content-Length` body framing
//! - gzip/deflate decoding and page text decoding

use crate::{HttpError, HttpResult};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// End of the header block
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Upper bound on the size of a header block
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Upper bound on the size of a response body, before content decoding
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Body of a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponseBody {
    /// Decoded `text/html`
    Page(String),
    /// Anything else, as received (after content decoding)
    Data(Vec<u8>),
    /// No body: the response only carries redirect and cookie headers
    #[default]
    Session,
}

/// A parsed HTTP response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code from the status line, if it could be parsed
    pub status: Option<u16>,
    pub content_length: usize,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub transfer_encoding: Option<String>,
    pub location: Option<String>,
    /// All `Set-Cookie` values joined by `; `
    pub set_cookie: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
    pub pragma: Option<String>,
    pub p3p: Option<String>,
    /// The server asked to close the connection after this response
    pub connection_close: bool,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Returns the page text if the body is a page
    pub fn page_content(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Page(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the raw bytes if the body is data
    pub fn data_content(&self) -> Option<&[u8]> {
        match &self.body {
            ResponseBody::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns true if the response has no body
    pub fn is_session(&self) -> bool {
        matches!(self.body, ResponseBody::Session)
    }

    /// Returns true if the response points the client at an `https` location
    pub fn redirects_to_secure(&self) -> bool {
        self.location
            .as_deref()
            .map(crate::url::is_https)
            .unwrap_or(false)
    }
}

/// Reads one complete response from `reader`
///
/// The header block is read byte by byte until [`HEADER_TERMINATOR`]. The body is framed by
/// `Transfer-Encoding` if present, otherwise by a positive `Content-Length`; anything else is a
/// session response with no body.
///
/// # Errors
///
/// * `HttpError::Io` - the socket failed or closed mid-response
/// * `HttpError::MalformedHeader` - `Content-Length` exceeds [`MAX_BODY_BYTES`]
/// * `HttpError::MalformedChunk` - a chunk length is not valid hex, or the chunks add up to more
///   than [`MAX_BODY_BYTES`]
/// * `HttpError::Decompression` - the body claims gzip/deflate but does not decode
pub async fn read_response<R>(reader: &mut R) -> HttpResult<HttpResponse>
where
    R: AsyncBufRead + Unpin,
{
    let header_bytes = read_header_block(reader).await?;
    let header_text = String::from_utf8_lossy(&header_bytes);
    let mut response = parse_header_block(&header_text)?;

    let body = if response.transfer_encoding.is_some() {
        read_chunked_body(reader).await?
    } else if response.content_length > 0 {
        if response.content_length > MAX_BODY_BYTES {
            return Err(HttpError::MalformedHeader(format!(
                "Content-Length {} exceeds {} bytes",
                response.content_length, MAX_BODY_BYTES
            )));
        }
        let mut body = Vec::new();
        read_body_bytes(reader, response.content_length, &mut body).await?;
        body
    } else {
        tracing::trace!("Session response, location: {:?}", response.location);
        return Ok(response);
    };

    let body = decode_content(response.content_encoding.as_deref(), body)?;
    response.body = match response.content_type.as_deref() {
        Some(content_type) if content_type.to_ascii_lowercase().contains("text/html") => {
            ResponseBody::Page(decode_text(content_type, &body))
        }
        _ => ResponseBody::Data(body),
    };
    Ok(response)
}

/// Reads bytes until the header terminator, returning the block without the terminator
pub async fn read_header_block<R>(reader: &mut R) -> HttpResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut block = Vec::with_capacity(1024);
    loop {
        let byte = reader.read_u8().await?;
        block.push(byte);
        if block.ends_with(HEADER_TERMINATOR) {
            block.truncate(block.len() - HEADER_TERMINATOR.len());
            return Ok(block);
        }
        if block.len() > MAX_HEADER_BYTES {
            return Err(HttpError::MalformedHeader(format!(
                "header block exceeds {} bytes",
                MAX_HEADER_BYTES
            )));
        }
    }
}

/// Parses the status line and headers
pub fn parse_header_block(block: &str) -> HttpResult<HttpResponse> {
    let mut lines = block.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    if !status_line.starts_with("HTTP/") {
        return Err(HttpError::MalformedHeader(format!(
            "unexpected status line {:?}",
            status_line
        )));
    }

    let mut response = HttpResponse {
        status: status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok()),
        ..HttpResponse::default()
    };
    tracing::trace!("Status line: {}", status_line);

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-type" => response.content_type = Some(value),
            "content-encoding" => response.content_encoding = Some(value),
            "content-length" => {
                response.content_length = value.parse().map_err(|_| {
                    HttpError::MalformedHeader(format!("bad Content-Length {:?}", value))
                })?;
            }
            "transfer-encoding" => response.transfer_encoding = Some(value),
            "location" => response.location = Some(value),
            "set-cookie" => {
                response.set_cookie = Some(match response.set_cookie.take() {
                    Some(existing) => format!("{}; {}", existing, value),
                    None => value,
                });
            }
            "cache-control" => response.cache_control = Some(value),
            "expires" => response.expires = Some(value),
            "pragma" => response.pragma = Some(value),
            "p3p" => response.p3p = Some(value),
            "connection" => response.connection_close = value.eq_ignore_ascii_case("close"),
            _ => {}
        }
    }

    Ok(response)
}

/// Reads `<hex-length>\r\n<bytes>\r\n` chunks until a zero-length chunk
pub async fn read_chunked_body<R>(reader: &mut R) -> HttpResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    loop {
        let line = read_line(reader).await?;
        let size_text = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| HttpError::MalformedChunk(line.clone()))?;
        tracing::trace!("Chunk of {} bytes", size);

        if size == 0 {
            // Trailer section ends with an empty line
            while !read_line(reader).await?.is_empty() {}
            return Ok(body);
        }

        match body.len().checked_add(size) {
            Some(total) if total <= MAX_BODY_BYTES => {}
            _ => {
                return Err(HttpError::MalformedChunk(format!(
                    "chunk length {} overruns the {} byte body limit",
                    size_text, MAX_BODY_BYTES
                )))
            }
        }
        read_body_bytes(reader, size, &mut body).await?;

        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
        if &crlf != b"\r\n" {
            return Err(HttpError::MalformedChunk(format!(
                "chunk of {} bytes not followed by CRLF",
                size
            )));
        }
    }
}

/// Undoes `Content-Encoding: gzip` or `deflate`
pub fn decode_content(encoding: Option<&str>, body: Vec<u8>) -> HttpResult<Vec<u8>> {
    let Some(encoding) = encoding.map(str::to_ascii_lowercase) else {
        return Ok(body);
    };

    let mut decoded = Vec::with_capacity(body.len() * 2);
    if encoding.contains("gzip") {
        GzDecoder::new(body.as_slice())
            .read_to_end(&mut decoded)
            .map_err(HttpError::Decompression)?;
    } else if encoding.contains("deflate") {
        ZlibDecoder::new(body.as_slice())
            .read_to_end(&mut decoded)
            .map_err(HttpError::Decompression)?;
    } else {
        return Ok(body);
    }
    Ok(decoded)
}

/// Decodes page bytes: UTF-8 if the content type declares it, otherwise one char per byte
pub fn decode_text(content_type: &str, body: &[u8]) -> String {
    let lower = content_type.to_ascii_lowercase();
    if lower.contains("utf-8") || lower.contains("utf8") {
        String::from_utf8_lossy(body).into_owned()
    } else {
        body.iter().map(|&b| char::from(b)).collect()
    }
}

/// Appends exactly `len` bytes to `body`, growing it only as data arrives
async fn read_body_bytes<R>(reader: &mut R, len: usize, body: &mut Vec<u8>) -> HttpResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let start = body.len();
    (&mut *reader).take(len as u64).read_to_end(body).await?;
    if body.len() - start < len {
        return Err(HttpError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("body ended after {} of {} bytes", body.len() - start, len),
        )));
    }
    Ok(())
}

async fn read_line<R>(reader: &mut R) -> HttpResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).await?;
    if read == 0 {
        return Err(HttpError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed inside chunked body",
        )));
    }
    Ok(String::from_utf8_lossy(&line).trim_end().to_string())
}
