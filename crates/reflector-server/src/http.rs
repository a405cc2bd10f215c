//! Minimal HTTP/1.1 request parsing and response writing
//!
//! Only what the reflector needs: a request line, headers and a
//! `Connection: close` response. Request bodies are never read.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use thiserror::Error;

/// Upper bound on the request line plus headers
pub const MAX_REQUEST_HEAD: u64 = 16 * 1024;

/// Errors that can occur while reading a request
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid HTTP request line")]
    InvalidRequestLine,

    #[error("Request head exceeds {} bytes", MAX_REQUEST_HEAD)]
    HeadTooLarge,
}

/// Parsed HTTP request data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Read the request line and headers from `stream`
    pub fn read_from<R: Read>(stream: R) -> Result<Self, HttpError> {
        let mut reader = BufReader::new(stream.take(MAX_REQUEST_HEAD));

        // Read request line: METHOD /path?query HTTP/1.1
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        if !request_line.ends_with('\n') {
            return Err(head_error(&request_line));
        }
        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
        if parts.len() < 2 {
            return Err(HttpError::InvalidRequestLine);
        }
        let method = parts[0].to_string();
        let full_path = parts[1];

        let (path, query) = match full_path.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (full_path.to_string(), String::new()),
        };

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            if !line.ends_with('\n') {
                return Err(head_error(&line));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((key, val)) = trimmed.split_once(':') {
                headers.insert(key.trim().to_lowercase(), val.trim().to_string());
            }
        }

        Ok(Self {
            method,
            path,
            query,
            headers,
        })
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Decoded query parameters; a repeated name keeps its last value
    pub fn params(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }
}

/// A truncated line means the client hung up or the head hit the byte cap
fn head_error(partial: &str) -> HttpError {
    if partial.is_empty() {
        HttpError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before request head",
        ))
    } else {
        HttpError::HeadTooLarge
    }
}

/// Response sent back to the client
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// `text/plain` response with the given status
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize as an HTTP/1.1 response that closes the connection
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, http_status_text(self.status));
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        for (k, v) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", k, v));
        }
        head.push_str("Connection: close\r\n\r\n");

        out.write_all(head.as_bytes())?;
        out.write_all(self.body.as_bytes())?;
        out.flush()
    }
}

pub fn http_status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Unknown",
    }
}
