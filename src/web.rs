use std::io::{self, Write};

/// 请求头累计上限（超出视为非法请求）。
pub const MAX_HEADER_BYTES: usize = 2048;

/// 首页：指向 /metrics 的静态页面。
pub const LANDING_PAGE: &str = "<html><head><title>Environment Sensor @ ESP32</title></head>\
<body><h1>Environment Sensor @ ESP32</h1>\
<p><a href=\"/metrics\">Metrics</a></p></body></html>\r\n";

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// 单连接请求读取状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    AwaitingLine,
    RequestComplete,
    /// 请求头超长。
    Overflow,
}

/// 逐字节累积请求头，遇到空行即完成。
pub struct RequestReader {
    header: Vec<u8>,
    line_len: usize,
    state: ReadState,
}

impl RequestReader {
    pub fn new() -> Self {
        Self {
            header: Vec::with_capacity(256),
            line_len: 0,
            state: ReadState::AwaitingLine,
        }
    }

    /// 推入一个字节，返回推入后的状态；完成后再推入无效果。
    pub fn push(&mut self, byte: u8) -> ReadState {
        if self.state != ReadState::AwaitingLine {
            return self.state;
        }
        if self.header.len() >= MAX_HEADER_BYTES {
            self.state = ReadState::Overflow;
            return self.state;
        }
        self.header.push(byte);
        match byte {
            b'\n' if self.line_len == 0 => self.state = ReadState::RequestComplete,
            b'\n' => self.line_len = 0,
            // \r 只进入请求头，不计入当前行
            b'\r' => {}
            _ => self.line_len += 1,
        }
        self.state
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// 已累计的请求头文本。
    pub fn header(&self) -> String {
        String::from_utf8_lossy(&self.header).into_owned()
    }
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new()
    }
}

/// 请求行（method path version）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

/// 解析请求头首行。
pub fn parse_request_line(header: &str) -> Option<RequestLine<'_>> {
    let line = header.lines().next()?.trim_end_matches('\r');
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    let version = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return None;
    }
    Some(RequestLine {
        method,
        path,
        version,
    })
}

/// 请求路由结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Metrics,
    Landing,
    BadRequest,
}

impl Route {
    /// 按 method + path 前缀分派。
    pub fn classify(header: &str) -> Self {
        match parse_request_line(header) {
            Some(RequestLine {
                method: "GET",
                path,
                ..
            }) if path.starts_with("/metrics") => Route::Metrics,
            Some(RequestLine {
                method: "GET",
                path,
                ..
            }) if path.starts_with('/') => Route::Landing,
            _ => Route::BadRequest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Metrics => "metrics",
            Route::Landing => "landing",
            Route::BadRequest => "bad_request",
        }
    }
}

/// 写出完整响应（始终 Connection: close）。
pub fn write_response<W: Write>(
    out: &mut W,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &str,
) -> io::Result<()> {
    write!(out, "HTTP/1.1 {} {}\r\n", status, reason)?;
    write!(out, "Content-Type: {}\r\n", content_type)?;
    write!(out, "Content-Length: {}\r\n", body.len())?;
    write!(out, "Connection: close\r\n\r\n")?;
    out.write_all(body.as_bytes())?;
    out.flush()
}
