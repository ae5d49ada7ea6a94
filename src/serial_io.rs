use std::fmt;
use std::time::{Duration, Instant};

use crate::proto::{Frame, FRAME_LEN};

/// 串口传输错误。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// 超时前未收齐一帧。
    Stall { received: usize },
    /// 驱动返回的错误码。
    Uart(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Stall { received } => write!(
                f,
                "frame read stalled after {} of {} bytes",
                received, FRAME_LEN
            ),
            TransportError::Uart(code) => write!(f, "UART driver error {}", code),
        }
    }
}

impl std::error::Error for TransportError {}

/// 定长帧收发接口（同步阻塞，读带超时）。
pub trait FrameTransport {
    /// 按顺序写出完整 9 字节。
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// 读取一帧，超时返回 `TransportError::Stall`。
    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, TransportError>;
}

/// 帧读取器：逐字节组装完整帧。
pub struct FrameReader {
    buffer: [u8; FRAME_LEN],
    len: usize,
}

impl FrameReader {
    /// 创建新的帧读取器。
    pub fn new() -> Self {
        Self {
            buffer: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// 推入一个字节，收满 9 字节时返回帧并复位。
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        self.buffer[self.len] = byte;
        self.len += 1;
        if self.len == FRAME_LEN {
            self.len = 0;
            return Some(Frame::from_bytes(self.buffer));
        }
        None
    }

    /// 已收字节数。
    pub fn received(&self) -> usize {
        self.len
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// 在截止时间内从分块字节源读满一帧。
///
/// `read_chunk` 收到剩余等待时间，返回本次读到的字节数（0 表示暂无数据）。
/// 超出一帧的多余字节被丢弃。
pub fn read_frame_with<F>(timeout: Duration, mut read_chunk: F) -> Result<Frame, TransportError>
where
    F: FnMut(&mut [u8], Duration) -> Result<usize, TransportError>,
{
    let deadline = Instant::now() + timeout;
    let mut reader = FrameReader::new();
    let mut chunk = [0u8; FRAME_LEN];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Stall {
                received: reader.received(),
            });
        }
        let wanted = FRAME_LEN - reader.received();
        let count = read_chunk(&mut chunk[..wanted], remaining)?;
        for &byte in &chunk[..count] {
            if let Some(frame) = reader.push(byte) {
                return Ok(frame);
            }
        }
    }
}

/// 十六进制打印收发字节（debug 级别）。
pub fn log_bytes(prefix: &str, bytes: &[u8]) {
    if bytes.is_empty() || !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let line = bytes
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ");
    log::debug!("{} {}", prefix, line);
}
