use std::time::Duration;

use esp_idf_hal::delay::{TickType, BLOCK};
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::UartDriver;

use crate::proto::Frame;
use crate::serial_io::{log_bytes, read_frame_with, FrameTransport, TransportError};

/// 基于 ESP-IDF UART 驱动的帧传输层。
pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl From<EspError> for TransportError {
    fn from(err: EspError) -> Self {
        TransportError::Uart(err.code())
    }
}

impl FrameTransport for UartTransport<'_> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        // 丢弃上一轮残留字节，避免帧错位
        self.uart.clear_rx()?;
        let bytes = frame.as_bytes();
        log_bytes("UART TX:", bytes);
        let mut written = 0;
        while written < bytes.len() {
            written += self.uart.write(&bytes[written..])?;
        }
        self.uart.wait_tx_done(BLOCK)?;
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
        let uart = &self.uart;
        let frame = read_frame_with(timeout, |buf, remaining| {
            let ticks = TickType::from(remaining).ticks();
            Ok(uart.read(buf, ticks)?)
        })?;
        log_bytes("UART RX:", frame.as_bytes());
        Ok(frame)
    }
}
