use std::fmt;
use std::time::Duration;

use crate::proto::{checksum, DetectionRange, Frame, CMD_READ_CO2, READ_CO2};
use crate::serial_io::{FrameTransport, TransportError};

/// 读取 CO2 失败原因（对外统一折叠为“无有效读数”）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Co2Error {
    /// 应答命令字不是 0x86。
    Protocol { opcode: u8 },
    /// 校验和不匹配。
    Checksum { expected: u8, found: u8 },
    Transport(TransportError),
}

impl fmt::Display for Co2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Co2Error::Protocol { opcode } => write!(
                f,
                "unexpected response opcode 0x{:02X} (expected 0x{:02X})",
                opcode, CMD_READ_CO2
            ),
            Co2Error::Checksum { expected, found } => write!(
                f,
                "checksum mismatch: expected 0x{:02X}, found 0x{:02X}",
                expected, found
            ),
            Co2Error::Transport(err) => write!(f, "transport: {}", err),
        }
    }
}

impl std::error::Error for Co2Error {}

impl From<TransportError> for Co2Error {
    fn from(err: TransportError) -> Self {
        Co2Error::Transport(err)
    }
}

/// 校验并解析浓度应答：先查命令字，再查校验和。
pub fn decode_co2_response(frame: &Frame) -> Result<u16, Co2Error> {
    let bytes = frame.as_bytes();
    if bytes[1] != CMD_READ_CO2 {
        return Err(Co2Error::Protocol { opcode: bytes[1] });
    }
    let expected = checksum(bytes);
    if expected != bytes[8] {
        return Err(Co2Error::Checksum {
            expected,
            found: bytes[8],
        });
    }
    Ok(u16::from_be_bytes([bytes[2], bytes[3]]))
}

/// MH-Z19 CO2 传感器（经帧传输层通信）。
pub struct Co2Sensor<T> {
    transport: T,
    read_timeout: Duration,
}

impl<T: FrameTransport> Co2Sensor<T> {
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
        }
    }

    /// 单次测量：发命令、收应答、校验、解码 ppm。
    pub fn read_co2(&mut self) -> Result<u16, Co2Error> {
        self.transport.write_frame(&READ_CO2)?;
        let response = self.transport.read_frame(self.read_timeout)?;
        decode_co2_response(&response)
    }

    /// 下发量程命令（传感器不回应答）。
    pub fn set_detection_range(&mut self, range: DetectionRange) -> Result<(), TransportError> {
        log::info!("Setting CO2 detection range to {} ppm", range.ppm());
        self.transport.write_frame(&range.command())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{co2_response, ScriptedPort};
    use super::*;
    use crate::proto::SET_RANGE_5K;

    fn sensor(responses: Vec<Result<Frame, TransportError>>) -> Co2Sensor<ScriptedPort> {
        Co2Sensor::new(ScriptedPort::with(responses), Duration::from_millis(100))
    }

    #[test]
    fn decodes_known_frame() {
        let mut co2 = sensor(vec![Ok(co2_response(1000))]);
        assert_eq!(co2.read_co2(), Ok(1000));
        assert_eq!(co2.transport().written, vec![READ_CO2]);
    }

    #[test]
    fn decodes_big_endian_bytes() {
        let mut bytes = [0xFF, 0x86, 0x03, 0xE8, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes[8] = checksum(&bytes);
        assert_eq!(decode_co2_response(&Frame::from_bytes(bytes)), Ok(1000));
    }

    #[test]
    fn wrong_opcode_rejected_even_with_valid_checksum() {
        let mut bytes = [0xFF, 0x99, 0x03, 0xE8, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes[8] = checksum(&bytes);
        let mut co2 = sensor(vec![Ok(Frame::from_bytes(bytes))]);
        assert_eq!(co2.read_co2(), Err(Co2Error::Protocol { opcode: 0x99 }));
    }

    #[test]
    fn wrong_opcode_reported_before_bad_checksum() {
        let bytes = [0xFF, 0x10, 0x03, 0xE8, 0x00, 0x00, 0x00, 0x00, 0x00];
        let err = decode_co2_response(&Frame::from_bytes(bytes)).unwrap_err();
        assert_eq!(err, Co2Error::Protocol { opcode: 0x10 });
    }

    #[test]
    fn bad_checksum_rejected() {
        let mut bytes = *co2_response(815).as_bytes();
        let good = bytes[8];
        bytes[8] = good.wrapping_add(1);
        let mut co2 = sensor(vec![Ok(Frame::from_bytes(bytes))]);
        assert_eq!(
            co2.read_co2(),
            Err(Co2Error::Checksum {
                expected: good,
                found: good.wrapping_add(1),
            })
        );
    }

    #[test]
    fn stall_surfaces_as_transport_error() {
        let mut co2 = sensor(vec![]);
        assert_eq!(
            co2.read_co2(),
            Err(Co2Error::Transport(TransportError::Stall { received: 0 }))
        );
    }

    #[test]
    fn range_command_is_written_without_reading() {
        let mut co2 = sensor(vec![]);
        co2.set_detection_range(DetectionRange::Ppm5000).unwrap();
        assert_eq!(co2.transport().written, vec![SET_RANGE_5K]);
    }
}
