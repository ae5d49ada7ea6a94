/// MH-Z19 串口帧长度（固定 9 字节，无分隔符）。
pub const FRAME_LEN: usize = 9;

/// 帧头与传感器地址。
pub const FRAME_START: u8 = 0xFF;
pub const SENSOR_ADDR: u8 = 0x01;

/// 命令字定义。
pub const CMD_READ_CO2: u8 = 0x86;
pub const CMD_SET_RANGE: u8 = 0x99;

/// 串口协议帧（start + addr/cmd + 载荷 + checksum），构造后不可变。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// 从原始字节构造帧（不做校验，应答帧由调用方校验）。
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// 原始字节。
    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// 校验和是否与第 8 字节一致。
    pub const fn checksum_ok(&self) -> bool {
        checksum(&self.0) == self.0[FRAME_LEN - 1]
    }
}

/// 计算校验和：字节 1..=7 累加取反加一。
pub const fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    let mut sum = 0u8;
    let mut i = 1;
    while i < FRAME_LEN - 1 {
        sum = sum.wrapping_add(frame[i]);
        i += 1;
    }
    (0xFF - sum).wrapping_add(1)
}

/// 组装命令帧并写入校验和。
const fn command(opcode: u8, payload: [u8; 5]) -> Frame {
    let mut bytes = [
        FRAME_START,
        SENSOR_ADDR,
        opcode,
        payload[0],
        payload[1],
        payload[2],
        payload[3],
        payload[4],
        0,
    ];
    bytes[FRAME_LEN - 1] = checksum(&bytes);
    Frame(bytes)
}

/// 量程命令（量程以大端 u16 写入字节 6–7）。
const fn range_command(ppm: u16) -> Frame {
    let [hi, lo] = ppm.to_be_bytes();
    command(CMD_SET_RANGE, [0, 0, 0, hi, lo])
}

/// 读取 CO2 浓度。
pub const READ_CO2: Frame = command(CMD_READ_CO2, [0; 5]);
/// 设置检测量程。
pub const SET_RANGE_10K: Frame = range_command(10_000);
pub const SET_RANGE_5K: Frame = range_command(5_000);
pub const SET_RANGE_2K: Frame = range_command(2_000);

/// 传感器检测量程。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionRange {
    Ppm2000,
    Ppm5000,
    #[default]
    Ppm10000,
}

impl DetectionRange {
    pub fn ppm(&self) -> u16 {
        match self {
            DetectionRange::Ppm2000 => 2_000,
            DetectionRange::Ppm5000 => 5_000,
            DetectionRange::Ppm10000 => 10_000,
        }
    }

    /// 对应的预置命令帧。
    pub fn command(&self) -> Frame {
        match self {
            DetectionRange::Ppm2000 => SET_RANGE_2K,
            DetectionRange::Ppm5000 => SET_RANGE_5K,
            DetectionRange::Ppm10000 => SET_RANGE_10K,
        }
    }

    pub fn from_ppm(ppm: u16) -> Option<Self> {
        match ppm {
            2_000 => Some(DetectionRange::Ppm2000),
            5_000 => Some(DetectionRange::Ppm5000),
            10_000 => Some(DetectionRange::Ppm10000),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_frames_carry_valid_checksums() {
        for frame in [READ_CO2, SET_RANGE_10K, SET_RANGE_5K, SET_RANGE_2K] {
            assert!(frame.checksum_ok(), "{:02X?}", frame.as_bytes());
            assert_eq!(checksum(frame.as_bytes()), frame.as_bytes()[8]);
        }
    }

    #[test]
    fn catalog_matches_datasheet_bytes() {
        assert_eq!(
            READ_CO2.as_bytes(),
            &[0xFF, 0x01, 0x86, 0x00, 0x00, 0x00, 0x00, 0x00, 0x79]
        );
        assert_eq!(
            SET_RANGE_2K.as_bytes(),
            &[0xFF, 0x01, 0x99, 0x00, 0x00, 0x00, 0x07, 0xD0, 0x8F]
        );
        assert_eq!(
            SET_RANGE_5K.as_bytes(),
            &[0xFF, 0x01, 0x99, 0x00, 0x00, 0x00, 0x13, 0x88, 0xCB]
        );
        assert_eq!(&SET_RANGE_10K.as_bytes()[6..8], &[0x27, 0x10]);
    }

    #[test]
    fn stamped_payload_validates() {
        let mut bytes = [0xFF, 0x86, 0x02, 0x60, 0x47, 0x00, 0x00, 0x00, 0x00];
        bytes[8] = checksum(&bytes);
        assert!(Frame::from_bytes(bytes).checksum_ok());
    }

    #[test]
    fn single_bit_flips_are_rejected() {
        let bytes = *READ_CO2.as_bytes();
        for idx in 1..FRAME_LEN {
            for bit in 0..8 {
                let mut corrupt = bytes;
                corrupt[idx] ^= 1 << bit;
                assert!(
                    !Frame::from_bytes(corrupt).checksum_ok(),
                    "flip byte {} bit {} accepted",
                    idx,
                    bit
                );
            }
        }
    }

    #[test]
    fn start_byte_is_not_covered() {
        let mut bytes = *READ_CO2.as_bytes();
        bytes[0] = 0x00;
        assert!(Frame::from_bytes(bytes).checksum_ok());
    }

    #[test]
    fn detection_range_lookup() {
        assert_eq!(DetectionRange::default(), DetectionRange::Ppm10000);
        assert_eq!(DetectionRange::from_ppm(5_000), Some(DetectionRange::Ppm5000));
        assert_eq!(DetectionRange::from_ppm(3_000), None);
        assert_eq!(DetectionRange::Ppm2000.command(), SET_RANGE_2K);
        assert_eq!(DetectionRange::Ppm10000.ppm(), 10_000);
    }
}
