use std::time::Duration;

use crate::proto::DetectionRange;

/// CO2 未知时对外输出的哨兵值。
pub const CO2_UNKNOWN: i32 = -1;

/// 最近一次采样快照（整体覆盖，不做局部合并）。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    /// °C
    pub temperature: f32,
    /// hPa
    pub pressure: f32,
    /// m
    pub altitude: f32,
    /// %RH
    pub humidity: f32,
    /// ppm；`None` 表示本轮无有效读数。
    pub co2: Option<u16>,
}

impl Snapshot {
    /// 启动时的空快照。
    pub const fn unknown() -> Self {
        Self {
            temperature: f32::NAN,
            pressure: f32::NAN,
            altitude: f32::NAN,
            humidity: f32::NAN,
            co2: None,
        }
    }

    /// CO2 对外值（未知时为 -1）。
    pub fn co2_value(&self) -> i32 {
        self.co2.map(i32::from).unwrap_or(CO2_UNKNOWN)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// 导出器参数（编译期 .env 覆盖默认值）。
#[derive(Clone, Debug, PartialEq)]
pub struct ExporterSettings {
    /// 指标 location 标签。
    pub location: String,
    pub detection_range: DetectionRange,
    /// 海平面基准气压（hPa）。
    pub sea_level_hpa: f32,
    pub http_port: u16,
    pub uart_baud: u32,
    pub co2_read_timeout: Duration,
    /// 启动等待 CO2 就绪的重试间隔。
    pub warmup_interval: Duration,
    /// 客户端读写超时。
    pub client_timeout: Duration,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            location: "Bedroom".to_string(),
            detection_range: DetectionRange::default(),
            sea_level_hpa: 1013.25,
            http_port: 80,
            uart_baud: 9600,
            co2_read_timeout: Duration::from_secs(1),
            warmup_interval: Duration::from_secs(1),
            client_timeout: Duration::from_secs(5),
        }
    }
}

impl ExporterSettings {
    /// 读取编译期注入的 SENSOR_LOCATION / CO2_RANGE_PPM。
    pub fn from_build_env() -> Self {
        Self::with_overrides(option_env!("SENSOR_LOCATION"), option_env!("CO2_RANGE_PPM"))
    }

    /// 在默认值上应用覆盖项，非法值保留默认并告警。
    pub fn with_overrides(location: Option<&str>, range_ppm: Option<&str>) -> Self {
        let mut settings = Self::default();
        if let Some(location) = location.map(str::trim).filter(|value| !value.is_empty()) {
            settings.location = location.to_string();
        }
        if let Some(raw) = range_ppm {
            match raw
                .trim()
                .parse::<u16>()
                .ok()
                .and_then(DetectionRange::from_ppm)
            {
                Some(range) => settings.detection_range = range,
                None => log::warn!(
                    "Ignoring CO2_RANGE_PPM={:?} (expected 2000, 5000 or 10000)",
                    raw
                ),
            }
        }
        settings
    }
}
