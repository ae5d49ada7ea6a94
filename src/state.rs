use std::time::Duration;

use crate::environment::EnvironmentSensor;
use crate::model::Snapshot;
use crate::serial::Co2Sensor;
use crate::serial_io::FrameTransport;

/// 采样状态：唯一写者，持有两个传感器与最新快照。
pub struct Sampler<T, E> {
    co2: Co2Sensor<T>,
    env: E,
    sea_level_hpa: f32,
    snapshot: Snapshot,
    refreshes: u32,
}

impl<T: FrameTransport, E: EnvironmentSensor> Sampler<T, E> {
    pub fn new(co2: Co2Sensor<T>, env: E, sea_level_hpa: f32) -> Self {
        Self {
            co2,
            env,
            sea_level_hpa,
            snapshot: Snapshot::unknown(),
            refreshes: 0,
        }
    }

    /// 最新快照。
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// 累计刷新次数。
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// 读取全部传感器并整体覆盖快照（无重试、无平均）。
    pub fn refresh(&mut self) -> &Snapshot {
        if let Err(err) = self.env.measure() {
            log::warn!("environment measurement failed: {:?}", err);
        }
        let temperature = or_nan("temperature", self.env.read_temperature());
        let pressure = or_nan("pressure", self.env.read_pressure()) / 100.0;
        let altitude = or_nan("altitude", self.env.read_altitude(self.sea_level_hpa));
        let humidity = or_nan("humidity", self.env.read_humidity());
        let co2 = match self.co2.read_co2() {
            Ok(ppm) => Some(ppm),
            Err(err) => {
                log::warn!("CO2 read failed: {}", err);
                None
            }
        };

        self.snapshot = Snapshot {
            temperature,
            pressure,
            altitude,
            humidity,
            co2,
        };
        self.refreshes += 1;
        &self.snapshot
    }

    /// 启动门控：按固定间隔重复刷新，直到拿到有效 CO2；返回刷新次数。
    pub fn warm_up<S>(&mut self, interval: Duration, mut sleep: S) -> u32
    where
        S: FnMut(Duration),
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if let Some(ppm) = self.refresh().co2 {
                log::info!("CO2 sensor ready after {} attempt(s): {} ppm", attempts, ppm);
                return attempts;
            }
            sleep(interval);
        }
    }
}

/// 读失败时记录 NaN（与驱动失败值一致）。
fn or_nan<D: core::fmt::Debug>(name: &str, reading: Result<f32, D>) -> f32 {
    reading.unwrap_or_else(|err| {
        log::warn!("{} read failed: {:?}", name, err);
        f32::NAN
    })
}
