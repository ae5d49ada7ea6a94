use ::bme280::spi::{SPIError, BME280};
use ::bme280::Error as Bme280Error;
use esp_idf_hal::delay::Delay;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiError};

use crate::environment::{altitude_from_pressure, EnvironmentSensor};

type Spi<'d> = SpiDeviceDriver<'d, SpiDriver<'d>>;

/// 驱动错误（SPI 总线错误经 bme280 包装）。
pub type BmeError = Bme280Error<SPIError<SpiError>>;

/// 一次强制测量的结果。
#[derive(Clone, Copy, Debug)]
struct Reading {
    temperature: f32,
    /// Pa
    pressure: f32,
    humidity: f32,
}

/// BME280（硬件 SPI）温湿压传感器。
///
/// `measure()` 做一次强制测量并缓存，随后的各项读数取自同一次测量。
pub struct Bme280Sensor<'d> {
    bme: BME280<Spi<'d>>,
    delay: Delay,
    latest: Option<Reading>,
}

impl<'d> Bme280Sensor<'d> {
    /// 初始化传感器；失败时调用方按致命错误处理。
    pub fn new(spi: Spi<'d>) -> Result<Self, BmeError> {
        let mut delay = Delay::new_default();
        let mut bme = BME280::new(spi)?;
        bme.init(&mut delay)?;
        Ok(Self {
            bme,
            delay,
            latest: None,
        })
    }

    fn take_measurement(&mut self) -> Result<Reading, BmeError> {
        self.latest = None;
        let m = self.bme.measure(&mut self.delay)?;
        let reading = Reading {
            temperature: m.temperature,
            pressure: m.pressure,
            humidity: m.humidity,
        };
        self.latest = Some(reading);
        Ok(reading)
    }

    /// 取缓存读数，没有则现测一次。
    fn reading(&mut self) -> Result<Reading, BmeError> {
        match self.latest {
            Some(reading) => Ok(reading),
            None => self.take_measurement(),
        }
    }
}

impl EnvironmentSensor for Bme280Sensor<'_> {
    type Error = BmeError;

    fn measure(&mut self) -> Result<(), Self::Error> {
        self.take_measurement().map(|_| ())
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        Ok(self.reading()?.temperature)
    }

    fn read_pressure(&mut self) -> Result<f32, Self::Error> {
        Ok(self.reading()?.pressure)
    }

    fn read_altitude(&mut self, sea_level_hpa: f32) -> Result<f32, Self::Error> {
        let pressure_hpa = self.reading()?.pressure / 100.0;
        Ok(altitude_from_pressure(pressure_hpa, sea_level_hpa))
    }

    fn read_humidity(&mut self) -> Result<f32, Self::Error> {
        Ok(self.reading()?.humidity)
    }
}
