/// 温湿压传感器能力接口（BME280 等）。
///
/// 各读数独立失败；失败时由调用方决定记录的值。
pub trait EnvironmentSensor {
    type Error: core::fmt::Debug;

    /// 开始一轮采样：一次测量供随后的各项读取共用。
    fn measure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// 温度（°C）。
    fn read_temperature(&mut self) -> Result<f32, Self::Error>;

    /// 气压（Pa）。
    fn read_pressure(&mut self) -> Result<f32, Self::Error>;

    /// 相对海平面基准气压（hPa）的海拔（m）。
    fn read_altitude(&mut self, sea_level_hpa: f32) -> Result<f32, Self::Error>;

    /// 相对湿度（%）。
    fn read_humidity(&mut self) -> Result<f32, Self::Error>;
}

/// 国际标准大气近似公式。
pub fn altitude_from_pressure(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44_330.0 * (1.0 - (pressure_hpa / sea_level_hpa).powf(0.1903))
}

#[cfg(test)]
pub(crate) mod mock {
    use super::EnvironmentSensor;

    /// 固定读数的桩传感器。
    #[derive(Clone, Debug)]
    pub struct FixedSensor {
        pub temperature: f32,
        pub pressure_pa: f32,
        pub humidity: f32,
        pub failing: bool,
        /// 调用记录
        pub calls: Vec<&'static str>,
    }

    impl FixedSensor {
        pub fn new(temperature: f32, pressure_pa: f32, humidity: f32) -> Self {
            Self {
                temperature,
                pressure_pa,
                humidity,
                failing: false,
                calls: Vec::new(),
            }
        }

        fn value(&mut self, call: &'static str, value: f32) -> Result<f32, &'static str> {
            self.calls.push(call);
            if self.failing {
                Err("bus error")
            } else {
                Ok(value)
            }
        }
    }

    impl EnvironmentSensor for FixedSensor {
        type Error = &'static str;

        fn measure(&mut self) -> Result<(), Self::Error> {
            self.value("measure", 0.0).map(|_| ())
        }

        fn read_temperature(&mut self) -> Result<f32, Self::Error> {
            self.value("temperature", self.temperature)
        }

        fn read_pressure(&mut self) -> Result<f32, Self::Error> {
            self.value("pressure", self.pressure_pa)
        }

        fn read_altitude(&mut self, sea_level_hpa: f32) -> Result<f32, Self::Error> {
            let altitude = super::altitude_from_pressure(self.pressure_pa / 100.0, sea_level_hpa);
            self.value("altitude", altitude)
        }

        fn read_humidity(&mut self) -> Result<f32, Self::Error> {
            self.value("humidity", self.humidity)
        }
    }
}
