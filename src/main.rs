#[cfg(target_os = "espidf")]
fn main() {
    firmware::main()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "environ-exporter is firmware for ESP-IDF targets; \
         run `cargo test` for the host-side logic"
    );
    std::process::exit(1);
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::fmt;
    use std::io;
    use std::net::TcpListener;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::spi::{self, SpiDeviceDriver, SpiDriver, SpiDriverConfig};
    use esp_idf_hal::sys::EspError;
    use esp_idf_hal::uart;

    use environ_exporter::bme280::Bme280Sensor;
    use environ_exporter::model::ExporterSettings;
    use environ_exporter::net::{connect_wifi, NetError};
    use environ_exporter::serial::Co2Sensor;
    use environ_exporter::state::Sampler;
    use environ_exporter::uart_link::UartTransport;
    use environ_exporter::web_server::serve;

    /// 启动阶段的致命错误，交由 main 执行停机策略。
    #[derive(Debug)]
    enum BootError {
        Peripheral(EspError),
        Network(NetError),
        Listener(io::Error),
        SensorInit(String),
        Server(io::Error),
    }

    impl From<EspError> for BootError {
        fn from(err: EspError) -> Self {
            BootError::Peripheral(err)
        }
    }

    impl From<NetError> for BootError {
        fn from(err: NetError) -> Self {
            BootError::Network(err)
        }
    }

    impl fmt::Display for BootError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                BootError::Peripheral(err) => write!(f, "peripheral setup failed: {}", err),
                BootError::Network(err) => write!(f, "network join failed: {}", err),
                BootError::Listener(err) => write!(f, "cannot open listener: {}", err),
                BootError::SensorInit(err) => write!(f, "BME280 init failed: {}", err),
                BootError::Server(err) => write!(f, "server stopped: {}", err),
            }
        }
    }

    pub fn main() {
        // ESP-IDF 运行时初始化（链接补丁 & 日志）
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        log::info!("environ-exporter booting (ESP-IDF)...");
        let settings = ExporterSettings::from_build_env();
        if let Err(err) = run(&settings) {
            log::error!("Fatal: {}", err);
        }
        // 无恢复路径：停机等待外部复位
        loop {
            FreeRtos::delay_ms(1000);
        }
    }

    fn run(settings: &ExporterSettings) -> Result<(), BootError> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        // 先入网再监听
        let _wifi = connect_wifi(peripherals.modem)?;
        let listener = TcpListener::bind(("0.0.0.0", settings.http_port))
            .map_err(BootError::Listener)?;

        // MH-Z19B：UART2，TX=GPIO17 / RX=GPIO16，8N1
        let uart_config = uart::config::Config::new().baudrate(Hertz(settings.uart_baud));
        let uart = uart::UartDriver::new(
            peripherals.uart2,
            pins.gpio17,
            pins.gpio16,
            AnyInputPin::none(),
            AnyOutputPin::none(),
            &uart_config,
        )?;
        let mut co2 = Co2Sensor::new(UartTransport::new(uart), settings.co2_read_timeout);
        if let Err(err) = co2.set_detection_range(settings.detection_range) {
            log::warn!("Failed to send detection range command: {}", err);
        }

        // BME280：VSPI，SCK=18 / MISO=19 / MOSI=23 / CS=5
        let spi_driver = SpiDriver::new(
            peripherals.spi3,
            pins.gpio18,
            pins.gpio23,
            Some(pins.gpio19),
            &SpiDriverConfig::new(),
        )?;
        let spi_config = spi::config::Config::new().baudrate(Hertz(1_000_000));
        let spi = SpiDeviceDriver::new(spi_driver, Some(pins.gpio5), &spi_config)?;
        let env = Bme280Sensor::new(spi)
            .map_err(|err| BootError::SensorInit(format!("{:?}", err)))?;
        log::info!("BME280 ready");

        let mut sampler = Sampler::new(co2, env, settings.sea_level_hpa);
        sampler.warm_up(settings.warmup_interval, |interval| {
            FreeRtos::delay_ms(interval.as_millis() as u32)
        });

        log::info!("Serving metrics for location {:?}", settings.location);
        serve(listener, &mut sampler, settings).map_err(BootError::Server)
    }
}
