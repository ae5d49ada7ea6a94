use core::convert::TryInto;
use std::time::Duration;

use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_hal::sys::EspError;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASS: &str = env!("WIFI_PASS");

/// 入网重试间隔。
const JOIN_RETRY: Duration = Duration::from_millis(500);

/// 入网错误。
#[derive(Debug)]
pub enum NetError {
    Esp(EspError),
    Credentials,
}

impl From<EspError> for NetError {
    fn from(err: EspError) -> Self {
        NetError::Esp(err)
    }
}

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetError::Esp(err) => write!(f, "Wi-Fi driver error: {}", err),
            NetError::Credentials => write!(f, "Wi-Fi SSID or password too long"),
        }
    }
}

/// 以 STA 模式入网，直到网卡就绪才返回（监听前必须在线）。
pub fn connect_wifi(modem: Modem) -> Result<BlockingWifi<EspWifi<'static>>, NetError> {
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), nvs)?, sys_loop)?;

    let auth_method = if WIFI_PASS.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let wifi_configuration = Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.try_into().map_err(|_| NetError::Credentials)?,
        bssid: None,
        auth_method,
        password: WIFI_PASS.try_into().map_err(|_| NetError::Credentials)?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;
    wifi.start()?;
    log::info!("Wi-Fi started");

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match wifi.connect().and_then(|_| wifi.wait_netif_up()) {
            Ok(()) => break,
            Err(err) => {
                if attempts == 1 || attempts % 20 == 0 {
                    log::warn!("Wi-Fi join attempt {} failed: {:?}", attempts, err);
                }
                let _ = wifi.disconnect();
                FreeRtos::delay_ms(JOIN_RETRY.as_millis() as u32);
            }
        }
    }

    let ip = wifi.wifi().sta_netif().get_ip_info()?.ip;
    log::info!("Wi-Fi connected to {} as {}", WIFI_SSID, ip);
    Ok(wifi)
}
