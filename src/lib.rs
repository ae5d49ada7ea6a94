// 模块划分：串口协议、传感器、采样状态、指标导出与 HTTP 应答
pub mod environment;
pub mod metrics;
pub mod model;
pub mod proto;
pub mod serial;
pub mod serial_io;
pub mod state;
pub mod web;
pub mod web_server;

// 仅在 ESP-IDF 目标上编译的外设模块
#[cfg(target_os = "espidf")]
pub mod bme280;
#[cfg(target_os = "espidf")]
pub mod net;
#[cfg(target_os = "espidf")]
pub mod uart_link;
