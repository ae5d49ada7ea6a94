use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crate::environment::EnvironmentSensor;
use crate::metrics::render;
use crate::model::ExporterSettings;
use crate::serial_io::FrameTransport;
use crate::state::Sampler;
use crate::web::{
    write_response, ReadState, RequestReader, Route, HTML_CONTENT_TYPE, LANDING_PAGE,
    METRICS_CONTENT_TYPE,
};

/// accept 失败后的退避间隔。
const ACCEPT_RETRY: Duration = Duration::from_millis(100);
/// 关闭前最多丢弃的残余请求字节。
const DRAIN_LIMIT: usize = 4096;
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// 顺序处理连接：一次只服务一个客户端，处理完毕关闭后再接受下一个。
///
/// 只有取监听地址失败会返回；accept 与单个连接的错误都只记录后继续。
pub fn serve<T, E>(
    listener: TcpListener,
    sampler: &mut Sampler<T, E>,
    settings: &ExporterSettings,
) -> io::Result<()>
where
    T: FrameTransport,
    E: EnvironmentSensor,
{
    log::info!("Metrics server listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                log::warn!("Accept failed: {:?}", err);
                thread::sleep(ACCEPT_RETRY);
                continue;
            }
        };
        log::debug!("Client connected: {}", peer);
        if let Err(err) = serve_client(stream, sampler, settings) {
            log::warn!("Client {} failed: {:?}", peer, err);
        }
    }
}

fn serve_client<T, E>(
    mut stream: TcpStream,
    sampler: &mut Sampler<T, E>,
    settings: &ExporterSettings,
) -> io::Result<()>
where
    T: FrameTransport,
    E: EnvironmentSensor,
{
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(settings.client_timeout))?;
    stream.set_write_timeout(Some(settings.client_timeout))?;
    match handle_connection(&mut stream, sampler, &settings.location)? {
        Some(route) => {
            log::debug!("Served {}", route.as_str());
            // 先发 FIN 再读空残余输入，避免带未读数据关闭触发 RST
            stream.shutdown(Shutdown::Write)?;
            stream.set_read_timeout(Some(DRAIN_TIMEOUT))?;
            let dropped = drain(&mut stream, DRAIN_LIMIT);
            if dropped > 0 {
                log::debug!("Discarded {} unread request bytes", dropped);
            }
        }
        None => log::debug!("Client closed before request completed"),
    }
    // stream 在此处释放，连接随之关闭
    Ok(())
}

/// 丢弃输入直到对端关闭、读出错或达到上限；返回丢弃的字节数。
pub fn drain<R: Read>(reader: &mut R, limit: usize) -> usize {
    let mut buf = [0u8; 256];
    let mut dropped = 0;
    while dropped < limit {
        let want = buf.len().min(limit - dropped);
        match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(count) => dropped += count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    dropped
}

/// 读取一个请求并写出一次响应；对端提前关闭时返回 `Ok(None)`。
pub fn handle_connection<S, T, E>(
    stream: &mut S,
    sampler: &mut Sampler<T, E>,
    location: &str,
) -> io::Result<Option<Route>>
where
    S: Read + Write,
    T: FrameTransport,
    E: EnvironmentSensor,
{
    let mut reader = RequestReader::new();
    let mut buf = [0u8; 64];
    'read: loop {
        let count = match stream.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        for &byte in &buf[..count] {
            if reader.push(byte) != ReadState::AwaitingLine {
                break 'read;
            }
        }
    }

    let route = match reader.state() {
        ReadState::RequestComplete => Route::classify(&reader.header()),
        _ => {
            log::warn!("Request header exceeded limit");
            Route::BadRequest
        }
    };
    match route {
        Route::Metrics => {
            let body = render(sampler.refresh(), location);
            write_response(stream, 200, "OK", METRICS_CONTENT_TYPE, &body)?;
        }
        Route::Landing => {
            write_response(stream, 200, "OK", HTML_CONTENT_TYPE, LANDING_PAGE)?;
        }
        Route::BadRequest => {
            write_response(stream, 400, "Bad Request", HTML_CONTENT_TYPE, "")?;
        }
    }
    Ok(Some(route))
}
