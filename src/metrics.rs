//! Prometheus 文本格式导出。
//!
//! 指标块顺序固定（温度、气压、海拔、湿度、CO2），下游可直接做文本比对。

use std::fmt::{self, Write};

use crate::model::Snapshot;

/// 渲染完整指标正文。
pub fn render(snapshot: &Snapshot, location: &str) -> String {
    let mut out = String::with_capacity(768);
    // 写 String 不会失败
    let _ = write_metrics(&mut out, snapshot, location);
    out
}

fn write_metrics<W: Write>(out: &mut W, snapshot: &Snapshot, location: &str) -> fmt::Result {
    let location = escape_label(location);
    write_gauge(
        out,
        "environ_temp",
        "Environment temperature (in C).",
        &location,
        format_args!("{:.2}", snapshot.temperature),
    )?;
    write_gauge(
        out,
        "environ_pressure",
        "Environment atmospheric pressure (in hPa).",
        &location,
        format_args!("{:.2}", snapshot.pressure),
    )?;
    write_gauge(
        out,
        "environ_altitude",
        "Environment altitude from sea level (in m).",
        &location,
        format_args!("{:.2}", snapshot.altitude),
    )?;
    write_gauge(
        out,
        "environ_humidity",
        "Environment relative humidity (in percentage).",
        &location,
        format_args!("{:.2}", snapshot.humidity),
    )?;
    write_gauge(
        out,
        "environ_co2",
        "Environment CO2 concentration (in ppm).",
        &location,
        format_args!("{}", snapshot.co2_value()),
    )
}

fn write_gauge<W: Write>(
    out: &mut W,
    name: &str,
    help: &str,
    location: &str,
    value: fmt::Arguments<'_>,
) -> fmt::Result {
    writeln!(out, "# HELP {} {}", name, help)?;
    writeln!(out, "# TYPE {} gauge", name)?;
    writeln!(out, "{}{{location=\"{}\"}} {}", name, location, value)
}

/// 标签值转义（反斜杠、双引号、换行）。
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            temperature: 21.5,
            pressure: 1008.3,
            altitude: 50.2,
            humidity: 45.0,
            co2: Some(815),
        }
    }

    #[test]
    fn renders_all_blocks_in_order() {
        let body = render(&sample(), "Bedroom");
        let expected = "\
# HELP environ_temp Environment temperature (in C).
# TYPE environ_temp gauge
environ_temp{location=\"Bedroom\"} 21.50
# HELP environ_pressure Environment atmospheric pressure (in hPa).
# TYPE environ_pressure gauge
environ_pressure{location=\"Bedroom\"} 1008.30
# HELP environ_altitude Environment altitude from sea level (in m).
# TYPE environ_altitude gauge
environ_altitude{location=\"Bedroom\"} 50.20
# HELP environ_humidity Environment relative humidity (in percentage).
# TYPE environ_humidity gauge
environ_humidity{location=\"Bedroom\"} 45.00
# HELP environ_co2 Environment CO2 concentration (in ppm).
# TYPE environ_co2 gauge
environ_co2{location=\"Bedroom\"} 815
";
        assert_eq!(body, expected);
        assert!(body
            .lines()
            .any(|line| line == "environ_co2{location=\"Bedroom\"} 815"));
    }

    #[test]
    fn render_is_stable() {
        let snapshot = sample();
        assert_eq!(render(&snapshot, "Bedroom"), render(&snapshot, "Bedroom"));
    }

    #[test]
    fn every_sample_carries_configured_location() {
        let body = render(&sample(), "Office");
        let samples: Vec<_> = body.lines().filter(|line| !line.starts_with('#')).collect();
        assert_eq!(samples.len(), 5);
        assert!(samples
            .iter()
            .all(|line| line.contains("{location=\"Office\"} ")));
    }

    #[test]
    fn unknown_values_are_rendered_not_hidden() {
        let body = render(&Snapshot::unknown(), "Bedroom");
        assert!(body.contains("environ_co2{location=\"Bedroom\"} -1\n"));
        assert!(body.contains("environ_temp{location=\"Bedroom\"} NaN\n"));
    }

    #[test]
    fn location_label_is_escaped() {
        let body = render(&sample(), "Lab \"A\"\\2");
        assert!(body.contains("environ_co2{location=\"Lab \\\"A\\\"\\\\2\"} 815"));
    }
}
