//! Serial telemetry line parsing
//!
//! The throttle quadrant prints either `t_raw,t_pct,p_raw,p_pct,m_raw,m_pct`
//! or `t_pct,p_pct,m_pct` per line; only the percentages are used. The pot
//! panel prints `CTRLPANEL,raw0,pct0,raw1,pct1,...` and only the raw values
//! are used.

use futures::Stream;
use quadrant_core::{ThrottleSample, CHANNEL_COUNT};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Line prefix identifying the pot panel
pub const PANEL_PREFIX: &str = "CTRLPANEL";

#[derive(Debug, Error, PartialEq)]
pub enum TelemetryError {
    #[error("Expected 3 or 6 fields, got {0}")]
    FieldCount(usize),

    #[error("Invalid number: \"{0}\"")]
    Number(String),

    #[error("Not a CTRLPANEL line")]
    NotPanel,
}

/// Non-empty comma separated fields
fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim).filter(|f| !f.is_empty())
}

fn number(field: &str) -> Result<f64, TelemetryError> {
    field
        .parse()
        .map_err(|_| TelemetryError::Number(field.to_string()))
}

/// Parse one throttle quadrant line
pub fn parse_throttle_line(line: &str) -> Result<ThrottleSample, TelemetryError> {
    let parts: Vec<&str> = fields(line).collect();
    let (t, p, m) = match parts.len() {
        n if n >= 6 => {
            // Raw fields must still be numbers for the line to count
            for raw in [parts[0], parts[2], parts[4]] {
                number(raw)?;
            }
            (parts[1], parts[3], parts[5])
        }
        n if n >= 3 => (parts[0], parts[1], parts[2]),
        n => return Err(TelemetryError::FieldCount(n)),
    };
    Ok(ThrottleSample::new(number(t)?, number(p)?, number(m)?))
}

/// Parse one pot panel line into raw channel values
///
/// Unparseable values read as 0 and missing channels are padded with 0.
pub fn parse_panel_line(line: &str) -> Result<[f64; CHANNEL_COUNT], TelemetryError> {
    let body = line
        .trim()
        .strip_prefix(PANEL_PREFIX)
        .ok_or(TelemetryError::NotPanel)?;

    let mut values = [0.0; CHANNEL_COUNT];
    for (slot, field) in values
        .iter_mut()
        .zip(fields(body).take(CHANNEL_COUNT * 2).step_by(2))
    {
        *slot = field.parse().unwrap_or(0.0);
    }
    Ok(values)
}

/// Stream of lines read from a device node or capture file
pub fn line_stream<R>(reader: R) -> impl Stream<Item = io::Result<String>>
where
    R: AsyncBufRead + Unpin,
{
    futures::stream::unfold(reader.lines(), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(e), lines)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_throttle_six_fields() {
        let sample = parse_throttle_line("512,50.0,1023,100.0,0,0.0").unwrap();
        assert_eq!(sample, ThrottleSample::new(50.0, 100.0, 0.0));
    }

    #[test]
    fn test_throttle_three_fields() {
        let sample = parse_throttle_line(" 12.5, 80 ,3\r").unwrap();
        assert_eq!(sample, ThrottleSample::new(12.5, 80.0, 3.0));
    }

    #[test]
    fn test_throttle_empty_fields_skipped() {
        let sample = parse_throttle_line("10,,20,30,").unwrap();
        assert_eq!(sample, ThrottleSample::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_throttle_rejects() {
        assert_eq!(
            parse_throttle_line("1,2"),
            Err(TelemetryError::FieldCount(2))
        );
        assert_eq!(
            parse_throttle_line("1,x,3"),
            Err(TelemetryError::Number("x".to_string()))
        );
        assert_eq!(
            parse_throttle_line("bad,1,2,3,4,5"),
            Err(TelemetryError::Number("bad".to_string()))
        );
    }

    #[test]
    fn test_panel_every_other_value() {
        let line = "CTRLPANEL,100,9.8,200,19.5,300,29.3,400,39.1,500,48.9,600,58.7,700,68.4";
        assert_eq!(
            parse_panel_line(line).unwrap(),
            [100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0]
        );
    }

    #[test]
    fn test_panel_short_and_garbled() {
        let line = "CTRLPANEL,100,9.8,??,0,300";
        assert_eq!(
            parse_panel_line(line).unwrap(),
            [100.0, 0.0, 300.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(
            parse_panel_line("CTRLPANEL").unwrap(),
            [0.0; CHANNEL_COUNT]
        );
    }

    #[test]
    fn test_panel_ignores_extra_fields() {
        let mut line = String::from("CTRLPANEL");
        for i in 0..10 {
            line.push_str(&format!(",{},0", i + 1));
        }
        assert_eq!(
            parse_panel_line(&line).unwrap(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
        );
    }

    #[test]
    fn test_panel_prefix_required() {
        assert_eq!(
            parse_panel_line("50,50,50"),
            Err(TelemetryError::NotPanel)
        );
    }

    #[tokio::test]
    async fn test_line_stream() {
        let data: &[u8] = b"1,2,3\nCTRLPANEL,5,0\n\nlast";
        let lines: Vec<String> = line_stream(data)
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["1,2,3", "CTRLPANEL,5,0", "", "last"]);
    }
}
