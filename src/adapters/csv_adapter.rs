//! CSV readers for bar series and replay event logs.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::adapters::replay_engine::ReplayEvent;
use crate::domain::bar::Bar;
use crate::domain::error::LedgerError;
use crate::domain::event::{Action, Direction, FillEvent, SignalEvent, SignalKind};

/// Reads `<base_path>/<instrument>.csv` bar files.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    /// Bars for `instrument`, sorted by trading day.
    ///
    /// Columns are looked up by header name: `tradingday`, `open`, `high`,
    /// `low`, `close`, `volume`, and an optional `open_interest`.
    pub fn load_bars(&self, instrument: &str) -> Result<Vec<Bar>, LedgerError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| LedgerError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| LedgerError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let required = |name: &str| {
            column(name).ok_or_else(|| LedgerError::Data {
                reason: format!("missing {} column in {}", name, path.display()),
            })
        };
        let day_col = required("tradingday")?;
        let open_col = required("open")?;
        let high_col = required("high")?;
        let low_col = required("low")?;
        let close_col = required("close")?;
        let volume_col = required("volume")?;
        let oi_col = column("open_interest");

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| LedgerError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let field = |col: usize, name: &str| {
                record.get(col).map(str::trim).ok_or_else(|| LedgerError::Data {
                    reason: format!("row {}: missing {} value", row + 1, name),
                })
            };
            let number = |col: usize, name: &str| -> Result<f64, LedgerError> {
                field(col, name)?.parse().map_err(|e| LedgerError::Data {
                    reason: format!("row {}: invalid {} value: {}", row + 1, name, e),
                })
            };

            let tradingday = parse_tradingday(field(day_col, "tradingday")?)?;
            let volume: i64 = field(volume_col, "volume")?.parse().map_err(|e| LedgerError::Data {
                reason: format!("row {}: invalid volume value: {}", row + 1, e),
            })?;
            let open_interest = match oi_col.and_then(|c| record.get(c)).map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(raw.parse::<i64>().map_err(|e| LedgerError::Data {
                    reason: format!("row {}: invalid open_interest value: {}", row + 1, e),
                })?),
            };

            bars.push(Bar {
                instrument: instrument.to_string(),
                tradingday,
                open: number(open_col, "open")?,
                high: number(high_col, "high")?,
                low: number(low_col, "low")?,
                close: number(close_col, "close")?,
                volume,
                open_interest,
            });
        }

        bars.sort_by_key(|b| b.tradingday);
        Ok(bars)
    }

    /// Instruments with a bar file under the base path, sorted.
    pub fn list_instruments(&self) -> Result<Vec<String>, LedgerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| LedgerError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LedgerError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".csv") {
                instruments.push(stem.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}

/// Trading days are written either as `2017-09-01` or as `20170901`.
pub fn parse_tradingday(raw: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(|_| LedgerError::Data {
            reason: format!("invalid tradingday '{}'", raw),
        })
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, LedgerError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| LedgerError::Data {
            reason: format!("invalid datetime '{}'", raw),
        })
}

#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(rename = "type")]
    kind: String,
    tradingday: String,
    datetime: String,
    #[serde(default)]
    strategy: Option<String>,
    instrument: String,
    #[serde(default)]
    signal: Option<String>,
    #[serde(default)]
    index: Option<u64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    quantity: Option<u64>,
    #[serde(default)]
    price: Option<f64>,
}

fn required<'a>(value: &'a Option<String>, line: usize, name: &str) -> Result<&'a str, LedgerError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LedgerError::Data {
            reason: format!("line {}: {} is required", line, name),
        })
}

impl EventRow {
    fn into_event(self, line: usize) -> Result<ReplayEvent, LedgerError> {
        let tradingday = parse_tradingday(self.tradingday.trim())?;
        let datetime = parse_datetime(self.datetime.trim())?;
        match self.kind.trim().to_ascii_lowercase().as_str() {
            "signal" => Ok(ReplayEvent::Signal(SignalEvent {
                strategy_name: required(&self.strategy, line, "strategy")?.to_string(),
                instrument: self.instrument.trim().to_string(),
                signal_kind: required(&self.signal, line, "signal")?.parse::<SignalKind>()?,
                tradingday,
                datetime,
            })),
            "fill" => Ok(ReplayEvent::Fill(FillEvent {
                index: self.index.ok_or_else(|| LedgerError::Data {
                    reason: format!("line {}: index is required", line),
                })?,
                instrument: self.instrument.trim().to_string(),
                action: required(&self.action, line, "action")?.parse::<Action>()?,
                direction: required(&self.direction, line, "direction")?.parse::<Direction>()?,
                quantity: self.quantity.ok_or_else(|| LedgerError::Data {
                    reason: format!("line {}: quantity is required", line),
                })?,
                price: self.price,
                tradingday,
                datetime,
            })),
            other => Err(LedgerError::invalid(format!(
                "line {}: unknown event type '{}'",
                line, other
            ))),
        }
    }
}

/// Parse an event log of `signal` and `fill` rows, preserving row order.
pub fn parse_event_log<R: Read>(reader: R) -> Result<Vec<ReplayEvent>, LedgerError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut events = Vec::new();
    for (i, row) in rdr.deserialize::<EventRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|e| LedgerError::Data {
            reason: format!("line {}: {}", line, e),
        })?;
        events.push(row.into_event(line)?);
    }
    Ok(events)
}

pub fn read_event_log(path: &Path) -> Result<Vec<ReplayEvent>, LedgerError> {
    let file = fs::File::open(path).map_err(|e| LedgerError::Data {
        reason: format!("failed to open {}: {}", path.display(), e),
    })?;
    parse_event_log(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_bars() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let content = "tradingday,open,high,low,close,volume,open_interest\n\
            20170905,3610.0,3660.0,3590.0,3640.0,130000,2410000\n\
            20170901,3600.0,3650.0,3580.0,3620.0,120000,\n";
        fs::write(path.join("rb1801.csv"), content).unwrap();
        fs::write(
            path.join("hc1801.csv"),
            "tradingday,close,open,high,low,volume\n2017-09-01,3400,3390,3420,3380,5000\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn load_bars_sorted_with_optional_open_interest() {
        let (_dir, path) = setup_bars();
        let bars = CsvAdapter::new(path).load_bars("rb1801").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].tradingday, NaiveDate::from_ymd_opt(2017, 9, 1).unwrap());
        assert_eq!(bars[0].close, 3620.0);
        assert_eq!(bars[0].open_interest, None);
        assert_eq!(bars[1].open_interest, Some(2_410_000));
        assert_eq!(bars[1].instrument, "rb1801");
    }

    #[test]
    fn load_bars_finds_columns_by_name() {
        let (_dir, path) = setup_bars();
        let bars = CsvAdapter::new(path).load_bars("hc1801").unwrap();
        assert_eq!(bars[0].close, 3400.0);
        assert_eq!(bars[0].open, 3390.0);
        assert_eq!(bars[0].volume, 5000);
    }

    #[test]
    fn load_bars_missing_file_is_data_error() {
        let (_dir, path) = setup_bars();
        let err = CsvAdapter::new(path).load_bars("i1801").unwrap_err();
        assert!(matches!(err, LedgerError::Data { .. }));
    }

    #[test]
    fn load_bars_missing_column_is_data_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.csv"), "tradingday,open,high,low,volume\n").unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .load_bars("x")
            .unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn list_instruments_only_csv() {
        let (_dir, path) = setup_bars();
        let instruments = CsvAdapter::new(path).list_instruments().unwrap();
        assert_eq!(instruments, vec!["hc1801", "rb1801"]);
    }

    #[test]
    fn parse_tradingday_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 9, 1).unwrap();
        assert_eq!(parse_tradingday("2017-09-01").unwrap(), expected);
        assert_eq!(parse_tradingday("20170901").unwrap(), expected);
        assert!(parse_tradingday("01/09/2017").is_err());
    }

    const LOG: &str = "\
type,tradingday,datetime,strategy,instrument,signal,index,action,direction,quantity,price
signal,20170901,2017-09-01 09:00:00,alpha,rb1801,long,,,,,
fill,20170901,2017-09-01 09:00:01,,rb1801,,0,open,buy,1,3620.5
signal,20170904,2017-09-04 14:59:00,beta,hc1801,SHORT,,,,,
";

    #[test]
    fn parse_event_log_keeps_order() {
        let events = parse_event_log(LOG.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        match &events[0] {
            ReplayEvent::Signal(s) => {
                assert_eq!(s.strategy_name, "alpha");
                assert_eq!(s.signal_kind, SignalKind::Long);
            }
            other => panic!("expected signal, got {other:?}"),
        }
        match &events[1] {
            ReplayEvent::Fill(f) => {
                assert_eq!(f.index, 0);
                assert_eq!(f.action, Action::Open);
                assert_eq!(f.direction, Direction::Buy);
                assert_eq!(f.price, Some(3620.5));
            }
            other => panic!("expected fill, got {other:?}"),
        }
        assert!(matches!(&events[2], ReplayEvent::Signal(s) if s.signal_kind == SignalKind::Short));
    }

    #[test]
    fn unknown_signal_is_invalid_event() {
        let log = "type,tradingday,datetime,strategy,instrument,signal\n\
            signal,20170901,2017-09-01 09:00:00,alpha,rb1801,flat\n";
        let err = parse_event_log(log.as_bytes()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidEvent { .. }));
    }

    #[test]
    fn fill_without_index_is_rejected() {
        let log = "type,tradingday,datetime,instrument,action,direction,quantity\n\
            fill,20170901,2017-09-01 09:00:00,rb1801,open,buy,1\n";
        let err = parse_event_log(log.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2: index is required"));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let log = "type,tradingday,datetime,instrument\n\
            cancel,20170901,2017-09-01 09:00:00,rb1801\n";
        assert!(parse_event_log(log.as_bytes()).is_err());
    }
}
