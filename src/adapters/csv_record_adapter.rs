//! Flat CSV export of book history.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::error::LedgerError;
use crate::domain::event::{Record, RecordEvent};
use crate::ports::record_port::RecordSink;

/// One exported line. Fields that do not apply to the record type are empty.
#[derive(Debug, Serialize)]
pub(crate) struct RecordRow<'a> {
    pub strategy_name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub index: Option<u64>,
    pub instrument: &'a str,
    pub tradingday: String,
    pub datetime: String,
    pub signal: Option<String>,
    pub action: Option<String>,
    pub direction: Option<String>,
    pub quantity: Option<u64>,
    pub order_kind: Option<String>,
    pub price: Option<f64>,
}

impl<'a> RecordRow<'a> {
    pub(crate) fn from_record(record: &'a Record) -> Self {
        let event = &record.event;
        let mut row = RecordRow {
            strategy_name: &record.strategy_name,
            kind: event.type_name(),
            index: None,
            instrument: event.instrument(),
            tradingday: event.tradingday().format("%Y-%m-%d").to_string(),
            datetime: event.datetime().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            signal: None,
            action: None,
            direction: None,
            quantity: None,
            order_kind: None,
            price: None,
        };
        match event {
            RecordEvent::Signal(s) => {
                row.signal = Some(s.signal_kind.to_string());
            }
            RecordEvent::Order(o) => {
                row.index = Some(o.index);
                row.action = Some(o.action.to_string());
                row.direction = Some(o.direction.to_string());
                row.quantity = Some(o.quantity);
                row.order_kind = Some(o.order_kind.to_string());
                row.price = o.price;
            }
            RecordEvent::Fill(f) => {
                row.index = Some(f.index);
                row.action = Some(f.action.to_string());
                row.direction = Some(f.direction.to_string());
                row.quantity = Some(f.quantity);
                row.price = f.price;
            }
        }
        row
    }
}

pub struct CsvRecordSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvRecordSink<File> {
    pub fn create(path: &Path) -> Result<Self, LedgerError> {
        let writer = csv::Writer::from_path(path).map_err(|e| LedgerError::Export {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        Ok(Self { writer })
    }
}

impl<W: Write> CsvRecordSink<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W, LedgerError> {
        self.writer.into_inner().map_err(|e| LedgerError::Export {
            reason: e.to_string(),
        })
    }
}

impl<W: Write> RecordSink for CsvRecordSink<W> {
    fn write_records(&mut self, records: &[Record]) -> Result<usize, LedgerError> {
        for record in records {
            self.writer
                .serialize(RecordRow::from_record(record))
                .map_err(|e| LedgerError::Export {
                    reason: e.to_string(),
                })?;
        }
        self.writer.flush()?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{
        Action, Direction, FillEvent, OrderEvent, OrderKind, SignalEvent, SignalKind,
    };
    use chrono::NaiveDate;

    fn records() -> Vec<Record> {
        let day = NaiveDate::from_ymd_opt(2017, 9, 1).unwrap();
        let at = day.and_hms_opt(14, 59, 0).unwrap();
        let order = OrderEvent {
            index: 0,
            instrument: "rb1801".into(),
            action: Action::Open,
            direction: Direction::Buy,
            quantity: 1,
            order_kind: OrderKind::Limit,
            price: Some(3620.0),
            tradingday: day,
            datetime: at,
        };
        let fill = FillEvent::from_order(&order, day, at, None);
        vec![
            Record {
                strategy_name: "alpha".into(),
                event: RecordEvent::Signal(SignalEvent {
                    strategy_name: "alpha".into(),
                    instrument: "rb1801".into(),
                    signal_kind: SignalKind::Long,
                    tradingday: day,
                    datetime: at,
                }),
            },
            Record {
                strategy_name: "alpha".into(),
                event: RecordEvent::Order(order),
            },
            Record {
                strategy_name: "alpha".into(),
                event: RecordEvent::Fill(fill),
            },
        ]
    }

    #[test]
    fn writes_header_and_one_line_per_record() {
        let mut sink = CsvRecordSink::from_writer(Vec::new());
        let written = sink.write_records(&records()).unwrap();
        assert_eq!(written, 3);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "strategy_name,type,index,instrument,tradingday,datetime,signal,action,direction,quantity,order_kind,price"
        );
        assert_eq!(
            lines[1],
            "alpha,signal,,rb1801,2017-09-01,2017-09-01 14:59:00,LONG,,,,,"
        );
        assert_eq!(
            lines[2],
            "alpha,order,0,rb1801,2017-09-01,2017-09-01 14:59:00,,OPEN,BUY,1,LIMIT,3620.0"
        );
        assert!(lines[3].starts_with("alpha,fill,0,rb1801"));
    }

    #[test]
    fn empty_export_writes_nothing() {
        let mut sink = CsvRecordSink::from_writer(Vec::new());
        assert_eq!(sink.write_records(&[]).unwrap(), 0);
        assert!(sink.into_inner().unwrap().is_empty());
    }
}
