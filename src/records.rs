//! Table layouts of the persisted entities.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;

use super::delta::IndexDate;
use super::manifest::NoHoldings;
use super::parsing::index::FilingRecord;
use super::parsing::thirteenf::{FilerInfo, FilingMetadata, HoldingLine};
use super::store::{Record, column_type};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text)
}

fn date(d: NaiveDate) -> Value {
    Value::Text(d.format("%Y-%m-%d").to_string())
}

fn datetime(d: Option<NaiveDateTime>) -> Value {
    d.map_or(Value::Null, |d| {
        Value::Text(d.format("%Y-%m-%d %H:%M:%S").to_string())
    })
}

impl Record for IndexDate {
    const COLUMNS: &'static [&'static str] = &["Date", "Link"];

    fn values(&self) -> Vec<Value> {
        vec![date(self.date), text(&self.link)]
    }
}

impl Record for FilingRecord {
    const COLUMNS: &'static [&'static str] = &[
        "CIK_int",
        "comp_name",
        "form_type",
        "date_filed",
        "file_name",
        "link",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.cik as i64),
            text(&self.company_name),
            text(&self.form_type),
            date(self.date_filed),
            text(&self.file_name),
            text(&self.link),
        ]
    }

    // The master index only carries the filing day.
    fn sql_type(column: &str) -> Option<&'static str> {
        match column {
            "date_filed" => Some("DATE"),
            other => column_type(other),
        }
    }
}

impl Record for NoHoldings {
    const COLUMNS: &'static [&'static str] = &["link", "manifest", "date_filed"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.link),
            text(&self.manifest),
            datetime(self.last_modified),
        ]
    }
}

impl Record for FilerInfo {
    const COLUMNS: &'static [&'static str] = &[
        "CIK",
        "company",
        "street1",
        "street2",
        "city",
        "stateorcountry",
        "zipcode",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.cik),
            text(&self.company),
            text(&self.street1),
            opt_text(self.street2.as_deref()),
            text(&self.city),
            text(&self.state_or_country),
            text(&self.zip_code),
        ]
    }
}

impl Record for FilingMetadata {
    const COLUMNS: &'static [&'static str] = &[
        "CIK",
        "form",
        "type",
        "date_filed",
        "file_no",
        "instruct5",
        "instrc5info",
        "period",
        "quarter",
        "amend",
        "oth_mgr",
        "signature",
        "entry_total",
        "value_total",
        "incld_mgrs",
        "confd_flag",
        "incl_mgr",
        "file_id",
    ];

    fn values(&self) -> Vec<Value> {
        let summary = self.summary.as_ref();
        vec![
            text(&self.cik),
            text(&self.form),
            text(&self.report_type),
            datetime(self.date_filed),
            opt_text(self.file_no.as_deref()),
            text(&self.instruct5),
            opt_text(self.instrc5info.as_deref()),
            date(self.period),
            date(self.quarter),
            opt_text(self.amend.as_deref()),
            opt_text(self.oth_mgr.as_deref()),
            text(&self.signature),
            summary.map_or(Value::Null, |s| Value::Integer(s.entry_total)),
            summary.map_or(Value::Null, |s| Value::Real(s.value_total)),
            summary.map_or(Value::Null, |s| Value::Integer(s.incld_mgrs)),
            opt_text(summary.and_then(|s| s.confd_flag.as_deref())),
            opt_text(summary.and_then(|s| s.incl_mgr.as_deref())),
            text(&self.file_id),
        ]
    }
}

impl Record for HoldingLine {
    const COLUMNS: &'static [&'static str] = &[
        "CIK",
        "form",
        "period",
        "file_no",
        "date_filed",
        "name",
        "CUSIP",
        "class",
        "mkt_val",
        "shares",
        "type",
        "put_call",
        "discretion",
        "va_sole",
        "va_shared",
        "va_none",
        "othmgrdisc",
        "hold_id",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.cik),
            text(&self.form),
            date(self.period),
            text(&self.file_no),
            datetime(self.date_filed),
            text(&self.name),
            text(&self.cusip),
            text(&self.class),
            Value::Real(self.mkt_val),
            Value::Real(self.shares),
            text(&self.share_type),
            opt_text(self.put_call.as_deref()),
            text(&self.discretion),
            Value::Real(self.va_sole),
            Value::Real(self.va_shared),
            Value::Real(self.va_none),
            opt_text(self.othmgrdisc.as_deref()),
            text(&self.hold_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn filing_record() -> FilingRecord {
        FilingRecord {
            cik: 1000097,
            company_name: "KINGDON CAPITAL MANAGEMENT, L.L.C.".to_string(),
            form_type: "13F-HR".to_string(),
            date_filed: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            file_name: "edgar/data/1000097/0001000097-20-000001.txt".to_string(),
            link: "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/index.json"
                .to_string(),
        }
    }

    #[test]
    fn test_forms_table_declares_filing_day_as_date() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert("forms", &[filing_record()], "link").unwrap();

        let ddl: String = store
            .connection()
            .query_row("SELECT sql FROM sqlite_master WHERE name = 'forms'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(ddl.contains("\"date_filed\" DATE"));
        assert!(!ddl.contains("DATETIME"));
        assert!(ddl.contains("\"CIK_int\" INTEGER"));

        let (cik, filed): (i64, NaiveDate) = store
            .connection()
            .query_row("SELECT CIK_int, date_filed FROM forms", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(cik, 1000097);
        assert_eq!(filed, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
    }

    #[test]
    fn test_column_lists_match_values() {
        let record = filing_record();
        assert_eq!(record.values().len(), FilingRecord::COLUMNS.len());

        let no_holdings = NoHoldings {
            link: "https://www.sec.gov/Archives/edgar/data/1/1".to_string(),
            manifest: "https://www.sec.gov/Archives/edgar/data/1/1/index.json".to_string(),
            last_modified: None,
        };
        assert_eq!(no_holdings.values().len(), NoHoldings::COLUMNS.len());
        assert_eq!(no_holdings.values()[2], Value::Null);
    }
}
