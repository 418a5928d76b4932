//! Extractors for Form 13F-HR documents.
//!
//! A 13F filing is split across two XML files. The *primary document* (`primary_doc.xml`)
//! carries the filer identity, the cover page, the signature block and an optional summary
//! page. The *information table* (file name varies) lists one `infoTable` element per
//! reported position.
//!
//! Each extractor turns a parsed [`XmlDocument`] into one typed record (or one record per
//! position). Required fields that cannot be located are a [`EdgarError::Parse`] failure for
//! the whole filing; optional fields are `Option`s and are only read when present.

use super::utils::{composite_key, parse_f64, parse_form_date, parse_i64};
use super::xml::{XmlDocument, XmlElement, tags};
use crate::{EdgarError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Identity and business address of a 13F filer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilerInfo {
    pub cik: String,
    pub company: String,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state_or_country: String,
    pub zip_code: String,
}

impl FilerInfo {
    /// Reads the filer CIK and the first `filingManager` block with its address.
    pub fn extract(primary: &XmlDocument) -> Result<Self> {
        let cik = primary.required_text(tags::CIK)?;
        let manager = primary.require(tags::FILING_MANAGER)?;
        let company = manager.required_text(tags::NAME)?;
        let address = manager.require(tags::ADDRESS)?;

        Ok(Self {
            cik,
            company,
            street1: address.required_text(tags::STREET1)?,
            street2: address.optional_text(tags::STREET2),
            city: address.required_text(tags::CITY)?,
            state_or_country: address.required_text(tags::STATE_OR_COUNTRY)?,
            zip_code: address.required_text(tags::ZIP_CODE)?,
        })
    }
}

/// Signature block of the primary document, persisted as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub name: String,
    pub title: String,
    pub phone: String,
    pub city: String,
    pub stateorcountry: String,
    pub sig_date: String,
}

impl Signature {
    fn extract(block: &XmlElement) -> Result<Self> {
        Ok(Self {
            name: block.required_text(tags::NAME)?,
            title: block.required_text(tags::TITLE)?,
            phone: block.required_text(tags::PHONE)?,
            city: block.required_text(tags::CITY)?,
            stateorcountry: block.required_text(tags::STATE_OR_COUNTRY)?,
            sig_date: block.required_text(tags::SIGNATURE_DATE)?,
        })
    }
}

/// A manager listed on the cover page as reporting part of the filer's holdings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherManager {
    #[serde(rename = "CIK", skip_serializing_if = "Option::is_none")]
    pub cik: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_no: Option<String>,
    pub name: String,
}

impl OtherManager {
    fn extract(block: &XmlElement) -> Result<Self> {
        Ok(Self {
            cik: block.optional_text(tags::CIK),
            file_no: block.optional_text(tags::FILE_NUMBER),
            name: block.required_text(tags::NAME)?,
        })
    }
}

/// A manager included in this report, listed on the summary page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludedManager {
    pub seq_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cik: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_no: Option<String>,
}

impl IncludedManager {
    fn extract(block: &XmlElement) -> Result<Self> {
        Ok(Self {
            seq_no: block.required_text(tags::SEQUENCE_NUMBER)?,
            cik: block.optional_text(tags::CIK),
            name: block.required_text(tags::NAME)?,
            file_no: block.optional_text(tags::FILE_NUMBER),
        })
    }
}

/// Totals reported on the optional summary page.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTotals {
    pub entry_total: i64,
    pub value_total: f64,
    pub incld_mgrs: i64,
    pub confd_flag: Option<String>,
    /// Included managers as space-separated JSON objects; only when `incld_mgrs != 0`.
    pub incl_mgr: Option<String>,
}

impl SummaryTotals {
    fn extract(page: &XmlElement) -> Result<Self> {
        let entry_total = parse_i64("tableEntryTotal", &page.required_text(tags::ENTRY_TOTAL)?)?;
        let value_total = parse_f64("tableValueTotal", &page.required_text(tags::VALUE_TOTAL)?)?;
        let incld_mgrs = parse_i64(
            "otherIncludedManagersCount",
            &page.required_text(tags::INCLUDED_MANAGERS)?,
        )?;

        let incl_mgr = if incld_mgrs != 0 {
            let managers = page
                .find_all(tags::OTHER_MANAGER2)
                .into_iter()
                .map(IncludedManager::extract)
                .collect::<Result<Vec<_>>>()?;
            Some(join_json(&managers)?)
        } else {
            None
        };

        Ok(Self {
            entry_total,
            value_total,
            incld_mgrs,
            confd_flag: page.optional_text(tags::CONFIDENTIAL_OMITTED),
            incl_mgr,
        })
    }
}

/// One 13F filing: cover page, signature and summary.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingMetadata {
    pub cik: String,
    pub form: String,
    pub report_type: String,
    /// Last-modified time of the primary document in the filing manifest.
    pub date_filed: Option<NaiveDateTime>,
    pub file_no: Option<String>,
    pub instruct5: String,
    pub instrc5info: Option<String>,
    pub period: NaiveDate,
    pub quarter: NaiveDate,
    pub amend: Option<String>,
    /// Other reporting managers as space-separated JSON objects.
    pub oth_mgr: Option<String>,
    /// Signature block as a JSON object.
    pub signature: String,
    pub summary: Option<SummaryTotals>,
    pub file_id: String,
}

impl FilingMetadata {
    pub fn extract(primary: &XmlDocument, date_filed: Option<NaiveDateTime>) -> Result<Self> {
        let cik = primary.required_text(tags::CIK)?;
        let form = primary.required_text(tags::SUBMISSION_TYPE)?;
        let report_type = primary.required_text(tags::REPORT_TYPE)?;
        let file_no = primary.optional_text(tags::FILE_NUMBER);

        let instruct5 = primary.required_text(tags::INSTRUCTION5)?;
        let instrc5info = if instruct5.eq_ignore_ascii_case("Y") {
            Some(primary.required_text(tags::ADDITIONAL_INFO)?)
        } else {
            None
        };

        let period = parse_form_date(
            "periodOfReport",
            &primary.required_text(tags::PERIOD_OF_REPORT)?,
        )?;
        let quarter = parse_form_date(
            "reportCalendarOrQuarter",
            &primary.required_text(tags::CALENDAR_QUARTER)?,
        )?;

        let oth_mgr = match primary.find(tags::OTHER_MANAGERS_INFO) {
            Some(info) => {
                let managers = info
                    .find_all(tags::OTHER_MANAGER)
                    .into_iter()
                    .map(OtherManager::extract)
                    .collect::<Result<Vec<_>>>()?;
                Some(join_json(&managers)?)
            }
            None => None,
        };

        let signature = Signature::extract(primary.require(tags::SIGNATURE_BLOCK)?)?;
        let signature = serde_json::to_string(&signature)
            .map_err(|e| EdgarError::parse(format!("signature: {}", e)))?;

        let summary = primary
            .find(tags::SUMMARY_PAGE)
            .map(SummaryTotals::extract)
            .transpose()?;

        let file_id = filing_key(&cik, file_no.as_deref(), period);

        Ok(Self {
            cik,
            form,
            report_type,
            date_filed,
            file_no,
            instruct5,
            instrc5info,
            period,
            quarter,
            amend: primary.optional_text(tags::IS_AMENDMENT),
            oth_mgr,
            signature,
            summary,
            file_id,
        })
    }
}

/// Filing-level fields repeated on every holding row.
#[derive(Debug, Clone, PartialEq)]
struct HoldingFiling {
    cik: String,
    form: String,
    period: NaiveDate,
    file_no: String,
    date_filed: Option<NaiveDateTime>,
}

impl HoldingFiling {
    fn extract(primary: &XmlDocument, date_filed: Option<NaiveDateTime>) -> Result<Self> {
        Ok(Self {
            cik: primary.required_text(tags::CIK)?,
            form: primary.required_text(tags::SUBMISSION_TYPE)?,
            period: parse_form_date(
                "periodOfReport",
                &primary.required_text(tags::PERIOD_OF_REPORT)?,
            )?,
            file_no: primary.required_text(tags::FILE_NUMBER)?,
            date_filed,
        })
    }
}

/// One reported position of a 13F information table, joined with its filing.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingLine {
    pub cik: String,
    pub form: String,
    pub period: NaiveDate,
    pub file_no: String,
    /// Last-modified time of the information table in the filing manifest.
    pub date_filed: Option<NaiveDateTime>,
    pub name: String,
    pub cusip: String,
    pub class: String,
    pub mkt_val: f64,
    pub shares: f64,
    pub share_type: String,
    pub put_call: Option<String>,
    pub discretion: String,
    pub va_sole: f64,
    pub va_shared: f64,
    pub va_none: f64,
    pub othmgrdisc: Option<String>,
    pub hold_id: String,
}

impl HoldingLine {
    /// Reads every `infoTable` entry of `holdings` and repeats the filing fields of `primary`
    /// on each row. An information table without entries yields no rows.
    pub fn extract_all(
        holdings: &XmlDocument,
        primary: &XmlDocument,
        date_filed: Option<NaiveDateTime>,
    ) -> Result<Vec<Self>> {
        let filing = HoldingFiling::extract(primary, date_filed)?;
        holdings
            .find_all(tags::INFO_TABLE)
            .into_iter()
            .map(|entry| Self::stitch(&filing, entry))
            .collect()
    }

    fn stitch(filing: &HoldingFiling, entry: &XmlElement) -> Result<Self> {
        let cusip = entry.required_text(tags::CUSIP)?;
        let voting = entry.require(tags::VOTING_AUTHORITY)?;

        let hold_id = format!(
            "{}:{}",
            filing_key(&filing.cik, Some(filing.file_no.as_str()), filing.period),
            cusip
        )
        .replace('-', "");

        Ok(Self {
            cik: filing.cik.clone(),
            form: filing.form.clone(),
            period: filing.period,
            file_no: filing.file_no.clone(),
            date_filed: filing.date_filed,
            name: entry.required_text(tags::ISSUER)?,
            class: entry.required_text(tags::TITLE_OF_CLASS)?,
            mkt_val: parse_f64("value", &entry.required_text(tags::VALUE)?)?,
            shares: parse_f64("sshPrnamt", &entry.required_text(tags::SHARES)?)?,
            share_type: entry.required_text(tags::SHARES_TYPE)?,
            put_call: entry.optional_text(tags::PUT_CALL),
            discretion: entry.required_text(tags::DISCRETION)?,
            va_sole: parse_f64("Sole", &voting.required_text(tags::SOLE)?)?,
            va_shared: parse_f64("Shared", &voting.required_text(tags::SHARED)?)?,
            va_none: parse_f64("None", &voting.required_text(tags::NONE)?)?,
            othmgrdisc: entry.optional_text(tags::OTHER_MANAGER),
            cusip,
            hold_id,
        })
    }
}

/// `CIK + file_no + period`, hyphens stripped. A missing file number contributes nothing.
fn filing_key(cik: &str, file_no: Option<&str>, period: NaiveDate) -> String {
    let period = period.format("%Y-%m-%d").to_string();
    composite_key(&[cik, file_no.unwrap_or_default(), &period])
}

fn join_json<T: Serialize>(items: &[T]) -> Result<String> {
    let encoded = items
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(encoded.join(" "))
}
