use super::utils::parse_index_date;
use crate::{EdgarError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marker that opens the column header of a master index file.
const HEADER_MARKER: &str = "CIK";

/// Columns of a master index row, in file order.
const FIELD_COUNT: usize = 5;

/// One row of a daily master index: a single filing submitted that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub cik: u64,
    pub company_name: String,
    pub form_type: String,
    pub date_filed: NaiveDate,
    /// Archive-relative path of the full submission text file.
    pub file_name: String,
    /// JSON manifest of the filing folder, derived from `file_name`.
    pub link: String,
}

/// Parser for the pipe-delimited master index files.
///
/// Everything before the first `CIK` token is free-form preamble and is discarded. The
/// header row and the dashed rule under it are skipped; every following non-blank line must
/// hold exactly five `|`-separated fields:
///
/// ```text
/// CIK|Company Name|Form Type|Date Filed|File Name
/// --------------------------------------------------------------------------------
/// 1000045|NICHOLAS FINANCIAL INC|10-Q|20230214|edgar/data/1000045/0000950170-23-002704.txt
/// ```
///
/// # Examples
///
/// ```
/// use edgar13f::parsing::index::MasterIndexParser;
///
/// let parser = MasterIndexParser::new("https://www.sec.gov/Archives");
/// let rows = parser
///     .parse("CIK|Company Name|Form Type|Date Filed|File Name\n---\n1|A|13F-HR|20200102|edgar/data/1/0000000001-20-000001.txt\n")
///     .unwrap();
/// assert_eq!(rows[0].link, "https://www.sec.gov/Archives/edgar/data/1/000000000120000001/index.json");
/// ```
pub struct MasterIndexParser {
    archives_prefix: String,
}

impl MasterIndexParser {
    pub fn new(archives_prefix: &str) -> Self {
        Self {
            archives_prefix: archives_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Derives the filing manifest URL: hyphens removed, `.txt` replaced by `/index.json`.
    pub fn manifest_link(&self, file_name: &str) -> String {
        let compact = file_name.trim().replace('-', "");
        let folder = compact.strip_suffix(".txt").unwrap_or(&compact);
        format!("{}/{}/index.json", self.archives_prefix, folder)
    }

    /// Parses a whole master index document.
    ///
    /// # Errors
    ///
    /// `Parse` if the `CIK` marker is missing (empty or truncated file), or if a row does not
    /// have five fields, a numeric CIK and a valid date.
    pub fn parse(&self, content: &str) -> Result<Vec<FilingRecord>> {
        let start = content
            .find(HEADER_MARKER)
            .ok_or_else(|| EdgarError::parse("master index has no CIK header"))?;

        let mut lines = content[start..].lines().enumerate().skip(1).peekable();
        while lines
            .peek()
            .is_some_and(|(_, line)| line.trim_start().starts_with("---"))
        {
            lines.next();
        }

        let mut records = Vec::new();
        for (n, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            records.push(self.parse_line(line).map_err(|e| {
                EdgarError::parse(format!("line {} after header: {}", n, e))
            })?);
        }
        Ok(records)
    }

    fn parse_line(&self, line: &str) -> Result<FilingRecord> {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return Err(EdgarError::parse(format!(
                "expected {} fields, found {}: {:?}",
                FIELD_COUNT,
                fields.len(),
                line
            )));
        }

        let cik = fields[0]
            .parse::<u64>()
            .map_err(|_| EdgarError::parse(format!("invalid CIK: {}", fields[0])))?;
        let date_filed = parse_index_date(fields[3])?;

        Ok(FilingRecord {
            cik,
            company_name: fields[1].to_string(),
            form_type: fields[2].to_string(),
            date_filed,
            file_name: fields[4].to_string(),
            link: self.manifest_link(fields[4]),
        })
    }
}
