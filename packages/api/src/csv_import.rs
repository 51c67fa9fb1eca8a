//! # CSV prospect import
//!
//! Files are checked locally by [`CsvFile::preflight`] before anything is
//! uploaded, then sent to the backend as a multipart `file` field, either for a
//! dry run ([`ApiClient::validate_csv`]) or for the real import
//! ([`ApiClient::upload_csv`]).
//!
//! ## Header mapping
//!
//! Column names are matched case-insensitively after trimming.
//!
//! | Field | Accepted headers |
//! |-------|------------------|
//! | `firstName` | firstname, first name, first_name |
//! | `lastName` | lastname, last name, last_name |
//! | `email` | email, email address, email_address, emailaddress |
//! | `company` | company, company name, company_name, companyname, organization |
//! | `position` | position, job title, job_title, jobtitle, title, role |
//! | `location` | location, city, state, country, address |
//! | `linkedin` | linkedin, linkedin url, linkedin_url, linkedinurl |
//! | `notes` | notes, comments, description |
//! | `tags` | tags |
//!
//! The first five are required.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, ROUTES};
use crate::error::ApiError;
use crate::samples::RemoteProspect;

const REQUIRED: &[(&str, &[&str])] = &[
    ("firstName", &["firstname", "first name", "first_name"]),
    ("lastName", &["lastname", "last name", "last_name"]),
    ("email", &["email", "email address", "email_address", "emailaddress"]),
    (
        "company",
        &["company", "company name", "company_name", "companyname", "organization"],
    ),
    (
        "position",
        &["position", "job title", "job_title", "jobtitle", "title", "role"],
    ),
];

const OPTIONAL: &[(&str, &[&str])] = &[
    ("location", &["location", "city", "state", "country", "address"]),
    ("linkedin", &["linkedin", "linkedin url", "linkedin_url", "linkedinurl"]),
    ("notes", &["notes", "comments", "description"]),
    ("tags", &["tags"]),
];

/// A CSV file picked for import.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// Header positions of the prospect fields found in a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    columns: BTreeMap<&'static str, usize>,
}

impl ColumnMap {
    /// Zero-based column index of a field, e.g. `column("firstName")`.
    pub fn column(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.keys().copied()
    }
}

impl CsvFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            contents,
        })
    }

    /// Local checks run before upload: extension, encoding and required headers.
    pub fn preflight(&self) -> Result<ColumnMap, ApiError> {
        if !self.file_name.to_lowercase().ends_with(".csv") {
            return Err(ApiError::InvalidFile(format!(
                "{} is not a .csv file",
                self.file_name
            )));
        }
        let text = std::str::from_utf8(&self.contents)
            .map_err(|_| ApiError::InvalidFile("file is not valid UTF-8".into()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let Some(header) = header_record(text) else {
            return Err(ApiError::InvalidFile("file is empty".into()));
        };

        let headers: Vec<String> = parse_csv_line(header)
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let mut map = ColumnMap::default();
        let mut missing = Vec::new();
        for (field, aliases) in REQUIRED {
            match find_column(&headers, aliases) {
                Some(index) => {
                    map.columns.insert(*field, index);
                }
                None => missing.push(*field),
            }
        }
        if !missing.is_empty() {
            return Err(ApiError::InvalidFile(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }
        for (field, aliases) in OPTIONAL {
            if let Some(index) = find_column(&headers, aliases) {
                map.columns.insert(*field, index);
            }
        }
        Ok(map)
    }

    fn form(&self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.contents.clone())
            .file_name(self.file_name.clone())
            .mime_str("text/csv")?;
        Ok(Form::new().part("file", part))
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// The first non-blank record. Newlines inside quoted cells do not end it.
fn header_record(text: &str) -> Option<&str> {
    let mut in_quotes = false;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                start.get_or_insert(i);
            }
            '\n' if !in_quotes => {
                if let Some(start) = start {
                    return Some(&text[start..i]);
                }
            }
            c if start.is_none() && !c.is_whitespace() => start = Some(i),
            _ => {}
        }
    }
    start.map(|start| &text[start..])
}

/// Split one CSV record. Quoted fields may contain commas and `""` escapes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes => {}
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// A row the backend refused, numbered as in the file (header is row 1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
    #[serde(default)]
    pub data: Value,
}

/// Dry-run result of [`ApiClient::validate_csv`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvValidation {
    pub success: bool,
    pub total: usize,
    pub importable: usize,
    #[serde(default)]
    pub errors: Vec<RowError>,
    #[serde(default)]
    pub sample_prospects: Vec<RemoteProspect>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsvUploadResult {
    pub success: bool,
    pub total: usize,
    pub imported: usize,
    #[serde(default)]
    pub errors: Vec<RowError>,
}

impl ApiClient {
    pub async fn validate_csv(&self, file: &CsvFile) -> Result<CsvValidation, ApiError> {
        file.preflight()?;
        let path = format!("{ROUTES}/prospects/validate-csv");
        let result: CsvValidation = self
            .send_json(self.request(Method::POST, &path).multipart(file.form()?))
            .await?;
        info!(
            file = %file.file_name,
            total = result.total,
            importable = result.importable,
            "csv validated"
        );
        Ok(result)
    }

    pub async fn upload_csv(&self, file: &CsvFile) -> Result<CsvUploadResult, ApiError> {
        file.preflight()?;
        let path = format!("{ROUTES}/prospects/upload-csv");
        let result: CsvUploadResult = self
            .send_json(self.request(Method::POST, &path).multipart(file.form()?))
            .await?;
        info!(
            file = %file.file_name,
            total = result.total,
            imported = result.imported,
            "csv uploaded"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv(text: &str) -> CsvFile {
        CsvFile::new("prospects.csv", text)
    }

    #[test]
    fn test_parse_quoted_fields() {
        assert_eq!(
            parse_csv_line(r#"Sarah,"Johnson, PhD","says ""hi""",,x"#),
            vec!["Sarah", "Johnson, PhD", r#"says "hi""#, "", "x"]
        );
        assert_eq!(parse_csv_line("a,b\r"), vec!["a", "b"]);
    }

    #[test]
    fn test_preflight_maps_aliases() {
        let map = csv("\u{feff}First Name,LAST_NAME,Email Address,Organization,Job Title,City,Tags\n")
            .preflight()
            .unwrap();
        assert_eq!(map.column("firstName"), Some(0));
        assert_eq!(map.column("company"), Some(3));
        assert_eq!(map.column("position"), Some(4));
        assert_eq!(map.column("location"), Some(5));
        assert_eq!(map.column("tags"), Some(6));
        assert_eq!(map.column("notes"), None);
        assert_eq!(map.fields().count(), 7);
    }

    #[test]
    fn test_preflight_header_with_quoted_newline() {
        let map = csv("\n\"Notes\nfree text\",firstName,lastName,email,company,position\nA,B,C,d@e.co,F,G\n")
            .preflight()
            .unwrap();
        assert_eq!(map.column("firstName"), Some(1));
        assert_eq!(map.column("position"), Some(5));
        assert_eq!(map.column("notes"), None);
    }

    #[test]
    fn test_preflight_reports_missing_columns() {
        match csv("firstName,lastName,company\n").preflight() {
            Err(ApiError::InvalidFile(reason)) => {
                assert_eq!(reason, "Missing required columns: email, position")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_preflight_rejects_bad_files() {
        let wrong_ext = CsvFile::new("prospects.xlsx", "firstName");
        assert!(matches!(wrong_ext.preflight(), Err(ApiError::InvalidFile(_))));

        let binary = CsvFile::new("prospects.csv", vec![0xff, 0xfe, 0x00]);
        assert!(matches!(binary.preflight(), Err(ApiError::InvalidFile(_))));

        assert!(matches!(csv("\n  \n").preflight(), Err(ApiError::InvalidFile(_))));
    }

    #[test]
    fn test_upload_request_is_multipart() {
        let client = ApiClient::new("http://localhost:8000").with_token("tok");
        let file = csv("firstName,lastName,email,company,position\n");
        let request = client
            .request(Method::POST, "/routes/prospects/upload-csv")
            .multipart(file.form().unwrap())
            .build()
            .unwrap();
        let content_type = request.headers().get("content-type").unwrap();
        assert!(content_type
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn test_from_path_reads_name_and_bytes() {
        let path = std::env::temp_dir().join("prospector-import-test.csv");
        tokio::fs::write(&path, "firstName\n").await.unwrap();

        let file = CsvFile::from_path(&path).await.unwrap();

        assert_eq!(file.file_name, "prospector-import-test.csv");
        assert_eq!(file.contents, b"firstName\n");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn test_decode_validation_result() {
        let result: CsvValidation = serde_json::from_value(json!({
            "success": true,
            "total": 2,
            "importable": 1,
            "errors": [{ "row": 3, "error": "Invalid email format", "data": { "email": "x" } }],
            "sampleProspects": [{
                "firstName": "Emily",
                "lastName": "Rodriguez",
                "email": "emily@finnovate.com",
                "company": "Finnovate Partners",
                "position": "Director",
                "createdAt": 1.5
            }]
        }))
        .unwrap();
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(result.sample_prospects[0].first_name, "Emily");
    }
}
