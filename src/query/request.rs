use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::records::QuerySignature;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One logical query as the caller states it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub columns: Vec<String>,
    pub condition: String,
    pub table: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl QueryRequest {
    /// Build a request, checking the date bounds but not the condition text.
    pub fn new(
        columns: Vec<String>,
        condition: impl Into<String>,
        table: impl Into<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Self> {
        let table = table.into();
        if columns.is_empty() {
            return Err(AppError::message("at least one column must be requested"));
        }
        if table.trim().is_empty() {
            return Err(AppError::message("table name must not be empty"));
        }

        let start = normalize_date(start, "start")?;
        let end = normalize_date(end, "end")?;
        if let (Some(s), Some(e)) = (&start, &end) {
            if s > e {
                return Err(AppError::message(format!(
                    "start date {s} is after end date {e}"
                )));
            }
        }

        Ok(Self {
            columns,
            condition: condition.into(),
            table,
            start: start.map(|date| date.format(DATE_FORMAT).to_string()),
            end: end.map(|date| date.format(DATE_FORMAT).to_string()),
        })
    }

    pub fn signature(&self) -> QuerySignature {
        QuerySignature::new(self.condition.clone(), self.start.clone(), self.end.clone())
    }

    /// Same query with a different condition, used for row-window rewrites.
    pub fn with_condition(&self, condition: String) -> Self {
        Self {
            condition,
            ..self.clone()
        }
    }
}

fn normalize_date(raw: Option<String>, label: &str) -> Result<Option<NaiveDate>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|err| {
                AppError::message(format!(
                    "{label} date `{text}` is not in YYYY-MM-DD form: {err}"
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["Stkcd".to_string(), "Trddt".to_string()]
    }

    #[test]
    fn signature_ignores_table_and_columns() {
        let a = QueryRequest::new(
            columns(),
            "Stkcd='000001'",
            "TRD_Dalyr",
            Some("2020-01-01".to_string()),
            Some("2020-06-30".to_string()),
        )
        .unwrap();
        let b = QueryRequest::new(
            vec!["Clsprc".to_string()],
            "Stkcd='000001'",
            "TRD_Mnth",
            Some("2020-01-01".to_string()),
            Some("2020-06-30".to_string()),
        )
        .unwrap();

        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn blank_dates_are_unbounded() {
        let request =
            QueryRequest::new(columns(), "", "TRD_Dalyr", Some("  ".to_string()), None).unwrap();
        assert_eq!(request.start, None);
        assert_eq!(request.end, None);
    }

    #[test]
    fn rejects_bad_dates_and_inverted_range() {
        let bad = QueryRequest::new(columns(), "", "T", Some("2020/01/01".to_string()), None);
        assert!(bad.unwrap_err().to_string().contains("YYYY-MM-DD"));

        let inverted = QueryRequest::new(
            columns(),
            "",
            "T",
            Some("2021-01-01".to_string()),
            Some("2020-01-01".to_string()),
        );
        assert!(inverted.unwrap_err().to_string().contains("after"));
    }

    #[test]
    fn rejects_missing_columns_or_table() {
        assert!(QueryRequest::new(Vec::new(), "", "T", None, None).is_err());
        assert!(QueryRequest::new(columns(), "", " ", None, None).is_err());
    }
}
