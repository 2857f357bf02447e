//! Flattening a form's responses for download.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::{
    db::{form::FormCore, response::Response},
    mongodb::Id,
};

/// Supported export formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::InvalidInput(format!(
                "Unsupported export format \"{other}\", expected json or csv"
            ))),
        }
    }
}

/// One CSV column per question: the form's current questions first, then any
/// question only seen in stored answers, labelled by its snapshot text.
fn columns(form: &FormCore, responses: &[Response]) -> Vec<(Id, String)> {
    let mut columns: Vec<(Id, String)> = form
        .questions
        .iter()
        .map(|q| (q.id, q.question_text.clone()))
        .collect();
    for answer in responses.iter().flat_map(|r| &r.answers) {
        if !columns.iter().any(|(id, _)| *id == answer.question_id) {
            columns.push((answer.question_id, answer.question_text.clone()));
        }
    }
    columns
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(escape).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Render responses as CSV, one row per response in the given order.
/// Unanswered questions are left blank.
pub fn to_csv(form: &FormCore, responses: &[Response]) -> String {
    let columns = columns(form, responses);
    let mut out = String::new();

    let header = ["Response ID", "Submitted At"]
        .into_iter()
        .chain(columns.iter().map(|(_, text)| text.as_str()));
    write_row(&mut out, header);

    for response in responses {
        let id = response.id.to_string();
        let submitted_at = response.submitted_at.to_rfc3339();
        let answers = columns.iter().map(|(question_id, _)| {
            response
                .answer_to(*question_id)
                .map_or("", |a| a.answer.as_str())
        });
        let row = [id.as_str(), submitted_at.as_str()].into_iter().chain(answers);
        write_row(&mut out, row);
    }
    out
}
