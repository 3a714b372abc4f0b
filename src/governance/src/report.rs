//! HTML table rendering for the summary emails

use crate::types::{ExpiryRecord, TaggingResult};
use handlebars::html_escape;

const TABLE_STYLE: &str = "border-collapse:collapse;font-family:sans-serif";
const CELL_STYLE: &str = "border:1px solid #ccc;padding:4px 10px;text-align:left";

fn row(cells: &[String]) -> String {
    let mut html = String::from("<tr>");
    for cell in cells {
        html.push_str(&format!("<td style=\"{}\">{}</td>", CELL_STYLE, cell));
    }
    html.push_str("</tr>");
    html
}

fn header(titles: &[&str]) -> String {
    let mut html = String::from("<tr>");
    for title in titles {
        html.push_str(&format!("<th style=\"{}\">{}</th>", CELL_STYLE, title));
    }
    html.push_str("</tr>");
    html
}

/// One row per newly tagged group: name and inferred owner.
pub fn tagging_table(results: &[TaggingResult]) -> String {
    let mut html = format!("<table style=\"{}\">", TABLE_STYLE);
    html.push_str(&header(&["Resource group", "Owner"]));
    for result in results {
        html.push_str(&row(&[
            html_escape(&result.group_name),
            html_escape(&result.owner_email),
        ]));
    }
    html.push_str("</table>");
    html
}

/// One row per classified group: name, owner, expiry date, resource count.
pub fn expiry_table(records: &[ExpiryRecord]) -> String {
    let mut html = format!("<table style=\"{}\">", TABLE_STYLE);
    html.push_str(&header(&[
        "Resource group",
        "Owner",
        "Delete after",
        "Resources",
    ]));
    for record in records {
        html.push_str(&row(&[
            html_escape(&record.group_name),
            html_escape(record.owner_email.as_deref().unwrap_or("-")),
            record.delete_after.format("%m/%d/%y").to_string(),
            record.resource_count.to_string(),
        ]));
    }
    html.push_str("</table>");
    html
}
