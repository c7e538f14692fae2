use super::shared_types::ApiError;
use crate::app_state::AppState;
use axum::{extract::State, response::Html};
use std::fmt::Write;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Metrics</title>
<style>
table { font-family: sans-serif; border-collapse: collapse; width: 100%; }
td, th { border: 1px solid #dddddd; text-align: left; padding: 8px; }
tr:nth-child(even) { background-color: #eeeeee; }
</style>
</head>
<body>
<h2>Metrics</h2>
<table>
  <tr><th>Name</th><th>Type</th><th>Value</th></tr>
"#;

const PAGE_TAIL: &str = "</table>\n</body>\n</html>\n";

/// `GET /`: every stored metric as an HTML table.
pub async fn root_handler(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    // ---
    let snapshot = state.storage().get_all().await?;

    let mut page = String::from(PAGE_HEAD);
    for metric in snapshot.metrics() {
        let _ = writeln!(
            page,
            "  <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&metric.name),
            metric.value.kind(),
            metric.value
        );
    }
    page.push_str(PAGE_TAIL);

    Ok(Html(page))
}

fn escape(text: &str) -> String {
    // ---
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn names_are_escaped() {
        assert_eq!(escape("<b>&\"x'"), "&lt;b&gt;&amp;&quot;x&#39;");
        assert_eq!(escape("PollCount"), "PollCount");
    }
}
