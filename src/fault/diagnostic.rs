use quick_xml::escape::escape;

use super::error::ServiceError;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{status} {description}</title></head>
<body>
<h1>{status} {description}</h1>
<p><b>Type:</b> {type}</p>
<p><b>Message:</b> {message}</p>
<pre>{details}</pre>
<pre>{trace}</pre>
</body>
</html>
"#;

/// Render the HTML fault page.
///
/// With `expose_diagnostics` off, the debug detail and trace sections are
/// left empty.
pub fn render_diagnostic_page(error: &ServiceError, expose_diagnostics: bool) -> String {
    let status = error.status();
    let message = error.to_string();
    let (details, trace) = if expose_diagnostics {
        (format!("{error:?}"), error.trace().unwrap_or_default())
    } else {
        (String::new(), String::new())
    };

    let value = |key: &str| -> Option<String> {
        Some(match key {
            "status" => status.as_str().to_string(),
            "description" => status.canonical_reason().unwrap_or("").to_string(),
            "type" => error.kind().to_string(),
            "message" => escape(message.as_str()).into_owned(),
            "details" => escape(details.as_str()).into_owned(),
            "trace" => escape(trace.as_str()).into_owned(),
            _ => return None,
        })
    };

    let mut page = String::with_capacity(PAGE.len() + message.len() + details.len() + trace.len());
    let mut rest = PAGE;
    while let Some(open) = rest.find('{') {
        page.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            rest = tail;
            break;
        };
        match value(&tail[1..close]) {
            Some(v) => page.push_str(&v),
            None => page.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    page.push_str(rest);
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders_and_escapes() {
        let err = ServiceError::not_found("<script>alert(1)</script>");
        let page = render_diagnostic_page(&err, true);
        assert!(page.contains("<h1>404 Not Found</h1>"));
        assert!(page.contains("<b>Type:</b> NotFound"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(!page.contains("{trace}"));
    }

    #[test]
    fn hides_details_when_disabled() {
        let err = ServiceError::invalid_operation("state is corrupt");
        let page = render_diagnostic_page(&err, false);
        assert!(page.contains("state is corrupt"));
        assert!(!page.contains("InvalidOperation("));
    }
}
