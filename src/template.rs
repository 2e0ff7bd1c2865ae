//! HTML document shell for the `standalone` template.
//!
//! The `fragment` template needs nothing from here: the renderer output is
//! uploaded as-is.

/// Opening of a standalone document, up to and including `<title>`.
pub const STANDALONE_HEAD: &str = "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>";

/// Between the title and the rendered body.
pub const STANDALONE_BODY_OPEN: &str = "</title>\n</head>\n<body>\n";

/// Closing of a standalone document.
pub const STANDALONE_TAIL: &str = "</body>\n</html>\n";

/// Wrap rendered body HTML in a complete HTML5 document.
pub fn standalone(title: &str, body_html: &str) -> String {
    let title = escape_text(title);
    let mut out = String::with_capacity(
        STANDALONE_HEAD.len()
            + title.len()
            + STANDALONE_BODY_OPEN.len()
            + body_html.len()
            + STANDALONE_TAIL.len(),
    );
    out.push_str(STANDALONE_HEAD);
    out.push_str(&title);
    out.push_str(STANDALONE_BODY_OPEN);
    out.push_str(body_html);
    out.push_str(STANDALONE_TAIL);
    out
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
