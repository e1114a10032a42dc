//! Splits template text into literal text and tags.
use super::TemplateError;

/// One piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Segment<'a> {
    /// Literal output.
    Text(String),
    /// `<%= code %>`: evaluate and insert.
    Output { code: &'a str, line: usize },
    /// `<% code %>`: evaluate and discard.
    Code { code: &'a str, line: usize },
}

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// Scan `content` into segments.
///
/// `<%%` is a literal `<%`, `<%# ... %>` is dropped, and a tag closed with
/// `-%>` swallows the newline that immediately follows it.
pub(super) fn segments(content: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut rest = content;
    let mut line = 1;

    while let Some(start) = rest.find(OPEN) {
        let (before, tag) = rest.split_at(start);
        text.push_str(before);
        line += newlines(before);

        if let Some(after) = tag.strip_prefix("<%%") {
            text.push_str(OPEN);
            rest = after;
            continue;
        }

        let body = tag.get(OPEN.len()..).unwrap_or_default();
        let Some(end) = body.find(CLOSE) else {
            return Err(TemplateError::syntax(line, "unclosed tag"));
        };
        let (inner, after) = body.split_at(end);
        let after = after.get(CLOSE.len()..).unwrap_or_default();
        let (inner, trim) = inner
            .strip_suffix('-')
            .map_or((inner, false), |stripped| (stripped, true));

        if !text.is_empty() {
            out.push(Segment::Text(std::mem::take(&mut text)));
        }
        if let Some(code) = inner.strip_prefix('=') {
            out.push(Segment::Output { code, line });
        } else if inner.starts_with('#') {
            // comment
        } else {
            out.push(Segment::Code { code: inner, line });
        }
        line += newlines(inner);

        rest = after;
        if trim
            && let Some(stripped) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
        {
            rest = stripped;
            line += 1;
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        out.push(Segment::Text(text));
    }
    Ok(out)
}

fn newlines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}
