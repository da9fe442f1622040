//! Minimal quoted-CSV encoding for the export endpoints.
//!
//! Every field is quoted and embedded quotes are doubled, matching what
//! spreadsheet imports expect for free-text columns (audit change blobs can
//! contain commas, quotes and newlines).

/// Quote a single field: wrap in double quotes, double any embedded quote.
pub fn quote(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    for ch in field.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Encode one row, quoting every field.
pub fn encode_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Encode a full document: a header row followed by data rows, joined with
/// `\n` (no trailing newline).
pub fn encode(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(encode_row(headers.iter().copied()));
    for row in rows {
        lines.push(encode_row(row.iter().map(String::as_str)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_fields() {
        assert_eq!(quote("abc"), "\"abc\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn doubles_embedded_quotes() {
        assert_eq!(quote(r#"say "hi""#), r#""say ""hi""""#);
    }

    #[test]
    fn commas_and_newlines_stay_inside_the_field() {
        let row = encode_row(["a,b", "c\nd"]);
        assert_eq!(row, "\"a,b\",\"c\nd\"");
    }

    #[test]
    fn encodes_header_and_rows() {
        let doc = encode(&["ID", "Name"], &[vec!["1".into(), "Jane".into()]]);
        assert_eq!(doc, "\"ID\",\"Name\"\n\"1\",\"Jane\"");
    }
}
