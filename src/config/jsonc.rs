// src/config/jsonc.rs
// JSON-with-comments reader for project configuration files

use serde_json::Value;

/// Parse JSONC text: `//` and `/* */` comments and trailing commas are
/// accepted, as the TypeScript compiler accepts them in project files.
pub fn parse(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip(text))
}

/// Remove comments and trailing commas outside of string literals.
///
/// Comments are replaced by whitespace (newlines kept) so that line/column
/// positions in serde_json errors still point into the original text.
pub fn strip(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;
    // Byte offset in `out` of a comma that may turn out to be trailing
    let mut pending_comma: Option<usize> = None;

    while i < bytes.len() {
        let c = bytes[i];

        if in_string {
            let ch = next_char(text, i);
            out.push(ch);
            if c == b'\\' {
                if let Some(escaped) = text[i + 1..].chars().next() {
                    out.push(escaped);
                    i += 1 + escaped.len_utf8();
                    continue;
                }
            } else if c == b'"' {
                in_string = false;
            }
            i += ch.len_utf8();
            continue;
        }

        match c {
            b'"' => {
                pending_comma = None;
                in_string = true;
                out.push('"');
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str("  ");
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    out.push(if bytes[i] == b'\n' { '\n' } else { ' ' });
                    i += 1;
                }
                if i < bytes.len() {
                    out.push_str("  ");
                    i += 2;
                }
            }
            b',' => {
                pending_comma = Some(out.len());
                out.push(',');
                i += 1;
            }
            b'}' | b']' => {
                if let Some(pos) = pending_comma.take() {
                    out.replace_range(pos..pos + 1, " ");
                }
                out.push(c as char);
                i += 1;
            }
            _ => {
                let ch = next_char(text, i);
                if !ch.is_whitespace() {
                    pending_comma = None;
                }
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    out
}

fn next_char(text: &str, at: usize) -> char {
    text[at..].chars().next().unwrap_or(' ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_unchanged() {
        let text = r#"{"compilerOptions": {"module": "commonjs"}}"#;
        assert_eq!(strip(text), text);
    }

    #[test]
    fn test_line_and_block_comments() {
        let text = r#"{
            // module kind
            "compilerOptions": { /* inline */ "strict": true }
        }"#;
        assert_eq!(
            parse(text).unwrap(),
            json!({"compilerOptions": {"strict": true}})
        );
    }

    #[test]
    fn test_trailing_commas() {
        let text = r#"{"include": ["src/**/*.ts",], "compilerOptions": {"strict": true,},}"#;
        assert_eq!(
            parse(text).unwrap(),
            json!({"include": ["src/**/*.ts"], "compilerOptions": {"strict": true}})
        );
    }

    #[test]
    fn test_comment_markers_inside_strings_kept() {
        let text = r#"{"paths": {"@/*": ["src/*"]}, "url": "http://example.com"}"#;
        let value = parse(text).unwrap();
        assert_eq!(value["url"], "http://example.com");
        assert_eq!(value["paths"]["@/*"][0], "src/*");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let text = r#"{"a": "say \"hi\", // not a comment"}"#;
        assert_eq!(parse(text).unwrap()["a"], "say \"hi\", // not a comment");
    }

    #[test]
    fn test_comma_in_string_before_brace_kept() {
        let text = r#"{"a": ",}"}"#;
        assert_eq!(parse(text).unwrap()["a"], ",}");
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(parse("").is_err());
        assert!(parse("   // only a comment").is_err());
    }
}
