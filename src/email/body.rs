use std::borrow::Cow;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::email::common::{EmailBody, MimePart};

/// Select the best textual body of a MIME tree.
///
/// Depth-first, children in order: the first `text/plain` part wins, then the
/// first `text/html` part. A tree with neither yields an empty body with no
/// mime type.
pub fn extract_body(payload: &MimePart) -> EmailBody {
    match walk(payload) {
        (Some(plain), _) => EmailBody {
            mime_type: Some("text/plain".to_string()),
            content: plain,
        },
        (None, Some(html)) => EmailBody {
            mime_type: Some("text/html".to_string()),
            content: html,
        },
        (None, None) => EmailBody::empty(),
    }
}

/// First plain and first html text found in this subtree
fn walk(part: &MimePart) -> (Option<String>, Option<String>) {
    let mut plain = None;
    let mut html = None;

    if let Some(data) = part.data.as_deref().filter(|d| !d.is_empty()) {
        if part.mime_type.eq_ignore_ascii_case("text/plain") {
            plain = Some(decode_text(data));
        } else if part.mime_type.eq_ignore_ascii_case("text/html") {
            html = Some(decode_text(data));
        }
    }

    for child in &part.parts {
        if plain.is_some() && html.is_some() {
            break;
        }
        let (child_plain, child_html) = walk(child);
        plain = plain.or(child_plain);
        html = html.or(child_html);
    }

    (plain, html)
}

/// Invalid UTF-8 sequences become U+FFFD instead of failing
fn decode_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Text handed to the language model for a selected body.
///
/// HTML is reduced to readable text; plain text passes through untouched.
pub fn model_input_text(body: &EmailBody) -> Cow<'_, str> {
    if body.is_html() {
        debug!("Converting HTML body to text ({} bytes)", body.content.len());
        Cow::Owned(html_to_text(&body.content))
    } else {
        Cow::Borrowed(body.content.as_str())
    }
}

// Compile-once patterns
fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid built-in regex"))
}

fn re_script_style() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"(?is)<(script|style)\b.*?</(script|style)\s*>")
}

fn re_line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"(?i)<br\s*/?>")
}

fn re_block_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"(?i)</(p|div|tr|li|h[1-6])\s*>")
}

fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"<[^>]+>")
}

fn re_blank_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\n{3,}")
}

/// Simple HTML stripping (tags removed, block ends become line breaks)
pub fn html_to_text(html: &str) -> String {
    let text = re_script_style().replace_all(html, "");
    let text = re_line_break().replace_all(&text, "\n");
    let text = re_block_end().replace_all(&text, "\n");
    let text = re_tag().replace_all(&text, "");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    re_blank_run().replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternative(plain: &str, html: &str) -> MimePart {
        MimePart::multipart(
            "multipart/alternative",
            vec![
                MimePart::leaf("text/plain", plain),
                MimePart::leaf("text/html", html),
            ],
        )
    }

    #[test]
    fn test_html_only_tree() {
        let tree = MimePart::multipart(
            "multipart/mixed",
            vec![
                MimePart::leaf("image/png", vec![0x89u8, 0x50, 0x4e, 0x47]),
                MimePart::leaf("text/html", "<p>Meeting at 3pm</p>"),
            ],
        );

        let body = extract_body(&tree);
        assert_eq!(body.mime_type.as_deref(), Some("text/html"));
        assert_eq!(body.content, "<p>Meeting at 3pm</p>");
    }

    #[test]
    fn test_plain_preferred_even_when_nested_deeper() {
        let tree = MimePart::multipart(
            "multipart/mixed",
            vec![
                MimePart::leaf("text/html", "<b>html first</b>"),
                MimePart::multipart(
                    "multipart/related",
                    vec![alternative("deep plain", "<i>deep html</i>")],
                ),
            ],
        );

        let body = extract_body(&tree);
        assert_eq!(body.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(body.content, "deep plain");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let tree = MimePart::multipart(
            "multipart/mixed",
            vec![
                alternative("first plain", "<p>first html</p>"),
                alternative("second plain", "<p>second html</p>"),
            ],
        );

        assert_eq!(extract_body(&tree).content, "first plain");
    }

    #[test]
    fn test_depth_first_order() {
        // The plain part inside the first child comes before the sibling plain part
        let tree = MimePart::multipart(
            "multipart/mixed",
            vec![
                MimePart::multipart(
                    "multipart/alternative",
                    vec![MimePart::leaf("text/plain", "nested")],
                ),
                MimePart::leaf("text/plain", "sibling"),
            ],
        );

        assert_eq!(extract_body(&tree).content, "nested");
    }

    #[test]
    fn test_single_part_message() {
        let body = extract_body(&MimePart::leaf("text/plain", "hello"));
        assert_eq!(body.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(body.content, "hello");
    }

    #[test]
    fn test_empty_tree() {
        let body = extract_body(&MimePart::default());
        assert_eq!(body, EmailBody::empty());
        assert_eq!(body.mime_type, None);
        assert_eq!(body.content, "");
    }

    #[test]
    fn test_empty_data_is_skipped() {
        let tree = MimePart::multipart(
            "multipart/alternative",
            vec![
                MimePart::leaf("text/plain", ""),
                MimePart::leaf("text/html", "<p>only html has content</p>"),
            ],
        );

        assert_eq!(extract_body(&tree).mime_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let body = extract_body(&MimePart::leaf("text/plain", vec![b'o', b'k', 0xff, b'!']));
        assert_eq!(body.content, "ok\u{fffd}!");
    }

    #[test]
    fn test_model_input_text() {
        let plain = EmailBody {
            mime_type: Some("text/plain".to_string()),
            content: "  untouched <b>text</b>  ".to_string(),
        };
        assert_eq!(model_input_text(&plain), "  untouched <b>text</b>  ");

        let html = EmailBody {
            mime_type: Some("text/html".to_string()),
            content: "<html><head><style>p { color: red; }</style></head>\
                      <body><p>Hi Sam,</p><p>Let&#39;s meet <b>tomorrow</b> at 3pm.<br>Thanks &amp; regards</p></body></html>"
                .to_string(),
        };
        assert_eq!(
            model_input_text(&html),
            "Hi Sam,\nLet's meet tomorrow at 3pm.\nThanks & regards"
        );
    }

    #[test]
    fn test_html_to_text_collapses_blank_runs() {
        let html = "<div>one</div><br><br><br><br><div>two</div><script>var x = '<p>';</script>";
        assert_eq!(html_to_text(html), "one\n\ntwo");
        // second call reuses the compiled patterns
        assert_eq!(html_to_text("<i>again</i>"), "again");
    }
}
