use log::debug;
use serde_json::{Map, Value};

use crate::error::CoerceError;

/// Extract and parse the JSON object contained in a model reply.
///
/// Models sometimes wrap the payload in commentary ("Sure, here you go: ...").
/// A reply that is already a bare object is parsed directly; otherwise each
/// balanced `{...}` span is tried in order and the first one that parses as an
/// object wins. When none parse, the first parse error is returned.
pub fn coerce_json_object(text: &str) -> Result<Map<String, Value>, CoerceError> {
    let trimmed = text.trim();

    let mut first_error = None;

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        match serde_json::from_str::<Map<String, Value>>(trimmed) {
            Ok(object) => return Ok(object),
            Err(e) => first_error = Some(e),
        }
    }

    for (start, _) in trimmed.match_indices('{') {
        let Some(end) = object_end(trimmed, start) else {
            continue;
        };
        match serde_json::from_str::<Map<String, Value>>(&trimmed[start..end]) {
            Ok(object) => {
                debug!("Model reply had surrounding text, using bytes {}..{}", start, end);
                return Ok(object);
            }
            Err(e) => {
                debug!("Candidate at byte {} is not a JSON object: {}", start, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    Err(first_error.map_or(CoerceError::NoJson, CoerceError::from))
}

/// End (exclusive) of the object opened by the `{` at `start`.
///
/// Braces inside JSON string literals are ignored. If the object never
/// closes, the range runs to the last `}` in the text.
fn object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    // Unbalanced: behave like a greedy match
    let end = text.rfind('}')?;
    (end > start).then_some(end + 1)
}
