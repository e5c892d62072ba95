//! Defensive parsing of translation endpoint output.
//!
//! The endpoint is asked for one of two machine-parseable shapes: a JSON
//! object with three named fields, or a single pipe-delimited line. Models
//! being models, the reply may arrive wrapped in code fences, surrounded by
//! chatter, quoted, or with unicode escapes — all of that is cleaned up
//! here before the pipeline sees it.

/// JSON field carrying the target-script rendering of the sentence.
pub const SCRIPT_FIELD: &str = "kanji";
/// JSON field carrying the phonetic reading.
pub const READING_FIELD: &str = "romaji";
/// JSON field carrying the source-language text.
pub const SOURCE_FIELD: &str = "english";

/// Shape the endpoint's reply resolved to.
///
/// Conversion into a final translation result happens in the client, which
/// has the original sentence on hand for the fallback fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTranslation {
    /// Script, reading, and source text all recovered.
    ThreeField {
        script: String,
        reading: String,
        text: String,
    },
    /// Only reading and text recovered; the caller reuses the original
    /// sentence for the script field.
    TwoField { reading: String, text: String },
    /// Nothing usable; the caller falls back entirely.
    Unparseable,
}

/// Parse a raw endpoint reply into one of the accepted shapes.
pub fn parse_response(raw: &str) -> ParsedTranslation {
    let cleaned = strip_code_fence(raw.trim());

    if let Some(parsed) = parse_json_object(&cleaned) {
        return parsed;
    }

    parse_pipe_line(&cleaned)
}

/// Try the JSON object shape: the text itself, or the outermost `{...}`
/// substring when the model wrapped the object in prose.
fn parse_json_object(text: &str) -> Option<ParsedTranslation> {
    let mut candidates = vec![text.to_string()];
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}'))
        && start < end
    {
        candidates.push(text[start..=end].to_string());
    }

    for candidate in candidates {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) else {
            continue;
        };
        let Some(object) = value.as_object() else {
            continue;
        };

        let field = |name: &str| {
            object
                .get(name)
                .and_then(|v| v.as_str())
                .map(clean_field)
                .filter(|s| !s.is_empty())
        };

        let script = field(SCRIPT_FIELD);
        let reading = field(READING_FIELD);
        let text = field(SOURCE_FIELD);

        let usable = [&script, &reading, &text].iter().filter(|f| f.is_some()).count();
        if usable < 2 {
            continue;
        }

        return Some(match script {
            Some(script) => ParsedTranslation::ThreeField {
                script,
                reading: reading.unwrap_or_default(),
                text: text.unwrap_or_default(),
            },
            None => ParsedTranslation::TwoField {
                // script absent means reading and text are both present
                reading: reading.unwrap_or_default(),
                text: text.unwrap_or_default(),
            },
        });
    }

    None
}

/// Try the pipe-delimited shape: `script|reading|text`, or two fields as
/// `reading|text`.
fn parse_pipe_line(text: &str) -> ParsedTranslation {
    let Some(line) = text.lines().find(|line| line.contains('|')) else {
        return ParsedTranslation::Unparseable;
    };

    let fields: Vec<String> = line.split('|').map(clean_field).collect();

    match fields.as_slice() {
        [script, reading, text]
            if !script.is_empty() && (!reading.is_empty() || !text.is_empty()) =>
        {
            ParsedTranslation::ThreeField {
                script: script.clone(),
                reading: reading.clone(),
                text: text.clone(),
            }
        }
        [reading, text] if !text.is_empty() => ParsedTranslation::TwoField {
            reading: reading.clone(),
            text: text.clone(),
        },
        _ => ParsedTranslation::Unparseable,
    }
}

/// Trim, strip one layer of wrapping quotes, and decode unicode escapes.
fn clean_field(raw: &str) -> String {
    let mut text = raw.trim();

    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            text = &text[open.len_utf8()..text.len() - close.len_utf8()];
            break;
        }
    }

    decode_unicode_escapes(text.trim())
}

/// Strip a wrapping markdown code fence, if present.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 3 {
        return trimmed.to_string();
    }
    lines[1..lines.len() - 1].join("\n").trim().to_string()
}

/// Decode `\uXXXX` escape sequences back to literal characters, including
/// surrogate pairs. Malformed escapes are kept verbatim.
fn decode_unicode_escapes(text: &str) -> String {
    if !text.contains("\\u") {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.char_indices();

    while let Some((index, c)) = chars.next() {
        if c != '\\' || !text[index..].starts_with("\\u") {
            result.push(c);
            continue;
        }

        match take_escape(&text[index..]) {
            Some((decoded, consumed)) => {
                result.push(decoded);
                // Skip past everything the escape consumed ('\\' is already out)
                for _ in 0..consumed - 1 {
                    chars.next();
                }
            }
            None => result.push(c),
        }
    }

    result
}

/// Decode one escape starting at `\u`. Returns the character and the number
/// of chars consumed (6, or 12 for a surrogate pair).
fn take_escape(text: &str) -> Option<(char, usize)> {
    let high = parse_hex4(text.get(2..6)?)?;

    // Surrogate pair: a high surrogate must be followed by \uDC00..\uDFFF
    if (0xD800..=0xDBFF).contains(&high) {
        let rest = text.get(6..)?;
        if !rest.starts_with("\\u") {
            return None;
        }
        let low = parse_hex4(rest.get(2..6)?)?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return None;
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return char::from_u32(code).map(|c| (c, 12));
    }

    if (0xDC00..=0xDFFF).contains(&high) {
        return None; // unpaired low surrogate
    }

    char::from_u32(high).map(|c| (c, 6))
}

fn parse_hex4(hex: &str) -> Option<u32> {
    if hex.len() != 4 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
