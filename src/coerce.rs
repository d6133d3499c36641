//! Schema-directed numeric coercion.
//!
//! Query strings carry only text. A value is turned back into a number
//! only when the schema says the key is numeric; the text itself never
//! decides. `"5"` for a key whose default is `"1"` stays `"5"`.

use crate::schema::Schema;
use crate::value::QueryValue;

/// True for numbers, and for strings that read as a finite number.
///
/// Strings are trimmed first; empty or whitespace-only strings are not
/// numeric. Accepted literals are decimal (`12`, `-3.5`, `.5`, `1e3`,
/// `+4`) and unsigned `0x`/`0o`/`0b` integers.
pub fn is_numeric(value: &QueryValue) -> bool {
    match value {
        QueryValue::Number(_) => true,
        QueryValue::String(s) => parse_number(s).is_some(),
        _ => false,
    }
}

/// Coerce numeric strings to numbers, element-wise through arrays.
///
/// Non-numeric strings and every other value pass through unchanged.
pub fn to_numberable(value: QueryValue) -> QueryValue {
    match value {
        QueryValue::String(s) => match parse_number(&s) {
            Some(n) => QueryValue::Number(n),
            None => QueryValue::String(s),
        },
        QueryValue::Array(items) => {
            QueryValue::Array(items.into_iter().map(to_numberable).collect())
        }
        other => other,
    }
}

/// Whether `key` should be coerced when parsed against `schema`.
pub fn should_coerce(schema: &Schema, key: &str) -> bool {
    schema.is_numeric(key)
}

/// Parse a trimmed numeric literal to a finite `f64`.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&text[2..], radix).ok().map(|n| n as f64);
    }

    // Rust's float grammar also takes "inf"/"nan"; reject anything alphabetic
    // other than the exponent marker.
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}
