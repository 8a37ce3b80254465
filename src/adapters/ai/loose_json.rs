//! Loosely-typed view over model-emitted JSON.
//!
//! The only place in the crate that reads untyped data. Every lookup takes an
//! alias list because field names drift between providers and prompt revisions.

use crate::domain::entities::non_negative;
use serde_json::{Map, Value};

/// Read-only accessor over a JSON object.
#[derive(Debug, Clone, Copy)]
pub struct LooseDoc<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> LooseDoc<'a> {
    /// `None` unless `value` is an object.
    pub fn new(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    /// First alias with a non-null value. Exact key match wins over case-insensitive.
    pub fn raw(&self, aliases: &[&str]) -> Option<&'a Value> {
        let fields = self.fields;
        aliases
            .iter()
            .find_map(|alias| fields.get(*alias).filter(|v| !v.is_null()))
            .or_else(|| {
                aliases.iter().find_map(|alias| {
                    fields
                        .iter()
                        .find(|(k, v)| k.eq_ignore_ascii_case(alias) && !v.is_null())
                        .map(|(_, v)| v)
                })
            })
    }

    /// Non-negative number from a number or numeric-looking string.
    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        aliases
            .iter()
            .find_map(|alias| self.raw(&[*alias]).and_then(coerce_number))
            .map(non_negative)
    }

    /// Trimmed, non-empty string. Numbers and booleans are stringified.
    pub fn string(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .find_map(|alias| self.raw(&[*alias]).and_then(coerce_string))
    }

    pub fn array(&self, aliases: &[&str]) -> Option<&'a Vec<Value>> {
        aliases
            .iter()
            .find_map(|alias| self.raw(&[*alias]).and_then(Value::as_array))
    }
}

/// Number from `27`, `"27"`, `"27 g"`, `"~30"`, `"15-20"` (midpoint), `"1,5"`,
/// `"1,200"` or `{"value": 27, "unit": "g"}`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric_text(s),
        Value::Object(map) => ["value", "amount", "grams", "g"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(coerce_number),
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(coerce_string)
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// First number in free text. A trailing `-N`, `–N` or `to N` makes it a range
/// and yields the midpoint.
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let (first, rest) = leading_number(text)?;
    let rest = rest.trim_start();
    let range_tail = rest
        .strip_prefix('-')
        .or_else(|| rest.strip_prefix('–'))
        .or_else(|| rest.strip_prefix("to "));
    if let Some(tail) = range_tail {
        let tail = tail.trim_start();
        if tail.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some((second, _)) = leading_number(tail) {
                return Some((first + second) / 2.0);
            }
        }
    }
    Some(first)
}

fn leading_number(text: &str) -> Option<(f64, &str)> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let negative = text[..start].trim_end().ends_with('-')
        && !text[..start]
            .trim_end()
            .trim_end_matches('-')
            .ends_with(|c: char| c.is_ascii_digit());
    let digits = &text[start..];
    let end = digits
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(digits.len());
    let token = digits[..end].trim_end_matches(['.', ',']);

    let normalized = if is_thousands_grouped(token) {
        token.replace(',', "")
    } else {
        token.replace(',', ".")
    };
    // Overlong digit runs parse to infinity; treat them as no number at all.
    let value = normalized.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let value = if negative { -value } else { value };
    Some((value, &digits[token.len()..]))
}

/// `1,200` or `12,345,678` style grouping (every group after the first has 3 digits).
fn is_thousands_grouped(token: &str) -> bool {
    let mut groups = token.split(',');
    let head = groups.next().unwrap_or_default();
    let tail: Vec<&str> = groups.collect();
    !tail.is_empty()
        && !token.contains('.')
        && (1..=3).contains(&head.len())
        && tail.iter().all(|g| g.len() == 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_text_forms() {
        assert_eq!(parse_numeric_text("27"), Some(27.0));
        assert_eq!(parse_numeric_text("27.5 g"), Some(27.5));
        assert_eq!(parse_numeric_text("~30g carbs"), Some(30.0));
        assert_eq!(parse_numeric_text("15-20"), Some(17.5));
        assert_eq!(parse_numeric_text("15 to 25 grams"), Some(20.0));
        assert_eq!(parse_numeric_text("1,5"), Some(1.5));
        assert_eq!(parse_numeric_text("1,200 kcal"), Some(1200.0));
        assert_eq!(parse_numeric_text("-4"), Some(-4.0));
        assert_eq!(parse_numeric_text("unknown"), None);
        assert_eq!(parse_numeric_text(""), None);
    }

    #[test]
    fn test_overlong_digit_runs_are_absent() {
        let digits = "9".repeat(400);
        assert_eq!(parse_numeric_text(&digits), None);

        let value = json!({"carbohydrates": digits, "carbs": "12 g"});
        let doc = LooseDoc::new(&value).unwrap();
        assert_eq!(doc.number(&["carbohydrates", "carbs"]), Some(12.0));
    }

    #[test]
    fn test_aliases_and_case() {
        let value = json!({"Total_Carbs": "45g", "protein": null, "protein_grams": 12});
        let doc = LooseDoc::new(&value).unwrap();
        assert_eq!(doc.number(&["total_carbohydrates", "total_carbs"]), Some(45.0));
        assert_eq!(doc.number(&["protein", "protein_grams"]), Some(12.0));
        assert_eq!(doc.number(&["fat"]), None);
    }

    #[test]
    fn test_numbers_are_clamped() {
        let value = json!({"fat": -3});
        let doc = LooseDoc::new(&value).unwrap();
        assert_eq!(doc.number(&["fat"]), Some(0.0));
    }

    #[test]
    fn test_strings_are_trimmed_and_rejected_when_blank() {
        let value = json!({"name": "  rice  ", "notes": "   ", "count": 3});
        let doc = LooseDoc::new(&value).unwrap();
        assert_eq!(doc.string(&["name"]), Some("rice".to_string()));
        assert_eq!(doc.string(&["notes"]), None);
        assert_eq!(doc.string(&["count"]), Some("3".to_string()));
    }

    #[test]
    fn test_unit_objects() {
        assert_eq!(coerce_number(&json!({"value": 12, "unit": "g"})), Some(12.0));
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_non_object_has_no_doc() {
        assert!(LooseDoc::new(&json!([1, 2])).is_none());
    }
}
