//! Defensive parser for model answers.
//!
//! Model output is not a stable contract: it may be wrapped in Markdown, carry
//! prose around the JSON, rename fields, or be cut off mid-object. `parse` never
//! fails; it degrades field by field and always returns a usable result.

use super::loose_json::{LooseDoc, coerce_number, parse_numeric_text};
use crate::domain::{AnalysisResult, Confidence, FoodItem, ImageType, SuppliedTotals};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Accepted key aliases per field.
mod keys {
    pub const ITEMS: &[&str] = &["food_items", "foods", "items", "food_list", "components"];
    pub const IMAGE_TYPE: &[&str] = &["image_type", "type", "source_type"];
    pub const CONFIDENCE: &[&str] = &["confidence", "confidence_score", "overall_confidence"];
    pub const TOTAL_CARBS: &[&str] = &[
        "total_carbohydrates",
        "total_carbs",
        "carbohydrates",
        "carbs",
        "net_carbs",
    ];
    pub const TOTAL_PROTEIN: &[&str] = &["total_protein", "protein"];
    pub const TOTAL_FAT: &[&str] = &["total_fat", "fat"];
    pub const TOTAL_CALORIES: &[&str] = &["total_calories", "calories", "kcal", "energy_kcal"];
    pub const DESCRIPTION: &[&str] = &["overall_description", "description", "summary"];
    pub const PORTION_METHOD: &[&str] = &[
        "portion_assessment_method",
        "portion_method",
        "analysis_notes",
    ];
    pub const DIETARY: &[&str] = &[
        "diabetes_considerations",
        "dietary_considerations",
        "considerations",
    ];
    pub const VISUAL_NOTES: &[&str] = &[
        "visual_assessment_details",
        "visual_notes",
        "visual_details",
    ];

    pub const NAME: &[&str] = &["name", "food_name", "food", "item"];
    pub const PORTION: &[&str] = &["portion_estimate", "portion", "portion_size", "amount"];
    pub const STANDARD_SERVING: &[&str] =
        &["usda_serving_size", "serving_size", "standard_serving"];
    pub const MULTIPLIER: &[&str] = &["serving_multiplier", "servings", "multiplier"];
    pub const CARBS: &[&str] = &[
        "carbohydrates",
        "carbs",
        "carbohydrate_grams",
        "carbs_grams",
        "total_carbohydrates",
    ];
    pub const PROTEIN: &[&str] = &["protein", "protein_grams"];
    pub const FAT: &[&str] = &["fat", "fat_grams", "total_fat"];
    pub const CALORIES: &[&str] = &["calories", "kcal", "energy_kcal", "energy"];
    pub const NOTES: &[&str] = &["assessment_notes", "notes", "comment"];
}

const UNNAMED_FOOD: &str = "Unidentified food";
const UNSPECIFIED_PORTION: &str = "Portion not specified";
const RAW_DESCRIPTION_LIMIT: usize = 280;

#[derive(Error, Debug)]
enum ItemError {
    #[error("item is not an object")]
    NotAnObject,
    #[error("item has neither a name nor a carbohydrate value")]
    Unrecognizable,
}

/// Turns model answer text into an [`AnalysisResult`].
pub struct ResultParser;

impl ResultParser {
    /// Total: any input, including empty or truncated text, yields a result
    /// with at least one item and non-negative carbohydrates.
    pub fn parse(raw_text: &str) -> AnalysisResult {
        let cleaned = strip_code_fences(raw_text);
        let trimmed = raw_text.trim();
        let document = parse_document(&cleaned).or_else(|| {
            (cleaned != trimmed)
                .then(|| parse_document(trimmed))
                .flatten()
        });

        match document {
            Some(document) => {
                let result = from_document(&document);
                debug!(
                    items = result.food_items.len(),
                    carbs = result.total_carbohydrates,
                    confidence = %result.confidence,
                    "parsed model answer"
                );
                result
            }
            None => {
                warn!(
                    raw_len = raw_text.len(),
                    "model answer is not JSON, using fallback estimate"
                );
                let mut result = AnalysisResult::from_items(Vec::new(), SuppliedTotals::default());
                result.confidence = Confidence::Low;
                result.overall_description = Some(cleaned.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map(|s| truncate_chars(&s, RAW_DESCRIPTION_LIMIT));
                result
            }
        }
    }
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
///
/// A fence only counts when it opens a line; backticks inside a JSON string
/// value are left alone.
pub fn strip_code_fences(raw_text: &str) -> String {
    let trimmed = raw_text.trim();

    let Some(fence_start) = line_fence(trimmed, FenceEnd::First) else {
        return trimmed.to_string();
    };
    let after_fence = &trimmed[fence_start + 3..];
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match after_fence.find('\n') {
        Some(nl) if after_fence[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_fence[nl + 1..]
        }
        _ => after_fence
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim_start(),
    };
    let body = match line_fence(body, FenceEnd::Last) {
        Some(end) => &body[..end],
        None => body.trim_end().strip_suffix("```").unwrap_or(body),
    };
    body.trim().to_string()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FenceEnd {
    First,
    Last,
}

/// Byte offset of a "```" that starts a line (after optional indentation).
fn line_fence(text: &str, which: FenceEnd) -> Option<usize> {
    let mut offset = 0;
    let mut found = None;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line[indent..].starts_with("```") {
            found = Some(offset + indent);
            if which == FenceEnd::First {
                break;
            }
        }
        offset += line.len();
    }
    found
}

/// The first-`{`-to-last-`}` slice, if it exists.
fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Generic document from cleaned text. Tries the brace slice first, then the whole text.
fn parse_document(cleaned: &str) -> Option<Value> {
    let as_document = |text: &str| -> Option<Value> {
        match serde_json::from_str::<Value>(text).ok()? {
            object @ Value::Object(_) => Some(object),
            // A bare item list is still usable.
            Value::Array(items) => Some(serde_json::json!({ "food_items": items })),
            _ => None,
        }
    };

    let candidate = json_slice(cleaned).unwrap_or(cleaned);
    as_document(candidate).or_else(|| {
        if candidate.len() == cleaned.len() {
            None
        } else {
            debug!("brace slice did not parse, retrying with full text");
            as_document(cleaned)
        }
    })
}

fn from_document(document: &Value) -> AnalysisResult {
    let Some(doc) = LooseDoc::new(document) else {
        return AnalysisResult::from_items(Vec::new(), SuppliedTotals::default());
    };

    let items: Vec<FoodItem> = doc
        .array(keys::ITEMS)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| match extract_item(entry) {
                    Ok(item) => Some(item),
                    Err(reason) => {
                        warn!(index, %reason, "skipping malformed food item");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    let synthesized = items.is_empty();

    let supplied = SuppliedTotals {
        carbohydrates: doc.number(keys::TOTAL_CARBS),
        protein: doc.number(keys::TOTAL_PROTEIN),
        fat: doc.number(keys::TOTAL_FAT),
        calories: doc.number(keys::TOTAL_CALORIES),
    };

    let mut result = AnalysisResult::from_items(items, supplied);
    if synthesized {
        if let (Some(name), Some(item)) = (doc.string(keys::NAME), result.food_items.first_mut()) {
            item.name = name;
        }
    }

    result.image_type = doc
        .string(keys::IMAGE_TYPE)
        .map(|t| {
            if t.to_ascii_lowercase().contains("menu") {
                ImageType::MenuItem
            } else {
                ImageType::FoodPhoto
            }
        })
        .unwrap_or_default();
    result.confidence = doc
        .raw(keys::CONFIDENCE)
        .map(confidence_from)
        .unwrap_or_default();
    result.overall_description = doc.string(keys::DESCRIPTION);
    result.portion_assessment_method = doc.string(keys::PORTION_METHOD);
    result.dietary_considerations = doc.string(keys::DIETARY);
    result.visual_assessment_details = doc.string(keys::VISUAL_NOTES);
    result
}

fn extract_item(entry: &Value) -> Result<FoodItem, ItemError> {
    let item = LooseDoc::new(entry).ok_or(ItemError::NotAnObject)?;

    let name = item.string(keys::NAME);
    let carbohydrates = item.number(keys::CARBS);
    if name.is_none() && carbohydrates.is_none() {
        return Err(ItemError::Unrecognizable);
    }

    let mut food = FoodItem::new(
        name.unwrap_or_else(|| UNNAMED_FOOD.to_string()),
        item.string(keys::PORTION)
            .unwrap_or_else(|| UNSPECIFIED_PORTION.to_string()),
        carbohydrates.unwrap_or(0.0),
    )
    .with_serving_multiplier(item.number(keys::MULTIPLIER).unwrap_or(1.0))
    .with_protein(item.number(keys::PROTEIN))
    .with_fat(item.number(keys::FAT))
    .with_calories(item.number(keys::CALORIES));
    food.standard_serving = item.string(keys::STANDARD_SERVING);
    food.assessment_notes = item.string(keys::NOTES);
    Ok(food)
}

/// Numeric score (0..1, or a percentage) or a literal bucket. Anything else is medium.
fn confidence_from(value: &Value) -> Confidence {
    if let Value::String(text) = value {
        let lower = text.trim().to_ascii_lowercase();
        return bucket_from_words(&lower)
            .or_else(|| parse_numeric_text(&lower).map(score_bucket))
            .unwrap_or_default();
    }
    coerce_number(value).map(score_bucket).unwrap_or_default()
}

/// Whole-word bucket match. Negated or contradictory wording ("not high",
/// "low to high") is ambiguous and yields `None`.
fn bucket_from_words(lower: &str) -> Option<Confidence> {
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| matches!(*w, "not" | "no" | "un")) {
        return None;
    }

    let mut buckets = words.iter().filter_map(|w| match *w {
        "high" | "highly" => Some(Confidence::High),
        "medium" | "moderate" | "moderately" => Some(Confidence::Medium),
        "low" => Some(Confidence::Low),
        _ => None,
    });
    let first = buckets.next()?;
    buckets.all(|b| b == first).then_some(first)
}

fn score_bucket(score: f64) -> Confidence {
    let normalized = if score > 1.0 && score <= 100.0 {
        score / 100.0
    } else {
        score.min(1.0)
    };
    Confidence::from_score(normalized)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
