//! Built-in estimator. No network, no credential.
//!
//! Matches keywords in the meal description against a small reference table
//! and answers in the same JSON shape the remote models use, so the rest of
//! the pipeline treats it like any other provider.

use super::error_mapping::classify;
use crate::domain::{AnalysisError, AnalysisRequest, ProviderId};
use crate::ports::{ProviderClient, RawResponse};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

struct Reference {
    keywords: &'static [&'static str],
    name: &'static str,
    serving: &'static str,
    carbs: f64,
    protein: f64,
    fat: f64,
    calories: f64,
}

#[rustfmt::skip]
const TABLE: &[Reference] = &[
    Reference { keywords: &["banana"], name: "Banana", serving: "1 medium (118g)", carbs: 27.0, protein: 1.3, fat: 0.4, calories: 105.0 },
    Reference { keywords: &["apple"], name: "Apple", serving: "1 medium (182g)", carbs: 25.0, protein: 0.5, fat: 0.3, calories: 95.0 },
    Reference { keywords: &["orange"], name: "Orange", serving: "1 medium (131g)", carbs: 15.0, protein: 1.2, fat: 0.2, calories: 62.0 },
    Reference { keywords: &["rice"], name: "Cooked rice", serving: "1 cup (158g)", carbs: 45.0, protein: 4.3, fat: 0.4, calories: 205.0 },
    Reference { keywords: &["pasta", "spaghetti", "noodle"], name: "Cooked pasta", serving: "1 cup (140g)", carbs: 43.0, protein: 8.0, fat: 1.3, calories: 220.0 },
    Reference { keywords: &["bread", "toast"], name: "Bread", serving: "1 slice (30g)", carbs: 15.0, protein: 3.0, fat: 1.0, calories: 80.0 },
    Reference { keywords: &["bagel"], name: "Bagel", serving: "1 medium (105g)", carbs: 55.0, protein: 11.0, fat: 1.7, calories: 289.0 },
    Reference { keywords: &["pizza"], name: "Pizza", serving: "1 slice (107g)", carbs: 36.0, protein: 12.0, fat: 10.0, calories: 285.0 },
    Reference { keywords: &["burger", "hamburger"], name: "Hamburger", serving: "1 burger (226g)", carbs: 40.0, protein: 25.0, fat: 20.0, calories: 450.0 },
    Reference { keywords: &["fries", "chips"], name: "French fries", serving: "1 medium (117g)", carbs: 48.0, protein: 4.0, fat: 17.0, calories: 365.0 },
    Reference { keywords: &["oatmeal", "porridge", "oats"], name: "Oatmeal", serving: "1 cup cooked (234g)", carbs: 27.0, protein: 6.0, fat: 3.6, calories: 166.0 },
    Reference { keywords: &["cereal"], name: "Breakfast cereal", serving: "1 cup (30g)", carbs: 24.0, protein: 2.0, fat: 1.0, calories: 110.0 },
    Reference { keywords: &["potato"], name: "Baked potato", serving: "1 medium (173g)", carbs: 37.0, protein: 4.3, fat: 0.2, calories: 161.0 },
    Reference { keywords: &["egg"], name: "Egg", serving: "1 large (50g)", carbs: 0.6, protein: 6.3, fat: 5.3, calories: 78.0 },
    Reference { keywords: &["chicken"], name: "Chicken breast", serving: "100g cooked", carbs: 0.0, protein: 31.0, fat: 3.6, calories: 165.0 },
    Reference { keywords: &["steak", "beef"], name: "Beef steak", serving: "100g cooked", carbs: 0.0, protein: 26.0, fat: 15.0, calories: 250.0 },
    Reference { keywords: &["salmon", "fish"], name: "Salmon", serving: "100g cooked", carbs: 0.0, protein: 22.0, fat: 12.0, calories: 206.0 },
    Reference { keywords: &["salad"], name: "Green salad", serving: "1 bowl (150g)", carbs: 7.0, protein: 2.0, fat: 0.3, calories: 35.0 },
    Reference { keywords: &["milk"], name: "Milk", serving: "1 cup (244g)", carbs: 12.0, protein: 8.0, fat: 8.0, calories: 149.0 },
    Reference { keywords: &["yogurt", "yoghurt"], name: "Yogurt", serving: "1 cup (245g)", carbs: 17.0, protein: 9.0, fat: 8.0, calories: 149.0 },
    Reference { keywords: &["cheese"], name: "Cheese", serving: "1 slice (28g)", carbs: 0.4, protein: 7.0, fat: 9.0, calories: 113.0 },
    Reference { keywords: &["soda", "cola"], name: "Soda", serving: "1 can (355ml)", carbs: 39.0, protein: 0.0, fat: 0.0, calories: 140.0 },
    Reference { keywords: &["juice"], name: "Orange juice", serving: "1 cup (248g)", carbs: 26.0, protein: 1.7, fat: 0.5, calories: 112.0 },
    Reference { keywords: &["cookie"], name: "Cookie", serving: "1 medium (15g)", carbs: 10.0, protein: 0.8, fat: 3.5, calories: 75.0 },
];

const WORD_NUMBERS: &[(&str, f64)] = &[
    ("a", 1.0),
    ("an", 1.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("half", 0.5),
];

/// Deterministic keyword-table estimator.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicAdapter;

impl BasicAdapter {
    pub fn new() -> Self {
        Self
    }

    fn estimate(request: &AnalysisRequest) -> Value {
        let description = request.text_query().unwrap_or_default().to_lowercase();
        let words: Vec<&str> = description
            .split(|c: char| !(c.is_alphanumeric() || c == '.'))
            .filter(|w| !w.is_empty())
            .collect();

        let mut items = Vec::new();
        for reference in TABLE {
            let Some(pos) = words
                .iter()
                .position(|w| reference.keywords.iter().any(|k| w.starts_with(k)))
            else {
                continue;
            };
            let quantity = pos
                .checked_sub(1)
                .and_then(|i| quantity_word(words[i]))
                .unwrap_or(1.0);
            items.push(json!({
                "name": reference.name,
                "portion_estimate": format!("{} x {}", quantity, reference.serving),
                "standard_serving": reference.serving,
                "serving_multiplier": quantity,
                "carbohydrates": reference.carbs * quantity,
                "protein": reference.protein * quantity,
                "fat": reference.fat * quantity,
                "calories": reference.calories * quantity,
            }));
        }

        if items.is_empty() {
            return json!({
                "image_type": "food_photo",
                "food_items": [{
                    "name": "Unidentified meal",
                    "portion_estimate": "1 typical plate",
                    "serving_multiplier": 1.0,
                    "carbohydrates": 45.0,
                    "calories": 400.0,
                    "assessment_notes": "No reference food recognised; generic meal values used.",
                }],
                "confidence": "low",
                "overall_description": "Generic estimate from the built-in table.",
                "portion_assessment_method": "Built-in reference table",
            });
        }

        json!({
            "image_type": "food_photo",
            "food_items": items,
            "confidence": "medium",
            "overall_description": format!("Estimated from description: {}", description.trim()),
            "portion_assessment_method": "Built-in reference table",
        })
    }
}

fn quantity_word(word: &str) -> Option<f64> {
    word.parse::<f64>()
        .ok()
        .filter(|q| q.is_finite() && *q > 0.0)
        .or_else(|| {
            WORD_NUMBERS
                .iter()
                .find(|(w, _)| *w == word)
                .map(|(_, q)| *q)
        })
}

#[async_trait::async_trait]
impl ProviderClient for BasicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Basic
    }

    async fn call(
        &self,
        request: &AnalysisRequest,
        _api_key: Option<&str>,
        _timeout: Duration,
    ) -> Result<RawResponse, AnalysisError> {
        let body = Self::estimate(request);
        debug!(
            items = body["food_items"].as_array().map_or(0, Vec::len),
            "basic estimate ready"
        );
        Ok(RawResponse::new(200, body.to_string()))
    }

    fn classify_error(&self, status: u16, body: &str) -> AnalysisError {
        classify(self.id(), status, body)
    }

    fn extract_text(&self, body: &str) -> Result<String, AnalysisError> {
        Ok(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::ResultParser;
    use crate::domain::Confidence;

    async fn analyse(text: &str) -> crate::domain::AnalysisResult {
        let adapter = BasicAdapter::new();
        let req = AnalysisRequest::text(text, "p");
        let raw = adapter.call(&req, None, Duration::from_secs(1)).await.unwrap();
        ResultParser::parse(&adapter.interpret(&raw).unwrap())
    }

    #[tokio::test]
    async fn test_single_banana() {
        let result = analyse("a banana").await;
        assert_eq!(result.food_items.len(), 1);
        assert_eq!(result.food_items[0].name, "Banana");
        assert_eq!(result.total_carbohydrates, 27.0);
        assert_eq!(result.total_calories, Some(105.0));
    }

    #[tokio::test]
    async fn test_quantity_prefix() {
        let result = analyse("2 eggs and toast").await;
        assert_eq!(result.food_items.len(), 2);
        let egg = result.food_items.iter().find(|i| i.name == "Egg").unwrap();
        assert_eq!(egg.serving_multiplier, 2.0);
        assert_eq!(egg.carbohydrates, 1.2);
    }

    #[tokio::test]
    async fn test_unknown_meal_is_low_confidence() {
        let result = analyse("mystery casserole").await;
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.total_carbohydrates, 45.0);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let adapter = BasicAdapter::new();
        let req = AnalysisRequest::text("rice and chicken", "p");
        let a = adapter.call(&req, None, Duration::from_secs(1)).await.unwrap();
        let b = adapter.call(&req, None, Duration::from_secs(1)).await.unwrap();
        assert_eq!(a, b);
    }
}
