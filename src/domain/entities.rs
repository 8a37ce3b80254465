//! Domain entities. Pure data structures for meal analysis.
//!
//! No HTTP/provider wire types here. Adapters map provider output into these.

use super::errors::AnalysisError;
use super::providers::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Minimum serving multiplier a food item may carry.
pub const MIN_SERVING_MULTIPLIER: f64 = 0.1;

/// Analysis quality mode. `Fast` selects each provider's cheaper model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Standard,
    Fast,
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(AnalysisMode::Standard),
            "fast" => Ok(AnalysisMode::Fast),
            other => Err(format!("unknown analysis mode '{}'", other)),
        }
    }
}

/// Kind of input a provider may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Text,
    Image,
    Barcode,
}

/// A single analysis request. Immutable once built.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    image: Option<Arc<Vec<u8>>>,
    text_query: Option<String>,
    prompt: String,
    mode: AnalysisMode,
    provider_hint: Option<ProviderId>,
}

impl AnalysisRequest {
    /// Text-only request.
    pub fn text(query: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image: None,
            text_query: Some(query.into()),
            prompt: prompt.into(),
            mode: AnalysisMode::default(),
            provider_hint: None,
        }
    }

    /// Image request. Add a text query with [`AnalysisRequest::with_text`] for extra context.
    pub fn image(bytes: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            image: Some(Arc::new(bytes)),
            text_query: None,
            prompt: prompt.into(),
            mode: AnalysisMode::default(),
            provider_hint: None,
        }
    }

    pub fn with_text(mut self, query: impl Into<String>) -> Self {
        self.text_query = Some(query.into());
        self
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_provider_hint(mut self, provider: ProviderId) -> Self {
        self.provider_hint = Some(provider);
        self
    }

    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_deref().map(Vec::as_slice)
    }

    pub(crate) fn image_arc(&self) -> Option<Arc<Vec<u8>>> {
        self.image.clone()
    }

    /// Text query, trimmed. Blank queries are treated as absent.
    pub fn text_query(&self) -> Option<&str> {
        self.text_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn provider_hint(&self) -> Option<ProviderId> {
        self.provider_hint
    }

    pub fn kind(&self) -> RequestKind {
        if self.image.is_some() {
            RequestKind::Image
        } else {
            RequestKind::Text
        }
    }

    /// At least one of image bytes or a non-blank text query must be present.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match (&self.image, self.text_query()) {
            (Some(bytes), _) if bytes.is_empty() => Err(AnalysisError::ImageProcessingFailed(
                "image payload is empty".to_string(),
            )),
            (None, None) => Err(AnalysisError::RequestCreationFailed(
                "request needs an image or a text query".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// What the analysed image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    #[default]
    FoodPhoto,
    MenuItem,
}

/// Confidence bucket reported by (or derived from) the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// ≥0.8 high, ≥0.5 medium, else low.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Confidence::High
        } else if score >= 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// One recognised food component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub portion_estimate: String,
    pub standard_serving: Option<String>,
    /// Always ≥ [`MIN_SERVING_MULTIPLIER`].
    pub serving_multiplier: f64,
    /// Grams, always ≥ 0.
    pub carbohydrates: f64,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
    pub assessment_notes: Option<String>,
}

impl FoodItem {
    pub fn new(
        name: impl Into<String>,
        portion_estimate: impl Into<String>,
        carbohydrates: f64,
    ) -> Self {
        Self {
            name: name.into(),
            portion_estimate: portion_estimate.into(),
            standard_serving: None,
            serving_multiplier: 1.0,
            carbohydrates: non_negative(carbohydrates),
            protein: None,
            fat: None,
            calories: None,
            assessment_notes: None,
        }
    }

    pub fn with_serving_multiplier(mut self, multiplier: f64) -> Self {
        self.serving_multiplier = clamp_multiplier(multiplier);
        self
    }

    pub fn with_protein(mut self, grams: Option<f64>) -> Self {
        self.protein = grams.map(non_negative);
        self
    }

    pub fn with_fat(mut self, grams: Option<f64>) -> Self {
        self.fat = grams.map(non_negative);
        self
    }

    pub fn with_calories(mut self, kcal: Option<f64>) -> Self {
        self.calories = kcal.map(non_negative);
        self
    }
}

/// Canonical analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub image_type: ImageType,
    /// Never empty.
    pub food_items: Vec<FoodItem>,
    pub total_carbohydrates: f64,
    pub total_protein: Option<f64>,
    pub total_fat: Option<f64>,
    pub total_calories: Option<f64>,
    pub confidence: Confidence,
    pub overall_description: Option<String>,
    pub portion_assessment_method: Option<String>,
    pub dietary_considerations: Option<String>,
    pub visual_assessment_details: Option<String>,
}

impl AnalysisResult {
    /// Build a result from items, computing any total the provider did not supply.
    ///
    /// An empty item list is replaced by a single generic item so downstream
    /// per-item arithmetic never sees zero items.
    pub fn from_items(mut food_items: Vec<FoodItem>, supplied: SuppliedTotals) -> Self {
        if food_items.is_empty() {
            food_items.push(FoodItem::fallback(&supplied));
        }

        let sum_optional = |f: fn(&FoodItem) -> Option<f64>| -> Option<f64> {
            food_items
                .iter()
                .filter_map(f)
                .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
        };

        let total_carbohydrates = supplied
            .carbohydrates
            .map(non_negative)
            .unwrap_or_else(|| food_items.iter().map(|i| i.carbohydrates).sum());
        let total_protein = supplied
            .protein
            .map(non_negative)
            .or_else(|| sum_optional(|i| i.protein));
        let total_fat = supplied
            .fat
            .map(non_negative)
            .or_else(|| sum_optional(|i| i.fat));
        let total_calories = supplied
            .calories
            .map(non_negative)
            .or_else(|| sum_optional(|i| i.calories));

        Self {
            image_type: ImageType::default(),
            food_items,
            total_carbohydrates,
            total_protein,
            total_fat,
            total_calories,
            confidence: Confidence::default(),
            overall_description: None,
            portion_assessment_method: None,
            dietary_considerations: None,
            visual_assessment_details: None,
        }
    }
}

/// Aggregate totals as supplied by a provider (each optional).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuppliedTotals {
    pub carbohydrates: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
}

/// Carbohydrate grams used when nothing at all could be read from the provider.
const FALLBACK_CARBOHYDRATES: f64 = 30.0;
const FALLBACK_CALORIES: f64 = 250.0;

impl FoodItem {
    /// Single generic item. Prefers provider totals when present.
    pub(crate) fn fallback(supplied: &SuppliedTotals) -> Self {
        let nothing_known = supplied.carbohydrates.is_none() && supplied.calories.is_none();
        let mut item = FoodItem::new(
            "Mixed meal",
            "1 serving (estimated)",
            supplied.carbohydrates.unwrap_or(FALLBACK_CARBOHYDRATES),
        )
        .with_protein(supplied.protein)
        .with_fat(supplied.fat)
        .with_calories(
            supplied
                .calories
                .or(nothing_known.then_some(FALLBACK_CALORIES)),
        );
        item.assessment_notes = Some(
            "No individual foods were identified; values are an overall estimate.".to_string(),
        );
        item
    }
}

pub(crate) fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

pub(crate) fn clamp_multiplier(v: f64) -> f64 {
    if v.is_finite() {
        v.max(MIN_SERVING_MULTIPLIER)
    } else {
        1.0
    }
}
