//! Serving scaler. Pure arithmetic over an [`AnalysisResult`].

use super::entities::AnalysisResult;
use serde::Serialize;

/// Nutrient values of one item after scaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledItem {
    pub name: String,
    pub carbohydrates: f64,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
}

/// Totals and per-item values multiplied by `factor`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledTotals {
    pub factor: f64,
    pub carbohydrates: f64,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
    pub items: Vec<ScaledItem>,
}

/// Scale `result` from `original_servings` to `new_servings`.
///
/// `original_servings < 1` is treated as 1 so the factor is always finite.
pub fn rescale(result: &AnalysisResult, original_servings: f64, new_servings: f64) -> ScaledTotals {
    let original = if original_servings.is_finite() && original_servings >= 1.0 {
        original_servings
    } else {
        1.0
    };
    let new = if new_servings.is_finite() {
        new_servings.max(0.0)
    } else {
        0.0
    };
    let factor = new / original;
    let scale = |v: Option<f64>| v.map(|x| x * factor);

    ScaledTotals {
        factor,
        carbohydrates: result.total_carbohydrates * factor,
        protein: scale(result.total_protein),
        fat: scale(result.total_fat),
        calories: scale(result.total_calories),
        items: result
            .food_items
            .iter()
            .map(|item| ScaledItem {
                name: item.name.clone(),
                carbohydrates: item.carbohydrates * factor,
                protein: scale(item.protein),
                fat: scale(item.fat),
                calories: scale(item.calories),
            })
            .collect(),
    }
}

/// Per-serving view of a result that describes `servings` servings.
pub fn normalize(result: &AnalysisResult, servings: f64) -> ScaledTotals {
    rescale(result, servings, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FoodItem, SuppliedTotals};

    fn sample() -> AnalysisResult {
        AnalysisResult::from_items(
            vec![
                FoodItem::new("toast", "2 slices", 26.0)
                    .with_protein(Some(5.0))
                    .with_calories(Some(160.0)),
                FoodItem::new("jam", "1 tbsp", 13.0).with_calories(Some(50.0)),
            ],
            SuppliedTotals::default(),
        )
    }

    #[test]
    fn test_rescale_is_linear() {
        let result = sample();
        let same = rescale(&result, 2.0, 2.0);
        let double = rescale(&result, 2.0, 4.0);

        assert_eq!(same.factor, 1.0);
        assert_eq!(double.carbohydrates, same.carbohydrates * 2.0);
        assert_eq!(double.calories, same.calories.map(|c| c * 2.0));
        assert_eq!(double.protein, same.protein.map(|p| p * 2.0));
        for (d, s) in double.items.iter().zip(&same.items) {
            assert_eq!(d.carbohydrates, s.carbohydrates * 2.0);
            assert_eq!(d.calories, s.calories.map(|c| c * 2.0));
        }
    }

    #[test]
    fn test_small_original_is_treated_as_one() {
        let result = sample();
        let scaled = rescale(&result, 0.0, 3.0);
        assert_eq!(scaled.factor, 3.0);
        assert_eq!(scaled.carbohydrates, 39.0 * 3.0);
        assert_eq!(scaled.fat, None);
    }

    #[test]
    fn test_normalize_gives_per_serving_values() {
        let result = sample();
        let per_serving = normalize(&result, 3.0);
        assert!((per_serving.carbohydrates - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_does_not_touch_input() {
        let result = sample();
        let before = result.clone();
        let _ = rescale(&result, 1.0, 10.0);
        let _ = rescale(&result, 1.0, 10.0);
        assert_eq!(result, before);
    }
}
