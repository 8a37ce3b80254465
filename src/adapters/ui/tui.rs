//! Implements InputPort. Inquire-based interactive prompts.
//!
//! One loop iteration: ask for a description and/or photo, analyse, print the
//! result scaled to the servings the user will eat.

use crate::adapters::ui::progress::SpinnerProgress;
use crate::domain::{
    AnalysisError, AnalysisMode, AnalysisRequest, AnalysisResult, ProviderId, rescale,
};
use crate::ports::InputPort;
use crate::usecases::{AnalysisOrchestrator, AnalysisOutcome, ResultSource};
use async_trait::async_trait;
use inquire::error::InquireError;
use inquire::{Confirm, CustomType, Select, Text};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Instructions sent with every request. The answer shape matches what the
/// result parser looks for first.
pub const NUTRITION_PROMPT: &str = r#"You are a nutrition assistant estimating the macronutrients of a meal.

Identify every distinct food item, estimate its portion, and estimate carbohydrates,
protein and fat in grams plus calories. Be conservative and state your assumptions.

Respond with valid JSON only, no markdown:
{
  "image_type": "food_photo | menu_item",
  "food_items": [
    {
      "name": "string",
      "portion_estimate": "string",
      "standard_serving": "string or null",
      "serving_multiplier": 1.0,
      "carbohydrates": 0,
      "protein": 0,
      "fat": 0,
      "calories": 0,
      "assessment_notes": "string or null"
    }
  ],
  "total_carbohydrates": 0,
  "total_protein": 0,
  "total_fat": 0,
  "total_calories": 0,
  "confidence": 0.0,
  "overall_description": "string",
  "portion_assessment_method": "string",
  "dietary_considerations": "string or null",
  "visual_assessment_details": "string or null"
}"#;

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    orchestrator: Arc<AnalysisOrchestrator>,
    spinner: Arc<SpinnerProgress>,
    default_mode: AnalysisMode,
    provider_hint: Option<ProviderId>,
}

impl TuiInputPort {
    pub fn new(
        orchestrator: Arc<AnalysisOrchestrator>,
        spinner: Arc<SpinnerProgress>,
        default_mode: AnalysisMode,
        provider_hint: Option<ProviderId>,
    ) -> Self {
        Self {
            orchestrator,
            spinner,
            default_mode,
            provider_hint,
        }
    }

    /// Ask for one meal. `None` when the user cancels.
    async fn prompt_request(&self) -> Result<Option<(AnalysisRequest, f64)>, AnalysisError> {
        let description = match Text::new("Describe the meal (leave empty to use a photo only):")
            .prompt()
        {
            Ok(d) => d,
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(prompt_error(e)),
        };
        let image_path = match Text::new("Path to a photo (optional):").prompt() {
            Ok(p) => p,
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(prompt_error(e)),
        };

        let modes = vec!["standard", "fast"];
        let starting = match self.default_mode {
            AnalysisMode::Standard => 0,
            AnalysisMode::Fast => 1,
        };
        let mode = match Select::new("Analysis mode:", modes)
            .with_starting_cursor(starting)
            .prompt()
        {
            Ok(m) => m.parse().unwrap_or(self.default_mode),
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(prompt_error(e)),
        };

        let servings = match CustomType::<f64>::new("Servings you will eat:")
            .with_default(1.0)
            .with_error_message("Enter a number, e.g. 1 or 1.5")
            .prompt()
        {
            Ok(s) => s,
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(prompt_error(e)),
        };

        let image_path = image_path.trim();
        let mut request = if image_path.is_empty() {
            AnalysisRequest::text(description, NUTRITION_PROMPT)
        } else {
            let bytes = read_image(PathBuf::from(image_path)).await?;
            AnalysisRequest::image(bytes, NUTRITION_PROMPT).with_text(description)
        };
        request = request.with_mode(mode);
        if let Some(hint) = self.provider_hint {
            request = request.with_provider_hint(hint);
        }
        Ok(Some((request, servings)))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), AnalysisError> {
        loop {
            let Some((request, servings)) = self.prompt_request().await? else {
                info!("analysis session cancelled");
                return Ok(());
            };

            self.spinner.start("analysing meal");
            let outcome = self.orchestrator.analyze(&request).await;
            self.spinner.finish();

            match outcome {
                Ok(outcome) => print_outcome(&outcome, servings),
                Err(e) => {
                    warn!(error = %e, "analysis failed");
                    println!("\nAnalysis failed: {}\n", e);
                }
            }

            match Confirm::new("Analyse another meal?").with_default(true).prompt() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(e) if is_cancel(&e) => return Ok(()),
                Err(e) => return Err(prompt_error(e)),
            }
        }
    }
}

async fn read_image(path: PathBuf) -> Result<Vec<u8>, AnalysisError> {
    tokio::fs::read(&path).await.map_err(|e| {
        AnalysisError::ImageProcessingFailed(format!("cannot read {}: {}", path.display(), e))
    })
}

fn is_cancel(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

fn prompt_error(e: InquireError) -> AnalysisError {
    AnalysisError::RequestCreationFailed(e.to_string())
}

fn grams(v: Option<f64>) -> String {
    v.map(|g| format!("{:.1} g", g))
        .unwrap_or_else(|| "-".to_string())
}

fn kcal(v: Option<f64>) -> String {
    v.map(|c| format!("{:.0} kcal", c))
        .unwrap_or_else(|| "-".to_string())
}

fn source_label(source: ResultSource) -> String {
    match source {
        ResultSource::Cache => "cache".to_string(),
        ResultSource::Provider(p) => p.to_string(),
    }
}

fn print_outcome(outcome: &AnalysisOutcome, servings: f64) {
    let result: &AnalysisResult = &outcome.result;
    println!();
    println!(
        "Source: {} | Strategy: {} | Confidence: {} | {}",
        source_label(outcome.source),
        outcome
            .strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        result.confidence,
        outcome.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    if let Some(description) = &result.overall_description {
        println!("{}", description);
    }
    println!();

    let scaled = rescale(result, 1.0, servings);
    for item in &scaled.items {
        println!(
            "  {:<28} carbs {:>8}  protein {:>8}  fat {:>8}  {:>10}",
            item.name,
            format!("{:.1} g", item.carbohydrates),
            grams(item.protein),
            grams(item.fat),
            kcal(item.calories),
        );
    }
    println!();
    println!(
        "Total for {} serving(s): carbs {:.1} g | protein {} | fat {} | {}",
        servings,
        scaled.carbohydrates,
        grams(scaled.protein),
        grams(scaled.fat),
        kcal(scaled.calories),
    );
    if let Some(notes) = &result.dietary_considerations {
        println!("Notes: {}", notes);
    }
    println!();
}
