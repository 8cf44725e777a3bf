//! Nutrition advice and food-image analysis seam.
//!
//! The generative-AI service is reached through [`AdviceProvider`]; this
//! module owns prompt composition, response parsing, and failure
//! classification. Transport is up to the implementor.

use crate::{Error, FoodImageAnalysis, Language, Profile, Result};
use std::path::Path;

/// Marker in provider errors that indicates a bad or missing API key
const API_KEY_NOT_FOUND: &str = "Requested entity was not found.";

const ADVICE_FAILED: &str = "Failed to get nutrition advice";
const ANALYSIS_FAILED: &str = "Failed to analyze food image";

const ADVICE_PROMPT_TEMPLATE: &str = "Based on a Basal Metabolic Rate (BMR) of {calories} calories, \
please provide general healthy eating advice. Include suggestions for macronutrient distribution \
(carbs, protein, fat) and examples of suitable foods for each meal. Focus on balanced nutrition \
and sustainable habits. {language}";

const FOOD_ANALYSIS_PROMPT_TEMPLATE: &str = "You are a highly knowledgeable food and nutrition expert. \
Based on the provided image of food, accurately estimate the total calorie count (a numerical value \
in kcal, e.g., 350), provide a brief evaluation of its healthiness, and offer scientific dietary advice. \
Your response MUST be a JSON object, wrapped in a markdown code block like this: \
```json { \"estimatedCalories\": number | null, \"evaluation\": string, \"advice\": string } ```. \
If calorie estimation is not possible or the image does not clearly show food, set \"estimatedCalories\" \
to null and provide a helpful message in \"evaluation\" and \"advice\". {language}";

impl Language {
    /// Instruction appended to prompts so the model answers in this language
    pub fn response_instruction(&self) -> &'static str {
        match self {
            Language::En => "Respond in English.",
            Language::Zh => "请用中文回答。",
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Input for a nutrition advice request
///
/// Built only from a stored profile, so the BMR is always the value the
/// store computed.
#[derive(Clone, Debug, PartialEq)]
pub struct AdviceRequest {
    bmr: f64,
    goal: String,
    dietary_preferences: String,
    language: Language,
}

impl AdviceRequest {
    pub fn for_profile(
        profile: &Profile,
        goal: &str,
        dietary_preferences: &str,
        language: Language,
    ) -> Self {
        Self {
            bmr: profile.bmr,
            goal: goal.trim().to_string(),
            dietary_preferences: dietary_preferences.trim().to_string(),
            language,
        }
    }

    pub fn bmr(&self) -> f64 {
        self.bmr
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn dietary_preferences(&self) -> &str {
        &self.dietary_preferences
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// User prompt sent to the model
    pub fn prompt(&self) -> String {
        build_advice_prompt(self)
    }

    /// System instruction sent alongside the prompt
    pub fn system_instruction(&self) -> String {
        advice_system_instruction(self.language)
    }
}

/// An image payload for calorie estimation
#[derive(Clone, Debug, PartialEq)]
pub struct FoodImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl FoodImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read an image file, guessing the MIME type from its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_type_for(path).ok_or_else(|| {
            Error::Other(format!("Unsupported image type: {}", path.display()))
        })?;
        let data = std::fs::read(path)?;
        Ok(Self::new(mime_type, data))
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

// ============================================================================
// Provider
// ============================================================================

/// External generative-AI service
pub trait AdviceProvider {
    /// Free-text nutrition advice for the request
    fn nutrition_advice(&self, request: &AdviceRequest) -> Result<String>;

    /// Calorie estimate and commentary for a food photo
    fn analyze_food_image(&self, image: &FoodImage, language: Language)
        -> Result<FoodImageAnalysis>;
}

/// Ask the provider for advice, normalizing failures
///
/// Empty responses are treated as failed requests. No retries.
pub fn request_advice<P>(provider: &P, request: &AdviceRequest) -> Result<String>
where
    P: AdviceProvider + ?Sized,
{
    tracing::info!("Requesting nutrition advice for BMR {:.2}", request.bmr());

    match provider.nutrition_advice(request) {
        Ok(text) if text.trim().is_empty() => {
            tracing::warn!("Advice provider returned an empty response");
            Err(Error::RequestFailed(format!(
                "{}: Empty response from AI.",
                ADVICE_FAILED
            )))
        }
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!("Advice request failed: {}", e);
            Err(reclassify(e, ADVICE_FAILED))
        }
    }
}

/// Ask the provider to analyze an image, normalizing failures
pub fn request_food_analysis<P>(
    provider: &P,
    image: &FoodImage,
    language: Language,
) -> Result<FoodImageAnalysis>
where
    P: AdviceProvider + ?Sized,
{
    if image.data.is_empty() {
        return Err(Error::Other("Image is empty".into()));
    }
    tracing::info!(
        "Requesting food analysis for {} image ({} bytes)",
        image.mime_type,
        image.data.len()
    );

    provider.analyze_food_image(image, language).map_err(|e| {
        tracing::warn!("Food analysis failed: {}", e);
        reclassify(e, ANALYSIS_FAILED)
    })
}

/// Map a provider failure message onto an error kind
pub fn classify_failure(message: &str) -> Error {
    if message.contains(API_KEY_NOT_FOUND) {
        Error::ApiKey(
            "Requested entity was not found. Please ensure your API key is correctly configured."
                .into(),
        )
    } else {
        Error::RequestFailed(message.to_string())
    }
}

/// Classify a provider error and prefix generic failures with the operation
fn reclassify(error: Error, operation: &str) -> Error {
    let message = match error {
        Error::ApiKey(_) => return error,
        Error::RequestFailed(message) | Error::Other(message) => message,
        other => other.to_string(),
    };
    match classify_failure(&message) {
        Error::RequestFailed(message) => {
            Error::RequestFailed(format!("{}: {}", operation, message))
        }
        classified => classified,
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Compose the advice prompt
///
/// Goal and preferences are appended only when non-empty.
pub fn build_advice_prompt(request: &AdviceRequest) -> String {
    let mut prompt = ADVICE_PROMPT_TEMPLATE
        .replace("{calories}", &request.bmr.to_string())
        .replace("{language}", request.language.response_instruction());

    if !request.goal.is_empty() {
        prompt.push_str(&format!(" My specific goal is to {}.", request.goal));
    }
    if !request.dietary_preferences.is_empty() {
        prompt.push_str(&format!(
            " I have the following dietary preferences/restrictions: {}.",
            request.dietary_preferences
        ));
    }
    prompt.push_str(" Please provide detailed and actionable advice.");
    prompt
}

/// System instruction for the advice model
pub fn advice_system_instruction(language: Language) -> String {
    format!(
        "You are a highly knowledgeable and friendly nutrition expert. Provide clear, \
comprehensive, and encouraging advice on healthy eating, tailored to the user's calorie needs, \
goals, and preferences. Always prioritize health and sustainability. {}",
        language.response_instruction()
    )
}

/// Prompt sent with a food image
pub fn food_analysis_prompt(language: Language) -> String {
    FOOD_ANALYSIS_PROMPT_TEMPLATE.replace("{language}", language.response_instruction())
}

// ============================================================================
// Response parsing
// ============================================================================

/// Parse a model's food-analysis reply
///
/// Accepts a ```` ```json ```` fenced block or bare JSON. Anything that
/// does not parse becomes a fallback analysis with no calorie estimate.
pub fn parse_food_analysis(text: &str, language: Language) -> FoodImageAnalysis {
    let trimmed = text.trim();
    let body = extract_json_block(trimmed).unwrap_or(trimmed);

    match serde_json::from_str::<FoodImageAnalysis>(body) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!("Unexpected food analysis response format: {}", e);
            FoodImageAnalysis {
                estimated_calories: None,
                evaluation: format!(
                    "AI response format was unexpected. Please try with a clearer food image. ({})",
                    language.response_instruction()
                ),
                advice: format!(
                    "Ensure the image is clear and depicts food items. The AI might not have \
returned a valid JSON structure. ({})",
                    language.response_instruction()
                ),
            }
        }
    }
}

/// Body of the first ```` ```json ```` block, if any
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let body = rest[..end].trim();
    (!body.is_empty()).then_some(body)
}
