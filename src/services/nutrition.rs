use serde_json::{json, Value};

use crate::models::{ApiError, MealAnalysis, MealLog};
use crate::services::gemini::{Content, GeminiRequest, GeminiService, GenerationConfig, InlineData, Part};

pub const NO_MEALS_SENTINEL: &str = "No meals to summarize.";
pub const SUMMARY_ERROR_PREFIX: &str = "Error generating summary:";

const MEAL_ANALYSIS_PROMPT: &str = "\
Analyze the food item in this image.
1. Identify the food item precisely.
2. Estimate the serving size (e.g., in grams or cups) based on the image approximately and accurately.
3. Based on the food and serving size, estimate the total calories.
4. Provide a breakdown of key nutrients: Protein (g), Carbohydrates (g), and Fat (g).
5. Provide a breakdown of key vitamins and minerals: Vitamin C (mg), Vitamin D (mcg), and Iron (mg).

Return the response as a JSON object with the following keys:
\"foodName\", \"servingSize\", \"calories\",
\"nutrients\" (an object with \"protein\", \"carbs\", \"fat\"),
and \"vitamins\" (an object with \"vitamin_c\", \"vitamin_d\", \"iron\").";

/// Response schema hint constraining the model to the `MealAnalysis` shape.
pub fn meal_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodName": {"type": "STRING"},
            "servingSize": {"type": "STRING"},
            "calories": {"type": "NUMBER"},
            "nutrients": {
                "type": "OBJECT",
                "properties": {
                    "protein": {"type": "NUMBER"},
                    "carbs": {"type": "NUMBER"},
                    "fat": {"type": "NUMBER"}
                }
            },
            "vitamins": {
                "type": "OBJECT",
                "properties": {
                    "vitamin_c": {"type": "NUMBER"},
                    "vitamin_d": {"type": "NUMBER"},
                    "iron": {"type": "NUMBER"}
                }
            }
        }
    })
}

/// Builds the image analysis payload from a base64 encoded JPEG.
pub fn meal_analysis_request(base64_jpeg: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: MEAL_ANALYSIS_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/jpeg".to_string(),
                        data: base64_jpeg.to_string(),
                    },
                },
            ],
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: meal_analysis_schema(),
        }),
    }
}

/// Turns the client's raw result into a meal analysis.
///
/// Upstream errors pass through untouched. Text that does not decode into
/// the expected shape becomes `ApiError::DecodeFailed` carrying the text.
pub fn parse_meal_analysis(raw: Result<String, ApiError>) -> Result<MealAnalysis, ApiError> {
    let text = raw?;
    serde_json::from_str(&text).map_err(|e| {
        log::error!("❌ Failed to decode meal analysis: {}", e);
        ApiError::DecodeFailed { details: text }
    })
}

/// One plain-text line per meal, as embedded in the summary prompt.
pub fn summary_line(meal: &MealAnalysis) -> String {
    format!(
        "- {}: {} kcal, {}g protein, {}g carbs, {}g fat, {}mg Vit C, {}mcg Vit D, {}mg Iron\n",
        meal.food_name,
        meal.calories,
        meal.nutrients.protein,
        meal.nutrients.carbs,
        meal.nutrients.fat,
        meal.vitamins.vitamin_c,
        meal.vitamins.vitamin_d,
        meal.vitamins.iron
    )
}

/// Builds the daily summary payload, or `None` for an empty log.
pub fn daily_summary_request(log: &MealLog) -> Option<GeminiRequest> {
    if log.is_empty() {
        return None;
    }

    let meals_text: String = log.meals().iter().map(summary_line).collect();

    let prompt = format!(
        "Based on the following list of meals consumed today, provide a nutritional summary.\n\
         \n\
         Meals Consumed:\n\
         {}\n\
         Your summary should include:\n\
         1. Total calorie intake.\n\
         2. Total protein, carbohydrates, and fat intake in grams.\n\
         3. Total intake of Vitamin C, Vitamin D, and Iron.\n\
         4. A brief analysis comparing the total intake to general daily recommendations.\n\
         5. Suggestions for what to include in the diet if any key nutrients, vitamins, or minerals seem low. Briefly mention the importance of each.\n\
         \n\
         Format the response as clean, readable text. Use markdown for headings and lists.",
        meals_text
    );

    Some(GeminiRequest {
        contents: vec![Content {
            parts: vec![Part::Text { text: prompt }],
        }],
        generation_config: None,
    })
}

impl GeminiService {
    pub async fn analyze_meal_image(&self, base64_jpeg: &str) -> Result<MealAnalysis, ApiError> {
        log::debug!("📸 Analyzing meal image ({} base64 bytes)", base64_jpeg.len());

        let request = meal_analysis_request(base64_jpeg);
        let analysis = parse_meal_analysis(self.call(&request).await)?;

        log::info!(
            "🍽️ Identified {} ({}) at {} kcal",
            analysis.food_name,
            analysis.serving_size,
            analysis.calories
        );
        Ok(analysis)
    }

    /// Prose report for the logged meals, or the no-meals sentinel for an
    /// empty log (without contacting the API).
    pub async fn daily_summary(&self, log: &MealLog) -> Result<String, ApiError> {
        let Some(request) = daily_summary_request(log) else {
            return Ok(NO_MEALS_SENTINEL.to_string());
        };

        log::info!("🤖 Requesting daily summary for {} meals", log.len());

        self.call(&request).await.map_err(|e| {
            log::error!("❌ Failed to generate summary: {}", e);
            e
        })
    }
}

/// User-facing text for a failed summary, shown in place of the report.
pub fn summary_error_message(err: &ApiError) -> String {
    format!("{} {}", SUMMARY_ERROR_PREFIX, err.details())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Nutrients, Vitamins};
    use crate::services::gemini::tests::{service, text_response, RecordingSleeper, ScriptedTransport};
    use std::sync::Arc;

    const APPLE_JSON: &str = r#"{"foodName":"Apple","servingSize":"1 medium (182g)","calories":95,"nutrients":{"protein":0.5,"carbs":25,"fat":0.3},"vitamins":{"vitamin_c":8.4,"vitamin_d":0,"iron":0.2}}"#;

    fn apple() -> MealAnalysis {
        serde_json::from_str(APPLE_JSON).unwrap()
    }

    fn rice() -> MealAnalysis {
        MealAnalysis {
            food_name: "Rice".to_string(),
            serving_size: "1 cup".to_string(),
            calories: 200.0,
            nutrients: Nutrients {
                protein: 4.0,
                carbs: 45.0,
                fat: 0.4,
            },
            vitamins: Vitamins {
                vitamin_c: 0.0,
                vitamin_d: 0.0,
                iron: 1.9,
            },
        }
    }

    fn prompt_of(request: &GeminiRequest) -> &str {
        match &request.contents[0].parts[0] {
            Part::Text { text } => text,
            other => panic!("expected text part, got {:?}", other),
        }
    }

    #[test]
    fn test_meal_analysis_request_shape() {
        let request = meal_analysis_request("BASE64DATA");
        let value = serde_json::to_value(&request).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("Identify the food item"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "BASE64DATA");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            value["generationConfig"]["responseSchema"]["properties"]["vitamins"]["properties"]["vitamin_d"]["type"],
            "NUMBER"
        );
    }

    #[test]
    fn test_parse_passes_errors_through() {
        let upstream = ApiError::RetriesExhausted {
            details: "dns failure".to_string(),
        };
        assert_eq!(parse_meal_analysis(Err(upstream.clone())), Err(upstream));
    }

    #[test]
    fn test_parse_rejects_undecodable_text() {
        for raw in ["not json at all", r#"{"foodName": "Soup"}"#, "[1, 2, 3]"] {
            let err = parse_meal_analysis(Ok(raw.to_string())).unwrap_err();
            assert_eq!(err.to_string(), "Failed to decode the API's JSON response.");
            assert_eq!(err.details(), raw);
        }
    }

    #[test]
    fn test_parse_accepts_conforming_text() {
        let meal = parse_meal_analysis(Ok(APPLE_JSON.to_string())).unwrap();
        assert_eq!(meal, apple());
    }

    #[test]
    fn test_summary_line_defaults_missing_vitamins() {
        let mut meal = apple();
        meal.vitamins = Vitamins::default();
        assert_eq!(
            summary_line(&meal),
            "- Apple: 95 kcal, 0.5g protein, 25g carbs, 0.3g fat, 0mg Vit C, 0mcg Vit D, 0mg Iron\n"
        );
    }

    #[test]
    fn test_summary_request_is_deterministic() {
        let mut log = MealLog::new();
        log.append(apple());
        log.append(rice());

        let first = daily_summary_request(&log).unwrap();
        let second = daily_summary_request(&log).unwrap();

        assert_eq!(first, second);
        assert!(first.generation_config.is_none());
        assert!(daily_summary_request(&MealLog::new()).is_none());
    }

    #[tokio::test]
    async fn test_analyze_meal_image_end_to_end() {
        let transport = Arc::new(ScriptedTransport::replying_text(APPLE_JSON));
        let gemini = service(transport.clone(), Arc::new(RecordingSleeper::default()));

        let meal = gemini.analyze_meal_image("BASE64DATA").await.unwrap();

        assert_eq!(meal.food_name, "Apple");
        assert_eq!(meal.calories, 95.0);
        let sent = transport.requests.lock().unwrap();
        assert_eq!(sent[0], meal_analysis_request("BASE64DATA"));
    }

    #[tokio::test]
    async fn test_empty_log_summary_makes_no_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let gemini = service(transport.clone(), Arc::new(RecordingSleeper::default()));

        let summary = gemini.daily_summary(&MealLog::new()).await.unwrap();

        assert_eq!(summary, "No meals to summarize.");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_returns_prose_verbatim() {
        let prose = "## Daily Summary\n\n**Total calories:** 295 kcal";
        let transport = Arc::new(ScriptedTransport::replying_text(prose));
        let gemini = service(transport.clone(), Arc::new(RecordingSleeper::default()));
        let mut log = MealLog::new();
        log.append(apple());
        log.append(rice());

        let summary = gemini.daily_summary(&log).await.unwrap();

        assert_eq!(summary, prose);
        let sent = transport.requests.lock().unwrap();
        let prompt = prompt_of(&sent[0]);
        assert!(prompt.contains(
            "- Apple: 95 kcal, 0.5g protein, 25g carbs, 0.3g fat, 8.4mg Vit C, 0mcg Vit D, 0.2mg Iron\n"
        ));
        assert!(prompt.contains(
            "- Rice: 200 kcal, 4g protein, 45g carbs, 0.4g fat, 0mg Vit C, 0mcg Vit D, 1.9mg Iron\n"
        ));
        assert!(prompt.contains("Total calorie intake."));
    }

    #[tokio::test]
    async fn test_summary_error_is_reported_as_text() {
        let failures = (0..5).map(|_| Err("503 Service Unavailable".to_string())).collect();
        let transport = Arc::new(ScriptedTransport::new(failures));
        let gemini = service(transport.clone(), Arc::new(RecordingSleeper::default()));
        let mut log = MealLog::new();
        log.append(apple());

        let err = gemini.daily_summary(&log).await.unwrap_err();
        let summary = summary_error_message(&err);

        assert!(summary.starts_with("Error generating summary:"));
        assert!(summary.ends_with("503 Service Unavailable"));
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn test_summary_structure_error_includes_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(serde_json::json!({"candidates": []}))]));
        let gemini = service(transport, Arc::new(RecordingSleeper::default()));
        let mut log = MealLog::new();
        log.append(rice());

        let err = gemini.daily_summary(&log).await.unwrap_err();

        assert_eq!(summary_error_message(&err), r#"Error generating summary: {"candidates":[]}"#);
    }

    #[tokio::test]
    async fn test_null_vitamins_are_logged_as_zero() {
        let reply = r#"{"foodName":"Bread","servingSize":"1 slice","calories":80,"nutrients":{"protein":3,"carbs":15,"fat":1},"vitamins":{"vitamin_c":null,"vitamin_d":null,"iron":0.9}}"#;
        let meal = parse_meal_analysis(Ok(reply.to_string())).unwrap();
        assert_eq!(meal.vitamins.vitamin_c, 0.0);
        assert_eq!(meal.vitamins.iron, 0.9);

        let reply = r#"{"foodName":"Bread","servingSize":"1 slice","calories":80,"nutrients":{"protein":3,"carbs":15,"fat":1},"vitamins":null}"#;
        let meal = parse_meal_analysis(Ok(reply.to_string())).unwrap();
        assert_eq!(meal.vitamins, Vitamins::default());
    }

    #[test]
    fn test_text_response_helper_matches_wire() {
        assert_eq!(
            text_response("x").pointer("/candidates/0/content/parts/0/text"),
            Some(&serde_json::json!("x"))
        );
    }
}
