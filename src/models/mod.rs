use serde::{Deserialize, Deserializer, Serialize};

/// Structured nutrition estimate for one uploaded meal image.
///
/// Field names follow the response schema sent to the inference API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub food_name: String,
    pub serving_size: String,
    pub calories: f64,
    pub nutrients: Nutrients,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vitamins: Vitamins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Micronutrient estimates. A missing or null value is treated as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitamins {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vitamin_c: f64, // mg
    #[serde(default, deserialize_with = "null_as_default")]
    pub vitamin_d: f64, // mcg
    #[serde(default, deserialize_with = "null_as_default")]
    pub iron: f64, // mg
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Failure of the inference pipeline.
///
/// Every stage (transport, envelope, decoding) reports through this one
/// type so callers render a single shape: a tag, a message and a detail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid API response structure")]
    InvalidResponseStructure { details: serde_json::Value },
    #[error("API request failed after multiple retries.")]
    RetriesExhausted { details: String },
    #[error("Failed to decode the API's JSON response.")]
    DecodeFailed { details: String },
}

impl ApiError {
    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::InvalidResponseStructure { .. } => "invalid_response_structure",
            ApiError::RetriesExhausted { .. } => "retries_exhausted",
            ApiError::DecodeFailed { .. } => "decode_failed",
        }
    }

    pub fn details(&self) -> String {
        match self {
            ApiError::InvalidResponseStructure { details } => details.to_string(),
            ApiError::RetriesExhausted { details } | ApiError::DecodeFailed { details } => {
                details.clone()
            }
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ApiError", 3)?;
        s.serialize_field("kind", self.tag())?;
        s.serialize_field("error", &self.to_string())?;
        match self {
            ApiError::InvalidResponseStructure { details } => s.serialize_field("details", details)?,
            ApiError::RetriesExhausted { details } | ApiError::DecodeFailed { details } => {
                s.serialize_field("details", details)?
            }
        }
        s.end()
    }
}

/// Ordered meals recorded during one session.
///
/// Append-only: entries are never edited or removed. Dropping the session
/// drops the log.
#[derive(Debug, Clone, Default)]
pub struct MealLog {
    meals: Vec<MealAnalysis>,
}

impl MealLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a meal and returns its 1-based position.
    pub fn append(&mut self, meal: MealAnalysis) -> usize {
        self.meals.push(meal);
        self.meals.len()
    }

    pub fn meals(&self) -> &[MealAnalysis] {
        &self.meals
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}
