//! Core domain types for the BMR profile manager.
//!
//! This module defines:
//! - Body metrics and gender
//! - Profiles (named metrics plus derived BMR)
//! - Advice language and food analysis results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Metrics
// ============================================================================

/// Gender branch of the Mifflin-St Jeor equation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Gender {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(crate::Error::InvalidMetrics(format!(
                "unknown gender '{}'",
                other
            ))),
        }
    }
}

/// Body metrics in metric units
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    /// Years
    pub age: u32,
    pub gender: Gender,
    /// Centimetres
    pub height: f64,
    /// Kilograms
    pub weight: f64,
}

// ============================================================================
// Profiles
// ============================================================================

/// Opaque unique profile identifier
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named metrics record with its derived BMR
///
/// Serialized flat: `{id, name, age, gender, height, weight, bmr}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(flatten)]
    pub metrics: Metrics,
    /// kcal/day, recomputed whenever the metrics are written
    pub bmr: f64,
}

// ============================================================================
// Advice Types
// ============================================================================

/// Language the advice service should respond in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "chinese" => Ok(Language::Zh),
            other => Err(crate::Error::Other(format!("unknown language '{}'", other))),
        }
    }
}

/// Calorie estimate and commentary for a photographed meal
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodImageAnalysis {
    /// None when the image could not be estimated
    #[serde(rename = "estimatedCalories", default)]
    pub estimated_calories: Option<f64>,
    pub evaluation: String,
    pub advice: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(" F ".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ZH".parse::<Language>().unwrap(), Language::Zh);
        assert_eq!("english".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_profile_serializes_flat() {
        let profile = Profile {
            id: ProfileId::from("abc"),
            name: "Alex".into(),
            metrics: Metrics {
                age: 30,
                gender: Gender::Male,
                height: 175.0,
                weight: 70.0,
            },
            bmr: 1648.75,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["gender"], "MALE");
        assert_eq!(value["age"], 30);
        assert!(value.get("metrics").is_none());

        let parsed: Profile = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_food_analysis_field_names() {
        let analysis: FoodImageAnalysis =
            serde_json::from_str(r#"{"evaluation": "e", "advice": "a"}"#).unwrap();
        assert_eq!(analysis.estimated_calories, None);

        let value = serde_json::to_value(FoodImageAnalysis {
            estimated_calories: Some(300.0),
            evaluation: "e".into(),
            advice: "a".into(),
        })
        .unwrap();
        assert_eq!(value["estimatedCalories"], 300.0);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ProfileId::generate(), ProfileId::generate());
    }
}
