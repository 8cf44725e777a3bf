//! Basal Metabolic Rate via the Mifflin-St Jeor equation.
//!
//! `compute_bmr` performs no validation. The profile store checks
//! [`Metrics::validate`] before any BMR is stored.

use crate::{Error, Gender, Metrics, Result};
use std::fmt::Display;
use std::ops::RangeInclusive;

/// Compute BMR in kcal/day
///
/// - Male: `10w + 6.25h - 5a + 5`
/// - Female: `10w + 6.25h - 5a - 161`
///
/// The result is not rounded.
pub fn compute_bmr(gender: Gender, weight_kg: f64, height_cm: f64, age_years: u32) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age_years as f64;
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

/// Round a kcal value for display
pub fn format_kcal(kcal: f64) -> String {
    format!("{:.0}", kcal.round())
}

/// Accepted age in years
pub const AGE_RANGE: RangeInclusive<u32> = 1..=120;
/// Accepted height in cm
pub const HEIGHT_RANGE: RangeInclusive<f64> = 50.0..=250.0;
/// Accepted weight in kg
pub const WEIGHT_RANGE: RangeInclusive<f64> = 10.0..=300.0;

impl Metrics {
    /// BMR for these metrics
    pub fn bmr(&self) -> f64 {
        compute_bmr(self.gender, self.weight, self.height, self.age)
    }

    /// Reject metrics outside the supported input ranges
    ///
    /// NaN and infinities fail the range checks.
    pub fn validate(&self) -> Result<()> {
        if !AGE_RANGE.contains(&self.age) {
            return Err(out_of_range("age", self.age, &AGE_RANGE, "years"));
        }
        if !HEIGHT_RANGE.contains(&self.height) {
            return Err(out_of_range("height", self.height, &HEIGHT_RANGE, "cm"));
        }
        if !WEIGHT_RANGE.contains(&self.weight) {
            return Err(out_of_range("weight", self.weight, &WEIGHT_RANGE, "kg"));
        }
        Ok(())
    }
}

fn out_of_range<T: Display>(field: &str, value: T, range: &RangeInclusive<T>, unit: &str) -> Error {
    Error::InvalidMetrics(format!(
        "{} must be between {} and {} {}, got {}",
        field,
        range.start(),
        range.end(),
        unit,
        value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(gender: Gender, weight: f64, height: f64, age: u32) -> Metrics {
        Metrics {
            age,
            gender,
            height,
            weight,
        }
    }

    #[test]
    fn test_male_reference_value() {
        let bmr = compute_bmr(Gender::Male, 70.0, 175.0, 30);
        assert_eq!(bmr, 10.0 * 70.0 + 6.25 * 175.0 - 5.0 * 30.0 + 5.0);
        assert_eq!(bmr, 1648.75);
    }

    #[test]
    fn test_female_reference_value() {
        let bmr = compute_bmr(Gender::Female, 60.0, 165.0, 25);
        assert_eq!(bmr, 10.0 * 60.0 + 6.25 * 165.0 - 5.0 * 25.0 - 161.0);
        assert_eq!(bmr, 1345.25);
    }

    #[test]
    fn test_gender_offset_is_constant() {
        let samples = [
            (45.5, 150.0, 18),
            (70.0, 175.0, 30),
            (92.3, 188.4, 55),
            (120.0, 201.0, 80),
        ];
        for (w, h, a) in samples {
            let diff = compute_bmr(Gender::Male, w, h, a) - compute_bmr(Gender::Female, w, h, a);
            assert!((diff - 166.0).abs() < 1e-9, "diff was {}", diff);
        }
    }

    #[test]
    fn test_out_of_domain_inputs_do_not_panic() {
        let bmr = compute_bmr(Gender::Male, -10.0, 0.0, 200);
        assert_eq!(bmr, -100.0 - 1000.0 + 5.0);
    }

    #[test]
    fn test_metrics_bmr_matches_formula() {
        let m = metrics(Gender::Female, 60.0, 165.0, 25);
        assert_eq!(m.bmr(), compute_bmr(Gender::Female, 60.0, 165.0, 25));
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(metrics(Gender::Male, 70.0, 175.0, 30).validate().is_ok());
        assert!(matches!(
            metrics(Gender::Male, 70.0, 175.0, 0).validate(),
            Err(Error::InvalidMetrics(_))
        ));
        assert!(matches!(
            metrics(Gender::Male, 70.0, -1.0, 30).validate(),
            Err(Error::InvalidMetrics(_))
        ));
        assert!(matches!(
            metrics(Gender::Male, 0.0, 175.0, 30).validate(),
            Err(Error::InvalidMetrics(_))
        ));
        assert!(matches!(
            metrics(Gender::Male, f64::NAN, 175.0, 30).validate(),
            Err(Error::InvalidMetrics(_))
        ));
        assert!(matches!(
            metrics(Gender::Male, 70.0, f64::INFINITY, 30).validate(),
            Err(Error::InvalidMetrics(_))
        ));
    }

    #[test]
    fn test_validate_enforces_input_ranges() {
        // Bounds are inclusive
        assert!(metrics(Gender::Female, 10.0, 50.0, 1).validate().is_ok());
        assert!(metrics(Gender::Female, 300.0, 250.0, 120).validate().is_ok());

        for m in [
            metrics(Gender::Male, 70.0, 175.0, 121),
            metrics(Gender::Male, 70.0, 49.9, 30),
            metrics(Gender::Male, 70.0, 250.5, 30),
            metrics(Gender::Male, 9.5, 175.0, 30),
            metrics(Gender::Male, 300.1, 175.0, 30),
        ] {
            assert!(
                matches!(m.validate(), Err(Error::InvalidMetrics(_))),
                "expected {:?} to be rejected",
                m
            );
        }

        let err = metrics(Gender::Male, 70.0, 175.0, 121).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid metrics: age must be between 1 and 120 years, got 121"
        );
    }

    #[test]
    fn test_format_kcal_rounds() {
        assert_eq!(format_kcal(1648.75), "1649");
        assert_eq!(format_kcal(1345.25), "1345");
    }
}
