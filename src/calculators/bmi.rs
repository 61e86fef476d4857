use serde::Serialize;
use std::fmt;

use super::CalculatorError;

/// BMI 分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    #[serde(rename = "Underweight")]
    Underweight,
    #[serde(rename = "Normal range")]
    NormalRange,
    #[serde(rename = "Overweight")]
    Overweight,
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::NormalRange => "Normal range",
            BmiCategory::Overweight => "Overweight",
        };
        f.write_str(text)
    }
}

/// 身高单位厘米，体重单位千克
pub fn calculate_bmi(height_cm: f64, weight_kg: f64) -> Result<BmiCategory, CalculatorError> {
    if !(height_cm.is_finite() && weight_kg.is_finite()) || height_cm <= 0.0 || weight_kg <= 0.0 {
        return Err(CalculatorError::NonPositive);
    }

    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);

    let category = if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::NormalRange
    } else {
        BmiCategory::Overweight
    };

    tracing::debug!(height_cm, weight_kg, bmi, %category, "计算 BMI");
    Ok(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(calculate_bmi(180.0, 74.0), Ok(BmiCategory::NormalRange));
        assert_eq!(calculate_bmi(180.0, 55.0), Ok(BmiCategory::Underweight));
        assert_eq!(calculate_bmi(180.0, 100.0), Ok(BmiCategory::Overweight));
    }

    #[test]
    fn test_boundaries() {
        // 100cm: bmi 等于体重
        assert_eq!(calculate_bmi(100.0, 18.5), Ok(BmiCategory::NormalRange));
        assert_eq!(calculate_bmi(100.0, 25.0), Ok(BmiCategory::Overweight));
        assert_eq!(calculate_bmi(100.0, 18.4), Ok(BmiCategory::Underweight));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(calculate_bmi(0.0, 70.0), Err(CalculatorError::NonPositive));
        assert_eq!(calculate_bmi(180.0, -1.0), Err(CalculatorError::NonPositive));
        assert_eq!(
            calculate_bmi(f64::NAN, 70.0),
            Err(CalculatorError::NonPositive)
        );
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(BmiCategory::NormalRange.to_string(), "Normal range");
        assert_eq!(
            serde_json::to_value(BmiCategory::NormalRange).unwrap(),
            serde_json::json!("Normal range")
        );
    }
}
