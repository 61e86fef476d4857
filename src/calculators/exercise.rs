use serde::Serialize;

use super::CalculatorError;

/// 一个周期内的运动统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
    pub period_length: usize,
    pub training_days: usize,
    pub success: bool,
    pub rating: u8,
    pub rating_description: String,
    pub target: f64,
    pub average: f64,
}

/// 根据每日运动小时数和每日目标计算评分
pub fn calculate_exercises(
    daily_hours: &[f64],
    target: f64,
) -> Result<ExerciseResult, CalculatorError> {
    if daily_hours.is_empty() {
        return Err(CalculatorError::EmptyPeriod);
    }
    if target < 0.0 || daily_hours.iter().any(|h| *h < 0.0) {
        return Err(CalculatorError::Negative);
    }

    let period_length = daily_hours.len();
    let training_days = daily_hours.iter().filter(|h| **h > 0.0).count();
    let total: f64 = daily_hours.iter().sum();
    let average = total / period_length as f64;
    let success = average >= target;

    let (rating, rating_description) = if success {
        (3, "Excellent work! You've met your target.")
    } else if average >= target * 0.8 {
        (2, "Not too bad but could be better.")
    } else {
        (1, "Target not reached. Try to exercise more.")
    };

    Ok(ExerciseResult {
        period_length,
        training_days,
        success,
        rating,
        rating_description: rating_description.to_string(),
        target,
        average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_below_target() {
        let result = calculate_exercises(&[3.0, 0.0, 2.0, 4.5, 0.0, 3.0, 1.0], 2.0).unwrap();
        assert_eq!(result.period_length, 7);
        assert_eq!(result.training_days, 5);
        assert!(!result.success);
        assert_eq!(result.rating, 2);
        assert!((result.average - 1.9285714285714286).abs() < 1e-12);
    }

    #[test]
    fn test_ratings() {
        assert_eq!(calculate_exercises(&[2.0, 2.0], 2.0).unwrap().rating, 3);
        assert_eq!(calculate_exercises(&[1.7], 2.0).unwrap().rating, 2);
        let low = calculate_exercises(&[0.0, 1.0], 2.0).unwrap();
        assert_eq!(low.rating, 1);
        assert_eq!(
            low.rating_description,
            "Target not reached. Try to exercise more."
        );
    }

    #[test]
    fn test_empty_period_rejected() {
        assert_eq!(
            calculate_exercises(&[], 2.0),
            Err(CalculatorError::EmptyPeriod)
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(calculate_exercises(&[1.0], 1.0).unwrap()).unwrap();
        assert_eq!(value["periodLength"], 1);
        assert_eq!(value["ratingDescription"], "Excellent work! You've met your target.");
    }
}
