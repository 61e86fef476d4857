//! BMI 与运动量计算器

pub mod bmi;
pub mod exercise;

pub use bmi::{calculate_bmi, BmiCategory};
pub use exercise::{calculate_exercises, ExerciseResult};

use thiserror::Error;

/// 计算器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    /// 参数不是有限数字
    #[error("All provided values must be numbers.")]
    NotANumber(String),

    /// 身高或体重必须为正数
    #[error("Height and weight must be positive numbers.")]
    NonPositive,

    /// 没有提供任何一天的运动时长
    #[error("At least one day of exercise hours is required.")]
    EmptyPeriod,

    /// 目标或每日时长为负数
    #[error("Exercise hours and target cannot be negative.")]
    Negative,
}

/// 把命令行参数或查询参数解析成有限的数字
pub fn parse_number(arg: &str) -> Result<f64, CalculatorError> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CalculatorError::NotANumber(arg.to_string()))
}
