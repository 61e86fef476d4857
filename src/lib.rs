//! Patientor - 患者登记服务
//!
//! 患者与诊断登记、飞行日记，以及 BMI / 运动量计算器

pub mod calculators;
pub mod config;
pub mod diary;
pub mod error;
pub mod health;
pub mod seed;
pub mod server;
pub mod storage;
pub mod validation;

pub use anyhow::Result;
