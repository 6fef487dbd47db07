//! 工具模块 - 通用工具函数
//!
//! # 内容
//!
//! - [`logger`] - tracing 初始化
//! - [`validation`] - 输入校验

pub mod logger;
pub mod validation;
