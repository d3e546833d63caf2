//! 规则模块：规则库数据模型定义与校验
pub mod model;

// 导出核心接口
pub use self::model::{RuleLibrary, RulePatterns};
