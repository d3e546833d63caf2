//! 全局错误类型定义
//! 规则定义错误在编译期全部暴露，编译失败不产出半成品引擎

use thiserror::Error;

use regex::Error as RegexError;

/// 引擎核心错误枚举
#[derive(Error, Debug)]
pub enum DetectError {
    // ===================== 规则定义错误 =====================
    /// 规则库为空（无任何分类/规则）
    #[error("Rule library is empty")]
    EmptyRuleLibrary,

    /// 规则模式为空字符串
    #[error("Rule {category}.{name}: pattern is empty")]
    EmptyPattern { category: String, name: String },

    /// 规则模式包含捕获组（合并匹配依赖无捕获约定，捕获组会破坏备选分支定位）
    #[error("Rule {category}.{name}: regex \"{pattern}\" contains a capturing group")]
    CapturingGroup {
        category: String,
        name: String,
        pattern: String,
    },

    // ===================== 编译相关错误 =====================
    /// 正则表达式编译失败（正则语法错误/不支持的特性）
    #[error("Regex compilation failed: {0}")]
    RegexCompile(#[from] RegexError),
}

/// 全局Result类型别名
pub type DetectResult<T> = Result<T, DetectError>;
