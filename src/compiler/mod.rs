//! 编译模块：将原始规则编译为按扩展名分桶的合并匹配结构
pub mod pattern;
pub mod compiler;

pub use self::pattern::{CombinedPattern, CompiledRuleLibrary, ExtensionBucket, NO_EXT_KEY};
pub use self::compiler::RuleCompiler;
