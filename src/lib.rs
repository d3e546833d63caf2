//! rsfiledetect - 基于文件清单的游戏引擎识别引擎
//!
//! 输入：规则库（分类 -> 规则名 -> 正则模式）+ 扫描根目录下的相对路径列表，
//! 输出：标签匹配计数（`Category.Name` -> 次数）与启发式推断出的引擎标签。
//! 规则加载、目录遍历、结果打印均由外部调用方负责，本库不做任何 I/O。

// 导出全局错误类型
pub use self::error::{DetectError, DetectResult};

// 导出配置模块
pub use self::config::DetectorConfig;

// 导出规则模块核心接口
pub use self::rule::{RuleLibrary, RulePatterns};

// 导出编译模块核心接口
pub use self::compiler::{
    CombinedPattern, CompiledRuleLibrary, ExtensionBucket, RuleCompiler, NO_EXT_KEY,
};

// 导出检测模块核心接口
pub use self::detector::{
    deduce_engine, FileDetector, MatchMap, MatchedFile, EVIDENCE_PREFIX,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod detector;
