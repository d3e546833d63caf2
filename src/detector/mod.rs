//! 检测模块：文件清单匹配与证据推断核心逻辑
pub mod detector;
pub mod resolver;

// 导出核心接口
pub use self::detector::{FileDetector, MatchMap, MatchedFile};
pub use self::resolver::{deduce_engine, EVIDENCE_PREFIX};
