//! 检测器配置,存储所有可配置项

/// 检测器配置
/// 每个检测器实例持有独立配置，避免共享可变全局状态
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    // 是否在最终结果中保留 Evidence.* 证据标签（默认过滤）
    pub keep_evidence: bool,
}

impl DetectorConfig {
    /// 获取默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 保留证据标签（链式配置）
    pub fn with_keep_evidence(mut self, keep: bool) -> Self {
        self.keep_evidence = keep;
        self
    }
}
