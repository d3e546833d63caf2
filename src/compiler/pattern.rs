//! 编译后模式模型
//! 编译一次后只读，可跨线程并发查询

use std::collections::BTreeMap;

use regex::RegexSet;

/// 无扩展名哨兵桶的键
/// 模式尾部没有字面扩展名锚点时归入该桶，每条路径兜底查询
pub const NO_EXT_KEY: &str = "";

/// 子桶合并模式：同一桶内全部备选模式编译为一个RegexSet
/// 单次求值即可得到命中的全部备选分支序号（替代PCRE的(*MARK)定位）
#[derive(Debug)]
pub struct CombinedPattern {
    /// 合并后的模式集合（备选分支按片段文本排序，重建结果字节级稳定）
    set: RegexSet,
    /// 备选分支序号 -> 全局mark序号
    marks: Vec<u32>,
}

impl CombinedPattern {
    pub(crate) fn new(set: RegexSet, marks: Vec<u32>) -> Self {
        Self { set, marks }
    }

    /// 返回输入命中的首个mark（确定性排序下的第一个备选分支）
    pub fn first_mark(&self, input: &str) -> Option<u32> {
        self.set
            .matches(input)
            .iter()
            .next()
            .map(|alt| self.marks[alt])
    }

    /// 返回输入命中的全部mark
    pub fn all_marks(&self, input: &str) -> impl Iterator<Item = u32> + '_ {
        self.set
            .matches(input)
            .into_iter()
            .map(move |alt| self.marks[alt])
    }

    /// 备选分支数量
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// 合并后的模式文本列表（调试/稳定性校验用）
    pub fn patterns(&self) -> &[String] {
        self.set.patterns()
    }
}

/// 扩展名桶：锚定/非锚定两个子桶
/// 锚定子桶的模式要求从路径段边界（串首或`/`之后）开始匹配
#[derive(Debug, Default)]
pub struct ExtensionBucket {
    pub anchored: Option<CombinedPattern>,
    pub unanchored: Option<CombinedPattern>,
}

/// 编译后的规则库（构建后不可变）
#[derive(Debug)]
pub struct CompiledRuleLibrary {
    /// mark序号 -> 标签"Category.Name"（多模式规则的多个mark映射到同一标签）
    pub mark_labels: Vec<String>,
    /// 扩展名 -> 桶，BTreeMap保证键序确定（NO_EXT_KEY为哨兵桶）
    pub buckets: BTreeMap<String, ExtensionBucket>,
}

impl CompiledRuleLibrary {
    /// mark序号对应的标签
    #[inline]
    pub fn label(&self, mark: u32) -> &str {
        &self.mark_labels[mark as usize]
    }

    /// 指定扩展名的桶（None表示没有该扩展名的专属规则）
    pub fn bucket(&self, extension: &str) -> Option<&ExtensionBucket> {
        self.buckets.get(extension)
    }

    /// 无扩展名哨兵桶
    pub fn catch_all_bucket(&self) -> Option<&ExtensionBucket> {
        self.buckets.get(NO_EXT_KEY)
    }
}
