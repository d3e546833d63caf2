//! 规则编译器核心
//! 将规则库展开为mark序列，按扩展名/锚定方式分桶，合并为RegexSet

use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use super::pattern::{CombinedPattern, CompiledRuleLibrary, ExtensionBucket, NO_EXT_KEY};
use crate::error::{DetectError, DetectResult};
use crate::rule::model::has_capturing_group;
use crate::rule::RuleLibrary;

/// 路径段边界前缀（串首或`/`之后）
/// 以该字面前缀开头的模式归入锚定子桶，合并时统一重新加回
const ANCHOR_PREFIX: &str = "(?:^|/)";

/// 分桶前的模式暂存：锚定/非锚定片段（片段文本, mark）
#[derive(Debug, Default)]
struct PendingBucket {
    anchored: Vec<(String, u32)>,
    unanchored: Vec<(String, u32)>,
}

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则库
    /// 失败即整体失败，不产出部分编译的引擎
    pub fn compile(rules: &RuleLibrary) -> DetectResult<CompiledRuleLibrary> {
        if rules.is_empty() {
            return Err(DetectError::EmptyRuleLibrary);
        }

        let start = Instant::now();
        let mut mark_labels = Vec::new();
        let mut pending: BTreeMap<String, PendingBucket> = BTreeMap::new();
        let mut stats = CompileStats::default();

        // 1. 展开规则为mark序列并分桶
        for (category, rules) in &rules.rulesets {
            for (name, patterns) in rules {
                for pattern in patterns.as_slice() {
                    if pattern.trim().is_empty() {
                        return Err(DetectError::EmptyPattern {
                            category: category.clone(),
                            name: name.clone(),
                        });
                    }
                    if has_capturing_group(pattern) {
                        return Err(DetectError::CapturingGroup {
                            category: category.clone(),
                            name: name.clone(),
                            pattern: pattern.clone(),
                        });
                    }

                    let mark = mark_labels.len() as u32;
                    mark_labels.push(format!("{category}.{name}"));

                    // 匹配按构造即忽略大小写：模式与路径统一转小写
                    let lowered = Self::normalize_pattern(pattern);
                    Self::register_pattern(&mut pending, &lowered, mark, &mut stats);
                }
            }
        }

        // 2. 每个桶的子桶排序后合并为RegexSet
        let mut buckets = BTreeMap::new();
        for (key, pend) in pending {
            buckets.insert(
                key,
                ExtensionBucket {
                    anchored: Self::build_combined(pend.anchored, true)?,
                    unanchored: Self::build_combined(pend.unanchored, false)?,
                },
            );
        }

        debug!(
            "Rule compile finished: {} patterns ({} anchored), {} buckets ({} extension-keyed), elapsed {:?}",
            mark_labels.len(),
            stats.anchored,
            buckets.len(),
            buckets.len().saturating_sub(usize::from(buckets.contains_key(NO_EXT_KEY))),
            start.elapsed()
        );

        Ok(CompiledRuleLibrary {
            mark_labels,
            buckets,
        })
    }

    /// 模式归一化：转小写并移除环视语法
    /// regex引擎不支持环视，校验阶段放行、编译前按兼容性处理移除
    fn normalize_pattern(pattern: &str) -> String {
        static LOOK_AROUND_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\(\?<?[=!][^()]*\)").unwrap());

        let lowered = pattern.to_lowercase();
        LOOK_AROUND_RE.replace_all(&lowered, "").into_owned()
    }

    /// 按扩展名与锚定方式注册单个模式
    fn register_pattern(
        pending: &mut BTreeMap<String, PendingBucket>,
        lowered: &str,
        mark: u32,
        stats: &mut CompileStats,
    ) {
        // 锚定前缀剥离，合并时重新加回
        let (fragment, anchored) = match lowered.strip_prefix(ANCHOR_PREFIX) {
            Some(rest) => (rest, true),
            None => (lowered, false),
        };
        if anchored {
            stats.anchored += 1;
        }

        // 识别尾部字面扩展名锚点，命中则按扩展名注册，否则进哨兵桶
        let extensions = Self::extract_extensions(lowered);
        let keys: Vec<String> = if extensions.is_empty() {
            vec![NO_EXT_KEY.to_string()]
        } else {
            extensions
        };

        for key in keys {
            let bucket = pending.entry(key).or_default();
            let sub = if anchored {
                &mut bucket.anchored
            } else {
                &mut bucket.unanchored
            };
            sub.push((fragment.to_string(), mark));
        }
    }

    /// 从模式尾部提取字面扩展名列表
    /// 识别 `\.ext$` 与 `\.(?:ext1|ext2)$` 两种形态，其余归无扩展名
    fn extract_extensions(pattern: &str) -> Vec<String> {
        static SINGLE_EXT_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\\\.([a-z0-9_]+)\$$").unwrap());
        static MULTI_EXT_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\\\.\(\?:([a-z0-9_|]+)\)\$$").unwrap());

        if let Some(caps) = SINGLE_EXT_RE.captures(pattern) {
            return vec![caps[1].to_string()];
        }
        if let Some(caps) = MULTI_EXT_RE.captures(pattern) {
            return caps[1].split('|').map(str::to_string).collect();
        }
        Vec::new()
    }

    /// 合并子桶片段为一个RegexSet
    /// 片段按（文本, mark）排序，重建的合并模式跨进程稳定、可diff
    fn build_combined(
        mut fragments: Vec<(String, u32)>,
        anchored: bool,
    ) -> DetectResult<Option<CombinedPattern>> {
        if fragments.is_empty() {
            return Ok(None);
        }

        fragments.sort();

        let marks: Vec<u32> = fragments.iter().map(|(_, mark)| *mark).collect();
        let patterns: Vec<String> = fragments
            .iter()
            .map(|(fragment, _)| {
                if anchored {
                    format!("{ANCHOR_PREFIX}(?:{fragment})")
                } else {
                    format!("(?:{fragment})")
                }
            })
            .collect();

        let set = RegexSet::new(&patterns)?;
        Ok(Some(CombinedPattern::new(set, marks)))
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    anchored: usize,
}
