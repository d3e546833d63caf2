//! 检测器核心：对路径/文件清单执行分桶匹配，输出标签计数
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use super::resolver::{deduce_engine, EVIDENCE_PREFIX};
use crate::compiler::{CombinedPattern, CompiledRuleLibrary, RuleCompiler};
use crate::config::DetectorConfig;
use crate::error::DetectResult;
use crate::rule::RuleLibrary;

/// 聚合匹配结果：标签 -> 命中次数
pub type MatchMap = FxHashMap<String, u32>;

/// 单文件匹配记录（逐文件报告用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub path: String,
    pub label: String,
}

/// 文件检测器
/// 编译结构构建后只读，Arc共享，可跨线程并发查询
#[derive(Debug, Clone)]
pub struct FileDetector {
    compiled: Arc<CompiledRuleLibrary>,
    config: DetectorConfig,
}

impl FileDetector {
    /// 创建检测器（一次性编译规则库）
    pub fn new(rules: &RuleLibrary, config: DetectorConfig) -> DetectResult<Self> {
        let compiled = RuleCompiler::compile(rules)?;
        Ok(Self {
            compiled: Arc::new(compiled),
            config,
        })
    }

    /// 匹配单条路径，返回确定性顺序下的首个标签
    /// 路径须为正斜杠归一化的相对路径（归一化由外部调用方负责）
    pub fn match_path(&self, path: &str) -> Option<&str> {
        let lowered = path.to_lowercase();
        for combined in self.consult_order(&lowered) {
            if let Some(mark) = combined.first_mark(&lowered) {
                return Some(self.compiled.label(mark));
            }
        }
        None
    }

    /// 匹配单条路径，返回命中的全部标签（去重，桶顺序）
    pub fn match_all_labels(&self, path: &str) -> Vec<&str> {
        let lowered = path.to_lowercase();
        let mut labels: Vec<&str> = Vec::new();
        for combined in self.consult_order(&lowered) {
            for mark in combined.all_marks(&lowered) {
                let label = self.compiled.label(mark);
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels
    }

    /// 扫描文件清单，聚合各标签命中次数（原始计数，不做证据推断/过滤）
    /// 一条路径可同时计入多个标签（如 Evidence.* 与 GameEngine.*）
    pub fn match_file_list<S: AsRef<str>>(&self, files: &[S]) -> MatchMap {
        let mut matches = MatchMap::default();
        for file in files {
            let lowered = file.as_ref().to_lowercase();
            for combined in self.consult_order(&lowered) {
                for mark in combined.all_marks(&lowered) {
                    *matches
                        .entry(self.compiled.label(mark).to_string())
                        .or_insert(0) += 1;
                }
            }
        }
        matches
    }

    /// 逐文件匹配记录（一条路径命中多个标签则出现多次）
    pub fn get_matched_files<S: AsRef<str>>(&self, files: &[S]) -> Vec<MatchedFile> {
        let mut matched = Vec::new();
        for file in files {
            for label in self.match_all_labels(file.as_ref()) {
                matched.push(MatchedFile {
                    path: file.as_ref().to_string(),
                    label: label.to_string(),
                });
            }
        }
        matched
    }

    /// 对外检测接口：原始扫描 + 证据推断 + 证据标签过滤
    pub fn detect<S: AsRef<str>>(&self, files: &[S]) -> MatchMap {
        let mut matches = self.match_file_list(files);

        // 推断出的引擎标签计数固定为1，不覆盖直接命中的计数
        if let Some(engine) = deduce_engine(files, &matches) {
            debug!("Evidence resolution concluded engine: {engine}");
            matches.entry(engine.to_string()).or_insert(1);
        }

        if !self.config.keep_evidence {
            matches.retain(|label, _| !label.starts_with(EVIDENCE_PREFIX));
        }

        matches
    }

    /// 单条路径的子桶查询顺序：
    /// 扩展名桶（锚定 -> 非锚定），再哨兵桶（锚定 -> 非锚定）
    fn consult_order(&self, lowered: &str) -> impl Iterator<Item = &CombinedPattern> {
        let extension_bucket = Self::extension_of(lowered)
            .and_then(|ext| self.compiled.bucket(ext));
        let catch_all = self.compiled.catch_all_bucket();

        [extension_bucket, catch_all]
            .into_iter()
            .flatten()
            .flat_map(|bucket| [bucket.anchored.as_ref(), bucket.unanchored.as_ref()])
            .flatten()
    }

    /// 提取路径最后一段的扩展名（最后一个`.`之后的非空部分）
    fn extension_of(path: &str) -> Option<&str> {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rfind('.') {
            Some(i) if i + 1 < name.len() => Some(&name[i + 1..]),
            _ => None,
        }
    }
}
