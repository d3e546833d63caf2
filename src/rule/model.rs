//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化
//! 规则来源（INI/JSON 解析）由外部加载器负责，本模块只接收内存结构

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 完整规则库：分类名称 -> 规则名称 -> 一个或多个正则模式
/// BTreeMap保证遍历顺序确定，匹配结果不依赖规则声明顺序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleLibrary {
    pub rulesets: BTreeMap<String, BTreeMap<String, RulePatterns>>,
}

impl RuleLibrary {
    /// 规则库是否为空（无分类或所有分类均无规则）
    pub fn is_empty(&self) -> bool {
        self.rulesets.values().all(|rules| rules.is_empty())
    }
}

/// 规则模式值：单个模式或模式数组（兼容INI标量/数组两种写法）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulePatterns {
    Single(String),
    Multiple(Vec<String>),
}

impl RulePatterns {
    /// 统一展开为模式切片
    pub fn as_slice(&self) -> &[String] {
        match self {
            RulePatterns::Single(pattern) => std::slice::from_ref(pattern),
            RulePatterns::Multiple(patterns) => patterns.as_slice(),
        }
    }
}

/// 检测模式中的真实捕获组
/// 合并匹配依赖"备选分支序号 -> 规则"的定位约定，用户捕获组会错位该映射，
/// 因此 `(?:` 非捕获组、环视、`(*VERB)` 控制动词放行，命名捕获组视为捕获组。
/// 手写扫描器：跳过转义符与字符集内部，等价于PCRE方案的半精确检测
pub(crate) fn has_capturing_group(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    let mut in_class = false;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1, // 跳过转义字符
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'(' if !in_class => match bytes.get(i + 1) {
                // (*MARK) 等控制动词
                Some(b'*') => {}
                Some(b'?') => match bytes.get(i + 2) {
                    // (?<= (?<! 为环视，(?<name> 为命名捕获组
                    Some(b'<') => {
                        if !matches!(bytes.get(i + 3), Some(b'=') | Some(b'!')) {
                            return true;
                        }
                    }
                    // (?P<name> 命名捕获组（(?P=name 为反向引用，放行）
                    Some(b'P') => {
                        if matches!(bytes.get(i + 3), Some(b'<')) {
                            return true;
                        }
                    }
                    // (?'name' 命名捕获组
                    Some(b'\'') => return true,
                    // (?: (?= (?! (?> 及内联修饰符
                    _ => {}
                },
                // 普通捕获组
                _ => return true,
            },
            _ => {}
        }
        i += 1;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_group_is_capturing() {
        // 测试场景：普通分组视为捕获组
        assert!(has_capturing_group(r"(foo|bar)\.dll$"));
    }

    #[test]
    fn test_non_capturing_group_allowed() {
        // 测试场景：非捕获组放行
        assert!(!has_capturing_group(r"(?:^|/)unityplayer\.(?:dll|so)$"));
    }

    #[test]
    fn test_lookaround_allowed() {
        // 测试场景：前后环视放行
        assert!(!has_capturing_group(r"foo(?=\.dll)"));
        assert!(!has_capturing_group(r"foo(?!bar)"));
        assert!(!has_capturing_group(r"(?<=/)foo"));
        assert!(!has_capturing_group(r"(?<!bar)foo"));
    }

    #[test]
    fn test_named_group_is_capturing() {
        // 测试场景：命名捕获组按捕获组处理
        assert!(has_capturing_group(r"(?<name>foo)"));
        assert!(has_capturing_group(r"(?P<name>foo)"));
        assert!(has_capturing_group(r"(?'name'foo)"));
    }

    #[test]
    fn test_escaped_paren_allowed() {
        // 测试场景：转义括号与字符集内括号不是分组
        assert!(!has_capturing_group(r"foo\(bar\)"));
        assert!(!has_capturing_group(r"[()]foo"));
    }

    #[test]
    fn test_control_verb_allowed() {
        // 测试场景：PCRE控制动词放行
        assert!(!has_capturing_group(r"foo(*MARK:1)"));
    }

    #[test]
    fn test_rule_patterns_as_slice() {
        // 测试场景：标量与数组统一展开
        let single = RulePatterns::Single("a".to_string());
        let multi = RulePatterns::Multiple(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(single.as_slice().len(), 1);
        assert_eq!(multi.as_slice().len(), 2);
    }

    #[test]
    fn test_library_deserialize() {
        // 测试场景：从JSON反序列化规则库（外部加载器交付的内存结构）
        let lib: RuleLibrary = serde_json::from_value(serde_json::json!({
            "GameEngine": {
                "Unity": "(?:^|/)unityplayer\\.dll$",
                "Unreal": ["\\.pak$", "\\.uasset$"]
            }
        }))
        .unwrap();
        assert!(!lib.is_empty());
        let rules = &lib.rulesets["GameEngine"];
        assert_eq!(rules["Unreal"].as_slice().len(), 2);
    }
}
