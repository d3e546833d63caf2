//! 证据推断器：将模糊的 Evidence.* 信号升级为单一引擎结论
//! 决策表严格按声明顺序求值，首条命中即返回——多条证据可能偶然共存
//! （如Unreal游戏附带Wolf时代冷饭文件），只有固定优先级能避免系统性误判

use log::debug;
use rustc_hash::FxHashSet;

use super::detector::MatchMap;

/// 证据标签前缀（仅作启发式输入，默认从最终结果中过滤）
pub const EVIDENCE_PREFIX: &str = "Evidence.";

/// Godot默认打包档案名（单档案即可确认）
const DEFAULT_ARCHIVE_NAME: &str = "data.pck";
/// 打包档案扩展名
const ARCHIVE_SUFFIX: &str = ".pck";
/// 可执行文件的平台后缀（`.x86`须排在`.x86_64`/`.x86_32`之后）
const EXECUTABLE_SUFFIXES: &[&str] = &[".exe", ".x86_64", ".x86_32", ".x86"];
/// macOS应用包的二进制目录，配对前改写为同级资源目录（档案不与二进制同目录）
const MACOS_BINARY_DIR: &str = "/contents/macos/";
const MACOS_RESOURCE_DIR: &str = "/contents/resources/";

/// 决策表规则形态
/// 每条规则独立可测，相对顺序即优先级
#[derive(Debug)]
enum DeductionRule {
    /// 多个证据标签同时出现 => 引擎
    AllOf {
        evidence: &'static [&'static str],
        engine: &'static str,
    },
    /// DOS模拟器证据出现 => 按固定顺序在年代引擎子表中二次判定
    DosEra {
        emulator: &'static str,
        eras: &'static [(&'static str, &'static str)],
    },
    /// 证据出现且模拟器证据缺席 => 引擎（区分跨年代共用的文件类型）
    WithoutEmulator {
        evidence: &'static str,
        emulator: &'static str,
        engine: &'static str,
    },
    /// 证据集合中至少命中min个 => 引擎（单个文件类型不足以定论）
    AtLeast {
        min: usize,
        evidence: &'static [&'static str],
        engine: &'static str,
    },
    /// 档案证据出现且可执行文件/档案名配对检查通过 => 引擎
    PairedArchive {
        evidence: &'static str,
        engine: &'static str,
    },
    /// 单证据兜底（档案格式本身无歧义）
    AnyOf {
        evidence: &'static [&'static str],
        engine: &'static str,
    },
}

/// 有序决策表
/// 顺序为经验调优结果：档案共存判定先于DOS模拟器判定先于单证据兜底，
/// 调整相对顺序会改变歧义输入的分类结果
static DEDUCTION_TABLE: &[DeductionRule] = &[
    DeductionRule::AllOf {
        evidence: &["Evidence.RGSS_ARCHIVE", "Evidence.RGSS_DLL"],
        engine: "GameEngine.RPGMaker",
    },
    DeductionRule::AllOf {
        evidence: &["Evidence.AIR_RUNTIME", "Evidence.SWF"],
        engine: "GameEngine.AdobeAIR",
    },
    DeductionRule::AllOf {
        evidence: &["Evidence.HDLL", "Evidence.HL_BYTECODE"],
        engine: "GameEngine.Heaps",
    },
    DeductionRule::DosEra {
        emulator: "Evidence.DOSBOX",
        eras: &[
            ("Evidence.BUILD_GRP", "GameEngine.Build"),
            ("Evidence.VSWAP", "GameEngine.Wolf3D"),
            ("Evidence.WAD", "GameEngine.idTech"),
        ],
    },
    DeductionRule::WithoutEmulator {
        evidence: "Evidence.WAD",
        emulator: "Evidence.DOSBOX",
        engine: "GameEngine.GoldSrc",
    },
    DeductionRule::AtLeast {
        min: 2,
        evidence: &["Evidence.XNB", "Evidence.XSB", "Evidence.XWB", "Evidence.XGS"],
        engine: "GameEngine.XNA",
    },
    DeductionRule::PairedArchive {
        evidence: "Evidence.PCK",
        engine: "GameEngine.Godot",
    },
    DeductionRule::AnyOf {
        evidence: &["Evidence.VIS"],
        engine: "GameEngine.Visionaire",
    },
];

/// 依据聚合匹配与文件清单推断引擎标签
/// 返回None表示证据不足，属正常结果而非错误
pub fn deduce_engine<S: AsRef<str>>(files: &[S], matches: &MatchMap) -> Option<&'static str> {
    let has = |label: &str| matches.contains_key(label);

    for rule in DEDUCTION_TABLE {
        let engine = match rule {
            DeductionRule::AllOf { evidence, engine } => {
                evidence.iter().all(|e| has(e)).then_some(*engine)
            }
            DeductionRule::DosEra { emulator, eras } => {
                if has(emulator) {
                    eras.iter().find(|(e, _)| has(e)).map(|(_, engine)| *engine)
                } else {
                    None
                }
            }
            DeductionRule::WithoutEmulator {
                evidence,
                emulator,
                engine,
            } => (has(evidence) && !has(emulator)).then_some(*engine),
            DeductionRule::AtLeast {
                min,
                evidence,
                engine,
            } => (evidence.iter().filter(|e| has(e)).count() >= *min).then_some(*engine),
            DeductionRule::PairedArchive { evidence, engine } => {
                (has(evidence) && has_paired_archives(files)).then_some(*engine)
            }
            DeductionRule::AnyOf { evidence, engine } => {
                evidence.iter().any(|e| has(e)).then_some(*engine)
            }
        };

        if let Some(engine) = engine {
            debug!("Deduction rule fired: {rule:?} -> {engine}");
            return Some(engine);
        }
    }

    None
}

/// 结构化配对检查：每个打包档案都须对应某个可执行文件的预期档案名
/// 其他引擎的工具链也会产出类似命名的.pck文件，宽松匹配的误报代价过高，
/// 因此出现任何"孤儿档案"即整体否决；唯一例外是单档案且名为保留默认名
fn has_paired_archives<S: AsRef<str>>(files: &[S]) -> bool {
    let mut archives: Vec<String> = Vec::new();
    let mut expected: FxHashSet<String> = FxHashSet::default();

    for file in files {
        let lowered = file.as_ref().to_lowercase();
        if lowered.ends_with(ARCHIVE_SUFFIX) {
            archives.push(lowered);
            continue;
        }

        // macOS包布局：二进制在Contents/MacOS，档案在同级Contents/Resources
        let candidate = match lowered.rfind(MACOS_BINARY_DIR) {
            Some(i) => format!(
                "{}{}{}",
                &lowered[..i],
                MACOS_RESOURCE_DIR,
                &lowered[i + MACOS_BINARY_DIR.len()..]
            ),
            None => lowered,
        };

        if let Some(stem) = EXECUTABLE_SUFFIXES
            .iter()
            .find_map(|suffix| candidate.strip_suffix(suffix))
        {
            expected.insert(format!("{stem}{ARCHIVE_SUFFIX}"));
        } else {
            // 无扩展名的Unix/macOS二进制：直接追加档案扩展名
            let basename = candidate.rsplit('/').next().unwrap_or(&candidate);
            if !basename.is_empty() && !basename.contains('.') {
                expected.insert(format!("{candidate}{ARCHIVE_SUFFIX}"));
            }
        }
    }

    if archives.is_empty() {
        return false;
    }

    // 常见单档案情形：保留默认名直接确认
    if archives.len() == 1 {
        let basename = archives[0].rsplit('/').next().unwrap_or(&archives[0]);
        if basename == DEFAULT_ARCHIVE_NAME {
            return true;
        }
    }

    archives.iter().all(|archive| expected.contains(archive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_of(labels: &[&str]) -> MatchMap {
        labels.iter().map(|label| (label.to_string(), 1)).collect()
    }

    const NO_FILES: &[&str] = &[];

    #[test]
    fn test_all_of_conjunction() {
        // 测试场景：两个档案证据共存 => 具体引擎
        let matches = matches_of(&["Evidence.RGSS_ARCHIVE", "Evidence.RGSS_DLL"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.RPGMaker"));

        // 只出现其一不足以定论
        let matches = matches_of(&["Evidence.RGSS_ARCHIVE"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), None);
    }

    #[test]
    fn test_dos_era_sub_decision() {
        // 测试场景：DOS模拟器证据触发子表，按固定顺序判定
        let matches = matches_of(&["Evidence.DOSBOX", "Evidence.VSWAP"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.Wolf3D"));

        let matches = matches_of(&["Evidence.DOSBOX", "Evidence.WAD"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.idTech"));

        // 子表多项同时命中时取首条
        let matches = matches_of(&["Evidence.DOSBOX", "Evidence.WAD", "Evidence.BUILD_GRP"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.Build"));

        // 模拟器在场但子表全不命中 => 落到后续规则
        let matches = matches_of(&["Evidence.DOSBOX"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), None);
    }

    #[test]
    fn test_wad_without_emulator() {
        // 测试场景：跨年代共用文件类型靠模拟器缺席区分
        let matches = matches_of(&["Evidence.WAD"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.GoldSrc"));
    }

    #[test]
    fn test_threshold_rule() {
        // 测试场景：小证据集中任意两个共存即定论
        let matches = matches_of(&["Evidence.XNB", "Evidence.XWB"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.XNA"));

        let matches = matches_of(&["Evidence.XNB"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), None);
    }

    #[test]
    fn test_priority_conjunction_beats_threshold() {
        // 测试场景：同时满足合取规则与阈值规则时，必须返回前者的结论
        let matches = matches_of(&[
            "Evidence.HDLL",
            "Evidence.HL_BYTECODE",
            "Evidence.XNB",
            "Evidence.XSB",
        ]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.Heaps"));
    }

    #[test]
    fn test_single_evidence_fallback() {
        // 测试场景：无歧义档案格式的单证据兜底
        let matches = matches_of(&["Evidence.VIS"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), Some("GameEngine.Visionaire"));
    }

    #[test]
    fn test_no_evidence_no_conclusion() {
        // 测试场景：证据不足返回None，不是错误
        assert_eq!(deduce_engine(NO_FILES, &MatchMap::default()), None);
        let matches = matches_of(&["GameEngine.Unity"]);
        assert_eq!(deduce_engine(NO_FILES, &matches), None);
    }

    #[test]
    fn test_pairing_default_archive_name() {
        // 测试场景：唯一档案且为保留默认名，无可执行文件也确认
        assert!(has_paired_archives(&["Data/data.pck"]));
        let matches = matches_of(&["Evidence.PCK"]);
        assert_eq!(
            deduce_engine(&["Data/data.pck"], &matches),
            Some("GameEngine.Godot")
        );
    }

    #[test]
    fn test_pairing_rejects_orphan_archive() {
        // 测试场景：档案路径与任何可执行文件的预期档案名不符 => 否决
        assert!(!has_paired_archives(&["Game.exe", "Sound/Game.pck"]));
        let matches = matches_of(&["Evidence.PCK"]);
        assert_eq!(deduce_engine(&["Game.exe", "Sound/Game.pck"], &matches), None);
    }

    #[test]
    fn test_pairing_by_executable_suffix() {
        // 测试场景：各平台后缀替换为档案扩展名后逐一配对
        assert!(has_paired_archives(&["Game.exe", "Game.pck"]));
        assert!(has_paired_archives(&["bin/game.x86_64", "bin/game.pck"]));
        // 无扩展名Unix二进制直接追加扩展名
        assert!(has_paired_archives(&["game", "game.pck"]));
        // 多档案须全部配对，一个孤儿即否决
        assert!(has_paired_archives(&[
            "Game.exe",
            "Game.pck",
            "Tools.x86",
            "Tools.pck"
        ]));
        assert!(!has_paired_archives(&["Game.exe", "Game.pck", "stray.pck"]));
    }

    #[test]
    fn test_pairing_macos_bundle() {
        // 测试场景：macOS二进制目录改写为资源目录后配对
        assert!(has_paired_archives(&[
            "Game.app/Contents/MacOS/Game",
            "Game.app/Contents/Resources/Game.pck"
        ]));
        assert!(!has_paired_archives(&[
            "Game.app/Contents/MacOS/Game",
            "Game.app/Contents/MacOS/Game.pck"
        ]));
    }

    #[test]
    fn test_pairing_requires_archive() {
        // 测试场景：无档案文件不触发确认
        assert!(!has_paired_archives(&["Game.exe"]));
        assert!(!has_paired_archives(NO_FILES));
    }
}
