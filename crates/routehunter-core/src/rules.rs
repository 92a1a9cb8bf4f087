//! 规则文件加载（TOML）
//!
//! 规则只有两部分：判定“传输/安全设置记录”的标记键，以及入站标签的正则。
//! 两者都有内置默认值；规则文件中缺失的部分回落到默认值。
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, ScanError};

/// 内置标记键（按原样带引号匹配）
pub const DEFAULT_MARKERS: &[&str] = &[
    r#""tlsSettings""#,
    r#""realitySettings""#,
    r#""tcpSettings""#,
    r#""wsSettings""#,
    r#""httpSettings""#,
    r#""security""#,
];

/// 内置入站标签：`inbound-<端口>` 后跟 `{`，第 1 个捕获组为端口数字
pub const DEFAULT_LABEL_PATTERN: &str = r"inbound-([0-9]{1,5})\s*\{";

#[derive(Debug, Clone, Deserialize)]
struct MarkerSection {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelSection {
    #[serde(default)]
    pattern: Option<String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    markers: Option<MarkerSection>,
    #[serde(default)]
    label: Option<LabelSection>,
}

/// 归一化后的规则集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub markers: Vec<String>,
    pub label_pattern: String,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(|s| s.to_string()).collect(),
            label_pattern: DEFAULT_LABEL_PATTERN.to_string(),
        }
    }
}

impl RuleSet {
    /// 编译前的基本校验：标记非空、标签正则可编译且带捕获组
    pub(crate) fn validate(&self) -> Result<()> {
        if self.markers.iter().all(|m| m.is_empty()) {
            return Err(ScanError::Rules("marker list is empty".into()));
        }
        let rx = regex::bytes::Regex::new(&self.label_pattern)
            .map_err(|e| ScanError::Rules(format!("label pattern: {e}")))?;
        if rx.captures_len() < 2 {
            return Err(ScanError::Rules("label pattern needs a capture group for the port".into()));
        }
        Ok(())
    }
}

/// 从 TOML 规则文件加载并归一化为 RuleSet
pub fn load_rule_set(path: &Path) -> Result<RuleSet> {
    let txt = std::fs::read_to_string(path)?;
    parse_rule_set(&txt)
}

pub(crate) fn parse_rule_set(txt: &str) -> Result<RuleSet> {
    let parsed: RuleFile = toml::from_str(txt).map_err(|e| ScanError::Rules(e.to_string()))?;
    let mut rules = RuleSet::default();

    if let Some(section) = parsed.markers {
        rules.markers = section.keys.into_iter().filter(|k| !k.is_empty()).collect();
    }
    if let Some(pat) = parsed.label.and_then(|l| l.pattern) {
        rules.label_pattern = pat;
    }

    rules.validate()?;
    Ok(rules)
}
