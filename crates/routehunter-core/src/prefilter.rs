//! 标记预筛（Aho-Corasick）
//!
//! 对象必须至少包含一个传输/安全设置标记键才进入字段提取；
//! 所有标记构建为一个自动机，一次扫描即可判定。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::{Result, ScanError};

/// 预筛器（线程安全，可跨线程共享）
#[derive(Debug, Clone)]
pub(crate) struct MarkerFilter {
    ac: AhoCorasick,
}

impl MarkerFilter {
    pub(crate) fn new(markers: &[String]) -> Result<Self> {
        let patterns: Vec<&[u8]> = markers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| m.as_bytes())
            .collect();
        if patterns.is_empty() {
            return Err(ScanError::Rules("marker list is empty".into()));
        }
        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .map_err(|e| ScanError::Rules(format!("marker automaton: {e}")))?;
        Ok(Self { ac })
    }

    pub(crate) fn matches(&self, hay: &[u8]) -> bool {
        self.ac.is_match(hay)
    }
}
