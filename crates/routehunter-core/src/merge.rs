//! 合并与去重
use std::collections::HashSet;

use crate::types::{Candidate, CandidateKey};

/// 按去重键保序去重：同键只保留首次出现
#[derive(Debug, Default)]
pub(crate) struct Dedup {
    seen: HashSet<CandidateKey>,
}

impl Dedup {
    /// 首次出现返回 true
    pub(crate) fn insert(&mut self, c: &Candidate) -> bool {
        self.seen.insert(c.key())
    }
}

/// 单个来源内部去重（不分配 id）
pub(crate) fn dedup_in_order(items: Vec<Candidate>) -> Vec<Candidate> {
    let mut dedup = Dedup::default();
    items.into_iter().filter(|c| dedup.insert(c)).collect()
}

/// 依次消费各来源（调用方约定：正向在前、反向在后），
/// 未见过的键按出现顺序分配从 1 开始的连续 id；已见过的键直接丢弃，不做更新。
///
/// 同一键在两个来源中端口不同不会发生（端口是键的一部分），
/// 但同一记录被两个方向解析出不同端口时两者都会保留，先来源者 id 更小。
pub fn merge_candidates(sources: &[Vec<Candidate>]) -> Vec<Candidate> {
    let mut dedup = Dedup::default();
    let mut out = Vec::new();
    for c in sources.iter().flatten() {
        if dedup.insert(c) {
            out.push(Candidate { id: out.len() + 1, ..c.clone() });
        }
    }
    out
}

/// 按 id 选取候选项；id 列表为空表示全选
pub fn select_by_ids(candidates: &[Candidate], ids: &[usize]) -> Vec<Candidate> {
    if ids.is_empty() {
        return candidates.to_vec();
    }
    let wanted: HashSet<usize> = ids.iter().copied().collect();
    candidates.iter().filter(|c| wanted.contains(&c.id)).cloned().collect()
}
