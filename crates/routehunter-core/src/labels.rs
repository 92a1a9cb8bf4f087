//! 入站标签扫描
//!
//! 标签形如 `inbound-443 {`，是记录之外携带端口号的文本线索。
//! 整个缓冲区只扫描一次，正向关联通过二分查找复用结果。
use regex::bytes::Regex;

use crate::error::{Result, ScanError};

/// 标签命中：匹配区间与解码后的端口值
///
/// 文本上接受 1~5 位数字，端口是否落在 1..=65535 由下游判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMatch {
    pub start: usize,
    pub end: usize,
    pub port: u32,
}

impl LabelMatch {
    /// 可用端口（1..=65535），否则为 None
    pub fn usable_port(&self) -> Option<u16> {
        port_in_range(self.port)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LabelScanner {
    re: Regex,
}

impl LabelScanner {
    pub(crate) fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| ScanError::Rules(format!("label pattern: {e}")))?;
        Ok(Self { re })
    }

    /// 全缓冲扫描，按出现顺序返回；端口组缺失或无法解析的命中被跳过
    pub(crate) fn scan(&self, buf: &[u8]) -> Vec<LabelMatch> {
        let mut out = Vec::new();
        for caps in self.re.captures_iter(buf) {
            let (Some(m0), Some(digits)) = (caps.get(0), caps.get(1)) else { continue };
            if let Some(port) = parse_port_digits(digits.as_bytes()) {
                out.push(LabelMatch { start: m0.start(), end: m0.end(), port });
            }
        }
        out
    }
}

/// 解析 1~5 位十进制数字；其他输入返回 None
pub(crate) fn parse_port_digits(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || digits.len() > 5 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(digits.iter().fold(0u32, |n, d| n * 10 + u32::from(d - b'0')))
}

pub(crate) fn port_in_range(n: u32) -> Option<u16> {
    u16::try_from(n).ok().filter(|p| *p != 0)
}

/// 在 `[from, to)` 内完整出现的第一个标签
pub(crate) fn first_within(labels: &[LabelMatch], from: usize, to: usize) -> Option<&LabelMatch> {
    let idx = labels.partition_point(|l| l.start < from);
    labels[idx..].iter().take_while(|l| l.start < to).find(|l| l.end <= to)
}
