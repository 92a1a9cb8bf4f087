//! 扫描主流程与并行调度
use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::correlate::{correlate_backward, correlate_forward};
use crate::error::{Result, ScanError};
use crate::fields::FieldExtractor;
use crate::labels::{LabelMatch, LabelScanner};
use crate::merge::merge_candidates;
use crate::options::{ScanOptions, ScanStats};
use crate::rules::{load_rule_set, RuleSet};
use crate::spans::{extract_spans, Span};
use crate::types::Candidate;

/// 一次扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub candidates: Vec<Candidate>,
    pub stats: ScanStats,
}

/// 扫描器：规则与正则只编译一次，之后可对任意缓冲区重复调用
///
/// 扫描本身是缓冲区字节的纯函数，不保留跨调用状态。
#[derive(Debug)]
pub struct Scanner {
    opts: ScanOptions,
    labels: LabelScanner,
    extractor: FieldExtractor,
    pool: Option<rayon::ThreadPool>,
}

impl Scanner {
    pub fn new(opts: &ScanOptions) -> Result<Self> {
        let rules = match &opts.rules_path {
            Some(p) => load_rule_set(p)?,
            None => RuleSet::default(),
        };
        Self::with_rules(opts, &rules)
    }

    pub fn with_rules(opts: &ScanOptions, rules: &RuleSet) -> Result<Self> {
        rules.validate()?;
        let labels = LabelScanner::new(&rules.label_pattern)?;
        let extractor = FieldExtractor::new(rules)?;

        // 线程数>1 时正反两个方向并行；线程池构建失败则退回串行
        let threads = opts.effective_threads();
        let pool = if threads > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads.min(2)).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "thread pool unavailable, scanning serially");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { opts: opts.clone(), labels, extractor, pool })
    }

    /// 扫描数据源文件：不存在返回空结果；存在但读不了则报错，不返回部分结果
    pub fn scan_path(&self, path: &Path) -> Result<ScanReport> {
        let buf = match std::fs::read(path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "source not found, nothing to scan");
                return Ok(ScanReport::default());
            }
            Err(source) => return Err(ScanError::SourceUnreadable { path: path.to_path_buf(), source }),
        };
        Ok(self.scan_bytes(&buf))
    }

    /// 扫描内存中的缓冲区
    pub fn scan_bytes(&self, buf: &[u8]) -> ScanReport {
        let spans = extract_spans(buf, self.opts.max_span_size);
        let labels = self.labels.scan(buf);

        let (forward, backward) = match &self.pool {
            Some(pool) => pool.join(
                || self.forward(buf, &spans, &labels),
                || self.backward(buf, &labels),
            ),
            None => (self.forward(buf, &spans, &labels), self.backward(buf, &labels)),
        };

        let stats_fwd = forward.len();
        let stats_bwd = backward.len();
        // 合并顺序固定：正向在前、反向在后，保证 id 分配可复现
        let candidates = merge_candidates(&[forward, backward]);
        info!(
            forward = stats_fwd,
            backward = stats_bwd,
            merged = candidates.len(),
            "scan finished"
        );

        let stats = ScanStats {
            bytes_scanned: buf.len(),
            spans_total: spans.len(),
            labels_total: labels.len(),
            forward_candidates: stats_fwd,
            backward_candidates: stats_bwd,
            merged: candidates.len(),
        };
        ScanReport { candidates, stats }
    }

    fn forward(&self, buf: &[u8], spans: &[Span], labels: &[LabelMatch]) -> Vec<Candidate> {
        correlate_forward(buf, spans, labels, &self.extractor, self.opts.forward_window)
    }

    fn backward(&self, buf: &[u8], labels: &[LabelMatch]) -> Vec<Candidate> {
        correlate_backward(
            buf,
            labels,
            &self.extractor,
            self.opts.backward_window,
            self.opts.window_span_size,
        )
    }
}

/// 扫描数据源并将候选项以 JSON 数组写入 `out`
pub fn scan_and_write(source: &Path, out: &mut dyn Write, opts: &ScanOptions) -> Result<ScanStats> {
    let report = Scanner::new(opts)?.scan_path(source)?;
    write_candidates(out, &report.candidates)?;
    Ok(report.stats)
}

/// 将候选项逐个写成 JSON 数组
pub fn write_candidates(out: &mut dyn Write, candidates: &[Candidate]) -> Result<()> {
    write!(out, "[")?;
    for (i, c) in candidates.iter().enumerate() {
        if i > 0 {
            write!(out, ",")?;
        }
        serde_json::to_writer(&mut *out, c)?;
    }
    write!(out, "]")?;
    Ok(())
}

/// 数据源是否存在（常规文件）
pub fn source_present(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
