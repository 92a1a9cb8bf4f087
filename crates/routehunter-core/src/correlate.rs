//! 端口关联：正向（对象 → 其后的标签）与反向（标签 → 其前的对象）
//!
//! 两个方向互不依赖、无共享可变状态，可并行执行；
//! 各自输出按缓冲区/标签出现顺序排列，并在方向内部去重。
use tracing::debug;

use crate::fields::FieldExtractor;
use crate::labels::{first_within, LabelMatch};
use crate::merge::dedup_in_order;
use crate::spans::{extract_spans, Span};
use crate::types::Candidate;

/// 正向：对每个对象，优先用对象内端口字段；缺失时在对象结束后 `window` 字节内找第一个标签
pub fn correlate_forward(
    buf: &[u8],
    spans: &[Span],
    labels: &[LabelMatch],
    extractor: &FieldExtractor,
    window: usize,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for span in spans {
        let to = span.end.saturating_add(window).min(buf.len());
        let proximity = first_within(labels, span.end, to).map(|l| l.port);
        if let Some(c) = extractor.classify(span.bytes(buf), proximity) {
            out.push(c);
        }
    }
    let out = dedup_in_order(out);
    debug!(candidates = out.len(), "forward pass");
    out
}

/// 反向：对每个标签，在其前 `window` 字节内取最后一个完整对象，端口直接取自标签
pub fn correlate_backward(
    buf: &[u8],
    labels: &[LabelMatch],
    extractor: &FieldExtractor,
    window: usize,
    window_span_size: usize,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for label in labels {
        if label.usable_port().is_none() {
            continue;
        }
        let Some(span) = nearest_span_before(buf, label.start, window, window_span_size) else {
            continue;
        };
        if let Some(c) = extractor.classify_at_port(span.bytes(buf), label.port) {
            out.push(c);
        }
    }
    let out = dedup_in_order(out);
    debug!(candidates = out.len(), "backward pass");
    out
}

/// `[pos - window, pos)` 内最后一个完整的顶层对象（全局偏移）
pub(crate) fn nearest_span_before(buf: &[u8], pos: usize, window: usize, max_span_size: usize) -> Option<Span> {
    let pos = pos.min(buf.len());
    let base = pos.saturating_sub(window);
    extract_spans(&buf[base..pos], max_span_size)
        .pop()
        .map(|s| s.offset_by(base))
}
