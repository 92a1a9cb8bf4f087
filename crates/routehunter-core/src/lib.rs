//! 路由候选提取核心库
//!
//! 设计要点：
//! - 数据源（面板数据库文件）视为不透明字节序列，不解析其页/记录布局。
//! - 先按字节切分出顶层 `{...}` 对象，再用探针提取 SNI 或 Host/Path。
//! - 记录与端口之间只有文本邻近关系，因此正向、反向两次关联后取并集。
//! - 按 `(名称, [路径,] 端口)` 去重，id 在合并时按“正向在前、反向在后”顺序分配。
//! - 解析层面的任何异常都以丢弃记录处理；只有文件读取失败会返回错误。

mod cache;
mod correlate;
mod error;
mod fields;
mod labels;
mod merge;
mod options;
mod prefilter;
mod rules;
mod scan;
mod spans;
mod types;

pub use cache::{read_cache, reset_cache, write_cache, CacheFile};
pub use correlate::{correlate_backward, correlate_forward};
pub use error::{Result, ScanError};
pub use fields::FieldExtractor;
pub use labels::LabelMatch;
pub use merge::{merge_candidates, select_by_ids};
pub use options::{ScanOptions, ScanStats};
pub use rules::{load_rule_set, RuleSet, DEFAULT_LABEL_PATTERN, DEFAULT_MARKERS};
pub use scan::{scan_and_write, source_present, write_candidates, ScanReport, Scanner};
pub use spans::{extract_spans, Span};
pub use types::{Candidate, CandidateKey, Route};

/// 面板数据库的默认路径
pub const DEFAULT_SOURCE_PATH: &str = "/etc/x-ui/x-ui.db";
