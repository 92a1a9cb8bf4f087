//! 扫描选项与统计信息（模块）
use std::path::PathBuf;

/// 全缓冲正向扫描时单个对象的最大字节数；超过则丢弃
pub const DEFAULT_MAX_SPAN_SIZE: usize = 8_000_000;
/// 反向窗口内对象的最大字节数
pub const DEFAULT_WINDOW_SPAN_SIZE: usize = 4096;
/// 正向/反向关联的搜索窗口（字节）
pub const DEFAULT_FORWARD_WINDOW: usize = 4096;
pub const DEFAULT_BACKWARD_WINDOW: usize = 4096;

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 正向扫描（整个缓冲区）时允许的最大对象长度
    pub max_span_size: usize,
    /// 反向窗口内允许的最大对象长度
    pub window_span_size: usize,
    /// 对象结束后向后搜索标签的窗口
    pub forward_window: usize,
    /// 标签之前向前搜索对象的窗口
    pub backward_window: usize,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    /// 规则文件路径（TOML）；为空则使用内置规则
    pub rules_path: Option<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_span_size: DEFAULT_MAX_SPAN_SIZE,
            window_span_size: DEFAULT_WINDOW_SPAN_SIZE,
            forward_window: DEFAULT_FORWARD_WINDOW,
            backward_window: DEFAULT_BACKWARD_WINDOW,
            threads: None,
            rules_path: None,
        }
    }
}

impl ScanOptions {
    /// 实际使用的线程数（至少为 1）
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_scanned: usize,
    pub spans_total: usize,
    pub labels_total: usize,
    pub forward_candidates: usize,
    pub backward_candidates: usize,
    pub merged: usize,
}
