//! 错误类型
//!
//! 只有文件级 I/O 失败与配置错误会越过核心边界；
//! 解析层面的任何歧义都以“丢弃该记录”处理，不产生错误。
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// 数据源存在但无法读取（权限、I/O 故障等）；整次扫描中止
    #[error("cannot read source {path:?}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 规则文件或规则内容非法
    #[error("invalid rules: {0}")]
    Rules(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
