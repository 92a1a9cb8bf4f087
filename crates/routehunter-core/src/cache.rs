//! 候选项缓存文件：`{"updated_at": RFC3339, "items": [...]}`
//!
//! 写入均为原子操作：先写同目录临时文件，再 rename 覆盖。
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Candidate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    pub updated_at: String,
    pub items: Vec<Candidate>,
}

impl CacheFile {
    pub fn now(items: Vec<Candidate>) -> Self {
        Self { updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true), items }
    }
}

/// 写入带时间戳的缓存文件（格式化 JSON）
pub fn write_cache(path: &Path, items: &[Candidate]) -> Result<CacheFile> {
    let cache = CacheFile::now(items.to_vec());
    let body = serde_json::to_vec_pretty(&cache)?;
    write_atomic(path, &body)?;
    Ok(cache)
}

/// 扫描前先清空为 `{}`，失败的扫描不会留下过期条目
pub fn reset_cache(path: &Path) -> Result<()> {
    write_atomic(path, b"{}")
}

/// 读取缓存；空缓存（`{}`）或文件不存在返回 None
pub fn read_cache(path: &Path) -> Result<Option<CacheFile>> {
    let body = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value: serde_json::Value = serde_json::from_slice(&body)?;
    if value.as_object().map_or(false, |o| o.is_empty()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let tmp = dir.join(format!(".tmp-{}-{nanos:x}", std::process::id()));
    std::fs::write(&tmp, data)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
