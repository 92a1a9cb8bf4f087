//! 公共类型（对外暴露）
use serde::{Deserialize, Serialize};

/// 路由定义：TLS 按 SNI 分流，HTTP 按 Host + 路径前缀分流
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Route {
    Tls {
        #[serde(rename = "serverName")]
        server_name: String,
    },
    Http { host: String, path: String },
}

/// 候选项（对应缓存文件 items 数组的单个元素）
///
/// `id` 只在合并阶段分配；各关联阶段产出的候选项 `id` 为 0。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: usize,
    pub port: u16,
    #[serde(flatten)]
    pub route: Route,
}

/// 去重键：主机名大小写不敏感，路径大小写敏感
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateKey {
    Tls { server_name: String, port: u16 },
    Http { host: String, path: String, port: u16 },
}

impl Candidate {
    pub fn tls(port: u16, server_name: impl Into<String>) -> Self {
        Self { id: 0, port, route: Route::Tls { server_name: server_name.into() } }
    }

    pub fn http(port: u16, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self { id: 0, port, route: Route::Http { host: host.into(), path: path.into() } }
    }

    pub fn key(&self) -> CandidateKey {
        match &self.route {
            Route::Tls { server_name } => CandidateKey::Tls {
                server_name: server_name.to_lowercase(),
                port: self.port,
            },
            Route::Http { host, path } => CandidateKey::Http {
                host: host.to_lowercase(),
                path: path.clone(),
                port: self.port,
            },
        }
    }

    /// "tls" 或 "http"
    pub fn kind(&self) -> &'static str {
        match self.route {
            Route::Tls { .. } => "tls",
            Route::Http { .. } => "http",
        }
    }
}
