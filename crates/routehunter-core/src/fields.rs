//! 字段提取：把一个对象判定为 TLS 或 HTTP 路由记录
//!
//! 提取规则是一组按优先级排列的独立探针，每个探针只在对应的嵌套设置对象内查找，
//! 第一个命中的探针胜出，后续探针不再尝试。同名设置对象出现多次时依次尝试，
//! 直到某一个给出字段值；对象区间来自一次性建好的 `ObjectIndex`，
//! 整个判定的代价与对象长度成线性关系：
//! 1. `tlsSettings.serverName`
//! 2. `realitySettings.serverNames[0]`
//! 3. `tcpSettings.request.headers.Host`（path 取自 request）
//! 4. `wsSettings.headers.Host`（path 取自 wsSettings）
//! 5. `httpSettings.host`（path 取自 httpSettings）
use regex::bytes::Regex;

use crate::error::{Result, ScanError};
use crate::labels::{parse_port_digits, port_in_range};
use crate::prefilter::MarkerFilter;
use crate::rules::RuleSet;
use crate::spans::{ObjectIndex, Span};
use crate::types::{Candidate, Route};

type Probe = fn(&Patterns, &Doc<'_>) -> Option<Route>;

/// 探针顺序即优先级
const PROBES: &[Probe] = &[
    probe_tls_server_name,
    probe_reality_server_names,
    probe_tcp_request_host,
    probe_ws_host,
    probe_http2_host,
];

/// 预编译的字节级正则（`(?-u:[^"])` 允许值中出现非 UTF-8 字节）
#[derive(Debug, Clone)]
struct Patterns {
    port_field: Regex,
    tls_settings: Regex,
    reality_settings: Regex,
    tcp_settings: Regex,
    ws_settings: Regex,
    http_settings: Regex,
    request: Regex,
    headers: Regex,
    server_name: Regex,
    server_names: Regex,
    host_any_case: Regex,
    host_lower: Regex,
    path: Regex,
}

fn compile(pat: &str) -> Result<Regex> {
    Regex::new(pat).map_err(|e| ScanError::Rules(format!("field pattern {pat:?}: {e}")))
}

/// `"key" : {` 引导的嵌套对象
fn object_intro(key: &str) -> Result<Regex> {
    compile(&format!(r#""{key}"\s*:\s*\{{"#))
}

/// 值为字符串或字符串数组（取首元素）
fn string_or_first(key: &str, allow_empty: bool) -> Result<Regex> {
    let q = if allow_empty { "*" } else { "+" };
    compile(&format!(
        r#""{key}"\s*:\s*(?:"((?-u:[^"]){q})"|\[\s*"((?-u:[^"]){q})")"#
    ))
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            port_field: compile(r#""port"\s*:\s*([0-9]{1,5})"#)?,
            tls_settings: object_intro("tlsSettings")?,
            reality_settings: object_intro("realitySettings")?,
            tcp_settings: object_intro("tcpSettings")?,
            ws_settings: object_intro("wsSettings")?,
            http_settings: object_intro("httpSettings")?,
            request: object_intro("request")?,
            headers: object_intro("headers")?,
            server_name: compile(r#""serverName"\s*:\s*"((?-u:[^"])+)""#)?,
            server_names: compile(r#""serverNames"\s*:\s*\[\s*"((?-u:[^"])+)""#)?,
            host_any_case: string_or_first("(?:Host|host)", false)?,
            host_lower: string_or_first("host", false)?,
            path: string_or_first("path", true)?,
        })
    }
}

/// 待判定的对象及其括号配对表
struct Doc<'a> {
    buf: &'a [u8],
    index: ObjectIndex,
}

impl<'a> Doc<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, index: ObjectIndex::build(buf) }
    }

    fn root(&self) -> Span {
        Span { start: 0, end: self.buf.len() }
    }

    fn bytes(&self, span: Span) -> &'a [u8] {
        span.bytes(self.buf)
    }
}

/// `within` 内由 `intro` 引导的嵌套对象，按出现顺序逐个给出
///
/// 引导处的 `{` 位于字符串内或未闭合时跳过；已给出对象内部的命中也跳过，
/// 因此给出的对象互不重叠。
fn objects<'d>(doc: &'d Doc<'d>, within: Span, intro: &'d Regex) -> impl Iterator<Item = Span> + 'd {
    let mut covered = within.start;
    intro.find_iter(doc.bytes(within)).filter_map(move |m| {
        let open = within.start + m.end() - 1;
        if open < covered {
            return None;
        }
        let obj = doc.index.object_at(open)?;
        covered = obj.end;
        Some(obj)
    })
}

/// 取第一个非空捕获组的值（有损解码）
fn captured_value(hay: &[u8], re: &Regex) -> Option<String> {
    let caps = re.captures(hay)?;
    let m = caps.iter().skip(1).flatten().next()?;
    Some(String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// 主机名/SNI：去除首尾空白，空值视为未找到
fn name_value(hay: &[u8], re: &Regex) -> Option<String> {
    let v = captured_value(hay, re)?;
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// 路径：缺失或为空时取 `/`
fn path_value(hay: &[u8], re: &Regex) -> String {
    match captured_value(hay, re) {
        Some(p) if !p.trim().is_empty() => p,
        _ => "/".to_string(),
    }
}

fn probe_tls_server_name(p: &Patterns, doc: &Doc<'_>) -> Option<Route> {
    objects(doc, doc.root(), &p.tls_settings)
        .find_map(|tls| name_value(doc.bytes(tls), &p.server_name))
        .map(|server_name| Route::Tls { server_name })
}

fn probe_reality_server_names(p: &Patterns, doc: &Doc<'_>) -> Option<Route> {
    objects(doc, doc.root(), &p.reality_settings)
        .find_map(|reality| name_value(doc.bytes(reality), &p.server_names))
        .map(|server_name| Route::Tls { server_name })
}

fn probe_tcp_request_host(p: &Patterns, doc: &Doc<'_>) -> Option<Route> {
    objects(doc, doc.root(), &p.tcp_settings).find_map(|tcp| {
        objects(doc, tcp, &p.request).find_map(|request| {
            let host = objects(doc, request, &p.headers)
                .find_map(|headers| name_value(doc.bytes(headers), &p.host_any_case))?;
            Some(Route::Http { host, path: path_value(doc.bytes(request), &p.path) })
        })
    })
}

fn probe_ws_host(p: &Patterns, doc: &Doc<'_>) -> Option<Route> {
    objects(doc, doc.root(), &p.ws_settings).find_map(|ws| {
        let host = objects(doc, ws, &p.headers)
            .find_map(|headers| name_value(doc.bytes(headers), &p.host_any_case))?;
        Some(Route::Http { host, path: path_value(doc.bytes(ws), &p.path) })
    })
}

fn probe_http2_host(p: &Patterns, doc: &Doc<'_>) -> Option<Route> {
    objects(doc, doc.root(), &p.http_settings).find_map(|h2| {
        let host = name_value(doc.bytes(h2), &p.host_lower)?;
        Some(Route::Http { host, path: path_value(doc.bytes(h2), &p.path) })
    })
}

/// 字段提取器（编译一次，跨线程只读共享）
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    markers: MarkerFilter,
    patterns: Patterns,
}

impl FieldExtractor {
    pub fn new(rules: &RuleSet) -> Result<Self> {
        Ok(Self { markers: MarkerFilter::new(&rules.markers)?, patterns: Patterns::new()? })
    }

    /// 不含任何设置标记的对象直接丢弃；否则按探针优先级提取路由
    pub fn route_of(&self, span: &[u8]) -> Option<Route> {
        if !self.markers.matches(span) {
            return None;
        }
        let doc = Doc::new(span);
        PROBES.iter().find_map(|probe| probe(&self.patterns, &doc))
    }

    /// 对象内第一个 `"port": <数字>` 字段（仅 1..=65535 有效）
    pub fn explicit_port(&self, span: &[u8]) -> Option<u16> {
        let caps = self.patterns.port_field.captures(span)?;
        port_in_range(parse_port_digits(caps.get(1)?.as_bytes())?)
    }

    /// 正向判定：优先使用对象内的端口字段，缺失时使用调用方按邻近关系找到的端口
    pub fn classify(&self, span: &[u8], proximity_port: Option<u32>) -> Option<Candidate> {
        let route = self.route_of(span)?;
        let port = self
            .explicit_port(span)
            .or_else(|| proximity_port.and_then(port_in_range))?;
        Some(Candidate { id: 0, port, route })
    }

    /// 反向判定：端口直接取自标签，忽略对象内的端口字段
    pub fn classify_at_port(&self, span: &[u8], port: u32) -> Option<Candidate> {
        let port = port_in_range(port)?;
        let route = self.route_of(span)?;
        Some(Candidate { id: 0, port, route })
    }
}
