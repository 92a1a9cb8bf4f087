//! 花括号对象切分（字节级状态机）
//!
//! 在任意二进制内容中找出“顶层、括号平衡”的 `{...}` 字节区间：
//! - 字符串内的括号不计数；反斜杠只转义紧随其后的一个字节；
//! - 只报告最外层对象，内部嵌套被吸收；
//! - 深度为 0 时的多余 `}` 直接忽略（容忍不平衡的噪声）；
//! - 按字节扫描，不做 UTF-8 解码，对象之间的二进制帧数据天然被跳过。

/// 缓冲区内的半开区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }

    /// 将窗口内的相对区间映射回全局偏移
    pub(crate) fn offset_by(self, base: usize) -> Self {
        Self { start: base + self.start, end: base + self.end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    Escaped,
}

/// 字符串之外的花括号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Open,
    Close,
}

/// 最外层对象的开闭事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceEvent {
    Opened,
    Closed,
}

#[derive(Debug)]
struct BraceScanner {
    state: ScanState,
    depth: usize,
}

impl BraceScanner {
    fn new() -> Self {
        Self { state: ScanState::Normal, depth: 0 }
    }

    /// 推进一个字节；深度为 0 时的多余 `}` 不产生记号
    fn step(&mut self, b: u8) -> Option<Brace> {
        match self.state {
            ScanState::Escaped => {
                self.state = ScanState::InString;
                None
            }
            ScanState::InString => {
                match b {
                    b'\\' => self.state = ScanState::Escaped,
                    b'"' => self.state = ScanState::Normal,
                    _ => {}
                }
                None
            }
            ScanState::Normal => match b {
                b'"' => {
                    self.state = ScanState::InString;
                    None
                }
                b'{' => {
                    self.depth += 1;
                    Some(Brace::Open)
                }
                b'}' if self.depth > 0 => {
                    self.depth -= 1;
                    Some(Brace::Close)
                }
                _ => None,
            },
        }
    }

    fn feed(&mut self, b: u8) -> Option<BraceEvent> {
        match self.step(b)? {
            Brace::Open => (self.depth == 1).then_some(BraceEvent::Opened),
            Brace::Close => (self.depth == 0).then_some(BraceEvent::Closed),
        }
    }
}

/// 单次从左到右扫描，返回所有长度不超过 `max_span_size` 的顶层对象
///
/// 结果按 `start` 严格递增且互不重叠。
pub fn extract_spans(buf: &[u8], max_span_size: usize) -> Vec<Span> {
    let mut out = Vec::new();
    let mut scanner = BraceScanner::new();
    let mut start: Option<usize> = None;

    for (i, &b) in buf.iter().enumerate() {
        match scanner.feed(b) {
            Some(BraceEvent::Opened) => start = Some(i),
            Some(BraceEvent::Closed) => {
                if let Some(s) = start.take() {
                    let span = Span { start: s, end: i + 1 };
                    // 超长对象在输出时静默丢弃
                    if span.len() <= max_span_size {
                        out.push(span);
                    }
                }
            }
            None => {}
        }
    }
    out
}

/// 对象内所有层级 `{` 与其配对 `}` 的位置表
///
/// 一次扫描建成；字符串内的括号与未闭合的 `{` 都不会出现在表中，
/// 之后按偏移查询配对位置为 O(log n)。
#[derive(Debug, Default)]
pub(crate) struct ObjectIndex {
    /// (左括号偏移, 右括号偏移)，按左括号偏移递增
    pairs: Vec<(usize, usize)>,
}

impl ObjectIndex {
    pub(crate) fn build(buf: &[u8]) -> Self {
        let mut scanner = BraceScanner::new();
        let mut open = Vec::new();
        let mut pairs = Vec::new();
        for (i, &b) in buf.iter().enumerate() {
            match scanner.step(b) {
                Some(Brace::Open) => open.push(i),
                Some(Brace::Close) => {
                    if let Some(o) = open.pop() {
                        pairs.push((o, i));
                    }
                }
                None => {}
            }
        }
        pairs.sort_unstable_by_key(|&(o, _)| o);
        Self { pairs }
    }

    /// 若 `offset` 处是字符串外且已闭合的 `{`，返回其对象区间（含首尾括号）
    pub(crate) fn object_at(&self, offset: usize) -> Option<Span> {
        let idx = self.pairs.binary_search_by_key(&offset, |&(o, _)| o).ok()?;
        let (start, close) = self.pairs[idx];
        Some(Span { start, end: close + 1 })
    }
}
