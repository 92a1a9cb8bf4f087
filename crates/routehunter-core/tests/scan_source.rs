use pretty_assertions::assert_eq;
use routehunter_core::{
    extract_spans, merge_candidates, scan_and_write, select_by_ids, Candidate, ScanError, ScanOptions,
    Scanner,
};
use std::collections::HashSet;

fn scanner() -> Scanner {
    Scanner::new(&ScanOptions::default()).unwrap()
}

/// 模拟数据库页：对象之间夹杂二进制帧数据
fn page(parts: &[&[u8]]) -> Vec<u8> {
    let mut buf = b"SQLite format 3\x00\x10\x00\x01\x01".to_vec();
    for p in parts {
        buf.extend_from_slice(b"\x00\x00\x8f\x13");
        buf.extend_from_slice(p);
    }
    buf
}

#[test]
fn tls_object_followed_by_label() {
    let buf = page(&[
        br#"{"streamSettings":{"network":"tcp","security":"tls","tlsSettings":{"serverName":"a.example.com"}}}"#,
        b"\x02\x07inbound-8443 {",
    ]);
    let report = scanner().scan_bytes(&buf);
    assert_eq!(report.candidates, vec![Candidate { id: 1, ..Candidate::tls(8443, "a.example.com") }]);
}

#[test]
fn ws_object_with_host_list() {
    let buf = page(&[
        br#"{"network":"ws","wsSettings":{"path":"/ws","headers":{"Host":["api.example.com"]}}}"#,
        b"inbound-2083 {}",
    ]);
    let report = scanner().scan_bytes(&buf);
    assert_eq!(
        report.candidates,
        vec![Candidate { id: 1, ..Candidate::http(2083, "api.example.com", "/ws") }]
    );
}

#[test]
fn unterminated_brace_run_yields_nothing() {
    let opts = ScanOptions { max_span_size: 1024, ..ScanOptions::default() };
    let mut buf = br#"{"tlsSettings":{"serverName":"a.example.com""#.to_vec();
    buf.extend(std::iter::repeat(b'{').take(4096));
    buf.extend_from_slice(b"inbound-443 {");
    let report = Scanner::new(&opts).unwrap().scan_bytes(&buf);
    assert!(report.candidates.is_empty());
    assert_eq!(report.stats.spans_total, 0);
}

#[test]
fn oversized_object_is_skipped_but_neighbours_survive() {
    let opts = ScanOptions { max_span_size: 256, window_span_size: 256, ..ScanOptions::default() };
    let filler = "x".repeat(512);
    let big = format!(r#"{{"tlsSettings":{{"serverName":"big.example"}},"pad":"{filler}"}}"#);
    let buf = page(&[
        big.as_bytes(),
        b"inbound-1000 {}",
        br#"{"tlsSettings":{"serverName":"small.example"}}"#,
        b"inbound-2000 {}",
    ]);
    let report = Scanner::new(&opts).unwrap().scan_bytes(&buf);
    let names: Vec<String> = report
        .candidates
        .iter()
        .map(|c| format!("{}:{}", c.kind(), c.port))
        .collect();
    assert_eq!(names, vec!["tls:2000"]);
}

#[test]
fn same_route_found_by_both_passes_is_merged_once() {
    // 第一个对象自带端口，只被正向找到；第二个对象之后的第一个标签端口无效，
    // 正向放弃它，反向则从有效标签回溯到它
    let buf = page(&[
        br#"{"port":443,"tlsSettings":{"serverName":"dup.example"}}"#,
        br#"{"realitySettings":{"serverNames":["DUP.example"]}}"#,
        b"inbound-0 {",
        b"inbound-443 {",
    ]);
    let report = scanner().scan_bytes(&buf);
    assert_eq!(report.stats.forward_candidates, 1);
    assert_eq!(report.stats.backward_candidates, 1);
    assert_eq!(report.candidates, vec![Candidate { id: 1, ..Candidate::tls(443, "dup.example") }]);
}

#[test]
fn merged_result_respects_union_bound_and_unique_keys() {
    let buf = page(&[
        br#"{"port":10001,"tlsSettings":{"serverName":"one.example"}}"#,
        b"inbound-10001 {}",
        br#"{"tcpSettings":{"header":{"request":{"path":["/t"],"headers":{"Host":["tcp.example"]}}}}}"#,
        b"inbound-10002 {}",
        br#"{"port":10003,"httpSettings":{"host":["h2.example"],"path":"/h2"}}"#,
        b"trailing-noise inbound-10004 {}",
        br#"{"wsSettings":{"headers":{"host":"late.example"}}}"#,
        b"inbound-10005 {",
    ]);
    let report = scanner().scan_bytes(&buf);
    let s = &report.stats;
    assert!(s.merged >= s.forward_candidates.max(s.backward_candidates));
    assert!(s.merged <= s.forward_candidates + s.backward_candidates);

    let keys: HashSet<_> = report.candidates.iter().map(Candidate::key).collect();
    assert_eq!(keys.len(), report.candidates.len());

    let ids: Vec<usize> = report.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, (1..=report.candidates.len()).collect::<Vec<_>>());
    // 反向把 C 对象关联到了 10004，键不同，因此多出一条
    assert_eq!((s.forward_candidates, s.backward_candidates, s.merged), (4, 4, 5));
    let tcp = Candidate::http(10002, "tcp.example", "/t");
    assert!(report.candidates.iter().any(|c| c.port == 10002 && c.route == tcp.route));
    assert!(report.candidates.iter().any(|c| c.port == 10004 && c.kind() == "http"));
}

#[test]
fn scanning_twice_gives_identical_ids() {
    let buf = page(&[
        br#"{"tlsSettings":{"serverName":"b.example"}}"#,
        b"inbound-444 {}",
        br#"{"tlsSettings":{"serverName":"a.example"}}"#,
        b"inbound-443 {}",
    ]);
    let s = scanner();
    let first = s.scan_bytes(&buf);
    assert_eq!(first, s.scan_bytes(&buf));
    assert_eq!(first, scanner().scan_bytes(&buf));
    assert_eq!(first.candidates[0].port, 444);
}

#[test]
fn arbitrary_binary_never_panics() {
    let mut seed: u32 = 7;
    let mut buf = Vec::with_capacity(64 * 1024);
    for _ in 0..64 * 1024 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        buf.push((seed & 0xff) as u8);
    }
    buf.extend_from_slice(br#"{"tlsSettings":{"serverName":"tail.example"}} inbound-9 {"#);
    let report = scanner().scan_bytes(&buf);
    let keys: HashSet<_> = report.candidates.iter().map(Candidate::key).collect();
    assert_eq!(keys.len(), report.candidates.len());
    assert!(report.candidates.iter().all(|c| c.port != 0));
    for pair in extract_spans(&buf, usize::MAX).windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}

#[test]
fn many_settings_keys_inside_strings_scan_in_linear_time() {
    // 引号错位使每个 `"tlsSettings":{` 的括号都落在字符串内，
    // 记录末尾才是真正的设置对象
    let n = 100_000;
    let mut record = br#"{"a":"x"#.to_vec();
    for _ in 0..n {
        record.extend_from_slice(br#""tlsSettings":{"#);
    }
    record.extend_from_slice(br#"","tlsSettings":{"serverName":"real.example"}}"#);
    let buf = page(&[&record, b"inbound-443 {"]);

    let opts = ScanOptions { threads: Some(1), ..ScanOptions::default() };
    let scanner = Scanner::new(&opts).unwrap();
    let started = std::time::Instant::now();
    let report = scanner.scan_bytes(&buf);
    let elapsed = started.elapsed();

    assert_eq!(report.stats.spans_total, 1);
    assert_eq!(report.candidates, vec![Candidate { id: 1, ..Candidate::tls(443, "real.example") }]);
    assert!(elapsed < std::time::Duration::from_secs(10), "scan took {elapsed:?}");
}

#[test]
fn missing_source_is_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let report = scanner().scan_path(&dir.path().join("absent.db")).unwrap();
    assert!(report.candidates.is_empty());
}

#[test]
fn unreadable_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // 目录可 stat 但不可作为文件读取
    let err = scanner().scan_path(dir.path()).unwrap_err();
    assert!(matches!(err, ScanError::SourceUnreadable { .. }), "{err:?}");
}

#[test]
fn scan_and_write_streams_json_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("x-ui.db");
    std::fs::write(
        &db,
        page(&[br#"{"tlsSettings":{"serverName":"file.example"}}"#, b"inbound-8443 {}"]),
    )
    .unwrap();

    let mut out = Vec::new();
    let stats = scan_and_write(&db, &mut out, &ScanOptions::default()).unwrap();
    assert_eq!(stats.merged, 1);
    let items: Vec<Candidate> = serde_json::from_slice(&out).unwrap();
    assert_eq!(items, vec![Candidate { id: 1, ..Candidate::tls(8443, "file.example") }]);
}

#[test]
fn custom_rules_file_changes_label_and_markers() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.toml");
    std::fs::write(
        &rules,
        "[markers]\nkeys = ['\"tlsSettings\"']\n\n[label]\npattern = 'tag:(\\d{1,5})'\n",
    )
    .unwrap();
    let opts = ScanOptions { rules_path: Some(rules), ..ScanOptions::default() };
    let buf = page(&[br#"{"tlsSettings":{"serverName":"c.example"}}"#, b"tag:7443"]);
    let report = Scanner::new(&opts).unwrap().scan_bytes(&buf);
    assert_eq!(report.candidates, vec![Candidate { id: 1, ..Candidate::tls(7443, "c.example") }]);
}

#[test]
fn select_after_merge() {
    let merged = merge_candidates(&[
        vec![Candidate::tls(1, "a"), Candidate::tls(2, "b")],
        vec![Candidate::tls(3, "c")],
    ]);
    let picked = select_by_ids(&merged, &[2]);
    assert_eq!(picked, vec![Candidate { id: 2, ..Candidate::tls(2, "b") }]);
}

#[test]
fn shipped_rules_file_matches_builtin_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rules/default.toml");
    let rules = routehunter_core::load_rule_set(&path).unwrap();
    assert_eq!(rules, routehunter_core::RuleSet::default());
}

#[test]
fn source_present_only_for_regular_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("x-ui.db");
    assert!(!routehunter_core::source_present(&db));
    assert!(!routehunter_core::source_present(dir.path()));
    std::fs::write(&db, b"").unwrap();
    assert!(routehunter_core::source_present(&db));
    assert!(scanner().scan_path(&db).unwrap().candidates.is_empty());
}
