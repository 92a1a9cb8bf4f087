use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use routehunter_core::{
    reset_cache, select_by_ids, source_present, write_cache, write_candidates, ScanOptions, Scanner,
    DEFAULT_SOURCE_PATH,
};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "routehunter", version, about = "从面板数据库中提取 SNI/HTTP 路由候选")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 扫描相关的公共参数
#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// 数据源文件（面板数据库）
    #[arg(long, default_value = DEFAULT_SOURCE_PATH)]
    source: PathBuf,

    /// 线程数（>1 时正反两个方向并行；"auto"=CPU 核心数）
    #[arg(long, default_value = "auto", value_parser = parse_threads)]
    threads: Threads,

    /// 规则文件路径（TOML），缺省使用内置规则
    #[arg(long)]
    rules: Option<PathBuf>,

    /// 单个对象的最大字节数（正向全缓冲扫描）
    #[arg(long)]
    max_span_size: Option<usize>,

    /// 对象与标签之间的最大距离（字节，正反两个方向共用）
    #[arg(long)]
    window: Option<usize>,
}

/// `--threads` 的取值；None 表示按 CPU 核心数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Threads(Option<usize>);

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描并写入带时间戳的缓存文件
    Scan {
        #[command(flatten)]
        args: ScanArgs,

        /// 缓存文件（JSON）
        #[arg(long, default_value = "./cache.json")]
        output: PathBuf,
    },
    /// 扫描并把候选项以 JSON 数组打印到标准输出
    List {
        #[command(flatten)]
        args: ScanArgs,

        /// 只输出这些 id（逗号分隔）；缺省输出全部
        #[arg(long, value_delimiter = ',')]
        ids: Vec<usize>,
    },
    /// 检查数据源是否存在
    Status {
        #[arg(long, default_value = DEFAULT_SOURCE_PATH)]
        source: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { args, output } => {
            info!(source = ?args.source, ?output, "starting scan");
            let scanner = Scanner::new(&build_options(&args)).context("load scan rules")?;

            reset_cache(&output).context("reset cache file")?;
            let report = scanner.scan_path(&args.source).context("scan source")?;
            write_cache(&output, &report.candidates).context("write cache file")?;

            let s = &report.stats;
            info!(
                bytes = s.bytes_scanned,
                spans = s.spans_total,
                labels = s.labels_total,
                forward = s.forward_candidates,
                backward = s.backward_candidates,
                merged = s.merged,
                "cache written"
            );
        }
        Commands::List { args, ids } => {
            let scanner = Scanner::new(&build_options(&args)).context("load scan rules")?;
            let report = scanner.scan_path(&args.source).context("scan source")?;
            let picked = select_by_ids(&report.candidates, &ids);

            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_candidates(&mut out, &picked).context("write candidates")?;
            writeln!(out)?;
            out.flush().ok();
        }
        Commands::Status { source } => {
            let status = serde_json::json!({
                "present": source_present(&source),
                "path": source.display().to_string(),
            });
            println!("{status}");
        }
    }

    Ok(())
}

/// 扫描统计与告警走 stderr，stdout 只留给 `list`/`status` 的 JSON；
/// 等级由 RUST_LOG 控制，缺省 info（`debug` 可看到两个方向各自的候选数）
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 组装扫描参数；未指定的项使用库默认值
fn build_options(args: &ScanArgs) -> ScanOptions {
    let mut opts = ScanOptions {
        threads: args.threads.0,
        rules_path: args.rules.clone(),
        ..ScanOptions::default()
    };
    if let Some(n) = args.max_span_size {
        opts.max_span_size = n;
    }
    if let Some(w) = args.window {
        opts.forward_window = w;
        opts.backward_window = w;
        opts.window_span_size = w;
    }
    opts
}

/// `auto` 或正整数；其他取值在参数解析阶段报错，而不是悄悄退回自动
fn parse_threads(s: &str) -> std::result::Result<Threads, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(Threads(None));
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Threads(Some(n))),
        _ => Err(format!("expected \"auto\" or a positive integer, got {s:?}")),
    }
}
