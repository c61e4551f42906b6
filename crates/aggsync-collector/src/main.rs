//! Aggregate bar backfill CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use aggsync_collector::{
    modules, resolve, ConfigDocument, IngestStats, Overrides, PipelineError, Result,
};
use aggsync_core::{init_logging, LogConfig, LogFormat};
use aggsync_provider::{FetchError, PolygonClient, RecordFetcher};
use aggsync_store::{
    BatchLoader, MemoryAggregateStore, PgAggregateStore, SchemaManager, DEFAULT_BATCH_SIZE,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "aggsync-collector")]
#[command(about = "Historical aggregate bar backfill into PostgreSQL", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (TOML)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// 종목 코드 (설정 파일보다 우선, STOCK_TICKER가 있으면 그 값이 우선)
    #[arg(long)]
    ticker: Option<String>,

    /// 시작일 (YYYY-MM-DD 또는 epoch ms)
    #[arg(long)]
    start: Option<String>,

    /// 종료일 (YYYY-MM-DD 또는 epoch ms)
    #[arg(long)]
    end: Option<String>,

    /// 배치당 행 수
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE as u64, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// DB 없이 메모리 저장소로 적재 (수집/변환 점검용)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    if let Err(e) = init_logging(&LogConfig::new(&cli.log_level).with_format(cli.log_format)) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("Aggsync collector 시작");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("종료 신호 수신, 진행 중인 작업을 중단합니다");
                cancel.cancel();
            }
        });
    }

    let started = Instant::now();
    let mut stats = IngestStats::new();
    let result = run(&cli, &cancel, &mut stats).await;
    stats.elapsed = started.elapsed();

    stats.log_summary("백필");
    println!("{}", stats.summary_line());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "백필 실패");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, cancel: &CancellationToken, stats: &mut IngestStats) -> Result<()> {
    let document = ConfigDocument::load(&cli.config)?;
    let overrides = Overrides {
        ticker: cli.ticker.clone(),
        start: cli.start.clone(),
        end: cli.end.clone(),
        ..Default::default()
    }
    .with_env();
    let config = resolve(&document, &overrides)?;
    tracing::info!(
        range = %config.fetch.describe(),
        store = %config.store.target(),
        dry_run = cli.dry_run,
        "설정 로드 완료"
    );

    let client = PolygonClient::new(config.polygon).map_err(FetchError::Fatal)?;
    let fetcher = RecordFetcher::new(client, config.retry);
    let rows = modules::collect_rows(&fetcher, &config.fetch, cancel, stats).await?;

    let batch_size = usize::try_from(cli.batch_size).unwrap_or(usize::MAX);

    if cli.dry_run {
        let loader = BatchLoader::new(MemoryAggregateStore::new(), batch_size);
        modules::load_rows(&loader, &rows, cancel, stats).await?;
        tracing::info!(rows = loader.sink().len().await, "dry-run 적재 완료");
        return Ok(());
    }

    let db = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!("취소 요청 수신, 스키마 준비를 중단합니다");
            return Err(PipelineError::Cancelled);
        }
        provisioned = SchemaManager::provision(&config.store) => provisioned?,
    };
    let loader = BatchLoader::new(
        PgAggregateStore::new(&db, config.store.batch_timeout),
        batch_size,
    );
    let result = modules::load_rows(&loader, &rows, cancel, stats).await;
    db.close().await;

    result
}
