//! # telemon-app
//!
//! TELEMON 바이너리 진입점.
//! 설정 로드, 디바이스별 파이프라인 구성, 시그널 기반 종료.

mod lifecycle;
mod settings;
mod supervisor;

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::supervisor::Supervisor;

/// 네트워크 디바이스 텔레메트리 수집기
///
/// gRPC dial-in 스트림을 구독해 라인 프로토콜로 시계열 DB에 적재
#[derive(Parser, Debug)]
#[command(name = "telemon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (TOML/JSON/YAML)
    #[arg(long, short = 'c', default_value = "telemon.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 설정만 검증하고 종료
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG가 있으면 우선
    let log_filter = format!(
        "telemon={0},telemon_app={0},telemon_core={0},telemon_network={0},telemon_pipeline={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let config = settings::load(&args.config)
        .map_err(|e| anyhow!("설정 로드 실패 ({}): {e}", args.config.display()))?;

    if args.check_config {
        println!(
            "설정 정상: 디바이스 {}개, 규칙 {}개, 싱크 {}",
            config.devices.len(),
            config.rules.len(),
            config.sink.url
        );
        return Ok(());
    }

    info!(
        devices = config.devices.len(),
        rules = config.rules.len(),
        sink = %config.sink.url,
        "TELEMON 시작"
    );

    let supervisor =
        Supervisor::from_config(&config).map_err(|e| anyhow!("파이프라인 구성 실패: {e}"))?;
    if supervisor.len() == 0 {
        warn!("구성된 파이프라인 없음");
    }

    let lifecycle = Arc::new(LifecycleManager::new());
    let shutdown = lifecycle.subscribe();
    let signal_task = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.wait_for_signal().await })
    };

    let reports = supervisor.run(shutdown).await;
    signal_task.abort();

    for report in &reports {
        info!(
            device = %report.device,
            reason = ?report.reason,
            delivered = report.stats.metrics_delivered,
            failed = report.stats.metrics_failed,
            "파이프라인 결과"
        );
    }
    if reports.is_empty() {
        warn!("실행된 파이프라인 없음");
    }

    info!("TELEMON 종료");
    Ok(())
}
