//! Example: verify one barcode against the registry and print the verdict.
//!
//! Usage: cargo run -p scancheck --example verify_barcode -- --barcode ABC123 [--base-url URL] [--by-barcode] [--timeout-secs N]

use scancheck::{
    DetectionSource, LookupClient, LookupConfig, ManualDetector, PrimaryEndpoint, ScanController,
    ScanSession, TracingSink,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scancheck=info")),
        )
        .init();
    let args: Vec<String> = std::env::args().collect();
    let mut config = LookupConfig::default();
    let mut barcode = String::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--barcode" => {
                i += 1;
                barcode = args.get(i).cloned().unwrap_or_default();
            }
            "--base-url" => {
                i += 1;
                config.base_url = args.get(i).cloned().unwrap_or_default();
            }
            "--by-barcode" => {
                config.primary = PrimaryEndpoint::ByBarcode {
                    path: config.primary.path().to_string(),
                };
            }
            "--timeout-secs" => {
                i += 1;
                let secs: u64 = args.get(i).map(|s| s.parse::<u64>()).transpose()?.unwrap_or(0);
                config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            _ => {}
        }
        i += 1;
    }
    if barcode.is_empty() {
        eprintln!("Usage: verify_barcode --barcode VALUE [--base-url URL] [--by-barcode] [--timeout-secs N]");
        std::process::exit(1);
    }

    let registry = LookupClient::builder().config(config).build()?;
    let controller = ScanController::new(
        ScanSession::new(),
        Arc::new(registry),
        Arc::new(TracingSink),
    );
    let detector = Arc::new(ManualDetector::new());
    let source = DetectionSource::new(detector.clone());
    let mut detections = controller.start_scanning(&source)?;

    // A handheld scanner reports the same symbol several times; only one lookup runs.
    for _ in 0..3 {
        detector.push(barcode.as_str());
    }
    let mut pipeline = None;
    while pipeline.is_none() {
        let Some(detected) = detections.next().await else {
            break;
        };
        pipeline = controller.on_detected(detected).await;
    }
    if let Some(pipeline) = pipeline {
        pipeline.await?;
    }
    controller.stop_scanning(&source);

    match controller.last_verdict().await {
        Some(verdict) => {
            println!("{}", verdict);
            println!("{}", serde_json::to_string(&verdict)?);
        }
        None => println!("no verdict"),
    }
    Ok(())
}
