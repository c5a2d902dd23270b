use env_logger::Env;
use log::{error, info};
use plate_scanner::{image_source, GeminiClient, PipelineController};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-scanner");

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            error!("Usage: plate-scanner <image-file>");
            process::exit(2);
        }
    };
    let recognizer = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Unable to read {}: {}", path, e);
            process::exit(1);
        }
    };
    let image = match image_source::from_file(bytes) {
        Ok(image) => image,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    info!("Scanning {} ({} bytes, {})", path, image.len(), image.mime_type());

    let mut pipeline = PipelineController::new();
    pipeline.set_image(image);
    if let Err(e) = pipeline.process(&recognizer).await {
        error!("Scan failed: {}", e);
        process::exit(1);
    }

    let overlays = pipeline.overlay_rects();
    if let Some(detections) = pipeline.detections() {
        if detections.is_empty() {
            info!("No plates found");
        }
        for (plate, rect) in detections.plates.iter().zip(&overlays) {
            info!(
                "{} ({} confidence) at top {:.1}% left {:.1}%, {:.1}% x {:.1}%",
                plate.plate_number,
                plate.confidence,
                rect.top_pct,
                rect.left_pct,
                rect.width_pct,
                rect.height_pct
            );
            if let Some(model) = &plate.vehicle_model {
                info!("  vehicle: {}", model);
            } else if let Some(kind) = &plate.vehicle_type {
                info!("  vehicle: {}", kind);
            }
            if let Some(region) = &plate.region {
                info!("  region: {}", region);
            }
        }
    }
    info!("Session scans: {}", pipeline.scan_count());
}
