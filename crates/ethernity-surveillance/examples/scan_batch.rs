use std::env;
use std::fs;

use chrono::{Duration, Utc};
use ethernity_core::{PricePoint, Trade, TradeSide};
use ethernity_surveillance::{MarketBatch, SurveillanceConfig, SurveillanceEngine};
use ethereum_types::{Address, H256};
use tracing_subscriber::EnvFilter;

/// Lote de demonstração: dez carteiras comprando juntas e uma alta seguida de queda
fn demo_batch() -> MarketBatch {
    let t0 = Utc::now() - Duration::hours(3);
    let token = Address::repeat_byte(0x70);

    let trades = (0..10u64)
        .map(|i| Trade {
            tx_hash: H256::from_low_u64_be(i + 1),
            wallet_address: Address::from_low_u64_be(100 + i),
            token_address: token,
            amount: 1_000.0,
            price: 0.10 + i as f64 * 0.01,
            timestamp: t0 + Duration::seconds(i as i64 * 15),
            side: TradeSide::Buy,
        })
        .collect();

    let price_history = [(0, 0.10, 2_000.0), (1200, 0.21, 25_000.0), (3000, 0.08, 30_000.0)]
        .iter()
        .map(|(secs, price, volume)| PricePoint {
            timestamp: t0 + Duration::seconds(*secs),
            price: *price,
            volume_usd: *volume,
        })
        .collect();

    MarketBatch { trades, price_history, ..Default::default() }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Uso: scan_batch [LOTE_JSON] [CONFIG_JSON]
    let args: Vec<String> = env::args().collect();
    let config = match args.get(2) {
        Some(path) => Some(SurveillanceConfig::from_json_str(&fs::read_to_string(path)?)?),
        None => None,
    };

    let engine = SurveillanceEngine::new(config)?;
    let report = match args.get(1) {
        Some(path) => {
            let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
            engine.scan_json(&value)?
        }
        None => engine.scan(&demo_batch()),
    };

    if report.is_clean() {
        println!("Nenhuma atividade suspeita encontrada");
    } else {
        println!("Atividades suspeitas detectadas:");
        for detection in &report.detections {
            println!(
                "- [{}/{}] {} (confiança {:.1}%, perda estimada ${:.2})",
                detection.family, detection.kind, detection.description, detection.confidence, detection.estimated_loss_usd
            );
        }
    }

    for rejected in &report.rejected {
        eprintln!("registro descartado {}: {}", rejected.reference, rejected.reason);
    }
    Ok(())
}
