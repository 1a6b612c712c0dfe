/*!
 * Ethernity Surveillance - Engine
 *
 * Orquestra as famílias de detectores sobre um lote de eventos de mercado.
 */

use crate::config::SurveillanceConfig;
use crate::detection::Detection;
use crate::detectors::{PatternScanner, PumpDumpDetector, RugPullDetector, SybilDetector, WashTradingDetector};
use ethernity_core::ingest::{price_points_from_json, screen, trades_from_json, wallets_from_json};
use ethernity_core::{
    ContractEvent, Error, LiquidityPoint, PricePoint, RejectedRecord, Result, Trade, WalletInfo, WalletTransaction,
};
use ethereum_types::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Lote de eventos de mercado de um token, protocolo ou intervalo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketBatch {
    pub trades: Vec<Trade>,
    pub price_history: Vec<PricePoint>,
    pub wallets: Vec<WalletInfo>,
    pub liquidity: Vec<LiquidityPoint>,
    pub contract_events: Vec<ContractEvent>,
    /// Supply total por token, usado na detecção de venda concentrada
    pub token_supplies: BTreeMap<Address, f64>,
    pub wallet_histories: BTreeMap<Address, Vec<WalletTransaction>>,
    /// Volume horário normal; sem ele vale o da configuração
    pub baseline_volume_usd: Option<f64>,
}

impl MarketBatch {
    /// Decodifica um lote JSON registro a registro.
    ///
    /// Negociações, preços e carteiras malformados são descartados um a um e
    /// devolvidos como rejeitados; os demais campos precisam decodificar inteiros.
    pub fn from_json(value: &Value) -> Result<(MarketBatch, Vec<RejectedRecord>)> {
        let fields = value
            .as_object()
            .ok_or_else(|| Error::DecodeError("esperado objeto de lote".to_string()))?;

        let mut batch = MarketBatch::default();
        let mut rejected = Vec::new();

        if let Some(trades) = present(fields, "trades") {
            let trades = trades_from_json(trades)?;
            rejected.extend(trades.rejected);
            batch.trades = trades.accepted;
        }
        if let Some(prices) = present(fields, "price_history") {
            let prices = price_points_from_json(prices)?;
            rejected.extend(prices.rejected);
            batch.price_history = prices.accepted;
        }
        if let Some(wallets) = present(fields, "wallets") {
            let wallets = wallets_from_json(wallets)?;
            rejected.extend(wallets.rejected);
            batch.wallets = wallets.accepted;
        }

        batch.liquidity = decode_field(fields, "liquidity")?;
        batch.contract_events = decode_field(fields, "contract_events")?;
        batch.token_supplies = decode_field(fields, "token_supplies")?;
        batch.wallet_histories = decode_field(fields, "wallet_histories")?;
        batch.baseline_volume_usd = decode_field(fields, "baseline_volume_usd")?;

        Ok((batch, rejected))
    }

    /// Separa os registros inválidos, devolvendo o lote limpo e os rejeitados
    pub fn screened(&self) -> (MarketBatch, Vec<RejectedRecord>) {
        let mut rejected = Vec::new();

        let trades = screen(&self.trades);
        rejected.extend(trades.rejected);
        let prices = screen(&self.price_history);
        rejected.extend(prices.rejected);
        let wallets = screen(&self.wallets);
        rejected.extend(wallets.rejected);
        let liquidity = screen(&self.liquidity);
        rejected.extend(liquidity.rejected);

        let mut wallet_histories = BTreeMap::new();
        for (wallet, txs) in &self.wallet_histories {
            let history = screen(txs);
            rejected.extend(history.rejected);
            wallet_histories.insert(*wallet, history.accepted);
        }

        let baseline_volume_usd = match self.baseline_volume_usd {
            Some(volume) if !(volume.is_finite() && volume > 0.0) => {
                let reference = "baseline_volume_usd".to_string();
                let reason = Error::ValidationError(format!("volume de referência inválido: {}", volume)).to_string();
                warn!(record = %reference, reason = %reason, "registro descartado");
                rejected.push(RejectedRecord { reference, reason });
                None
            }
            other => other,
        };

        let batch = MarketBatch {
            trades: trades.accepted,
            price_history: prices.accepted,
            wallets: wallets.accepted,
            liquidity: liquidity.accepted,
            contract_events: self.contract_events.clone(),
            token_supplies: self.token_supplies.clone(),
            wallet_histories,
            baseline_volume_usd,
        };
        (batch, rejected)
    }
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn decode_field<T: DeserializeOwned + Default>(fields: &Map<String, Value>, key: &str) -> Result<T> {
    match present(fields, key) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| Error::DecodeError(format!("{}: {}", key, e))),
        None => Ok(T::default()),
    }
}

/// Resultado de uma varredura
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Detecções ordenadas por família e espécie
    pub detections: Vec<Detection>,
    /// Registros descartados na triagem
    pub rejected: Vec<RejectedRecord>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Motor de vigilância
pub struct SurveillanceEngine {
    scanners: Vec<Box<dyn PatternScanner>>,
}

impl SurveillanceEngine {
    /// Cria um motor com as famílias habilitadas na configuração
    pub fn new(config: Option<SurveillanceConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        config.validate()?;

        let mut scanners: Vec<Box<dyn PatternScanner>> = Vec::new();

        if config.families.detect_wash_trading {
            scanners.push(Box::new(WashTradingDetector::with_settings(
                config.max_cycle_depth,
                config.top_contributors,
                config.baseline_volume_usd,
            )));
        }

        if config.families.detect_rug_pull {
            scanners.push(Box::new(RugPullDetector::new()));
        }

        if config.families.detect_pump_dump {
            scanners.push(Box::new(PumpDumpDetector::new()));
        }

        if config.families.detect_sybil {
            scanners.push(Box::new(SybilDetector::new()));
        }

        Ok(Self { scanners })
    }

    pub fn add_scanner(&mut self, scanner: Box<dyn PatternScanner>) {
        self.scanners.push(scanner);
    }

    pub fn available_scanners(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// Varre o lote com todas as famílias habilitadas
    pub fn scan(&self, batch: &MarketBatch) -> ScanReport {
        let (clean, rejected) = batch.screened();
        debug!(
            trades = clean.trades.len(),
            prices = clean.price_history.len(),
            wallets = clean.wallets.len(),
            rejected = rejected.len(),
            "lote triado"
        );

        let mut detections: Vec<Detection> = Vec::new();
        for scanner in &self.scanners {
            let found = scanner.scan(&clean);
            debug!(scanner = scanner.name(), found = found.len(), "varredura concluída");
            detections.extend(found.into_iter().map(Detection::from_evidence));
        }
        detections.sort_by_key(|d| (d.family, d.kind));

        for detection in &detections {
            info!(
                family = %detection.family,
                kind = %detection.kind,
                confidence = detection.confidence,
                wallets = detection.wallets.len(),
                "{}",
                detection.description
            );
        }

        ScanReport { detections, rejected }
    }

    /// Decodifica e varre um lote JSON; registros que não decodificam
    /// entram em `rejected` antes dos descartados na triagem
    pub fn scan_json(&self, value: &Value) -> Result<ScanReport> {
        let (batch, mut rejected) = MarketBatch::from_json(value)?;
        let mut report = self.scan(&batch);
        rejected.append(&mut report.rejected);
        report.rejected = rejected;
        Ok(report)
    }
}
