/*!
 * Detector de pump & dump
 *
 * Compras e vendas coordenadas por muitas carteiras, alta rápida de
 * preço e a queda que se segue a ela.
 */

use super::{mean, PatternScanner, RATIO_EPSILON};
use crate::detectors::wash_trading::group_by_token;
use crate::engine::MarketBatch;
use crate::evidence::{CoordinatedTradeEvidence, DetectorFamily, DumpEvidence, Evidence, PriceSpikeEvidence};
use crate::scoring::{BonusTerm, MagnitudeCurve, ScaleTier, ScoreInputs, TimeframeDecay, WeightTable};
use crate::window::{sliding_windows, Strongest};
use ethernity_core::ingest::screen;
use ethernity_core::utils::{sort_by_time, span_secs, within_window};
use ethernity_core::{PricePoint, Timestamp, Trade, TradeSide};
use ethereum_types::Address;
use std::collections::BTreeSet;
use tracing::debug;

pub const COORDINATION_WINDOW_SECS: u64 = 300;
/// Carteiras distintas necessárias para caracterizar coordenação
pub const MIN_COORDINATED_WALLETS: usize = 10;
pub const SPIKE_WINDOW_SECS: u64 = 3600;
pub const MIN_SPIKE_INCREASE: f64 = 0.5;
/// Horizonte após a alta em que uma queda ainda é associada a ela
pub const DUMP_WINDOW_SECS: u64 = 7200;
pub const MIN_DUMP_DROP: f64 = 0.5;

const COORDINATION_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 10.0, base: 60.0 },
    ScaleTier { at_least: 20.0, base: 70.0 },
    ScaleTier { at_least: 50.0, base: 80.0 },
];

const SPIKE_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 0.5, base: 60.0 },
    ScaleTier { at_least: 1.0, base: 70.0 },
    ScaleTier { at_least: 2.0, base: 80.0 },
];

const DUMP_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 0.5, base: 60.0 },
    ScaleTier { at_least: 0.7, base: 70.0 },
    ScaleTier { at_least: 0.9, base: 80.0 },
];

const COORDINATED_TRADING_WEIGHTS: WeightTable = WeightTable {
    tiers: COORDINATION_TIERS,
    magnitude: Some(BonusTerm { cap: 6.0, curve: MagnitudeCurve::Linear { from: 0.0, to: 0.3 } }),
    timeframe: Some(TimeframeDecay { cap: 6.0, half_life_secs: 120.0 }),
    corroboration: Some(BonusTerm { cap: 8.0, curve: MagnitudeCurve::Saturating { half_at: 30.0 } }),
};

const PRICE_SPIKE_WEIGHTS: WeightTable = WeightTable {
    tiers: SPIKE_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Saturating { half_at: 5.0 } }),
    timeframe: Some(TimeframeDecay { cap: 10.0, half_life_secs: 900.0 }),
    corroboration: None,
};

const DUMP_WEIGHTS: WeightTable = WeightTable {
    tiers: DUMP_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Saturating { half_at: 5.0 } }),
    timeframe: Some(TimeframeDecay { cap: 10.0, half_life_secs: 1800.0 }),
    corroboration: None,
};

/// Detector de pump & dump
#[derive(Debug, Clone, Default)]
pub struct PumpDumpDetector;

impl PumpDumpDetector {
    pub fn new() -> Self {
        Self
    }

    /// Janela de cinco minutos com compras de ao menos 10 carteiras distintas
    pub fn detect_coordinated_buying(trades: &[Trade]) -> Option<CoordinatedTradeEvidence> {
        detect_coordinated(trades, TradeSide::Buy)
    }

    /// Janela de cinco minutos com vendas de ao menos 10 carteiras distintas
    pub fn detect_coordinated_selling(trades: &[Trade]) -> Option<CoordinatedTradeEvidence> {
        detect_coordinated(trades, TradeSide::Sell)
    }

    /// Maior alta de preço, de pelo menos 50%, entre dois pontos a no máximo uma hora
    pub fn detect_price_spike(history: &[PricePoint]) -> Option<PriceSpikeEvidence> {
        let series = sorted_history(history);
        if series.len() < 2 {
            return None;
        }
        let baseline = mean_volume(&series);

        let mut strongest = Strongest::new();
        for window in sliding_windows(&series, SPIKE_WINDOW_SECS) {
            let start = &series[window.start];
            let mut highest: Option<(usize, f64)> = None;
            for j in (window.start + 1)..=window.end {
                let increase = (series[j].price - start.price) / start.price;
                if highest.map_or(true, |(_, best)| increase > best) {
                    highest = Some((j, increase));
                }
            }
            let (j, increase) = match highest {
                Some(found) => found,
                None => continue,
            };
            if increase + RATIO_EPSILON < MIN_SPIKE_INCREASE {
                continue;
            }

            let end = &series[j];
            let during = &series[window.start..=j];
            strongest.offer(
                increase,
                start.timestamp,
                PriceSpikeEvidence {
                    start_price: start.price,
                    end_price: end.price,
                    percentage_increase: increase,
                    started_at: start.timestamp,
                    peaked_at: end.timestamp,
                    timeframe_secs: span_secs(start.timestamp, end.timestamp),
                    volume_during_spike_usd: during.iter().map(|p| p.volume_usd).sum(),
                    volume_spike_ratio: volume_ratio(during, baseline),
                },
            );
        }
        debug!(best = ?strongest.tally(), "varredura de alta de preço concluída");
        strongest.into_inner()
    }

    /// Maior queda, de pelo menos 50%, em até duas horas após `spike_timestamp`.
    ///
    /// O preço de referência é o do último ponto registrado até
    /// `spike_timestamp`; sem ele não há alta a que associar a queda.
    pub fn detect_dump(history: &[PricePoint], spike_timestamp: Timestamp) -> Option<DumpEvidence> {
        let series = sorted_history(history);
        let reference = series.iter().rposition(|p| p.timestamp <= spike_timestamp)?;
        let peak = &series[reference];
        if peak.price <= 0.0 {
            return None;
        }

        let mut deepest: Option<(usize, f64)> = None;
        for (k, point) in series.iter().enumerate().skip(reference + 1) {
            if !within_window(spike_timestamp, point.timestamp, DUMP_WINDOW_SECS) {
                break;
            }
            let drop = (peak.price - point.price) / peak.price;
            if deepest.map_or(true, |(_, best)| drop > best) {
                deepest = Some((k, drop));
            }
        }

        let (k, drop) = deepest?;
        if drop + RATIO_EPSILON < MIN_DUMP_DROP {
            debug!(drop, "queda após a alta abaixo do limiar");
            return None;
        }

        let bottom = &series[k];
        let during = &series[(reference + 1)..=k];
        Some(DumpEvidence {
            peak_price: peak.price,
            dump_price: bottom.price,
            percentage_drop: drop,
            peaked_at: peak.timestamp,
            dumped_at: bottom.timestamp,
            timeframe_secs: span_secs(peak.timestamp, bottom.timestamp),
            volume_during_dump_usd: during.iter().map(|p| p.volume_usd).sum(),
            volume_spike_ratio: volume_ratio(during, mean_volume(&series)),
        })
    }

    /// Vale para compras e vendas coordenadas
    pub fn coordinated_trading_confidence(evidence: &CoordinatedTradeEvidence) -> f64 {
        COORDINATED_TRADING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.wallet_addresses.len() as f64,
            magnitude: evidence.price_impact,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: evidence.trade_count as f64,
        })
    }

    pub fn price_spike_confidence(evidence: &PriceSpikeEvidence) -> f64 {
        PRICE_SPIKE_WEIGHTS.score(&ScoreInputs {
            primary: evidence.percentage_increase,
            magnitude: evidence.volume_spike_ratio,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }

    pub fn dump_confidence(evidence: &DumpEvidence) -> f64 {
        DUMP_WEIGHTS.score(&ScoreInputs {
            primary: evidence.percentage_drop,
            magnitude: evidence.volume_spike_ratio,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }
}

impl PatternScanner for PumpDumpDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::PumpDump
    }

    fn name(&self) -> &str {
        "PumpDumpDetector"
    }

    fn scan(&self, batch: &MarketBatch) -> Vec<Evidence> {
        let mut found = Vec::new();
        if let Some(e) = Self::detect_coordinated_buying(&batch.trades) {
            found.push(Evidence::CoordinatedBuying(e));
        }
        if let Some(spike) = Self::detect_price_spike(&batch.price_history) {
            let dump = Self::detect_dump(&batch.price_history, spike.peaked_at);
            found.push(Evidence::PriceSpike(spike));
            if let Some(e) = dump {
                found.push(Evidence::Dump(e));
            }
        }
        if let Some(e) = Self::detect_coordinated_selling(&batch.trades) {
            found.push(Evidence::CoordinatedSelling(e));
        }
        found
    }
}

fn detect_coordinated(trades: &[Trade], side: TradeSide) -> Option<CoordinatedTradeEvidence> {
    let one_side: Vec<Trade> = screen(trades).accepted.into_iter().filter(|t| t.side == side).collect();

    let mut strongest = Strongest::new();
    for (token, series) in group_by_token(&one_side) {
        for window in sliding_windows(&series, COORDINATION_WINDOW_SECS) {
            let slice = window.slice(&series);
            let mut seen = BTreeSet::new();
            let wallets: Vec<Address> =
                slice.iter().map(|t| t.wallet_address).filter(|w| seen.insert(*w)).collect();
            if wallets.len() < MIN_COORDINATED_WALLETS {
                continue;
            }

            let prices: Vec<f64> = slice.iter().map(|t| t.price).collect();
            let avg = mean(&prices);
            let price_impact = if avg > 0.0 {
                match side {
                    TradeSide::Buy => (prices.iter().copied().fold(avg, f64::max) - avg) / avg,
                    TradeSide::Sell => (avg - prices.iter().copied().fold(avg, f64::min)) / avg,
                }
            } else {
                0.0
            };

            let first = slice[0].timestamp;
            let last = slice[slice.len() - 1].timestamp;
            strongest.offer(
                wallets.len() as f64,
                first,
                CoordinatedTradeEvidence {
                    side,
                    token_address: token,
                    wallet_addresses: wallets,
                    trade_count: slice.len(),
                    timeframe_secs: span_secs(first, last),
                    total_volume_usd: slice.iter().map(Trade::volume_usd).sum(),
                    price_impact,
                    tx_hashes: slice.iter().map(|t| t.tx_hash).collect(),
                },
            );
        }
    }
    debug!(%side, best = ?strongest.tally(), "varredura de coordenação concluída");
    strongest.into_inner()
}

fn sorted_history(history: &[PricePoint]) -> Vec<PricePoint> {
    let mut series = screen(history).accepted;
    sort_by_time(&mut series);
    series
}

fn mean_volume(series: &[PricePoint]) -> f64 {
    let volumes: Vec<f64> = series.iter().map(|p| p.volume_usd).collect();
    mean(&volumes)
}

/// Volume médio por ponto no trecho sobre o volume médio da série
fn volume_ratio(during: &[PricePoint], baseline: f64) -> f64 {
    if baseline <= 0.0 || during.is_empty() {
        return 0.0;
    }
    mean_volume(during) / baseline
}
