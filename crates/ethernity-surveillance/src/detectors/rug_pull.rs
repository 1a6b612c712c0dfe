/*!
 * Detector de rug pull
 *
 * Retirada súbita de liquidez, venda concentrada do supply por uma
 * carteira e ações administrativas suspeitas sobre o contrato.
 */

use super::{PatternScanner, RATIO_EPSILON};
use crate::detectors::wash_trading::sort_trades;
use crate::engine::MarketBatch;
use crate::evidence::{
    ContractManipulationEvidence, DetectorFamily, Evidence, LiquidityRemovalEvidence, TokenDumpEvidence,
};
use crate::scoring::{clamp_confidence, BonusTerm, MagnitudeCurve, ScaleTier, ScoreInputs, TimeframeDecay, WeightTable};
use crate::window::{sliding_windows, Strongest};
use ethernity_core::ingest::screen;
use ethernity_core::utils::{sort_by_time, span_secs};
use ethernity_core::{ContractAction, ContractEvent, LiquidityPoint, Trade};
use ethereum_types::Address;
use std::collections::BTreeMap;
use tracing::debug;

pub const LIQUIDITY_WINDOW_SECS: u64 = 3600;
/// Fração mínima de liquidez removida
pub const MIN_LIQUIDITY_REMOVAL: f64 = 0.5;
pub const DUMP_WINDOW_SECS: u64 = 3600;
/// Fração mínima do supply vendida por uma carteira
pub const MIN_SUPPLY_SOLD: f64 = 0.3;

/// Referência do decaimento de confiança de upgrades com timelock
const TIMELOCK_REFERENCE_SECS: f64 = 86_400.0;

const PERCENTAGE_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 30.0 },
    ScaleTier { at_least: 0.5, base: 60.0 },
    ScaleTier { at_least: 0.7, base: 75.0 },
    ScaleTier { at_least: 0.9, base: 90.0 },
];

const LIQUIDITY_REMOVAL_WEIGHTS: WeightTable = WeightTable {
    tiers: PERCENTAGE_TIERS,
    magnitude: Some(BonusTerm { cap: 5.0, curve: MagnitudeCurve::Saturating { half_at: 1_000_000.0 } }),
    timeframe: Some(TimeframeDecay { cap: 10.0, half_life_secs: 900.0 }),
    corroboration: None,
};

const TOKEN_DUMP_WEIGHTS: WeightTable = WeightTable {
    tiers: PERCENTAGE_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Linear { from: 0.0, to: 1.0 } }),
    timeframe: Some(TimeframeDecay { cap: 5.0, half_life_secs: 900.0 }),
    corroboration: None,
};

/// Detector de rug pull
#[derive(Debug, Clone, Default)]
pub struct RugPullDetector;

impl RugPullDetector {
    pub fn new() -> Self {
        Self
    }

    /// Maior retirada de liquidez dentro de uma hora, se chegar a 50%
    pub fn check_liquidity_removal(points: &[LiquidityPoint]) -> Option<LiquidityRemovalEvidence> {
        let mut series = screen(points).accepted;
        sort_by_time(&mut series);

        let mut strongest = Strongest::new();
        for window in sliding_windows(&series, LIQUIDITY_WINDOW_SECS) {
            let opening = &series[window.start];
            if opening.liquidity_usd <= 0.0 {
                continue;
            }

            let mut deepest: Option<(usize, f64)> = None;
            for j in (window.start + 1)..=window.end {
                let removed = (opening.liquidity_usd - series[j].liquidity_usd) / opening.liquidity_usd;
                if deepest.map_or(true, |(_, best)| removed > best) {
                    deepest = Some((j, removed));
                }
            }
            let (j, removed) = match deepest {
                Some(found) => found,
                None => continue,
            };
            if removed + RATIO_EPSILON < MIN_LIQUIDITY_REMOVAL {
                continue;
            }

            let closing = &series[j];
            strongest.offer(
                removed,
                opening.timestamp,
                LiquidityRemovalEvidence {
                    percentage: removed,
                    timeframe_secs: span_secs(opening.timestamp, closing.timestamp),
                    removed_amount_usd: opening.liquidity_usd - closing.liquidity_usd,
                    remaining_amount_usd: closing.liquidity_usd,
                    wallet_address: closing.wallet_address,
                    tx_hashes: series[(window.start + 1)..=j].iter().filter_map(|p| p.tx_hash).collect(),
                },
            );
        }
        debug!(best = ?strongest.tally(), "varredura de liquidez concluída");
        strongest.into_inner()
    }

    /// Carteira que vende ao menos 30% do supply de `token` dentro de uma hora
    pub fn check_token_dump(trades: &[Trade], token: Address, total_supply: f64) -> Option<TokenDumpEvidence> {
        if !total_supply.is_finite() || total_supply <= 0.0 {
            debug!(total_supply, "supply inválido, venda concentrada não avaliada");
            return None;
        }

        let mut market: Vec<Trade> =
            screen(trades).accepted.into_iter().filter(|t| t.token_address == token).collect();
        sort_trades(&mut market);

        let mut sellers: BTreeMap<Address, Vec<Trade>> = BTreeMap::new();
        for trade in market.iter().filter(|t| t.is_sell()) {
            sellers.entry(trade.wallet_address).or_default().push(trade.clone());
        }

        let mut strongest = Strongest::new();
        for (seller, sells) in sellers {
            for window in sliding_windows(&sells, DUMP_WINDOW_SECS) {
                let slice = window.slice(&sells);
                let sold: f64 = slice.iter().map(|t| t.amount).sum();
                let fraction = sold / total_supply;
                if fraction + RATIO_EPSILON < MIN_SUPPLY_SOLD {
                    continue;
                }

                let first = &slice[0];
                let last = &slice[slice.len() - 1];
                let lowest = market
                    .iter()
                    .filter(|t| t.timestamp >= first.timestamp && t.timestamp <= last.timestamp)
                    .map(|t| t.price)
                    .fold(first.price, f64::min);
                let price_impact = ((first.price - lowest) / first.price).max(0.0);

                strongest.offer(
                    fraction,
                    first.timestamp,
                    TokenDumpEvidence {
                        token_address: token,
                        percentage: fraction,
                        timeframe_secs: span_secs(first.timestamp, last.timestamp),
                        sold_amount: sold,
                        total_supply,
                        price_impact,
                        wallet_address: seller,
                        tx_hashes: slice.iter().map(|t| t.tx_hash).collect(),
                    },
                );
            }
        }
        strongest.into_inner()
    }

    /// Ação administrativa mais grave observada.
    ///
    /// Precedência: transferência de propriedade, pausa de emergência,
    /// upgrade, mint. Dentro da mesma ação vale o evento mais antigo.
    pub fn check_contract_manipulation(events: &[ContractEvent]) -> ContractManipulationEvidence {
        let chosen = events
            .iter()
            .min_by(|a, b| {
                action_rank(a.action)
                    .cmp(&action_rank(b.action))
                    .then_with(|| a.timestamp.cmp(&b.timestamp))
                    .then_with(|| a.tx_hash.cmp(&b.tx_hash))
            });

        match chosen {
            Some(event) => ContractManipulationEvidence {
                detected: true,
                action: event.action,
                from_address: Some(event.from_address),
                to_address: event.to_address,
                timelock_delay_secs: event.timelock_delay_secs,
                tx_hashes: vec![event.tx_hash],
            },
            None => ContractManipulationEvidence::default(),
        }
    }

    pub fn liquidity_removal_confidence(evidence: &LiquidityRemovalEvidence) -> f64 {
        LIQUIDITY_REMOVAL_WEIGHTS.score(&ScoreInputs {
            primary: evidence.percentage,
            magnitude: evidence.removed_amount_usd,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }

    pub fn token_dump_confidence(evidence: &TokenDumpEvidence) -> f64 {
        TOKEN_DUMP_WEIGHTS.score(&ScoreInputs {
            primary: evidence.percentage,
            magnitude: evidence.price_impact,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }

    /// Pontuação fixa por ação; upgrades perdem força com timelocks longos
    pub fn manipulation_confidence(evidence: &ContractManipulationEvidence) -> f64 {
        if !evidence.detected {
            return 0.0;
        }
        let score = match evidence.action {
            ContractAction::OwnershipTransfer => 95.0,
            ContractAction::EmergencyPause => 90.0,
            ContractAction::ContractUpgrade => {
                let delay = evidence.timelock_delay_secs.unwrap_or(0) as f64;
                90.0 - 30.0 * delay / (delay + TIMELOCK_REFERENCE_SECS)
            }
            ContractAction::MintFunctionCall => 85.0,
        };
        clamp_confidence(score)
    }
}

fn action_rank(action: ContractAction) -> u8 {
    match action {
        ContractAction::OwnershipTransfer => 0,
        ContractAction::EmergencyPause => 1,
        ContractAction::ContractUpgrade => 2,
        ContractAction::MintFunctionCall => 3,
    }
}

impl PatternScanner for RugPullDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::RugPull
    }

    fn name(&self) -> &str {
        "RugPullDetector"
    }

    fn scan(&self, batch: &MarketBatch) -> Vec<Evidence> {
        let mut found = Vec::new();
        if let Some(e) = Self::check_liquidity_removal(&batch.liquidity) {
            found.push(Evidence::LiquidityRemoval(e));
        }
        for (token, supply) in &batch.token_supplies {
            if let Some(e) = Self::check_token_dump(&batch.trades, *token, *supply) {
                found.push(Evidence::TokenDump(e));
            }
        }
        let manipulation = Self::check_contract_manipulation(&batch.contract_events);
        if manipulation.detected {
            found.push(Evidence::ContractManipulation(manipulation));
        }
        found
    }
}
