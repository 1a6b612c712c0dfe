/*!
 * Detector de ataques sybil
 *
 * Agrupa carteiras muito parecidas em criação, saldo e atividade e
 * compara o comportamento transacional de um conjunto de carteiras.
 * Farming de airdrop e votação coordenada chegam prontos da camada de
 * ingestão e aqui são apenas pontuados.
 */

use super::{linear_proximity, mean, ratio_proximity, PatternScanner, RATIO_EPSILON};
use crate::engine::MarketBatch;
use crate::evidence::{
    AirdropFarmingEvidence, BehaviorSimilarityEvidence, ClusterPattern, CoordinatedVotingEvidence,
    DetectorFamily, Evidence, WalletClusterEvidence,
};
use crate::scoring::{BonusTerm, MagnitudeCurve, ScaleTier, ScoreInputs, TimeframeDecay, WeightTable};
use crate::window::Strongest;
use ethernity_core::ingest::screen;
use ethernity_core::utils::{abs_diff_secs, sort_by_time, span_secs};
use ethernity_core::{WalletInfo, WalletTransaction};
use ethereum_types::Address;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Similaridade que duas carteiras precisam superar para dividir um cluster
pub const MIN_PAIR_SIMILARITY: f64 = 0.8;
/// Um cluster só é reportado acima de 10 membros
pub const MIN_CLUSTER_SIZE: usize = 11;
/// Distância de tempo em que a proximidade de criação/atividade chega a zero
pub const PROXIMITY_HORIZON_SECS: f64 = 86_400.0;
pub const MIN_BEHAVIOR_SIMILARITY: f64 = 0.8;
/// Diferença relativa máxima do gas price da primeira transação
pub const GAS_PRICE_TOLERANCE: f64 = 0.01;

const CLUSTER_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 11.0, base: 60.0 },
    ScaleTier { at_least: 30.0, base: 70.0 },
    ScaleTier { at_least: 50.0, base: 80.0 },
];

const COUNT_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 10.0, base: 60.0 },
    ScaleTier { at_least: 30.0, base: 70.0 },
    ScaleTier { at_least: 50.0, base: 80.0 },
];

const WALLET_CLUSTERING_WEIGHTS: WeightTable = WeightTable {
    tiers: CLUSTER_TIERS,
    magnitude: Some(BonusTerm { cap: 15.0, curve: MagnitudeCurve::Linear { from: 0.8, to: 1.0 } }),
    timeframe: None,
    corroboration: None,
};

const BEHAVIOR_SIMILARITY_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Linear { from: 0.8, to: 1.0 } }),
    timeframe: Some(TimeframeDecay { cap: 5.0, half_life_secs: 1800.0 }),
    corroboration: Some(BonusTerm { cap: 5.0, curve: MagnitudeCurve::Saturating { half_at: 2.0 } }),
};

const AIRDROP_FARMING_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Linear { from: 0.5, to: 1.0 } }),
    timeframe: None,
    corroboration: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Linear { from: 0.5, to: 1.0 } }),
};

const COORDINATED_VOTING_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 10.0, curve: MagnitudeCurve::Linear { from: 0.5, to: 1.0 } }),
    timeframe: None,
    corroboration: Some(BonusTerm { cap: 15.0, curve: MagnitudeCurve::Saturating { half_at: 500_000.0 } }),
};

/// Proximidades de um par de carteiras, cada uma em [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalletSimilarity {
    pub creation: f64,
    pub balance: f64,
    pub activity: f64,
}

impl WalletSimilarity {
    pub fn between(a: &WalletInfo, b: &WalletInfo) -> Self {
        let tx_count = ratio_proximity(a.transaction_count as f64, b.transaction_count as f64);
        let last_seen = linear_proximity(abs_diff_secs(a.last_activity, b.last_activity), PROXIMITY_HORIZON_SECS);
        Self {
            creation: linear_proximity(abs_diff_secs(a.creation_time, b.creation_time), PROXIMITY_HORIZON_SECS),
            balance: ratio_proximity(a.balance, b.balance),
            activity: (tx_count + last_seen) / 2.0,
        }
    }

    pub fn score(&self) -> f64 {
        (self.creation + self.balance + self.activity) / 3.0
    }
}

/// Detector de ataques sybil
#[derive(Debug, Clone, Default)]
pub struct SybilDetector;

impl SybilDetector {
    pub fn new() -> Self {
        Self
    }

    /// Maior grupo de carteiras com similaridade mútua acima de 0.8, se
    /// tiver mais de 10 membros.
    ///
    /// Agrupamento guloso por ligação completa, visitando as carteiras por
    /// data de criação: cada carteira entra no primeiro cluster em que é
    /// similar a todos os membros.
    pub fn detect_wallet_clustering(wallets: &[WalletInfo]) -> Option<WalletClusterEvidence> {
        let mut ordered = screen(wallets).accepted;
        ordered.sort_by_key(|w| w.address);
        sort_by_time(&mut ordered);
        let mut seen = BTreeSet::new();
        ordered.retain(|w| seen.insert(w.address));

        let mut clusters: Vec<Vec<&WalletInfo>> = Vec::new();
        for wallet in &ordered {
            let home = clusters.iter_mut().find(|members| {
                members
                    .iter()
                    .all(|m| WalletSimilarity::between(m, wallet).score() > MIN_PAIR_SIMILARITY)
            });
            match home {
                Some(members) => members.push(wallet),
                None => clusters.push(vec![wallet]),
            }
        }
        debug!(wallets = ordered.len(), clusters = clusters.len(), "agrupamento de carteiras concluído");

        let mut strongest = Strongest::new();
        for members in clusters.into_iter().filter(|c| c.len() >= MIN_CLUSTER_SIZE) {
            let started_at = members[0].creation_time;
            strongest.offer(members.len() as f64, started_at, members);
        }
        let members = strongest.into_inner()?;

        let mut pairs = Vec::new();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                pairs.push(WalletSimilarity::between(members[i], members[j]));
            }
        }
        let creation = mean(&pairs.iter().map(|p| p.creation).collect::<Vec<_>>());
        let balance = mean(&pairs.iter().map(|p| p.balance).collect::<Vec<_>>());
        let activity = mean(&pairs.iter().map(|p| p.activity).collect::<Vec<_>>());

        let pattern_type = if creation >= balance && creation >= activity {
            ClusterPattern::CreationTiming
        } else if balance >= activity {
            ClusterPattern::BalanceSimilarity
        } else {
            ClusterPattern::ActivitySimilarity
        };

        Some(WalletClusterEvidence {
            wallet_addresses: members.iter().map(|w| w.address).collect(),
            cluster_size: members.len(),
            average_similarity_score: mean(&pairs.iter().map(WalletSimilarity::score).collect::<Vec<_>>()),
            pattern_type,
        })
    }

    /// Compara o histórico de transações de um conjunto de carteiras.
    ///
    /// Similaridade de par: metade proximidade do gas price médio, metade
    /// proximidade do valor médio. Qualifica com média de pares >= 0.8.
    pub fn analyze_behavior_similarity(
        histories: &BTreeMap<Address, Vec<WalletTransaction>>,
    ) -> Option<BehaviorSimilarityEvidence> {
        if histories.len() < 2 {
            return None;
        }

        let profiles: Vec<(Address, Vec<WalletTransaction>)> = histories
            .iter()
            .map(|(wallet, txs)| {
                let mut accepted = screen(txs).accepted;
                accepted.sort_by_key(|t| t.nonce);
                sort_by_time(&mut accepted);
                (*wallet, accepted)
            })
            .collect();

        let mut scores = Vec::new();
        let mut patterns = BTreeSet::new();
        for i in 0..profiles.len() {
            for j in (i + 1)..profiles.len() {
                let (a, b) = (&profiles[i].1, &profiles[j].1);
                let score = transaction_similarity(a, b);
                scores.push(score);
                if score > MIN_BEHAVIOR_SIMILARITY {
                    if same_gas_price(a, b) {
                        patterns.insert("same_gas_price");
                    }
                    if same_nonce_pattern(a, b) {
                        patterns.insert("same_nonce_pattern");
                    }
                }
            }
        }

        let similarity = mean(&scores);
        if similarity + RATIO_EPSILON < MIN_BEHAVIOR_SIMILARITY {
            return None;
        }

        let first = profiles.iter().filter_map(|(_, txs)| txs.first()).map(|t| t.timestamp).min();
        let last = profiles.iter().filter_map(|(_, txs)| txs.last()).map(|t| t.timestamp).max();
        Some(BehaviorSimilarityEvidence {
            wallet_addresses: profiles.iter().map(|(w, _)| *w).collect(),
            similarity_score: similarity,
            matching_patterns: patterns.into_iter().map(String::from).collect(),
            timeframe_secs: match (first, last) {
                (Some(first), Some(last)) => span_secs(first, last),
                _ => 0,
            },
        })
    }

    pub fn wallet_clustering_confidence(evidence: &WalletClusterEvidence) -> f64 {
        WALLET_CLUSTERING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.cluster_size as f64,
            magnitude: evidence.average_similarity_score,
            timeframe_secs: None,
            corroboration: 0.0,
        })
    }

    pub fn behavior_similarity_confidence(evidence: &BehaviorSimilarityEvidence) -> f64 {
        BEHAVIOR_SIMILARITY_WEIGHTS.score(&ScoreInputs {
            primary: evidence.wallet_addresses.len() as f64,
            magnitude: evidence.similarity_score,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: evidence.matching_patterns.len() as f64,
        })
    }

    pub fn airdrop_farming_confidence(evidence: &AirdropFarmingEvidence) -> f64 {
        AIRDROP_FARMING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.claim_count as f64,
            magnitude: evidence.claim_timing_similarity,
            timeframe_secs: None,
            corroboration: evidence.claim_amount_similarity,
        })
    }

    /// O poder de voto total escala a confiança além da contagem de votos
    pub fn coordinated_voting_confidence(evidence: &CoordinatedVotingEvidence) -> f64 {
        COORDINATED_VOTING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.vote_count as f64,
            magnitude: evidence.voting_timing_similarity,
            timeframe_secs: None,
            corroboration: evidence.total_voting_power,
        })
    }
}

impl PatternScanner for SybilDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::SybilAttack
    }

    fn name(&self) -> &str {
        "SybilDetector"
    }

    fn scan(&self, batch: &MarketBatch) -> Vec<Evidence> {
        let mut found = Vec::new();
        if let Some(e) = Self::detect_wallet_clustering(&batch.wallets) {
            found.push(Evidence::WalletClustering(e));
        }
        if let Some(e) = Self::analyze_behavior_similarity(&batch.wallet_histories) {
            found.push(Evidence::BehaviorSimilarity(e));
        }
        found
    }
}

fn transaction_similarity(a: &[WalletTransaction], b: &[WalletTransaction]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let gas = ratio_proximity(average(a, |t| t.gas_price), average(b, |t| t.gas_price));
    let amount = ratio_proximity(average(a, |t| t.amount), average(b, |t| t.amount));
    0.5 * gas + 0.5 * amount
}

fn average(txs: &[WalletTransaction], field: impl Fn(&WalletTransaction) -> f64) -> f64 {
    mean(&txs.iter().map(field).collect::<Vec<_>>())
}

/// Gas price da primeira transação dentro de 1%
fn same_gas_price(a: &[WalletTransaction], b: &[WalletTransaction]) -> bool {
    match (a.first(), b.first()) {
        (Some(x), Some(y)) => 1.0 - ratio_proximity(x.gas_price, y.gas_price) < GAS_PRICE_TOLERANCE,
        _ => false,
    }
}

/// Mesmo salto de nonce entre as duas primeiras transações
fn same_nonce_pattern(a: &[WalletTransaction], b: &[WalletTransaction]) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    let step = |txs: &[WalletTransaction]| txs[1].nonce as i128 - txs[0].nonce as i128;
    step(a) == step(b)
}
