/*!
 * Detector de wash trading
 *
 * Auto-negociação, ciclos de negociação entre carteiras, inflação de
 * volume e manipulação coordenada de preço.
 */

use super::{mean, PatternScanner, RATIO_EPSILON};
use crate::engine::MarketBatch;
use crate::evidence::{
    CircularTradeEvidence, DetectorFamily, Evidence, PriceManipulationEvidence, SelfTradeEvidence,
    VolumeInflationEvidence,
};
use crate::scoring::{BonusTerm, MagnitudeCurve, ScaleTier, ScoreInputs, TimeframeDecay, WeightTable};
use crate::window::{sliding_windows, Strongest};
use ethernity_core::ingest::screen;
use ethernity_core::utils::{short_address, sort_by_time, span_secs, within_window};
use ethernity_core::Trade;
use ethereum_types::Address;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Distância máxima entre compra e venda de uma auto-negociação
pub const SELF_TRADE_WINDOW_SECS: u64 = 3600;
pub const MIN_SELF_TRADES: usize = 10;
pub const CIRCULAR_WINDOW_SECS: u64 = 3600;
/// Rotações mínimas de um ciclo
pub const MIN_CYCLE_COUNT: usize = 3;
pub const VOLUME_WINDOW_SECS: u64 = 3600;
pub const MIN_INFLATION_RATIO: f64 = 3.0;
pub const COORDINATION_WINDOW_SECS: u64 = 300;
pub const MIN_COORDINATED_TRADES: usize = 20;
pub const MIN_COORDINATED_WALLETS: usize = 2;
/// Coeficiente de variação abaixo do qual o preço é considerado sustentado
pub const PRICE_MAINTAINED_CV: f64 = 0.05;

pub const DEFAULT_MAX_CYCLE_DEPTH: usize = 6;
pub const DEFAULT_TOP_CONTRIBUTORS: usize = 5;
pub const DEFAULT_BASELINE_VOLUME_USD: f64 = 100_000.0;

const COUNT_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 10.0, base: 60.0 },
    ScaleTier { at_least: 50.0, base: 70.0 },
    ScaleTier { at_least: 101.0, base: 90.0 },
];

const RATIO_TIERS: &[ScaleTier] = &[
    ScaleTier { at_least: 0.0, base: 35.0 },
    ScaleTier { at_least: 3.0, base: 60.0 },
    ScaleTier { at_least: 5.0, base: 70.0 },
    ScaleTier { at_least: 10.0, base: 90.0 },
];

const SELF_TRADING_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 8.0, curve: MagnitudeCurve::Saturating { half_at: 500_000.0 } }),
    timeframe: Some(TimeframeDecay { cap: 7.0, half_life_secs: 1800.0 }),
    corroboration: None,
};

const CIRCULAR_TRADING_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 8.0, curve: MagnitudeCurve::Saturating { half_at: 500_000.0 } }),
    timeframe: Some(TimeframeDecay { cap: 7.0, half_life_secs: 1800.0 }),
    corroboration: Some(BonusTerm { cap: 5.0, curve: MagnitudeCurve::Saturating { half_at: 5.0 } }),
};

const VOLUME_INFLATION_WEIGHTS: WeightTable = WeightTable {
    tiers: RATIO_TIERS,
    magnitude: Some(BonusTerm { cap: 8.0, curve: MagnitudeCurve::Linear { from: 0.5, to: 1.0 } }),
    timeframe: Some(TimeframeDecay { cap: 7.0, half_life_secs: 1800.0 }),
    corroboration: None,
};

const PRICE_MANIPULATION_WEIGHTS: WeightTable = WeightTable {
    tiers: COUNT_TIERS,
    magnitude: Some(BonusTerm { cap: 5.0, curve: MagnitudeCurve::Saturating { half_at: 5.0 } }),
    timeframe: Some(TimeframeDecay { cap: 7.0, half_life_secs: 150.0 }),
    corroboration: Some(BonusTerm { cap: 8.0, curve: MagnitudeCurve::Linear { from: 0.0, to: 1.0 } }),
};

/// Detector de wash trading
#[derive(Debug, Clone)]
pub struct WashTradingDetector {
    max_cycle_depth: usize,
    top_contributors: usize,
    baseline_volume_usd: f64,
}

impl Default for WashTradingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl WashTradingDetector {
    pub fn new() -> Self {
        Self {
            max_cycle_depth: DEFAULT_MAX_CYCLE_DEPTH,
            top_contributors: DEFAULT_TOP_CONTRIBUTORS,
            baseline_volume_usd: DEFAULT_BASELINE_VOLUME_USD,
        }
    }

    pub fn with_settings(max_cycle_depth: usize, top_contributors: usize, baseline_volume_usd: f64) -> Self {
        Self {
            max_cycle_depth: max_cycle_depth.max(2),
            top_contributors: top_contributors.max(1),
            baseline_volume_usd,
        }
    }

    /// Todas as negociações que formam par compra/venda da mesma carteira
    /// no mesmo token a no máximo uma hora de distância.
    ///
    /// Resultado ordenado por (timestamp, tx_hash), sem repetições.
    pub fn find_self_trades(trades: &[Trade]) -> Vec<Trade> {
        let mut found = Vec::new();
        for group in group_by_wallet_and_token(&screen(trades).accepted).into_values() {
            let mut paired = vec![false; group.len()];
            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    if !within_window(group[i].timestamp, group[j].timestamp, SELF_TRADE_WINDOW_SECS) {
                        break;
                    }
                    if group[j].side == group[i].side.opposite() {
                        paired[i] = true;
                        paired[j] = true;
                    }
                }
            }
            found.extend(group.into_iter().zip(paired).filter(|(_, p)| *p).map(|(trade, _)| trade));
        }
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.tx_hash.cmp(&b.tx_hash)));
        found
    }

    /// Janela de uma hora com ao menos 10 negociações de uma carteira em
    /// um token, contendo os dois lados
    pub fn detect_self_trading(trades: &[Trade]) -> Option<SelfTradeEvidence> {
        let mut strongest = Strongest::new();
        for ((wallet, token), group) in group_by_wallet_and_token(&screen(trades).accepted) {
            for window in sliding_windows(&group, SELF_TRADE_WINDOW_SECS) {
                let slice = window.slice(&group);
                if slice.len() < MIN_SELF_TRADES {
                    continue;
                }
                if !(slice.iter().any(Trade::is_buy) && slice.iter().any(Trade::is_sell)) {
                    continue;
                }
                let first = slice[0].timestamp;
                let last = slice[slice.len() - 1].timestamp;
                strongest.offer(
                    slice.len() as f64,
                    first,
                    SelfTradeEvidence {
                        wallet_address: wallet,
                        token_address: token,
                        trade_count: slice.len(),
                        timeframe_secs: span_secs(first, last),
                        total_volume_usd: slice.iter().map(Trade::volume_usd).sum(),
                        tx_hashes: slice.iter().map(|t| t.tx_hash).collect(),
                    },
                );
            }
        }
        debug!(best = ?strongest.tally(), "varredura de auto-negociação concluída");
        strongest.into_inner()
    }

    /// Menor ciclo de negociação entre carteiras de um mesmo token.
    ///
    /// Aresta A→B quando A vende e B compra na mesma janela; o peso é
    /// `min(vendas de A, compras de B)`. Só arestas com peso mínimo de
    /// `MIN_CYCLE_COUNT` entram no grafo, então todo ciclo encontrado qualifica.
    pub fn detect_circular_trading(&self, trades: &[Trade]) -> Option<CircularTradeEvidence> {
        let mut strongest = Strongest::new();
        for (token, series) in group_by_token(&screen(trades).accepted) {
            for window in sliding_windows(&series, CIRCULAR_WINDOW_SECS) {
                // dois participantes, dois lados, MIN_CYCLE_COUNT rotações
                if window.len() < 4 * MIN_CYCLE_COUNT {
                    continue;
                }
                let slice = window.slice(&series);
                let graph = transfer_graph(slice);
                let cycle = match shortest_cycle(&graph, self.max_cycle_depth) {
                    Some(cycle) => cycle,
                    None => continue,
                };
                let cycle_count = cycle_multiplicity(&graph, &cycle);
                let wallets: Vec<Address> = cycle.iter().map(|n| graph[*n]).collect();
                let members: BTreeSet<Address> = wallets.iter().copied().collect();
                let involved: Vec<&Trade> = slice.iter().filter(|t| members.contains(&t.wallet_address)).collect();
                let (first, last) = match (involved.first(), involved.last()) {
                    (Some(first), Some(last)) => (first.timestamp, last.timestamp),
                    _ => continue,
                };

                let mut pattern: Vec<String> = wallets.iter().map(short_address).collect();
                pattern.push(short_address(&wallets[0]));

                strongest.offer(
                    cycle_count as f64,
                    slice[0].timestamp,
                    CircularTradeEvidence {
                        pattern: pattern.join("->"),
                        token_address: token,
                        wallet_addresses: wallets,
                        cycle_count,
                        timeframe_secs: span_secs(first, last),
                        total_volume_usd: involved.iter().map(|t| t.volume_usd()).sum(),
                        tx_hashes: involved.iter().map(|t| t.tx_hash).collect(),
                    },
                );
            }
        }
        debug!(best = ?strongest.tally(), "varredura de ciclos concluída");
        strongest.into_inner()
    }

    /// Janela de uma hora cujo volume supera em mais de 3x o volume normal
    pub fn detect_volume_inflation(
        &self,
        trades: &[Trade],
        baseline_volume_usd: f64,
    ) -> Option<VolumeInflationEvidence> {
        if !baseline_volume_usd.is_finite() || baseline_volume_usd <= 0.0 {
            debug!(baseline_volume_usd, "volume normal inválido, inflação não avaliada");
            return None;
        }

        let mut strongest = Strongest::new();
        for (token, series) in group_by_token(&screen(trades).accepted) {
            for window in sliding_windows(&series, VOLUME_WINDOW_SECS) {
                let slice = window.slice(&series);
                let volume: f64 = slice.iter().map(Trade::volume_usd).sum();
                let ratio = volume / baseline_volume_usd;
                if ratio <= MIN_INFLATION_RATIO + RATIO_EPSILON {
                    continue;
                }

                let mut by_wallet: BTreeMap<Address, f64> = BTreeMap::new();
                for trade in slice {
                    *by_wallet.entry(trade.wallet_address).or_insert(0.0) += trade.volume_usd();
                }
                let mut ranked: Vec<(Address, f64)> = by_wallet.into_iter().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                ranked.truncate(self.top_contributors);
                let contributed: f64 = ranked.iter().map(|(_, v)| v).sum();

                let first = slice[0].timestamp;
                let last = slice[slice.len() - 1].timestamp;
                strongest.offer(
                    ratio,
                    first,
                    VolumeInflationEvidence {
                        token_address: token,
                        normal_volume_usd: baseline_volume_usd,
                        current_volume_usd: volume,
                        inflation_ratio: ratio,
                        timeframe_secs: span_secs(first, last),
                        contributing_wallets: ranked.iter().map(|(w, _)| *w).collect(),
                        wallet_contribution_pct: if volume > 0.0 { contributed / volume } else { 0.0 },
                        tx_hashes: slice.iter().map(|t| t.tx_hash).collect(),
                    },
                );
            }
        }
        strongest.into_inner()
    }

    /// Janela de cinco minutos com ao menos 20 negociações de duas ou mais carteiras
    pub fn detect_price_manipulation(trades: &[Trade]) -> Option<PriceManipulationEvidence> {
        let mut strongest = Strongest::new();
        for (token, series) in group_by_token(&screen(trades).accepted) {
            for window in sliding_windows(&series, COORDINATION_WINDOW_SECS) {
                let slice = window.slice(&series);
                if slice.len() < MIN_COORDINATED_TRADES {
                    continue;
                }
                let wallets: BTreeSet<Address> = slice.iter().map(|t| t.wallet_address).collect();
                if wallets.len() < MIN_COORDINATED_WALLETS {
                    continue;
                }

                let prices: Vec<f64> = slice.iter().map(|t| t.price).collect();
                let first = slice[0].timestamp;
                let last = slice[slice.len() - 1].timestamp;
                strongest.offer(
                    slice.len() as f64,
                    first,
                    PriceManipulationEvidence {
                        token_address: token,
                        coordinated_trade_count: slice.len(),
                        wallet_addresses: wallets.into_iter().collect(),
                        price_maintained: coefficient_of_variation(&prices) < PRICE_MAINTAINED_CV,
                        timeframe_secs: span_secs(first, last),
                        tx_hashes: slice.iter().map(|t| t.tx_hash).collect(),
                    },
                );
            }
        }
        strongest.into_inner()
    }

    pub fn self_trading_confidence(evidence: &SelfTradeEvidence) -> f64 {
        SELF_TRADING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.trade_count as f64,
            magnitude: evidence.total_volume_usd,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }

    pub fn circular_trading_confidence(evidence: &CircularTradeEvidence) -> f64 {
        CIRCULAR_TRADING_WEIGHTS.score(&ScoreInputs {
            primary: evidence.cycle_count as f64,
            magnitude: evidence.total_volume_usd,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: evidence.wallet_addresses.len() as f64,
        })
    }

    pub fn volume_inflation_confidence(evidence: &VolumeInflationEvidence) -> f64 {
        VOLUME_INFLATION_WEIGHTS.score(&ScoreInputs {
            primary: evidence.inflation_ratio,
            magnitude: evidence.wallet_contribution_pct,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: 0.0,
        })
    }

    pub fn price_manipulation_confidence(evidence: &PriceManipulationEvidence) -> f64 {
        PRICE_MANIPULATION_WEIGHTS.score(&ScoreInputs {
            primary: evidence.coordinated_trade_count as f64,
            magnitude: evidence.wallet_addresses.len() as f64,
            timeframe_secs: Some(evidence.timeframe_secs as f64),
            corroboration: if evidence.price_maintained { 1.0 } else { 0.0 },
        })
    }
}

impl PatternScanner for WashTradingDetector {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::WashTrading
    }

    fn name(&self) -> &str {
        "WashTradingDetector"
    }

    fn scan(&self, batch: &MarketBatch) -> Vec<Evidence> {
        let baseline = batch.baseline_volume_usd.unwrap_or(self.baseline_volume_usd);
        let mut found = Vec::new();
        if let Some(e) = Self::detect_self_trading(&batch.trades) {
            found.push(Evidence::SelfTrading(e));
        }
        if let Some(e) = self.detect_circular_trading(&batch.trades) {
            found.push(Evidence::CircularTrading(e));
        }
        if let Some(e) = self.detect_volume_inflation(&batch.trades, baseline) {
            found.push(Evidence::VolumeInflation(e));
        }
        if let Some(e) = Self::detect_price_manipulation(&batch.trades) {
            found.push(Evidence::PriceManipulation(e));
        }
        found
    }
}

fn group_by_wallet_and_token(trades: &[Trade]) -> BTreeMap<(Address, Address), Vec<Trade>> {
    let mut groups: BTreeMap<(Address, Address), Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups.entry((trade.wallet_address, trade.token_address)).or_default().push(trade.clone());
    }
    for group in groups.values_mut() {
        sort_trades(group);
    }
    groups
}

pub(crate) fn group_by_token(trades: &[Trade]) -> BTreeMap<Address, Vec<Trade>> {
    let mut groups: BTreeMap<Address, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups.entry(trade.token_address).or_default().push(trade.clone());
    }
    for group in groups.values_mut() {
        sort_trades(group);
    }
    groups
}

/// Ordem cronológica; empates resolvidos pelo hash para independer da ordem de chegada
pub(crate) fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_key(|t| t.tx_hash);
    sort_by_time(trades);
}

/// Grafo de transferências implícitas de uma janela. Nós em ordem de endereço.
fn transfer_graph(slice: &[Trade]) -> DiGraph<Address, usize> {
    let mut sells: BTreeMap<Address, usize> = BTreeMap::new();
    let mut buys: BTreeMap<Address, usize> = BTreeMap::new();
    for trade in slice {
        let counter = if trade.is_sell() { &mut sells } else { &mut buys };
        *counter.entry(trade.wallet_address).or_insert(0) += 1;
    }

    let wallets: BTreeSet<Address> = sells.keys().chain(buys.keys()).copied().collect();
    let mut graph = DiGraph::new();
    let nodes: BTreeMap<Address, NodeIndex> = wallets.iter().map(|w| (*w, graph.add_node(*w))).collect();

    for (seller, sold) in &sells {
        for (buyer, bought) in &buys {
            if seller == buyer {
                continue;
            }
            let weight = (*sold).min(*bought);
            if weight < MIN_CYCLE_COUNT {
                continue;
            }
            if let (Some(from), Some(to)) = (nodes.get(seller), nodes.get(buyer)) {
                graph.add_edge(*from, *to, weight);
            }
        }
    }
    graph
}

/// Menor ciclo do grafo com no máximo `max_depth` arestas; empates ficam
/// com o ciclo que começa no menor endereço
fn shortest_cycle(graph: &DiGraph<Address, usize>, max_depth: usize) -> Option<Vec<NodeIndex>> {
    let mut best: Option<Vec<NodeIndex>> = None;
    for start in graph.node_indices() {
        let limit = best.as_ref().map_or(max_depth, |b| b.len() - 1);
        if let Some(cycle) = shortest_cycle_from(graph, start, limit) {
            if best.as_ref().map_or(true, |b| cycle.len() < b.len()) {
                best = Some(cycle);
            }
        }
    }
    best
}

/// BFS limitado a partir de `start`; devolve os nós do ciclo começando em `start`
fn shortest_cycle_from(
    graph: &DiGraph<Address, usize>,
    start: NodeIndex,
    max_depth: usize,
) -> Option<Vec<NodeIndex>> {
    let mut depth = vec![usize::MAX; graph.node_count()];
    let mut parent: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
    depth[start.index()] = 0;
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let d = depth[node.index()];
        if d + 1 > max_depth {
            continue;
        }
        let mut successors: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
        successors.sort();
        for next in successors {
            if next == start {
                let mut cycle = vec![node];
                let mut current = node;
                while let Some(p) = parent[current.index()] {
                    cycle.push(p);
                    current = p;
                }
                cycle.reverse();
                return Some(cycle);
            }
            if depth[next.index()] == usize::MAX {
                depth[next.index()] = d + 1;
                parent[next.index()] = Some(node);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Menor peso ao longo do ciclo fechado
fn cycle_multiplicity(graph: &DiGraph<Address, usize>, cycle: &[NodeIndex]) -> usize {
    (0..cycle.len())
        .map(|i| {
            let from = cycle[i];
            let to = cycle[(i + 1) % cycle.len()];
            graph.find_edge(from, to).map_or(0, |e| graph[e])
        })
        .min()
        .unwrap_or(0)
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / avg
}
