/*!
 * Ethernity Surveillance - Evidence
 *
 * Uma evidência por padrão detectável. Cada registro guarda apenas as
 * medidas que justificam a detecção e permitem revisá-la depois.
 */

use crate::detectors::{PumpDumpDetector, RugPullDetector, SybilDetector, WashTradingDetector};
use ethernity_core::utils::{format_address, short_address};
use ethernity_core::{ContractAction, Timestamp, TradeSide, TransactionHash};
use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Família de detectores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorFamily {
    WashTrading,
    RugPull,
    PumpDump,
    SybilAttack,
}

impl fmt::Display for DetectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorFamily::WashTrading => write!(f, "wash_trading"),
            DetectorFamily::RugPull => write!(f, "rug_pull"),
            DetectorFamily::PumpDump => write!(f, "pump_dump"),
            DetectorFamily::SybilAttack => write!(f, "sybil_attack"),
        }
    }
}

/// Espécie de padrão dentro de uma família
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    SelfTrading,
    CircularTrading,
    VolumeInflation,
    PriceManipulation,
    LiquidityRemoval,
    TokenDump,
    ContractManipulation,
    CoordinatedBuying,
    PriceSpike,
    Dump,
    CoordinatedSelling,
    WalletClustering,
    BehaviorSimilarity,
    AirdropFarming,
    CoordinatedVoting,
}

impl PatternKind {
    pub fn family(self) -> DetectorFamily {
        match self {
            PatternKind::SelfTrading
            | PatternKind::CircularTrading
            | PatternKind::VolumeInflation
            | PatternKind::PriceManipulation => DetectorFamily::WashTrading,
            PatternKind::LiquidityRemoval
            | PatternKind::TokenDump
            | PatternKind::ContractManipulation => DetectorFamily::RugPull,
            PatternKind::CoordinatedBuying
            | PatternKind::PriceSpike
            | PatternKind::Dump
            | PatternKind::CoordinatedSelling => DetectorFamily::PumpDump,
            PatternKind::WalletClustering
            | PatternKind::BehaviorSimilarity
            | PatternKind::AirdropFarming
            | PatternKind::CoordinatedVoting => DetectorFamily::SybilAttack,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::SelfTrading => "self_trading",
            PatternKind::CircularTrading => "circular_trading",
            PatternKind::VolumeInflation => "volume_inflation",
            PatternKind::PriceManipulation => "price_manipulation",
            PatternKind::LiquidityRemoval => "liquidity_removal",
            PatternKind::TokenDump => "token_dump",
            PatternKind::ContractManipulation => "contract_manipulation",
            PatternKind::CoordinatedBuying => "coordinated_buying",
            PatternKind::PriceSpike => "price_spike",
            PatternKind::Dump => "dump",
            PatternKind::CoordinatedSelling => "coordinated_selling",
            PatternKind::WalletClustering => "wallet_clustering",
            PatternKind::BehaviorSimilarity => "behavior_similarity",
            PatternKind::AirdropFarming => "airdrop_farming",
            PatternKind::CoordinatedVoting => "coordinated_voting",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Wash trading
// ============================================================================

/// Mesma carteira comprando e vendendo o mesmo token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTradeEvidence {
    pub wallet_address: Address,
    pub token_address: Address,
    pub trade_count: usize,
    pub timeframe_secs: u64,
    pub total_volume_usd: f64,
    pub tx_hashes: Vec<TransactionHash>,
}

/// Ciclo de transferências entre carteiras (A→B→…→A)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularTradeEvidence {
    /// Ciclo legível, ex.: `0x1111aaaa->0x2222bbbb->0x1111aaaa`
    pub pattern: String,
    pub token_address: Address,
    pub wallet_addresses: Vec<Address>,
    /// Rotações completas suportadas pelas negociações do ciclo
    pub cycle_count: usize,
    pub timeframe_secs: u64,
    pub total_volume_usd: f64,
    pub tx_hashes: Vec<TransactionHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInflationEvidence {
    pub token_address: Address,
    pub normal_volume_usd: f64,
    pub current_volume_usd: f64,
    pub inflation_ratio: f64,
    pub timeframe_secs: u64,
    pub contributing_wallets: Vec<Address>,
    /// Fração (0..=1) do volume vinda das carteiras listadas
    pub wallet_contribution_pct: f64,
    pub tx_hashes: Vec<TransactionHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceManipulationEvidence {
    pub token_address: Address,
    pub coordinated_trade_count: usize,
    pub wallet_addresses: Vec<Address>,
    pub price_maintained: bool,
    pub timeframe_secs: u64,
    pub tx_hashes: Vec<TransactionHash>,
}

// ============================================================================
// Rug pull
// ============================================================================

/// Retirada de liquidez; `percentage` é fração (0.9 = 90%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRemovalEvidence {
    pub percentage: f64,
    pub timeframe_secs: u64,
    pub removed_amount_usd: f64,
    pub remaining_amount_usd: f64,
    pub wallet_address: Option<Address>,
    pub tx_hashes: Vec<TransactionHash>,
}

/// Venda concentrada do supply; `percentage` e `price_impact` são frações
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDumpEvidence {
    pub token_address: Address,
    pub percentage: f64,
    pub timeframe_secs: u64,
    pub sold_amount: f64,
    pub total_supply: f64,
    pub price_impact: f64,
    pub wallet_address: Address,
    pub tx_hashes: Vec<TransactionHash>,
}

/// Ação administrativa suspeita. Com `detected == false` os demais
/// campos não têm significado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractManipulationEvidence {
    pub detected: bool,
    pub action: ContractAction,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub timelock_delay_secs: Option<u64>,
    pub tx_hashes: Vec<TransactionHash>,
}

impl Default for ContractManipulationEvidence {
    fn default() -> Self {
        Self {
            detected: false,
            action: ContractAction::OwnershipTransfer,
            from_address: None,
            to_address: None,
            timelock_delay_secs: None,
            tx_hashes: Vec::new(),
        }
    }
}

// ============================================================================
// Pump & dump
// ============================================================================

/// Compras ou vendas coordenadas de carteiras distintas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedTradeEvidence {
    pub side: TradeSide,
    pub token_address: Address,
    pub wallet_addresses: Vec<Address>,
    pub trade_count: usize,
    pub timeframe_secs: u64,
    pub total_volume_usd: f64,
    /// Fração: (máximo - média) / média nas compras, (média - mínimo) / média nas vendas
    pub price_impact: f64,
    pub tx_hashes: Vec<TransactionHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSpikeEvidence {
    pub start_price: f64,
    pub end_price: f64,
    pub percentage_increase: f64,
    pub started_at: Timestamp,
    pub peaked_at: Timestamp,
    pub timeframe_secs: u64,
    pub volume_during_spike_usd: f64,
    pub volume_spike_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpEvidence {
    pub peak_price: f64,
    pub dump_price: f64,
    pub percentage_drop: f64,
    pub peaked_at: Timestamp,
    pub dumped_at: Timestamp,
    pub timeframe_secs: u64,
    pub volume_during_dump_usd: f64,
    pub volume_spike_ratio: f64,
}

// ============================================================================
// Sybil
// ============================================================================

/// Dimensão que mais aproximou as carteiras de um cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPattern {
    CreationTiming,
    BalanceSimilarity,
    ActivitySimilarity,
}

impl fmt::Display for ClusterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterPattern::CreationTiming => write!(f, "creation_timing"),
            ClusterPattern::BalanceSimilarity => write!(f, "balance_similarity"),
            ClusterPattern::ActivitySimilarity => write!(f, "activity_similarity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletClusterEvidence {
    pub wallet_addresses: Vec<Address>,
    pub cluster_size: usize,
    pub average_similarity_score: f64,
    pub pattern_type: ClusterPattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSimilarityEvidence {
    pub wallet_addresses: Vec<Address>,
    pub similarity_score: f64,
    pub matching_patterns: Vec<String>,
    pub timeframe_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirdropFarmingEvidence {
    pub wallet_addresses: Vec<Address>,
    pub airdrop_contract: Address,
    pub claim_count: usize,
    pub claim_timing_similarity: f64,
    pub claim_amount_similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    For,
    Against,
    Abstain,
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::For => write!(f, "for"),
            VoteDirection::Against => write!(f, "against"),
            VoteDirection::Abstain => write!(f, "abstain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedVotingEvidence {
    pub wallet_addresses: Vec<Address>,
    pub proposal_id: String,
    pub vote_direction: VoteDirection,
    pub vote_count: usize,
    pub voting_timing_similarity: f64,
    pub total_voting_power: f64,
}

// ============================================================================
// União
// ============================================================================

/// Evidência de qualquer padrão
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    SelfTrading(SelfTradeEvidence),
    CircularTrading(CircularTradeEvidence),
    VolumeInflation(VolumeInflationEvidence),
    PriceManipulation(PriceManipulationEvidence),
    LiquidityRemoval(LiquidityRemovalEvidence),
    TokenDump(TokenDumpEvidence),
    ContractManipulation(ContractManipulationEvidence),
    CoordinatedBuying(CoordinatedTradeEvidence),
    PriceSpike(PriceSpikeEvidence),
    Dump(DumpEvidence),
    CoordinatedSelling(CoordinatedTradeEvidence),
    WalletClustering(WalletClusterEvidence),
    BehaviorSimilarity(BehaviorSimilarityEvidence),
    AirdropFarming(AirdropFarmingEvidence),
    CoordinatedVoting(CoordinatedVotingEvidence),
}

impl Evidence {
    pub fn kind(&self) -> PatternKind {
        match self {
            Evidence::SelfTrading(_) => PatternKind::SelfTrading,
            Evidence::CircularTrading(_) => PatternKind::CircularTrading,
            Evidence::VolumeInflation(_) => PatternKind::VolumeInflation,
            Evidence::PriceManipulation(_) => PatternKind::PriceManipulation,
            Evidence::LiquidityRemoval(_) => PatternKind::LiquidityRemoval,
            Evidence::TokenDump(_) => PatternKind::TokenDump,
            Evidence::ContractManipulation(_) => PatternKind::ContractManipulation,
            Evidence::CoordinatedBuying(_) => PatternKind::CoordinatedBuying,
            Evidence::PriceSpike(_) => PatternKind::PriceSpike,
            Evidence::Dump(_) => PatternKind::Dump,
            Evidence::CoordinatedSelling(_) => PatternKind::CoordinatedSelling,
            Evidence::WalletClustering(_) => PatternKind::WalletClustering,
            Evidence::BehaviorSimilarity(_) => PatternKind::BehaviorSimilarity,
            Evidence::AirdropFarming(_) => PatternKind::AirdropFarming,
            Evidence::CoordinatedVoting(_) => PatternKind::CoordinatedVoting,
        }
    }

    pub fn family(&self) -> DetectorFamily {
        self.kind().family()
    }

    /// Confiança em [0, 100] segundo a tabela da espécie
    pub fn confidence(&self) -> f64 {
        match self {
            Evidence::SelfTrading(e) => WashTradingDetector::self_trading_confidence(e),
            Evidence::CircularTrading(e) => WashTradingDetector::circular_trading_confidence(e),
            Evidence::VolumeInflation(e) => WashTradingDetector::volume_inflation_confidence(e),
            Evidence::PriceManipulation(e) => WashTradingDetector::price_manipulation_confidence(e),
            Evidence::LiquidityRemoval(e) => RugPullDetector::liquidity_removal_confidence(e),
            Evidence::TokenDump(e) => RugPullDetector::token_dump_confidence(e),
            Evidence::ContractManipulation(e) => RugPullDetector::manipulation_confidence(e),
            Evidence::CoordinatedBuying(e) | Evidence::CoordinatedSelling(e) => {
                PumpDumpDetector::coordinated_trading_confidence(e)
            }
            Evidence::PriceSpike(e) => PumpDumpDetector::price_spike_confidence(e),
            Evidence::Dump(e) => PumpDumpDetector::dump_confidence(e),
            Evidence::WalletClustering(e) => SybilDetector::wallet_clustering_confidence(e),
            Evidence::BehaviorSimilarity(e) => SybilDetector::behavior_similarity_confidence(e),
            Evidence::AirdropFarming(e) => SybilDetector::airdrop_farming_confidence(e),
            Evidence::CoordinatedVoting(e) => SybilDetector::coordinated_voting_confidence(e),
        }
    }

    /// Carteiras envolvidas, sem repetição e na ordem da evidência
    pub fn wallets(&self) -> Vec<Address> {
        let mut wallets = match self {
            Evidence::SelfTrading(e) => vec![e.wallet_address],
            Evidence::CircularTrading(e) => e.wallet_addresses.clone(),
            Evidence::VolumeInflation(e) => e.contributing_wallets.clone(),
            Evidence::PriceManipulation(e) => e.wallet_addresses.clone(),
            Evidence::LiquidityRemoval(e) => e.wallet_address.into_iter().collect(),
            Evidence::TokenDump(e) => vec![e.wallet_address],
            Evidence::ContractManipulation(e) => {
                e.from_address.into_iter().chain(e.to_address).collect()
            }
            Evidence::CoordinatedBuying(e) | Evidence::CoordinatedSelling(e) => e.wallet_addresses.clone(),
            Evidence::PriceSpike(_) | Evidence::Dump(_) => Vec::new(),
            Evidence::WalletClustering(e) => e.wallet_addresses.clone(),
            Evidence::BehaviorSimilarity(e) => e.wallet_addresses.clone(),
            Evidence::AirdropFarming(e) => e.wallet_addresses.clone(),
            Evidence::CoordinatedVoting(e) => e.wallet_addresses.clone(),
        };
        let mut seen = std::collections::HashSet::new();
        wallets.retain(|w| seen.insert(*w));
        wallets
    }

    pub fn tokens(&self) -> Vec<Address> {
        match self {
            Evidence::SelfTrading(e) => vec![e.token_address],
            Evidence::CircularTrading(e) => vec![e.token_address],
            Evidence::VolumeInflation(e) => vec![e.token_address],
            Evidence::PriceManipulation(e) => vec![e.token_address],
            Evidence::TokenDump(e) => vec![e.token_address],
            Evidence::CoordinatedBuying(e) | Evidence::CoordinatedSelling(e) => vec![e.token_address],
            Evidence::AirdropFarming(e) => vec![e.airdrop_contract],
            _ => Vec::new(),
        }
    }

    pub fn tx_hashes(&self) -> Vec<TransactionHash> {
        match self {
            Evidence::SelfTrading(e) => e.tx_hashes.clone(),
            Evidence::CircularTrading(e) => e.tx_hashes.clone(),
            Evidence::VolumeInflation(e) => e.tx_hashes.clone(),
            Evidence::PriceManipulation(e) => e.tx_hashes.clone(),
            Evidence::LiquidityRemoval(e) => e.tx_hashes.clone(),
            Evidence::TokenDump(e) => e.tx_hashes.clone(),
            Evidence::ContractManipulation(e) => e.tx_hashes.clone(),
            Evidence::CoordinatedBuying(e) | Evidence::CoordinatedSelling(e) => e.tx_hashes.clone(),
            _ => Vec::new(),
        }
    }

    /// Perda estimada em USD; zero quando a evidência não permite estimar
    pub fn estimated_loss_usd(&self) -> f64 {
        let loss = match self {
            Evidence::LiquidityRemoval(e) => e.removed_amount_usd,
            Evidence::TokenDump(e) => e.sold_amount * e.price_impact,
            Evidence::Dump(e) => e.volume_during_dump_usd * e.percentage_drop,
            Evidence::CoordinatedSelling(e) => e.total_volume_usd * e.price_impact,
            _ => 0.0,
        };
        if loss.is_finite() { loss.max(0.0) } else { 0.0 }
    }

    /// Descrição legível da detecção
    pub fn describe(&self) -> String {
        match self {
            Evidence::SelfTrading(e) => format!(
                "{} negociações de auto-trading da carteira {} em {} min, volume ${:.2}",
                e.trade_count,
                short_address(&e.wallet_address),
                e.timeframe_secs / 60,
                e.total_volume_usd
            ),
            Evidence::CircularTrading(e) => format!(
                "{} ciclos de negociação circular envolvendo {} carteiras. Padrão: {}",
                e.cycle_count,
                e.wallet_addresses.len(),
                e.pattern
            ),
            Evidence::VolumeInflation(e) => format!(
                "Volume {:.1}x acima do normal. {} carteiras respondem por {:.0}% do volume",
                e.inflation_ratio,
                e.contributing_wallets.len(),
                e.wallet_contribution_pct * 100.0
            ),
            Evidence::PriceManipulation(e) => format!(
                "{} negociações coordenadas de {} carteiras. Preço {}",
                e.coordinated_trade_count,
                e.wallet_addresses.len(),
                if e.price_maintained { "sustentado" } else { "manipulado" }
            ),
            Evidence::LiquidityRemoval(e) => format!(
                "Remoção de {:.1}% da liquidez (${:.2}) em {} min",
                e.percentage * 100.0,
                e.removed_amount_usd,
                e.timeframe_secs / 60
            ),
            Evidence::TokenDump(e) => format!(
                "{:.1}% do supply vendido em {} min por {}, queda de preço de {:.1}%",
                e.percentage * 100.0,
                e.timeframe_secs / 60,
                short_address(&e.wallet_address),
                e.price_impact * 100.0
            ),
            Evidence::ContractManipulation(e) if !e.detected => {
                "Nenhuma manipulação de contrato detectada".to_string()
            }
            Evidence::ContractManipulation(e) => format!(
                "{} detectado: {} → {}",
                e.action,
                e.from_address.map(|a| format_address(&a)).unwrap_or_else(|| "N/A".to_string()),
                e.to_address.map(|a| format_address(&a)).unwrap_or_else(|| "N/A".to_string())
            ),
            Evidence::CoordinatedBuying(e) | Evidence::CoordinatedSelling(e) => format!(
                "{} ordens de {} coordenadas de {} carteiras com impacto de {:.1}%. Volume total: ${:.2}",
                e.trade_count,
                if e.side == TradeSide::Buy { "compra" } else { "venda" },
                e.wallet_addresses.len(),
                e.price_impact * 100.0,
                e.total_volume_usd
            ),
            Evidence::PriceSpike(e) => format!(
                "Alta de {:.1}% em {} min. Preço: ${:.4} → ${:.4}",
                e.percentage_increase * 100.0,
                e.timeframe_secs / 60,
                e.start_price,
                e.end_price
            ),
            Evidence::Dump(e) => format!(
                "Queda de {:.1}% em {} min após a alta. Preço: ${:.4} → ${:.4}",
                e.percentage_drop * 100.0,
                e.timeframe_secs / 60,
                e.peak_price,
                e.dump_price
            ),
            Evidence::WalletClustering(e) => format!(
                "Cluster de {} carteiras com {:.1}% de similaridade. Padrão: {}",
                e.cluster_size,
                e.average_similarity_score * 100.0,
                e.pattern_type
            ),
            Evidence::BehaviorSimilarity(e) => format!(
                "{} carteiras com {:.1}% de similaridade comportamental. Padrões: {}",
                e.wallet_addresses.len(),
                e.similarity_score * 100.0,
                e.matching_patterns.join(", ")
            ),
            Evidence::AirdropFarming(e) => format!(
                "{} resgates de airdrop de {} carteiras com {:.1}% de similaridade temporal",
                e.claim_count,
                e.wallet_addresses.len(),
                e.claim_timing_similarity * 100.0
            ),
            Evidence::CoordinatedVoting(e) => format!(
                "{} votos coordenados ({}) de {} carteiras na proposta {} com {:.1}% de similaridade temporal. Poder de voto: {:.0}",
                e.vote_count,
                e.vote_direction,
                e.wallet_addresses.len(),
                e.proposal_id,
                e.voting_timing_similarity * 100.0,
                e.total_voting_power
            ),
        }
    }
}
