/*!
 * Ethernity Surveillance - Detection
 *
 * Pacote entregue ao colaborador de alertas: evidência, confiança e os
 * dados derivados para explicar a detecção. Severidade, persistência e
 * deduplicação ficam fora deste crate.
 */

use crate::evidence::{DetectorFamily, Evidence, PatternKind};
use ethernity_core::TransactionHash;
use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Detecção positiva
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub family: DetectorFamily,
    pub kind: PatternKind,
    /// Confiança em [0, 100]
    pub confidence: f64,
    pub wallets: Vec<Address>,
    pub tokens: Vec<Address>,
    pub tx_hashes: Vec<TransactionHash>,
    pub description: String,
    pub estimated_loss_usd: f64,
    pub evidence: Evidence,
}

impl Detection {
    pub fn from_evidence(evidence: Evidence) -> Self {
        Self {
            family: evidence.family(),
            kind: evidence.kind(),
            confidence: evidence.confidence(),
            wallets: evidence.wallets(),
            tokens: evidence.tokens(),
            tx_hashes: evidence.tx_hashes(),
            description: evidence.describe(),
            estimated_loss_usd: evidence.estimated_loss_usd(),
            evidence,
        }
    }

    /// Medidas brutas da evidência como JSON
    pub fn metrics(&self) -> Value {
        serde_json::to_value(&self.evidence).unwrap_or(Value::Null)
    }
}
