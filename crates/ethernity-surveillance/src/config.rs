/*!
 * Ethernity Surveillance - Config
 */

use crate::detectors::wash_trading::{DEFAULT_BASELINE_VOLUME_USD, DEFAULT_MAX_CYCLE_DEPTH, DEFAULT_TOP_CONTRIBUTORS};
use ethernity_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuração do motor de vigilância.
///
/// Limiares e janelas de detecção são constantes fixas e não aparecem aqui.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveillanceConfig {
    /// Famílias de detectores habilitadas
    pub families: FamilySelection,
    /// Profundidade máxima da busca de ciclos entre carteiras
    pub max_cycle_depth: usize,
    /// Volume horário normal em USD quando o lote não traz o seu
    pub baseline_volume_usd: f64,
    /// Carteiras reportadas na inflação de volume
    pub top_contributors: usize,
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        Self {
            families: FamilySelection::default(),
            max_cycle_depth: DEFAULT_MAX_CYCLE_DEPTH,
            baseline_volume_usd: DEFAULT_BASELINE_VOLUME_USD,
            top_contributors: DEFAULT_TOP_CONTRIBUTORS,
        }
    }
}

/// Seleção de famílias de detectores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilySelection {
    /// Habilita detecção de wash trading
    pub detect_wash_trading: bool,
    /// Habilita detecção de rug pull
    pub detect_rug_pull: bool,
    /// Habilita detecção de pump & dump
    pub detect_pump_dump: bool,
    /// Habilita detecção de ataques sybil
    pub detect_sybil: bool,
}

impl Default for FamilySelection {
    fn default() -> Self {
        Self {
            detect_wash_trading: true,
            detect_rug_pull: true,
            detect_pump_dump: true,
            detect_sybil: true,
        }
    }
}

impl SurveillanceConfig {
    /// Lê a configuração de um documento JSON; campos ausentes usam o padrão
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cycle_depth < 2 {
            return Err(Error::ConfigError(format!(
                "max_cycle_depth deve ser ao menos 2, recebido {}",
                self.max_cycle_depth
            )));
        }
        if !self.baseline_volume_usd.is_finite() || self.baseline_volume_usd <= 0.0 {
            return Err(Error::ConfigError(format!(
                "baseline_volume_usd deve ser positivo, recebido {}",
                self.baseline_volume_usd
            )));
        }
        if self.top_contributors == 0 {
            return Err(Error::ConfigError("top_contributors deve ser ao menos 1".to_string()));
        }
        Ok(())
    }
}
