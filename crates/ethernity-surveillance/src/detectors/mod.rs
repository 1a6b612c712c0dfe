use crate::engine::MarketBatch;
use crate::evidence::{DetectorFamily, Evidence};

pub mod wash_trading;
pub mod rug_pull;
pub mod pump_dump;
pub mod sybil;

pub use wash_trading::WashTradingDetector;
pub use rug_pull::RugPullDetector;
pub use pump_dump::PumpDumpDetector;
pub use sybil::{SybilDetector, WalletSimilarity};

/// Uma família de detectores aplicada a um lote já triado.
///
/// Implementações são puras: a mesma entrada produz sempre a mesma saída.
pub trait PatternScanner: Send + Sync {
    fn family(&self) -> DetectorFamily;
    fn name(&self) -> &str;
    fn scan(&self, batch: &MarketBatch) -> Vec<Evidence>;
}

/// Igualdade relativa tolerante para comparações de limiar
pub(crate) const RATIO_EPSILON: f64 = 1e-9;

/// Proximidade em [0, 1] entre dois valores não negativos (`min / max`)
pub(crate) fn ratio_proximity(a: f64, b: f64) -> f64 {
    let high = a.max(b);
    if high <= 0.0 {
        return 1.0;
    }
    (a.min(b) / high).clamp(0.0, 1.0)
}

/// Proximidade linear em [0, 1]: 1 quando `distance` é zero, 0 a partir de `scale`
pub(crate) fn linear_proximity(distance: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance.abs() / scale).clamp(0.0, 1.0)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
