/*!
 * Ethernity Surveillance - Scoring
 *
 * Modelo de confiança compartilhado pelas quatro famílias:
 * `tier(escala) + bônus de magnitude + bônus temporal + bônus de corroboração`,
 * limitado a [0, 100]. Cada família fornece sua própria tabela de pesos.
 */

use serde::Serialize;

/// Confiança mínima e máxima
pub const MIN_CONFIDENCE: f64 = 0.0;
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Degrau de escala: vale quando a dimensão primária é >= `at_least`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleTier {
    pub at_least: f64,
    pub base: f64,
}

/// Curva que normaliza uma medida bruta para [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MagnitudeCurve {
    /// Interpolação linear entre `from` (0) e `to` (1)
    Linear { from: f64, to: f64 },
    /// `x / (x + half_at)`: metade do bônus em `half_at`, saturando em 1
    Saturating { half_at: f64 },
}

impl MagnitudeCurve {
    pub fn fraction(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        let fraction = match *self {
            MagnitudeCurve::Linear { from, to } => {
                if to <= from {
                    if value >= to { 1.0 } else { 0.0 }
                } else {
                    (value - from) / (to - from)
                }
            }
            MagnitudeCurve::Saturating { half_at } => {
                if value <= 0.0 {
                    0.0
                } else if value.is_infinite() {
                    1.0
                } else {
                    value / (value + half_at.max(f64::MIN_POSITIVE))
                }
            }
        };
        fraction.clamp(0.0, 1.0)
    }
}

/// Bônus limitado por `cap`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BonusTerm {
    pub cap: f64,
    pub curve: MagnitudeCurve,
}

impl BonusTerm {
    pub fn bonus(&self, value: f64) -> f64 {
        self.cap * self.curve.fraction(value)
    }
}

/// Bônus temporal: `cap` para janela nula, metade a cada `half_life_secs`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeframeDecay {
    pub cap: f64,
    pub half_life_secs: f64,
}

impl TimeframeDecay {
    pub fn bonus(&self, timeframe_secs: f64) -> f64 {
        if timeframe_secs.is_nan() {
            return 0.0;
        }
        let t = timeframe_secs.max(0.0);
        self.cap * 0.5f64.powf(t / self.half_life_secs.max(f64::MIN_POSITIVE))
    }
}

/// Tabela de pesos de uma espécie de evidência
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightTable {
    pub tiers: &'static [ScaleTier],
    pub magnitude: Option<BonusTerm>,
    pub timeframe: Option<TimeframeDecay>,
    pub corroboration: Option<BonusTerm>,
}

/// Medidas extraídas de uma evidência para pontuação
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreInputs {
    pub primary: f64,
    pub magnitude: f64,
    pub timeframe_secs: Option<f64>,
    pub corroboration: f64,
}

impl WeightTable {
    /// Base do maior degrau alcançado pela dimensão primária
    pub fn tier_base(&self, primary: f64) -> f64 {
        self.tiers
            .iter()
            .filter(|tier| primary >= tier.at_least)
            .map(|tier| tier.base)
            .fold(MIN_CONFIDENCE, f64::max)
    }

    pub fn score(&self, inputs: &ScoreInputs) -> f64 {
        let mut score = self.tier_base(inputs.primary);
        if let Some(term) = &self.magnitude {
            score += term.bonus(inputs.magnitude);
        }
        if let (Some(decay), Some(secs)) = (&self.timeframe, inputs.timeframe_secs) {
            score += decay.bonus(secs);
        }
        if let Some(term) = &self.corroboration {
            score += term.bonus(inputs.corroboration);
        }
        clamp_confidence(score)
    }
}

/// Limita uma pontuação a [0, 100]; NaN vira 0
pub fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_CONFIDENCE;
    }
    score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
