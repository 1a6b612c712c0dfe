/*!
 * Ethernity Surveillance
 *
 * Motor de detecção de atividade suspeita on-chain: wash trading, rug
 * pull, pump & dump e ataques sybil. Cada detector é uma função pura de
 * um lote de eventos de mercado e produz evidências com confiança em
 * [0, 100].
 */

mod config;
mod detection;
mod detectors;
mod engine;
mod evidence;
mod scoring;
mod window;

// Re-exportações públicas
pub use config::*;
pub use detection::*;
pub use detectors::*;
pub use engine::*;
pub use evidence::*;
pub use scoring::*;
pub use window::*;
