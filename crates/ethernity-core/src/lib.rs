/*!
 * Ethernity Core
 * 
 * Modelo de eventos de mercado e utilitários compartilhados
 * pelos detectores da workspace Ethernity
 */

pub mod types;
pub mod traits;
pub mod utils;
pub mod error;
pub mod ingest;

// Re-exportações públicas
pub use error::{Error, Result};
pub use types::*;
pub use traits::{Timestamped, Validate};
pub use ingest::{RejectedRecord, Screened};
