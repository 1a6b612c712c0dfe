/*!
 * Ethernity Traits
 * 
 * Traits comuns aos registros consumidos pelos detectores
 */

use crate::error::Result;
use crate::types::Timestamp;

/// Registro posicionado no tempo, ordenável antes da análise por janela
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

/// Registro que pode violar seus invariantes e deve ser descartado individualmente
pub trait Validate {
    /// Verifica os invariantes do registro
    fn validate(&self) -> Result<()>;

    /// Identificador legível usado ao reportar o registro rejeitado
    fn reference(&self) -> String;
}
