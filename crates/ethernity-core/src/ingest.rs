/*!
 * Ethernity Ingest
 *
 * Triagem de registros de mercado: cada registro inválido é descartado
 * individualmente e reportado, sem invalidar o lote.
 */

use crate::error::{Error, Result};
use crate::traits::Validate;
use crate::types::{PricePoint, Trade, WalletInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Registro rejeitado e o motivo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub reference: String,
    pub reason: String,
}

/// Resultado da triagem de um lote
#[derive(Debug, Clone)]
pub struct Screened<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> Default for Screened<T> {
    fn default() -> Self {
        Self { accepted: Vec::new(), rejected: Vec::new() }
    }
}

/// Separa registros válidos dos inválidos
pub fn screen<T: Validate + Clone>(records: &[T]) -> Screened<T> {
    let mut screened = Screened::default();
    for record in records {
        match record.validate() {
            Ok(()) => screened.accepted.push(record.clone()),
            Err(e) => {
                let reference = record.reference();
                warn!(record = %reference, reason = %e, "registro descartado");
                screened.rejected.push(RejectedRecord { reference, reason: e.to_string() });
            }
        }
    }
    screened
}

/// Decodifica um array JSON elemento a elemento
fn records_from_json<T>(value: &Value, kind: &str) -> Result<Screened<T>>
where
    T: DeserializeOwned + Validate,
{
    let items = value
        .as_array()
        .ok_or_else(|| Error::DecodeError(format!("esperado array de {}", kind)))?;

    let mut screened = Screened::default();
    for (index, item) in items.iter().enumerate() {
        let record: T = match serde_json::from_value(item.clone()) {
            Ok(record) => record,
            Err(e) => {
                let reference = format!("{} #{}", kind, index);
                warn!(record = %reference, reason = %e, "registro não decodificado");
                screened.rejected.push(RejectedRecord {
                    reference,
                    reason: Error::DecodeError(e.to_string()).to_string(),
                });
                continue;
            }
        };
        match record.validate() {
            Ok(()) => screened.accepted.push(record),
            Err(e) => {
                let reference = record.reference();
                warn!(record = %reference, reason = %e, "registro descartado");
                screened.rejected.push(RejectedRecord { reference, reason: e.to_string() });
            }
        }
    }
    Ok(screened)
}

/// Decodifica negociações de um array JSON
pub fn trades_from_json(value: &Value) -> Result<Screened<Trade>> {
    records_from_json(value, "trade")
}

/// Decodifica uma série de preços de um array JSON
pub fn price_points_from_json(value: &Value) -> Result<Screened<PricePoint>> {
    records_from_json(value, "price point")
}

/// Decodifica metadados de carteiras de um array JSON
pub fn wallets_from_json(value: &Value) -> Result<Screened<WalletInfo>> {
    records_from_json(value, "wallet")
}
