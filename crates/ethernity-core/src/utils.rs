/*!
 * Ethernity Utils
 * 
 * Utilitários de endereço e de tempo usados em toda a workspace Ethernity
 */

use crate::traits::Timestamped;
use crate::types::Timestamp;
use ethereum_types::Address;

/// Formata um Address para exibição
pub fn format_address(address: &Address) -> String {
    format!("0x{:x}", address)
}

/// Forma abreviada de um endereço para descrições (`0x12345678`)
pub fn short_address(address: &Address) -> String {
    let full = format_address(address);
    full.chars().take(10).collect()
}

/// Segundos inteiros entre dois instantes, nunca negativo
pub fn span_secs(start: Timestamp, end: Timestamp) -> u64 {
    let secs = (end - start).num_seconds();
    if secs < 0 { 0 } else { secs as u64 }
}

/// Verifica se `later` está no máximo `window_secs` depois de `earlier`
pub fn within_window(earlier: Timestamp, later: Timestamp, window_secs: u64) -> bool {
    let millis = (later - earlier).num_milliseconds();
    millis >= 0 && millis <= (window_secs as i64).saturating_mul(1000)
}

/// Distância absoluta em segundos entre dois instantes
pub fn abs_diff_secs(a: Timestamp, b: Timestamp) -> f64 {
    ((b - a).num_milliseconds() as f64 / 1000.0).abs()
}

/// Ordena registros por tempo preservando a ordem relativa dos empates
pub fn sort_by_time<T: Timestamped>(records: &mut [T]) {
    records.sort_by_key(|r| r.timestamp());
}
