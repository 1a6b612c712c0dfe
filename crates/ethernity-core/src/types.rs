/*!
 * Ethernity Types
 *
 * Modelo de eventos de mercado consumido por todos os detectores.
 * Os valores são imutáveis e produzidos pela camada de ingestão.
 */

use crate::error::{Error, Result};
use crate::traits::{Timestamped, Validate};
use crate::utils::format_address;
use chrono::{DateTime, Utc};
use ethereum_types::{Address, H256};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alias para hash de transação
pub type TransactionHash = H256;

/// Instante de um evento on-chain
pub type Timestamp = DateTime<Utc>;

/// Lado de uma negociação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn opposite(self) -> Self {
        match self {
            TradeSide::Buy => TradeSide::Sell,
            TradeSide::Sell => TradeSide::Buy,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(Error::ValidationError(format!("lado de negociação desconhecido: {}", other))),
        }
    }
}

/// Aceita o lado em qualquer caixa (`"BUY"`, `"sell"`)
impl<'de> Deserialize<'de> for TradeSide {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TradeSide::from_str(&raw).map_err(de::Error::custom)
    }
}

/// Negociação de um token por uma carteira
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub tx_hash: TransactionHash,
    pub wallet_address: Address,
    pub token_address: Address,
    pub amount: f64,
    pub price: f64,
    pub timestamp: Timestamp,
    pub side: TradeSide,
}

impl Trade {
    /// Volume em USD da negociação
    pub fn volume_usd(&self) -> f64 {
        self.amount * self.price
    }

    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == TradeSide::Sell
    }
}

impl Timestamped for Trade {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Validate for Trade {
    fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::ValidationError(format!("quantidade não positiva: {}", self.amount)));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::ValidationError(format!("preço não positivo: {}", self.price)));
        }
        Ok(())
    }

    fn reference(&self) -> String {
        format!("trade 0x{:x}", self.tx_hash)
    }
}

/// Ponto de uma série temporal de preço de um token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: f64,
    pub volume_usd: f64,
}

impl Timestamped for PricePoint {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Validate for PricePoint {
    fn validate(&self) -> Result<()> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::ValidationError(format!("preço não positivo: {}", self.price)));
        }
        if !self.volume_usd.is_finite() || self.volume_usd < 0.0 {
            return Err(Error::ValidationError(format!("volume negativo: {}", self.volume_usd)));
        }
        Ok(())
    }

    fn reference(&self) -> String {
        format!("price point {}", self.timestamp.to_rfc3339())
    }
}

/// Metadados de uma carteira
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: Address,
    pub creation_time: Timestamp,
    pub balance: f64,
    pub transaction_count: u64,
    pub last_activity: Timestamp,
}

impl Timestamped for WalletInfo {
    fn timestamp(&self) -> Timestamp {
        self.creation_time
    }
}

impl Validate for WalletInfo {
    fn validate(&self) -> Result<()> {
        if !self.balance.is_finite() || self.balance < 0.0 {
            return Err(Error::ValidationError(format!("saldo negativo: {}", self.balance)));
        }
        Ok(())
    }

    fn reference(&self) -> String {
        format!("wallet {}", format_address(&self.address))
    }
}

/// Leitura da liquidez total de um pool após uma operação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPoint {
    pub timestamp: Timestamp,
    pub liquidity_usd: f64,
    /// Carteira cuja operação produziu esta leitura, quando conhecida
    #[serde(default)]
    pub wallet_address: Option<Address>,
    #[serde(default)]
    pub tx_hash: Option<TransactionHash>,
}

impl Timestamped for LiquidityPoint {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Validate for LiquidityPoint {
    fn validate(&self) -> Result<()> {
        if !self.liquidity_usd.is_finite() || self.liquidity_usd < 0.0 {
            return Err(Error::ValidationError(format!("liquidez negativa: {}", self.liquidity_usd)));
        }
        Ok(())
    }

    fn reference(&self) -> String {
        match self.tx_hash {
            Some(hash) => format!("liquidity 0x{:x}", hash),
            None => format!("liquidity {}", self.timestamp.to_rfc3339()),
        }
    }
}

/// Ação administrativa sobre um contrato
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractAction {
    OwnershipTransfer,
    EmergencyPause,
    ContractUpgrade,
    MintFunctionCall,
}

impl fmt::Display for ContractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractAction::OwnershipTransfer => write!(f, "ownership transfer"),
            ContractAction::EmergencyPause => write!(f, "emergency pause"),
            ContractAction::ContractUpgrade => write!(f, "contract upgrade"),
            ContractAction::MintFunctionCall => write!(f, "mint function call"),
        }
    }
}

/// Evento administrativo observado em um contrato
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub tx_hash: TransactionHash,
    pub timestamp: Timestamp,
    pub action: ContractAction,
    pub from_address: Address,
    #[serde(default)]
    pub to_address: Option<Address>,
    /// Atraso de timelock em segundos (apenas upgrades)
    #[serde(default)]
    pub timelock_delay_secs: Option<u64>,
}

impl Timestamped for ContractEvent {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Transação simples de uma carteira, usada na análise de comportamento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub tx_hash: TransactionHash,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: f64,
    pub gas_price: f64,
    pub timestamp: Timestamp,
    pub nonce: u64,
}

impl Timestamped for WalletTransaction {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Validate for WalletTransaction {
    fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::ValidationError(format!("valor negativo: {}", self.amount)));
        }
        if !self.gas_price.is_finite() || self.gas_price < 0.0 {
            return Err(Error::ValidationError(format!("gas price negativo: {}", self.gas_price)));
        }
        Ok(())
    }

    fn reference(&self) -> String {
        format!("transaction 0x{:x}", self.tx_hash)
    }
}
