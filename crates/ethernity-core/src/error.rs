use thiserror::Error;

/// Erros comuns da biblioteca Ethernity
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Registro de mercado que viola seus invariantes
    #[error("Erro de validação: {0}")]
    ValidationError(String),
    
    /// Erro de decodificação de dados
    #[error("Erro de decodificação: {0}")]
    DecodeError(String),
    
    /// Configuração inválida
    #[error("Erro de configuração: {0}")]
    ConfigError(String),
    
    /// Erro genérico
    #[error("{0}")]
    Other(String),
}

/// Tipo de resultado usado em toda a biblioteca
pub type Result<T> = std::result::Result<T, Error>;
