//! User-visible status lines for gateway operations.

use super::error::ApiError;
use super::types::Auction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }

    pub fn creating_auction() -> Self {
        Self::new(StatusLevel::Loading, "Criando leilão...")
    }

    pub fn auction_created(auction: &Auction) -> Self {
        Self::new(
            StatusLevel::Success,
            format!(
                "Leilão '{}' criado com sucesso! ID: {}",
                auction.desc, auction.id
            ),
        )
    }

    pub fn auction_failed(error: &ApiError) -> Self {
        Self::new(StatusLevel::Error, format!("Erro ao criar leilão: {error}"))
    }

    pub fn sending_bid() -> Self {
        Self::new(StatusLevel::Loading, "Enviando lance...")
    }

    pub fn bid_sent(auction_id: &str, valor: f64) -> Self {
        Self::new(
            StatusLevel::Success,
            format!(
                "Lance R${valor:.2} enviado para o Leilão {auction_id}! Aguarde confirmação em tempo real."
            ),
        )
    }

    pub fn bid_failed(error: &ApiError) -> Self {
        match error {
            // Validation text is shown as-is.
            ApiError::Validation(text) => Self::new(StatusLevel::Error, text.clone()),
            other => Self::new(StatusLevel::Error, format!("Erro no envio: {other}")),
        }
    }

    pub fn followed(auction_id: &str) -> Self {
        Self::new(
            StatusLevel::Success,
            format!("Seguindo o leilão {auction_id}."),
        )
    }

    pub fn unfollowed(auction_id: &str) -> Self {
        Self::new(
            StatusLevel::Success,
            format!("Deixou de seguir o leilão {auction_id}."),
        )
    }

    pub fn request_failed(error: &ApiError) -> Self {
        Self::new(StatusLevel::Error, format!("Erro: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_sent_formats_value() {
        let msg = StatusMessage::bid_sent("17", 1500.0);
        assert_eq!(
            msg.text,
            "Lance R$1500.00 enviado para o Leilão 17! Aguarde confirmação em tempo real."
        );
        assert_eq!(msg.level, StatusLevel::Success);
    }

    #[test]
    fn test_bid_failed_carries_server_reason() {
        let msg = StatusMessage::bid_failed(&ApiError::Http {
            status: 400,
            message: "lance baixo".into(),
        });
        assert_eq!(msg.text, "Erro no envio: lance baixo");
        assert!(msg.is_error());
    }

    #[test]
    fn test_bid_validation_message_is_not_prefixed() {
        let msg = StatusMessage::bid_failed(&ApiError::Validation("valor inválido".into()));
        assert_eq!(msg.text, "valor inválido");
    }
}
