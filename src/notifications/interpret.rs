use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use super::payload::{auction_id, decode_payload, id_field, money_field, text_field, UNKNOWN};
use crate::session::SessionContext;
use crate::stream::{
    StreamEvent, KIND_LANCE_INVALIDO, KIND_LANCE_VALIDO, KIND_LEILAO_VENCEDOR,
    KIND_LINK_PAGAMENTO, KIND_STATUS_PAGAMENTO,
};

pub const FALLBACK_TITLE: &str = "Notificação Recebida";
pub const DEFAULT_REJECTION_REASON: &str = "Regra de negócio";

/// The named kinds with a dedicated rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    LanceValido,
    LanceInvalido,
    LeilaoVencedor,
    LinkPagamento,
    StatusPagamento,
}

impl NotificationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LanceValido => KIND_LANCE_VALIDO,
            Self::LanceInvalido => KIND_LANCE_INVALIDO,
            Self::LeilaoVencedor => KIND_LEILAO_VENCEDOR,
            Self::LinkPagamento => KIND_LINK_PAGAMENTO,
            Self::StatusPagamento => KIND_STATUS_PAGAMENTO,
        }
    }

    pub const fn all() -> &'static [NotificationKind] {
        &[
            NotificationKind::LanceValido,
            NotificationKind::LanceInvalido,
            NotificationKind::LeilaoVencedor,
            NotificationKind::LinkPagamento,
            NotificationKind::StatusPagamento,
        ]
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown notification kind: {value}"))
    }
}

/// Raised when this session won an auction and received its payment link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinAlert {
    pub auction_id: String,
    pub link: String,
}

impl WinAlert {
    pub fn message(&self) -> String {
        format!("PARABÉNS! Link de Pagamento: {}", self.link)
    }
}

/// Human-readable rendering of one stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub title: String,
    pub message: String,
    pub kind: String,
    pub alert: Option<WinAlert>,
}

impl Interpretation {
    fn new(kind: &str, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: kind.to_string(),
            alert: None,
        }
    }

    fn fallback(event: &StreamEvent) -> Self {
        Self::new(&event.kind, FALLBACK_TITLE, event.payload.clone())
    }
}

/// Map an event to a title/message pair. Never fails: undecodable payloads
/// produce the fallback notification carrying the raw text.
pub fn interpret(event: &StreamEvent, session: &SessionContext) -> Interpretation {
    let payload = match decode_payload(&event.payload) {
        Ok(payload) => payload,
        Err(e) => {
            error!(
                "failed to decode {} payload, using fallback: {}",
                event.kind, e
            );
            return Interpretation::fallback(event);
        }
    };

    let Ok(kind) = event.kind.parse::<NotificationKind>() else {
        return Interpretation::new(
            &event.kind,
            format!("Evento Desconhecido ({})", event.kind),
            payload.to_string(),
        );
    };

    if !payload.is_object() {
        error!(
            "{} payload is not a JSON object, using fallback",
            event.kind
        );
        return Interpretation::fallback(event);
    }

    describe(kind, &payload, session)
}

fn describe(kind: NotificationKind, payload: &Value, session: &SessionContext) -> Interpretation {
    let label = kind.as_str();
    match kind {
        NotificationKind::LanceValido => Interpretation::new(
            label,
            "Novo Lance Válido!",
            format!(
                "Leilão ID: {}, Novo Valor: {}",
                id_field(payload, "id").unwrap_or_else(|| UNKNOWN.to_string()),
                money_field(payload, "valor")
            ),
        ),
        NotificationKind::LanceInvalido => Interpretation::new(
            label,
            "Lance Invalidado",
            format!(
                "Lance {} foi recusado (Motivo: {}).",
                money_field(payload, "valor"),
                text_field(payload, "motivo")
                    .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string())
            ),
        ),
        NotificationKind::LeilaoVencedor => Interpretation::new(
            label,
            "Leilão Encerrado - Vencedor!",
            format!(
                "O Leilão ID {} foi para o usuário {}.",
                auction_id(payload),
                id_field(payload, "vencedor_id").unwrap_or_else(|| UNKNOWN.to_string())
            ),
        ),
        NotificationKind::LinkPagamento => describe_payment_link(payload, session),
        NotificationKind::StatusPagamento => {
            let status = text_field(payload, "status").unwrap_or_else(|| UNKNOWN.to_string());
            Interpretation::new(
                label,
                format!("Pagamento {status}"),
                format!(
                    "Status do Pagamento no Leilão {}: {status}.",
                    auction_id(payload)
                ),
            )
        }
    }
}

fn describe_payment_link(payload: &Value, session: &SessionContext) -> Interpretation {
    let auction = auction_id(payload);

    let Some(link) = text_field(payload, "link") else {
        let reason = text_field(payload, "erro").unwrap_or_else(|| UNKNOWN.to_string());
        return Interpretation::new(
            KIND_LINK_PAGAMENTO,
            "Falha no Link de Pagamento",
            format!("Leilão {auction}: {reason}"),
        );
    };

    let mut interpretation = Interpretation::new(
        KIND_LINK_PAGAMENTO,
        "Link de Pagamento Gerado",
        format!("Acesse: {link} (ID: {auction})"),
    );

    let won = id_field(payload, "vencedor_id")
        .map(|winner| session.is_self(&winner))
        .unwrap_or(false);
    if won {
        interpretation.alert = Some(WinAlert {
            auction_id: auction,
            link,
        });
    }
    interpretation
}
