use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /leiloes`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAuction {
    pub desc: String,
    pub hora_finalizacao: String,
    pub criador_id: String,
    pub id: i64,
}

/// Auction as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub valor_inicial: Option<f64>,
    #[serde(default)]
    pub criador_id: Option<String>,
    #[serde(default)]
    pub inicio: Option<String>,
    #[serde(default)]
    pub fim: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Auction {
    pub fn display_desc(&self) -> &str {
        if self.desc.trim().is_empty() {
            "Leilão sem descrição"
        } else {
            &self.desc
        }
    }
}

/// Body of `POST /lances`.
#[derive(Debug, Clone, Serialize)]
pub struct NewBid<'a> {
    pub id: &'a str,
    pub valor: f64,
    pub usuario_id: &'a str,
}

/// Acknowledgement of an accepted bid. Confirmation arrives on the stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BidReceipt {
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
}

/// Body of `POST /interest` and `DELETE /interest`.
#[derive(Debug, Clone, Serialize)]
pub struct InterestRequest<'a> {
    pub cliente_id: &'a str,
    pub leilao_id: &'a str,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
