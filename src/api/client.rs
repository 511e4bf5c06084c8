use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashSet;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::error::{error_message, ApiError};
use super::types::{Auction, BidReceipt, InterestRequest, NewAuction, NewBid};
use crate::session::{SessionContext, CLIENT_ID_HEADER};

pub const INVALID_BID_MESSAGE: &str = "Por favor, insira um ID de leilão e um valor válido.";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// REST client for the auction gateway.
///
/// Every request carries the session id in the `x-user-id` header.
pub struct GatewayClient {
    base_url: String,
    session: SessionContext,
    client: reqwest::Client,
    following: DashSet<String>,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        session: SessionContext,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::Config("gateway base url cannot be empty".to_string()));
        }
        if timeout.is_zero() {
            return Err(ApiError::Config(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CLIENT_ID_HEADER,
            HeaderValue::from_str(session.client_id())
                .map_err(|e| ApiError::Config(format!("invalid client id header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            session,
            client,
            following: DashSet::new(),
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// `POST /leiloes`. The auction id is the current millisecond timestamp.
    pub async fn create_auction(
        &self,
        desc: &str,
        hora_finalizacao: &str,
    ) -> Result<Auction, ApiError> {
        let desc = desc.trim();
        if desc.is_empty() {
            return Err(ApiError::Validation(
                "A descrição do leilão é obrigatória.".to_string(),
            ));
        }
        let hora_finalizacao = hora_finalizacao.trim();
        validate_end_time(hora_finalizacao)?;

        let body = NewAuction {
            desc: desc.to_string(),
            hora_finalizacao: hora_finalizacao.to_string(),
            criador_id: self.session.client_id().to_string(),
            id: Utc::now().timestamp_millis(),
        };
        info!("creating auction {} ({})", body.id, body.desc);

        let response = self.send(Method::POST, "/leiloes", Some(&body)).await?;
        let response =
            check_status(response, |status| format!("Falha na criação: HTTP {status}")).await?;
        parse_json(response).await
    }

    /// `GET /leiloes/ativos`.
    pub async fn list_active_auctions(&self) -> Result<Vec<Auction>, ApiError> {
        let response = self
            .send::<()>(Method::GET, "/leiloes/ativos", None)
            .await?;
        let response = check_status(response, |status| {
            format!("Erro ao buscar leilões: HTTP {status}")
        })
        .await?;
        let auctions: Option<Vec<Auction>> = parse_json(response).await?;
        Ok(auctions.unwrap_or_default())
    }

    /// `POST /lances`. Acceptance is confirmed later on the event stream.
    pub async fn place_bid(&self, auction_id: &str, valor: f64) -> Result<BidReceipt, ApiError> {
        let auction_id = auction_id.trim();
        if auction_id.is_empty() || !valor.is_finite() || valor <= 0.0 {
            return Err(ApiError::Validation(INVALID_BID_MESSAGE.to_string()));
        }

        let body = NewBid {
            id: auction_id,
            valor,
            usuario_id: self.session.client_id(),
        };
        debug!("placing bid of {:.2} on auction {}", valor, auction_id);

        let response = self.send(Method::POST, "/lances", Some(&body)).await?;
        let response =
            check_status(response, |status| format!("Falha no envio: HTTP {status}")).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(BidReceipt::default());
        }
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// `POST /interest`.
    pub async fn follow(&self, auction_id: &str) -> Result<(), ApiError> {
        let auction_id = require_auction_id(auction_id)?;
        self.interest(Method::POST, auction_id, |status| {
            format!("Não foi possível seguir o leilão (HTTP {status}).")
        })
        .await?;
        self.following.insert(auction_id.to_string());
        Ok(())
    }

    /// `DELETE /interest`.
    pub async fn unfollow(&self, auction_id: &str) -> Result<(), ApiError> {
        let auction_id = require_auction_id(auction_id)?;
        self.interest(Method::DELETE, auction_id, |status| {
            format!("Não foi possível deixar de seguir o leilão (HTTP {status}).")
        })
        .await?;
        self.following.remove(auction_id);
        Ok(())
    }

    /// Follow when not following, unfollow otherwise. Returns the new state.
    pub async fn toggle_follow(&self, auction_id: &str) -> Result<bool, ApiError> {
        if self.is_following(auction_id.trim()) {
            self.unfollow(auction_id).await?;
            Ok(false)
        } else {
            self.follow(auction_id).await?;
            Ok(true)
        }
    }

    pub fn is_following(&self, auction_id: &str) -> bool {
        self.following.contains(auction_id)
    }

    async fn interest(
        &self,
        method: Method,
        auction_id: &str,
        fallback: impl FnOnce(u16) -> String,
    ) -> Result<(), ApiError> {
        let body = InterestRequest {
            cliente_id: self.session.client_id(),
            leilao_id: auction_id,
        };
        let response = self.send(method, "/interest", Some(&body)).await?;
        check_status(response, fallback).await?;
        Ok(())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}

async fn check_status(
    response: Response,
    fallback: impl FnOnce(u16) -> String,
) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body, status.as_u16(), fallback);
    debug!("gateway returned {}: {}", status.as_u16(), message);
    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn require_auction_id(auction_id: &str) -> Result<&str, ApiError> {
    let auction_id = auction_id.trim();
    if auction_id.is_empty() {
        return Err(ApiError::Validation(
            "Informe o ID do leilão.".to_string(),
        ));
    }
    Ok(auction_id)
}

/// Accepts `datetime-local` style values (`2025-01-31T18:30`) and RFC 3339.
fn validate_end_time(value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::Validation(
            "A hora de finalização é obrigatória.".to_string(),
        ));
    }
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return Ok(());
    }
    if DATETIME_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok())
    {
        return Ok(());
    }
    Err(ApiError::Validation(format!(
        "Formato de data inválido: {value}"
    )))
}
