use std::time::Duration;

use httpmock::Method::{DELETE, GET, POST};
use httpmock::MockServer;
use serde_json::json;

use crate::api::{ApiError, GatewayClient, StatusMessage, INVALID_BID_MESSAGE};
use crate::session::SessionContext;

fn client_for(server: &MockServer) -> GatewayClient {
    GatewayClient::new(
        server.base_url(),
        SessionContext::new("client-test123"),
        Duration::from_secs(5),
    )
    .expect("gateway client should initialize")
}

#[tokio::test]
async fn create_auction_posts_body_with_identity() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/leiloes")
            .header("x-user-id", "client-test123")
            .body_contains("\"desc\":\"Vaso antigo\"")
            .body_contains("\"hora_finalizacao\":\"2030-01-31T18:30\"")
            .body_contains("\"criador_id\":\"client-test123\"");
        then.status(201).json_body(json!({
            "id": 1700000000000i64,
            "desc": "Vaso antigo",
            "fim": "2030-01-31T18:30"
        }));
    });

    let client = client_for(&server);
    let auction = client
        .create_auction("  Vaso antigo ", "2030-01-31T18:30")
        .await
        .expect("create should succeed");

    mock.assert();
    assert_eq!(auction.id, "1700000000000");
    assert_eq!(
        StatusMessage::auction_created(&auction).text,
        "Leilão 'Vaso antigo' criado com sucesso! ID: 1700000000000"
    );
}

#[tokio::test]
async fn create_auction_without_error_body_reports_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/leiloes");
        then.status(503);
    });

    let err = client_for(&server)
        .create_auction("Quadro", "2030-01-31T18:30")
        .await
        .expect_err("create should fail");

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "Falha na criação: HTTP 503");
    assert_eq!(
        StatusMessage::auction_failed(&err).text,
        "Erro ao criar leilão: Falha na criação: HTTP 503"
    );
}

#[tokio::test]
async fn create_auction_validates_before_sending() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/leiloes");
        then.status(201).json_body(json!({"id": 1}));
    });

    let client = client_for(&server);
    let err = client
        .create_auction("   ", "2030-01-31T18:30")
        .await
        .expect_err("empty description should be rejected");
    assert!(matches!(err, ApiError::Validation(_)));

    let err = client
        .create_auction("Quadro", "31/01/2030")
        .await
        .expect_err("malformed date should be rejected");
    assert!(matches!(err, ApiError::Validation(_)));

    mock.assert_hits(0);
}

#[tokio::test]
async fn list_active_auctions_parses_items() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/leiloes/ativos")
            .header("x-user-id", "client-test123");
        then.status(200).json_body(json!([
            {"id": 1, "desc": "Relógio", "valor_inicial": 100.0},
            {"id": "2", "desc": ""}
        ]));
    });

    let auctions = client_for(&server)
        .list_active_auctions()
        .await
        .expect("list should succeed");

    mock.assert();
    assert_eq!(auctions.len(), 2);
    assert_eq!(auctions[0].id, "1");
    assert_eq!(auctions[0].valor_inicial, Some(100.0));
    assert_eq!(auctions[1].display_desc(), "Leilão sem descrição");
}

#[tokio::test]
async fn list_active_auctions_treats_null_as_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/leiloes/ativos");
        then.status(200).body("null");
    });

    let auctions = client_for(&server)
        .list_active_auctions()
        .await
        .expect("list should succeed");
    assert!(auctions.is_empty());
}

#[tokio::test]
async fn list_active_auctions_failure_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/leiloes/ativos");
        then.status(500).body("internal");
    });

    let err = client_for(&server)
        .list_active_auctions()
        .await
        .expect_err("list should fail");
    assert_eq!(err.to_string(), "Erro ao buscar leilões: HTTP 500");
}

#[tokio::test]
async fn place_bid_sends_value_and_user() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/lances")
            .header("x-user-id", "client-test123")
            .json_body(json!({"id": "42", "valor": 150.5, "usuario_id": "client-test123"}));
        then.status(202)
            .json_body(json!({"mensagem": "Lance recebido", "valor": 150.5}));
    });

    let receipt = client_for(&server)
        .place_bid(" 42 ", 150.5)
        .await
        .expect("bid should succeed");

    mock.assert();
    assert_eq!(receipt.mensagem.as_deref(), Some("Lance recebido"));
    assert_eq!(receipt.valor, Some(150.5));
}

#[tokio::test]
async fn place_bid_accepts_empty_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/lances");
        then.status(200);
    });

    let receipt = client_for(&server)
        .place_bid("42", 10.0)
        .await
        .expect("bid should succeed");
    assert!(receipt.mensagem.is_none());
}

#[tokio::test]
async fn place_bid_surfaces_server_reason() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/lances");
        then.status(400).json_body(json!({"erro": "lance baixo"}));
    });

    let err = client_for(&server)
        .place_bid("42", 1.0)
        .await
        .expect_err("bid should fail");

    assert_eq!(err.status(), Some(400));
    assert_eq!(
        StatusMessage::bid_failed(&err).text,
        "Erro no envio: lance baixo"
    );
}

#[tokio::test]
async fn place_bid_without_error_body_mentions_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/lances");
        then.status(502);
    });

    let err = client_for(&server)
        .place_bid("42", 1.0)
        .await
        .expect_err("bid should fail");
    assert!(err.to_string().contains("502"));
    assert_eq!(err.to_string(), "Falha no envio: HTTP 502");
}

#[tokio::test]
async fn place_bid_rejects_invalid_input_locally() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/lances");
        then.status(200);
    });

    let client = client_for(&server);
    for (id, valor) in [("", 10.0), ("42", 0.0), ("42", -5.0), ("42", f64::NAN)] {
        let err = client
            .place_bid(id, valor)
            .await
            .expect_err("invalid bid should be rejected");
        assert_eq!(err.to_string(), INVALID_BID_MESSAGE);
        assert_eq!(StatusMessage::bid_failed(&err).text, INVALID_BID_MESSAGE);
    }

    mock.assert_hits(0);
}

#[tokio::test]
async fn follow_and_unfollow_track_interest() {
    let server = MockServer::start();
    let follow = server.mock(|when, then| {
        when.method(POST)
            .path("/interest")
            .json_body(json!({"cliente_id": "client-test123", "leilao_id": "9"}));
        then.status(200);
    });
    let unfollow = server.mock(|when, then| {
        when.method(DELETE)
            .path("/interest")
            .json_body(json!({"cliente_id": "client-test123", "leilao_id": "9"}));
        then.status(204);
    });

    let client = client_for(&server);
    assert!(!client.is_following("9"));

    assert!(client.toggle_follow("9").await.expect("follow should succeed"));
    assert!(client.is_following("9"));

    assert!(!client.toggle_follow("9").await.expect("unfollow should succeed"));
    assert!(!client.is_following("9"));

    follow.assert();
    unfollow.assert();
}

#[tokio::test]
async fn follow_failure_keeps_state() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/interest");
        then.status(404);
    });

    let client = client_for(&server);
    let err = client.follow("9").await.expect_err("follow should fail");
    assert_eq!(
        err.to_string(),
        "Não foi possível seguir o leilão (HTTP 404)."
    );
    assert!(!client.is_following("9"));
}

#[tokio::test]
async fn unfollow_failure_uses_server_text() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/interest");
        then.status(409).json_body(json!({"erro": "não seguia"}));
    });

    let err = client_for(&server)
        .unfollow("9")
        .await
        .expect_err("unfollow should fail");
    assert_eq!(err.to_string(), "não seguia");
}
