//! Integration tests: the client against a local webhook server over real HTTP.

mod common;

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::mock_server::{MockResponse, MockServer};
use crmlink_core::client::BatchCapabilities;
use crmlink_core::config::PRODUCT_ROWS_METHOD;
use crmlink_core::retry::RetryPolicy;
use crmlink_core::{ApiClient, ClientConfig, ErrorKind, Request};
use serde_json::{json, Value};

fn config_for(webhook_url: &str) -> ClientConfig {
    ClientConfig {
        webhook_url: webhook_url.to_string(),
        max_requests_per_second: 50.0,
        timeout: Duration::from_secs(5),
        retry: Some(RetryPolicy {
            backoff_factor: Duration::from_millis(10),
            ..RetryPolicy::default()
        }),
        ..ClientConfig::default()
    }
}

#[test]
fn fetch_all_pages_walks_every_page() {
    let server = MockServer::start(|req, _| {
        let body = req.json();
        assert_eq!(body["filter"], json!({"status": "active"}));
        match body["start"].as_u64() {
            Some(0) => MockResponse::json(
                200,
                json!({"result": {"items": [{"id": 1}, {"id": 2}]}, "total": 3, "next": 2}),
            ),
            Some(2) => MockResponse::json(200, json!({"result": {"items": [{"id": 3}]}, "total": 3})),
            other => panic!("unexpected start {other:?}"),
        }
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let rows = client
        .fetch_all_pages("crm.item.list", json!({"status": "active"}))
        .unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(server.hits_to("crm.item.list"), 2);
    assert_eq!(client.rate_limiter().stats().request_count, 2);
}

#[test]
fn authentication_failure_is_a_single_attempt() {
    let server = MockServer::start(|_, _| {
        MockResponse::json(401, json!({"error": "expired_token", "error_description": "token expired"}))
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let started = Instant::now();
    let err = client.call("crm.deal.get", json!({"id": 1})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    assert_eq!(err.status(), Some(401));
    assert_eq!(server.hits(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn server_errors_are_retried_until_success() {
    let server = MockServer::start(|_, seq| match seq {
        0 | 1 => MockResponse::empty(503),
        _ => MockResponse::json(200, json!({"result": {"ID": "9"}})),
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let r = client.call("crm.deal.get", json!({"id": 9})).unwrap();
    assert_eq!(r.payload["ID"], "9");
    assert_eq!(server.hits(), 3);
}

#[test]
fn retry_after_is_honoured_before_retrying() {
    let server = MockServer::start(|_, seq| match seq {
        0 => MockResponse::empty(429).with_header("Retry-After: 1"),
        _ => MockResponse::json(200, json!({"result": []})),
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let started = Instant::now();
    let r = client.call("crm.deal.list", json!({})).unwrap();
    assert!(r.items().is_empty());
    assert!(started.elapsed() >= Duration::from_millis(950));
    assert_eq!(server.hits(), 2);
}

#[test]
fn application_error_in_ok_reply_is_raised() {
    let server = MockServer::start(|_, _| {
        MockResponse::json(200, json!({"error": "NOT_FOUND", "error_description": "Not found"}))
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let err = client.call("crm.company.get", json!({"id": 404})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(server.hits(), 1);
}

#[test]
fn get_requests_send_bracketed_query() {
    let server = MockServer::start(|req, _| {
        assert_eq!(req.method, "GET");
        MockResponse::json(200, json!({"result": {"ID": "5"}}))
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    client
        .execute(&Request::get("crm.item.get", json!({"id": 5, "select": ["title"]})))
        .unwrap();
    let req = &server.requests()[0];
    assert_eq!(req.path, "/rest/1/token/crm.item.get");
    let query = req.query.as_deref().unwrap();
    assert!(query.contains("id=5"));
    assert!(query.contains("select%5B0%5D=title"));
}

#[test]
fn batch_unsupported_method_issues_one_call_per_invoice() {
    let server = MockServer::start(|req, _| {
        let owner = req.json()["filter"]["=ownerId"].as_u64().unwrap();
        let rows: Vec<Value> = (0..owner / 10).map(|i| json!({"id": i, "ownerId": owner})).collect();
        MockResponse::json(200, json!({"result": {"productRows": rows}}))
    });
    let client = ApiClient::new(config_for(&server.webhook_url)).unwrap();

    let out = client.products_for_invoices(&[10, 20, 30]).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out[&10].items.len(), 1);
    assert_eq!(out[&20].items.len(), 2);
    assert_eq!(out[&30].items.len(), 3);
    assert_eq!(server.hits_to(PRODUCT_ROWS_METHOD), 3);
    assert_eq!(server.hits_to("batch"), 0);

    // Repeat lookups are served from the cache.
    client.products_for_invoices(&[10, 20, 30]).unwrap();
    assert_eq!(server.hits(), 3);
}

#[test]
fn batch_supported_method_issues_one_batch_call() {
    let server = MockServer::start(|req, _| {
        let body = req.json();
        let cmd = body["cmd"].as_object().unwrap().clone();
        let results: serde_json::Map<String, Value> = cmd
            .keys()
            .map(|label| (label.clone(), json!({"productRows": [{"invoice": label}]})))
            .collect();
        MockResponse::json(200, json!({"result": {"result": results, "result_error": []}}))
    });
    let mut cfg = config_for(&server.webhook_url);
    cfg.batch = BatchCapabilities::all_supported();
    let client = ApiClient::new(cfg).unwrap();

    let out = client.products_for_invoices(&[10, 20, 30]).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out[&20].items[0]["invoice"], "20");
    assert_eq!(server.hits(), 1);
    assert_eq!(server.hits_to("batch"), 1);
}

#[test]
fn connection_refused_is_network_unavailable() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut cfg = config_for(&format!("http://127.0.0.1:{port}/rest/1/token/"));
    cfg.retry = None;
    let client = ApiClient::new(cfg).unwrap();

    let err = client.call("crm.deal.get", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
    assert!(err.is_retryable());
}

#[test]
fn slow_server_times_out() {
    let server = MockServer::start(|_, _| {
        MockResponse::json(200, json!({"result": []})).delayed(Duration::from_secs(2))
    });
    let mut cfg = config_for(&server.webhook_url);
    cfg.timeout = Duration::from_millis(300);
    cfg.retry = None;
    let client = ApiClient::new(cfg).unwrap();

    let err = client.call("crm.deal.list", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimedOut);
}

#[test]
fn threads_sharing_a_client_respect_the_quota() {
    let server = MockServer::start(|_, _| MockResponse::json(200, json!({"result": true})));
    let mut cfg = config_for(&server.webhook_url);
    cfg.max_requests_per_second = 10.0;
    let client = Arc::new(ApiClient::new(cfg).unwrap());

    let started = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for j in 0..2 {
                    client.call("crm.deal.update", json!({"id": i * 10 + j})).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    // Eight requests, seven gaps of at least 100ms.
    assert!(started.elapsed() >= Duration::from_millis(680));
    assert_eq!(server.hits(), 8);
}
