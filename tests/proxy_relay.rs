//! End-to-end forwarding behaviour over real sockets.

use axum::Router;
use futures_util::future::join_all;
use reqwest::{Method, StatusCode};
use relay_proxy::config::TimeoutConfig;
use relay_proxy::http::ORIGIN_RESPONSE_BODY;
use relay_proxy::lifecycle::ServiceKind;
use std::time::Duration;

mod common;

const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
const PATHS: [&str; 4] = ["/", "/test", "/a/b/c", "/items/42?expand=true"];

#[tokio::test]
async fn origin_answers_every_method_and_path() {
    let origin = common::start_origin().await;
    let client = common::client();

    for method in METHODS {
        for path in PATHS {
            let res = client
                .request(method.clone(), format!("http://{origin}{path}"))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{method} {path}");
            assert_eq!(res.text().await.unwrap(), ORIGIN_RESPONSE_BODY);
        }
    }
}

#[tokio::test]
async fn proxy_matches_direct_origin_response() {
    let origin = common::start_origin().await;
    let proxy = common::start_proxy(origin).await;
    let client = common::client();

    for method in METHODS {
        for path in PATHS {
            let direct = client
                .request(method.clone(), format!("http://{origin}{path}"))
                .send()
                .await
                .unwrap();
            let proxied = client
                .request(method.clone(), format!("http://{proxy}{path}"))
                .send()
                .await
                .unwrap();

            assert_eq!(proxied.status(), direct.status(), "{method} {path}");
            assert_eq!(
                proxied.text().await.unwrap(),
                direct.text().await.unwrap(),
                "{method} {path}"
            );
        }
    }
}

#[tokio::test]
async fn repeated_response_headers_survive() {
    let backend = common::start_raw_backend(
        "HTTP/1.1 201 Created\r\n\
         X-Test: a\r\n\
         X-Test: b\r\n\
         Set-Cookie: session=1\r\n\
         Set-Cookie: theme=dark\r\n\
         Content-Length: 2\r\n\
         Connection: close\r\n\
         \r\n\
         ok",
    )
    .await;
    let proxy = common::start_proxy(backend).await;

    let res = common::client().get(format!("http://{proxy}/")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let x_test: Vec<_> = res.headers().get_all("x-test").iter().collect();
    assert_eq!(x_test, ["a", "b"]);
    let cookies: Vec<_> = res.headers().get_all("set-cookie").iter().collect();
    assert_eq!(cookies, ["session=1", "theme=dark"]);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn non_success_status_is_relayed() {
    let backend = common::start_raw_backend(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
    )
    .await;
    let proxy = common::start_proxy(backend).await;

    let res = common::client().get(format!("http://{proxy}/gone")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "missing");
}

#[tokio::test]
async fn upstream_down_is_bad_gateway() {
    let proxy = common::start_proxy(common::closed_addr().await).await;

    let res = common::client().get(format!("http://{proxy}/test")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn slow_upstream_is_bad_gateway_with_reason() {
    let slow = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "too late"
    });
    let backend = common::start_server(ServiceKind::Origin, slow, TimeoutConfig::default()).await;
    let proxy = common::start_proxy_with(
        backend,
        TimeoutConfig {
            write_secs: 1,
            ..TimeoutConfig::default()
        },
    )
    .await;

    let started = std::time::Instant::now();
    let res = common::client().get(format!("http://{proxy}/slow")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(res.text().await.unwrap(), "upstream request timed out after 1s");
}

#[tokio::test]
async fn request_bodies_arrive_byte_for_byte() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(backend).await;
    let client = common::client();

    for size in [0usize, 1, 65_536, 1 << 20] {
        let mut rng = fastrand::Rng::with_seed(size as u64);
        let payload: Vec<u8> = std::iter::repeat_with(|| rng.u8(..)).take(size).collect();

        let res = client
            .post(format!("http://{proxy}/upload"))
            .body(payload.clone())
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK, "size {size}");
        assert_eq!(res.headers()["x-echo-method"], "POST", "size {size}");
        let echoed = res.bytes().await.unwrap();
        assert_eq!(echoed.len(), size);
        assert!(echoed[..] == payload[..], "body corrupted at size {size}");
    }
}

#[tokio::test]
async fn large_post_to_stub_origin_completes() {
    let origin = common::start_origin().await;
    let proxy = common::start_proxy(origin).await;

    let res = tokio::time::timeout(
        Duration::from_secs(10),
        common::client()
            .post(format!("http://{proxy}/big"))
            .body(vec![0x5a; 1 << 20])
            .send(),
    )
    .await
    .expect("1MB POST should finish within the timeout")
    .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), ORIGIN_RESPONSE_BODY);
}

#[tokio::test]
async fn target_is_rewritten_but_path_and_query_are_kept() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(backend).await;

    let res = common::client()
        .request(Method::PUT, format!("http://{proxy}/v1/items/7?a=1&b=two%20words"))
        .header("x-custom", "kept")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-method"], "PUT");
    assert_eq!(res.headers()["x-echo-path"], "/v1/items/7?a=1&b=two%20words");
    assert_eq!(res.headers()["x-echo-host"], backend.to_string().as_str());
}

#[tokio::test]
async fn concurrent_requests_get_their_own_responses() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(backend).await;
    let client = common::client();

    let requests = (0..64).map(|i| {
        let client = client.clone();
        async move {
            let path = format!("/req/{i}");
            let res = client
                .post(format!("http://{proxy}{path}"))
                .body(format!("body-{i}"))
                .send()
                .await
                .unwrap();
            let echoed_path = res.headers()["x-echo-path"].to_str().unwrap().to_string();
            (i, path, echoed_path, res.text().await.unwrap())
        }
    });

    for (i, path, echoed_path, body) in join_all(requests).await {
        assert_eq!(echoed_path, path);
        assert_eq!(body, format!("body-{i}"));
    }
}

#[tokio::test]
async fn broken_upstream_body_does_not_take_down_the_proxy() {
    let backend = common::start_scripted_backend(vec![
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial",
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nwhole",
    ])
    .await;
    let proxy = common::start_proxy(backend).await;
    let client = common::client();

    // Status may or may not make it out before the connection is aborted,
    // but a truncated body must never look complete.
    if let Ok(res) = client.get(format!("http://{proxy}/")).send().await {
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.bytes().await.is_err());
    }

    let res = client.get(format!("http://{proxy}/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "whole");
}
