//! Integration tests for the fetcher
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! HTTP collaborator, the adaptive controller, and the driver loop end-to-end.

use adaptive_fetcher::config::{Config, FetchConfig, RateConfig, UserAgentConfig};
use adaptive_fetcher::fetcher::{run_fetch_loop, AdaptiveFetchController, Fetch, HttpFetcher};
use adaptive_fetcher::{FetchError, RateAdjustment};
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given rate settings
fn create_test_config(rate: RateConfig) -> Config {
    Config {
        rate,
        user_agent: UserAgentConfig {
            name: "TestFetcher".to_string(),
            version: "1.0.0".to_string(),
            contact_url: None,
        },
        fetch: FetchConfig {
            url: None,
            timeout_secs: 2,
            connect_timeout_secs: 1,
        },
    }
}

fn create_controller(rate: RateConfig) -> AdaptiveFetchController<HttpFetcher> {
    let config = create_test_config(rate);
    let fetcher = HttpFetcher::from_config(&config).expect("Failed to build fetcher");
    AdaptiveFetchController::new(config.rate, fetcher).expect("Failed to create controller")
}

/// Any local response counts as fast; nothing counts as slow
fn always_fast() -> RateConfig {
    RateConfig {
        slow_threshold_ms: 60_000,
        fast_threshold_ms: 30_000,
        ..RateConfig::default()
    }
}

#[tokio::test]
async fn test_http_fetcher_returns_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc"))
        .and(header("user-agent", "TestFetcher/1.0.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Hello</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&create_test_config(RateConfig::default()))
        .expect("Failed to build fetcher");
    let url = format!("{}/doc", mock_server.uri());

    let page = fetcher.fetch(&url).await.expect("Fetch failed");

    assert_eq!(page.status_code, 200);
    assert_eq!(page.final_url, url);
    assert_eq!(page.content_type.as_deref(), Some("text/html"));
    assert_eq!(page.body, "<html><body>Hello</body></html>");
}

#[tokio::test]
async fn test_http_fetcher_maps_error_statuses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&create_test_config(RateConfig::default()))
        .expect("Failed to build fetcher");

    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;
    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));

    let result = fetcher.fetch(&format!("{}/broken", mock_server.uri())).await;
    assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_http_fetcher_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&create_test_config(RateConfig::default()))
        .expect("Failed to build fetcher");

    let result = fetcher.fetch(&mock_server.uri()).await;
    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_slow_server_backs_rate_off() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let controller = create_controller(RateConfig {
        slow_threshold_ms: 100,
        fast_threshold_ms: 50,
        ..RateConfig::default()
    });

    let outcome = controller
        .fetch(&mock_server.uri())
        .await
        .expect("Fetch failed");
    assert!(outcome.elapsed_ms >= 400);
    assert!((controller.rate() - 9.0).abs() < 1e-9);

    controller
        .fetch(&mock_server.uri())
        .await
        .expect("Fetch failed");
    assert!((controller.rate() - 8.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_fast_server_speeds_rate_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
        .mount(&mock_server)
        .await;

    let controller = create_controller(always_fast());

    let outcome = controller
        .fetch(&mock_server.uri())
        .await
        .expect("Fetch failed");

    assert_eq!(outcome.payload.body, "fast");
    assert!((controller.rate() - 11.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_rate_override_respects_bounds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    // Every local response lands in the dead band
    let controller = create_controller(RateConfig {
        slow_threshold_ms: 60_000,
        fast_threshold_ms: 0,
        ..RateConfig::default()
    });

    assert!(controller.set_rate(100.0).is_err());

    controller
        .fetch(&mock_server.uri())
        .await
        .expect("Fetch failed");

    assert_eq!(controller.rate(), 10.0);
}

#[tokio::test]
async fn test_dead_band_response_keeps_rate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    // Nothing is faster than 0ms, nothing local is slower than 60s
    let controller = create_controller(RateConfig {
        slow_threshold_ms: 60_000,
        fast_threshold_ms: 0,
        ..RateConfig::default()
    });

    controller
        .fetch(&mock_server.uri())
        .await
        .expect("Fetch failed");

    assert_eq!(controller.rate(), 10.0);
    assert_eq!(
        controller.adjust_rate(1),
        RateAdjustment::Unchanged { rate: 10.0 }
    );
}

#[tokio::test]
async fn test_failed_fetch_propagates_and_keeps_rate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let controller = create_controller(always_fast());

    let result = controller.fetch(&mock_server.uri()).await;

    assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    assert_eq!(controller.rate(), 10.0);
}

#[tokio::test]
async fn test_fetch_loop_survives_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let controller = create_controller(always_fast());
    let (_tx, rx) = watch::channel(false);
    let url = format!("{}/flaky", mock_server.uri());

    let stats = run_fetch_loop(&controller, &url, Some(4), rx).await;

    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.failures, 4);
    assert_eq!(stats.failures_by_kind.get("status"), Some(&4));
    assert_eq!(controller.rate(), 10.0);
}

#[tokio::test]
async fn test_fetch_loop_collects_statistics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
        .expect(5)
        .mount(&mock_server)
        .await;

    let controller = create_controller(always_fast());
    let (_tx, rx) = watch::channel(false);

    let stats = run_fetch_loop(&controller, &mock_server.uri(), Some(5), rx).await;

    assert_eq!(stats.successes, 5);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.bytes_received, 50);
    assert_eq!(stats.min_rate, 10.0);
    assert!(stats.max_rate > 10.0);
    assert!(stats.max_rate <= 20.0);
    assert_eq!(stats.final_rate, controller.rate());
}

#[tokio::test]
async fn test_fetch_loop_stops_on_shutdown() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    // One permit every two seconds, so the second wait is long enough to cancel
    let controller = create_controller(RateConfig {
        initial_rate: 0.5,
        min_rate: 0.5,
        max_rate: 0.5,
        ..RateConfig::default()
    });
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send(true);
    });

    let start = std::time::Instant::now();
    let stats = run_fetch_loop(&controller, &mock_server.uri(), None, rx).await;

    assert_eq!(stats.cycles, 1);
    assert!(start.elapsed() < Duration::from_secs(2));
}
