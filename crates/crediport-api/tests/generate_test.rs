mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use helpers::fakes::{CountingFetcher, FailingFetcher, FailingRenderer, PdfStubRenderer};
use helpers::{bearer, setup_test_app, setup_test_app_with, token_for, USER_PASSWORD, USER_USERNAME};

#[tokio::test]
async fn test_generate_pdf_success() {
    let fetcher = Arc::new(CountingFetcher::new());
    let app = setup_test_app(fetcher.clone(), Arc::new(PdfStubRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let response = app
        .server
        .post("/generate-pdf")
        .add_header("Authorization", bearer(&token))
        .json(&serde_json::json!({ "dni": "12.345.678" }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["filename"], "reporte_12345678.pdf");
    assert_eq!(body["download_url"], "/download/reporte_12345678.pdf");
    assert!(body["size_bytes"].as_u64().unwrap() > 0);
    assert_eq!(fetcher.call_count(), 1);

    // The artifact is visible through the listing route.
    let listing = app
        .server
        .get("/list-pdfs")
        .add_header("Authorization", bearer(&token))
        .await;
    let listing_body: serde_json::Value = listing.json();
    assert_eq!(listing_body["total_pdfs"], 1);
    assert_eq!(listing_body["pdfs"][0]["filename"], "reporte_12345678.pdf");
}

#[tokio::test]
async fn test_generate_rejects_invalid_dni_before_fetch() {
    let fetcher = Arc::new(CountingFetcher::new());
    let app = setup_test_app(fetcher.clone(), Arc::new(PdfStubRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    for dni in ["", "1234", "12345678901", "abcd5678", "../../etc/passwd"] {
        let response = app
            .server
            .post("/generate-pdf")
            .add_header("Authorization", bearer(&token))
            .json(&serde_json::json!({ "dni": dni }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    // The browser capability was never touched.
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_generates_for_same_key_share_one_job() {
    let fetcher = Arc::new(CountingFetcher::with_delay(Duration::from_millis(150)));
    let app = setup_test_app(fetcher.clone(), Arc::new(PdfStubRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let request = || {
        app.server
            .post("/generate-pdf")
            .add_header("Authorization", bearer(&token))
            .json(&serde_json::json!({ "dni": "12345678" }))
    };

    let (r1, r2, r3, r4, r5) = tokio::join!(request(), request(), request(), request(), request());

    for response in [r1, r2, r3, r4, r5] {
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["filename"], "reporte_12345678.pdf");
    }

    // One underlying scrape+render sequence served all five callers.
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_scrape_failure_reported_as_bad_gateway() {
    let app = setup_test_app(Arc::new(FailingFetcher), Arc::new(PdfStubRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let response = app
        .server
        .post("/generate-pdf")
        .add_header("Authorization", bearer(&token))
        .json(&serde_json::json!({ "dni": "12345678" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "SCRAPE_FAILED");
}

#[tokio::test]
async fn test_render_failure_leaves_no_partial_artifact() {
    let app = setup_test_app(Arc::new(CountingFetcher::new()), Arc::new(FailingRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let response = app
        .server
        .post("/generate-pdf")
        .add_header("Authorization", bearer(&token))
        .json(&serde_json::json!({ "dni": "12345678" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RENDER_FAILED");

    // Nothing is visible under the artifact's final name.
    let listing = app
        .server
        .get("/list-pdfs")
        .add_header("Authorization", bearer(&token))
        .await;
    let listing_body: serde_json::Value = listing.json();
    assert_eq!(listing_body["total_pdfs"], 0);
}

#[tokio::test]
async fn test_queue_overflow_fails_fast_with_capacity_error() {
    let app = setup_test_app_with(
        Arc::new(CountingFetcher::with_delay(Duration::from_millis(400))),
        Arc::new(PdfStubRenderer),
        |config| {
            config.max_concurrent_renders = 1;
            config.render_queue_capacity = 0;
        },
    )
    .await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let slow = app
        .server
        .post("/generate-pdf")
        .add_header("Authorization", bearer(&token))
        .json(&serde_json::json!({ "dni": "11111111" }));

    let overflow = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.server
            .post("/generate-pdf")
            .add_header("Authorization", bearer(&token))
            .json(&serde_json::json!({ "dni": "22222222" }))
            .await
    };

    let (slow_response, overflow_response) = tokio::join!(slow, overflow);

    slow_response.assert_status_ok();
    overflow_response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = overflow_response.json();
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn test_generate_and_download_streams_pdf_bytes() {
    let app = setup_test_app(Arc::new(CountingFetcher::new()), Arc::new(PdfStubRenderer)).await;
    let token = token_for(&app.server, USER_USERNAME, USER_PASSWORD).await;

    let response = app
        .server
        .post("/generate-and-download-pdf")
        .add_header("Authorization", bearer(&token))
        .json(&serde_json::json!({ "dni": "12345678" }))
        .await;
    response.assert_status_ok();

    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("reporte_12345678.pdf"));
    assert!(response.as_bytes().starts_with(b"%PDF-"));
}
