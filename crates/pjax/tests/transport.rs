//! End-to-end navigation over real HTTP with `ReqwestTransport`.

use std::sync::Arc;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pjax::{
    select_navigator, Dom, Environment, FetchRequest, HtmlPage, Location, NavigationOptions, PageLoad,
    PjaxConfig, PjaxError, ReqwestTransport, SessionHistory, TargetUrl, Transport,
};

const PAGE: &str = r#"<html><head><title>Start</title></head>
<body><div id="main"><p>start</p></div></body></html>"#;

#[tokio::test]
async fn test_fetch_sends_query_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/frag"))
        .and(query_param("_pjax", "true"))
        .and(header("X-PJAX", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>frag</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(2_000);
    let mut request = FetchRequest::get(format!("{}/frag", server.uri()));
    request.headers.push(("X-PJAX".into(), "true".into()));
    request.parameters.push(("_pjax".into(), "true".into()));

    let response = transport.fetch(request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "<p>frag</p>");
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(2_000);
    let err = transport
        .fetch(FetchRequest::get(format!("{}/gone", server.uri())))
        .await
        .unwrap_err();
    assert!(matches!(err, PjaxError::Status { status: 410, .. }));
}

#[tokio::test]
async fn test_navigation_against_live_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("X-PJAX", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>Next</title><p>next</p>"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let start = format!("{}/", server.uri());
    let page = Arc::new(HtmlPage::parse(&start, PAGE));
    let history = Arc::new(SessionHistory::new(&start));
    let config = PjaxConfig::default();
    let env = Environment::new(
        page.clone(),
        history.clone(),
        history.clone(),
        Arc::new(ReqwestTransport::new(config.timeout_ms)),
    );
    let navigator = select_navigator(config, env);

    let handle = navigator
        .request(TargetUrl::from("/next"), NavigationOptions::new("#main"))
        .unwrap()
        .unwrap();
    handle.finished().await;
    assert_eq!(page.inner_html("#main").unwrap(), "<p>next</p>");
    assert_eq!(page.title(), "Next");
    assert_eq!(history.href(), format!("{}/next", server.uri()));

    let handle = navigator
        .request(TargetUrl::from("/broken"), NavigationOptions::new("#main"))
        .unwrap()
        .unwrap();
    handle.finished().await;
    assert_eq!(page.inner_html("#main").unwrap(), "<p>next</p>");
    assert_eq!(
        history.take_pending_loads(),
        vec![PageLoad::Assign(format!("{}/broken", server.uri()))]
    );
}
