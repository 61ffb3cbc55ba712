//! Browser session driven against a mock site.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pjax::{FallbackReason, NavigationOutcome, PjaxConfig, PjaxEvent};
use pjax_shell::session::{BrowserSession, Traversal};

const HOME: &str = r##"<!DOCTYPE html>
<html><head><title>Home</title></head>
<body>
  <a href="/foo" data-pjax="#main">Foo</a>
  <a href="/plain">Plain</a>
  <a href="/doc" data-pjax="#main">Doc</a>
  <div id="main"><p>home</p></div>
</body></html>"##;

const DOC: &str = r#"<html><head><title>Doc</title></head>
<body><div id="main"><p>doc</p></div></body></html>"#;

async fn site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("X-PJAX", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>Home</title><p>home again</p>"),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME))
        .mount(&server)
        .await;
    Mock::given(path("/foo"))
        .and(header("X-PJAX", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>Foo</title><p>foo</p>"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/plain"))
        .and(header("X-PJAX", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>plain</p>"))
        .mount(&server)
        .await;
    Mock::given(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
        .mount(&server)
        .await;
    server
}

async fn open(server: &MockServer) -> BrowserSession {
    BrowserSession::open(&format!("{}/", server.uri()), PjaxConfig::default(), "#main")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_open_loads_full_page() {
    let server = site().await;
    let session = open(&server).await;

    assert_eq!(session.title(), "Home");
    assert_eq!(session.url(), format!("{}/", server.uri()));
    assert_eq!(session.show(None).as_deref(), Some("<p>home</p>"));

    let links = session.links();
    assert_eq!(links.len(), 3);
    assert_eq!(links[0].href, format!("{}/foo", server.uri()));
    assert_eq!(links[0].text, "Foo");
    assert_eq!(session.container_for(&links[1]), "#main");
}

#[tokio::test]
async fn test_click_swaps_container() {
    let server = site().await;
    let mut session = open(&server).await;

    let link = session.click(0).await.unwrap();
    assert_eq!(link.href, format!("{}/foo", server.uri()));
    assert_eq!(session.show(None).as_deref(), Some("<p>foo</p>"));
    assert_eq!(session.title(), "Foo");
    assert_eq!(session.url(), format!("{}/foo", server.uri()));

    let (entries, current) = session.history();
    assert_eq!(entries.len(), 2);
    assert_eq!(current, 1);

    let events = session.drain_events();
    assert!(matches!(events.first(), Some(PjaxEvent::Started { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        PjaxEvent::Ended { outcome: NavigationOutcome::Swapped, .. }
    )));
    assert!(session.drain_events().is_empty());
}

#[tokio::test]
async fn test_link_without_attribute_uses_default_container() {
    let server = site().await;
    let mut session = open(&server).await;

    session.click(1).await.unwrap();
    assert_eq!(session.show(Some("#main")).as_deref(), Some("<p>plain</p>"));
    assert_eq!(session.title(), "Home");
}

#[tokio::test]
async fn test_full_document_response_is_loaded_as_page() {
    let server = site().await;
    let mut session = open(&server).await;

    session.click(2).await.unwrap();
    assert_eq!(session.title(), "Doc");
    assert_eq!(session.show(None).as_deref(), Some("<p>doc</p>"));
    assert_eq!(session.url(), format!("{}/doc", server.uri()));
    assert!(session.drain_events().iter().any(|e| matches!(
        e,
        PjaxEvent::FullNavigation { reason: FallbackReason::FullDocument, .. }
    )));
}

#[tokio::test]
async fn test_back_and_forward() {
    let server = site().await;
    let mut session = open(&server).await;
    session.click(0).await.unwrap();

    assert_eq!(session.back().await.unwrap(), Traversal::Replayed);
    assert_eq!(session.show(None).as_deref(), Some("<p>home again</p>"));
    assert_eq!(session.title(), "Home");
    assert_eq!(session.url(), format!("{}/", server.uri()));

    assert_eq!(session.forward().await.unwrap(), Traversal::Replayed);
    assert_eq!(session.show(None).as_deref(), Some("<p>foo</p>"));
    assert_eq!(session.url(), format!("{}/foo", server.uri()));

    let (entries, _) = session.history();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_errors_surface() {
    let server = site().await;
    let mut session = open(&server).await;

    assert!(session.click(9).await.is_err());
    assert!(session.back().await.is_err());
    assert!(session.forward().await.is_err());
}
