use mockito::Matcher;
use serde_json::json;
use whyred_backend::search::{SearchClient, SearchResult};

fn client(url: &str) -> SearchClient {
    SearchClient::with_client(reqwest::Client::new(), Some("search-key".into()), Some("engine".into()))
        .with_base_url(format!("{url}/customsearch/v1"))
}

#[tokio::test]
async fn search_renders_results_into_context() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/customsearch/v1")
        .match_header("x-goog-api-key", "search-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("cx".into(), "engine".into()),
            Matcher::UrlEncoded("q".into(), "rust lifetimes".into()),
            Matcher::UrlEncoded("num".into(), "5".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "title": "Lifetimes", "link": "https://doc.rust-lang.org/book/ch10-03-lifetime-syntax.html", "snippet": "Validating references" },
                    { "title": "Nomicon", "link": "https://doc.rust-lang.org/nomicon/lifetimes.html", "snippet": "Lifetimes in depth" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ctx = client(&server.url()).search("rust lifetimes").await;

    assert_eq!(ctx.results.len(), 2);
    assert_eq!(ctx.results[1].title, "Nomicon");
    assert_eq!(
        ctx.context,
        "Title: Lifetimes\nSnippet: Validating references\n\nTitle: Nomicon\nSnippet: Lifetimes in depth\n\n"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn no_items_gives_empty_context() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"searchInformation":{"totalResults":"0"}}"#)
        .create_async()
        .await;

    let ctx = client(&server.url()).try_search("nothing").await.unwrap();
    assert_eq!(ctx.results, Vec::<SearchResult>::new());
    assert!(ctx.context.is_empty());
}

#[tokio::test]
async fn upstream_failure_degrades() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error":{"code":403,"message":"API key not valid"}}"#)
        .create_async()
        .await;

    let search = client(&server.url());
    assert!(search.try_search("anything").await.is_err());

    let ctx = search.search("anything").await;
    assert!(ctx.results.is_empty());
    assert_eq!(
        ctx.context,
        "Search functionality is currently unavailable for query: anything"
    );
}

#[tokio::test]
async fn transport_errors_do_not_expose_query_string() {
    let search = SearchClient::with_client(
        reqwest::Client::new(),
        Some("SECRET_KEY_123".into()),
        Some("SECRET_ENGINE".into()),
    )
    .with_base_url("http://127.0.0.1:1/customsearch/v1");

    let err = search.try_search("private question").await.unwrap_err();
    let text = format!("{err} {err:?}");
    assert!(!text.contains("SECRET_KEY_123"), "key leaked: {text}");
    assert!(!text.contains("SECRET_ENGINE"), "engine id leaked: {text}");
}

#[tokio::test]
async fn unconfigured_client_never_calls_out() {
    let search = SearchClient::with_client(reqwest::Client::new(), None, Some("engine".into()));
    assert!(!search.is_configured());
    assert!(search.try_search("q").await.is_err());
    assert!(search.search("q").await.results.is_empty());
}
