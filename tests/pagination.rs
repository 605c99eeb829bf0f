//! Page iteration over a generic list endpoint.

mod common;

use common::client;
use hcloud::{first_by_name, iter_pages, Client, Context, ListOpts, Response, Result};
use http::Method;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct Server {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<Server>,
}

async fn list_servers(
    client: &Client,
    ctx: &Context,
    opts: &ListOpts,
    name: Option<&str>,
) -> Result<(Vec<Server>, Response)> {
    let mut pairs = opts.query_pairs();
    if let Some(name) = name {
        pairs.push(("name".to_string(), name.to_string()));
    }
    let req = client
        .new_request(ctx, Method::GET, "/servers", None)?
        .with_query_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let (list, response) = client.execute_json::<ServerList>(req).await?;
    Ok((list.servers, response))
}

fn page(servers: serde_json::Value, page: u32, next_page: Option<u32>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "servers": servers,
        "meta": {"pagination": {
            "page": page,
            "per_page": 2,
            "previous_page": if page > 1 { json!(page - 1) } else { json!(null) },
            "next_page": next_page,
            "last_page": 3,
            "total_entries": 5
        }}
    }))
}

#[tokio::test]
async fn test_iter_pages_concatenates_all_pages() {
    let server = MockServer::start().await;
    let pages = [
        (1, json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]), Some(2)),
        (2, json!([{"id": 3, "name": "c"}, {"id": 4, "name": "d"}]), Some(3)),
        (3, json!([{"id": 5, "name": "e"}]), None),
    ];
    for (number, servers, next) in pages {
        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param("page", number.to_string()))
            .respond_with(page(servers, number, next))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client(&server);
    let ctx = Context::background();
    let servers = iter_pages(|page| {
        let opts = ListOpts {
            page: Some(page),
            per_page: Some(2),
            ..Default::default()
        };
        let client = client.clone();
        let ctx = ctx.clone();
        async move { list_servers(&client, &ctx, &opts, None).await }
    })
    .await
    .unwrap();

    assert_eq!(
        servers.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
}

#[tokio::test]
async fn test_iter_pages_error_returns_no_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("page", "1"))
        .respond_with(page(json!([{"id": 1, "name": "a"}]), 1, Some(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "forbidden", "message": "insufficient permissions"}
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = Context::background();
    let result = iter_pages(|page| {
        let opts = ListOpts {
            page: Some(page),
            ..Default::default()
        };
        let client = client.clone();
        let ctx = ctx.clone();
        async move { list_servers(&client, &ctx, &opts, None).await }
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_error(&hcloud::ErrorCode::Forbidden));
}

#[tokio::test]
async fn test_first_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("name", "web"))
        .respond_with(page(json!([{"id": 9, "name": "web"}]), 1, None))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = Context::background();
    let opts = ListOpts::default();

    let (found, response) = first_by_name("web", || {
        list_servers(&client, &ctx, &opts, Some("web"))
    })
    .await
    .unwrap();
    assert_eq!(found.map(|s| s.name), Some("web".to_string()));
    assert!(response.is_some());

    let (found, response) = first_by_name("", || {
        list_servers(&client, &ctx, &opts, Some(""))
    })
    .await
    .unwrap();
    assert!(found.is_none());
    assert!(response.is_none());
}
