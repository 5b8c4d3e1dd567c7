use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxproxy::{CredentialResolver, ProxyError, TicketKind, WechatClient};

const TOKEN_BODY: &str = r#"{"access_token":"ACCESS_TOKEN","expires_in":7200}"#;
const TICKET_BODY: &str =
    r#"{"errcode":0,"errmsg":"ok","ticket":"JSAPI_TICKET","expires_in":7200}"#;

fn client(server: &MockServer) -> WechatClient {
    WechatClient::new(reqwest::Client::new(), Duration::from_secs(3600), 100)
        .with_api_base(server.uri())
        .with_qyapi_base(server.uri())
}

#[tokio::test]
async fn access_token_is_cached_until_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("grant_type", "client_credential"))
        .and(query_param("appid", "wx1"))
        .and(query_param("secret", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TOKEN_BODY))
        .expect(2)
        .mount(&server)
        .await;

    let wx = client(&server);
    assert_eq!(wx.access_token_json("wx1", "s1", false).await.unwrap(), TOKEN_BODY);
    // served from cache
    assert_eq!(wx.access_token_json("wx1", "s1", false).await.unwrap(), TOKEN_BODY);
    // refresh bypasses and replaces
    assert_eq!(wx.access_token_json("wx1", "s1", true).await.unwrap(), TOKEN_BODY);
    assert_eq!(wx.access_token("wx1", "s1").await.unwrap(), "ACCESS_TOKEN");
}

#[tokio::test]
async fn upstream_errors_pass_through_and_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errcode":40013,"errmsg":"invalid appid"}"#),
        )
        .expect(2)
        .mount(&server)
        .await;

    let wx = client(&server);
    for _ in 0..2 {
        match wx.access_token_json("bad", "s", false).await {
            Err(ProxyError::Upstream { errcode, errmsg }) => {
                assert_eq!(errcode, 40013);
                assert_eq!(errmsg, "invalid appid");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn corp_token_uses_enterprise_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .and(query_param("corpid", "corp"))
        .and(query_param("corpsecret", "cs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errcode":0,"errmsg":"ok","access_token":"CORP","expires_in":7200}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wx = client(&server);
    let first = wx.corp_token_json("corp", "cs", false).await.unwrap();
    let second = wx.corp_token_json("corp", "cs", false).await.unwrap();
    assert_eq!(first, second);
    assert!(first.contains("CORP"));
}

#[tokio::test]
async fn short_corp_body_is_invalid_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let wx = client(&server);
    assert!(matches!(
        wx.corp_token_json("corp", "cs", false).await,
        Err(ProxyError::Upstream { errcode: 40001, .. })
    ));
}

#[tokio::test]
async fn tickets_are_cached_per_kind_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TOKEN_BODY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("access_token", "ACCESS_TOKEN"))
        .and(query_param("type", "jsapi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TICKET_BODY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("type", "wx_card"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errcode":0,"errmsg":"ok","ticket":"CARD_TICKET","expires_in":7200}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wx = client(&server);
    assert_eq!(wx.jsapi_ticket("wx1", "s1").await.unwrap(), "JSAPI_TICKET");
    assert_eq!(wx.jsapi_ticket("wx1", "s1").await.unwrap(), "JSAPI_TICKET");

    let card = wx
        .ticket_for_app(TicketKind::WxCard, "wx1", "s1")
        .await
        .unwrap();
    assert!(card.contains("CARD_TICKET"));
    let again = wx.ticket_json(TicketKind::WxCard, "ACCESS_TOKEN").await.unwrap();
    assert_eq!(card, again);
}
