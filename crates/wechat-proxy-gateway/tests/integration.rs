use std::time::Duration;

use actix_web::{test, web, App};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wxproxy::MsgCrypter;
use wxproxy_gateway::{AppState, GatewayConfig};

const TOKEN: &str = "www.aiportal.net";
const AES_KEY: &str = "XVeChLv7XLCpkHiPJTGrx6Ha18Yq9i6LCkHV1oxk3mw";
const APP_ID: &str = "wx06766a90ab72960e";

const ENCRYPTED_FIXTURE: &str = "<xml>
<ToUserName><![CDATA[bfbd]]></ToUserName>
<Encrypt><![CDATA[ajTxGtmDjoECHpJkotp9Ok8elXjtUQ/BP1F795qu/7r9Efmeni7sRXS7f/RfJNgTshi/8XbiKx72Nri3kltaJX1t3QpmUvNufD7dA3ekwVp/1DLcGP65YtSgsrBTa9RoVEvby23X+7+X4mhBM5JzS8YFztsJEw3vxF5iYFOV4rdFrszli1ddaZRNZAGQDabcJ/rQIONxcog0t5ZGUIb+HuawqpNGtfE/wOmMJ0P5KVrkZP9U2+RbMCJQS8+HPUxs7ofJL7E7KicJ3JS41fDXI2IJjVTGOO+ddBmQVXLPX0xvKVUtjxj0VPea8/lFKSUIQlnqzWxJ7QP9/XpYIWVWHhNr2O3fXQ5SfberZlEPCEuudHklsjyOueDet06rNF5+28v0TIGuT7OdjolTG6r/oSyMRlO+DsKiyIaWWn0a8e8Y+CO8F4hoPdM9NWHW4pxCeKatu7nsAQOfWZc3pcnHBo8+60TLnmDfmR6eSgQTnbPmetgrDsxFtOgebk+y4nLq]]></Encrypt>
</xml>";

fn make_state(config: GatewayConfig) -> web::Data<AppState> {
    web::Data::new(AppState::with_clients(
        config,
        reqwest::Client::new(),
        reqwest::Client::new(),
    ))
}

fn base_config() -> GatewayConfig {
    GatewayConfig {
        dispatch_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn upstream_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        api_url: server.uri(),
        qyapi_url: server.uri(),
        ..base_config()
    }
}

fn call(server: &MockServer, route: &str) -> String {
    urlencoding::encode(&format!("{}{route}", server.uri())).into_owned()
}

#[actix_rt::test]
async fn test_health_reports_ok() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "wxproxy-gateway");
}

#[actix_rt::test]
async fn test_lenient_handshake_echoes() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/msg?signature=s&timestamp=1&nonce=2&echostr=hello")
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "hello");
}

#[actix_rt::test]
async fn test_strict_handshake_requires_subscribers_to_echo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .and(query_param("echostr", "hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nope"))
        .mount(&server)
        .await;

    let config = GatewayConfig {
        strict_verify: true,
        ..base_config()
    };
    let app = test::init_service(
        App::new()
            .app_data(make_state(config))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!("/msg?echostr=hello&call={}", call(&server, "/good"));
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, "hello");

    let uri = format!(
        "/msg?echostr=hello&call={}&call={}",
        call(&server, "/good"),
        call(&server, "/bad")
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert!(test::call_and_read_body(&app, req).await.is_empty());
}

#[actix_rt::test]
async fn test_plain_delivery_returns_first_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/silent"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/reply"))
        .and(body_string_contains("<xml>...</xml>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<xml>reply</xml>"))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!(
        "/msg?signature=s&timestamp=1&nonce=2&call={}&call={}",
        call(&server, "/silent"),
        call(&server, "/reply")
    );
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload("<xml>...</xml>")
        .to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, "<xml>reply</xml>");

    let uri = format!("/msg?call={}", call(&server, "/silent"));
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload("<xml>...</xml>")
        .to_request();
    assert!(test::call_and_read_body(&app, req).await.is_empty());
}

#[actix_rt::test]
async fn test_encrypted_delivery_reseals_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sub"))
        .and(body_string_contains("<URL>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<xml>OK</xml>"))
        .expect(1)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!(
        "/msg?signature=s&timestamp=1502757162&nonce=1106965505&encrypt_type=aes\
         &msg_signature=29e271bff094d2acbda57c07ad6c974042e0128c&token={}&aes={}&call={}",
        urlencoding::encode(TOKEN),
        urlencoding::encode(AES_KEY),
        call(&server, "/sub")
    );
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload(ENCRYPTED_FIXTURE)
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert!(body.starts_with(b"<xml><Encrypt><![CDATA["));

    let crypter = MsgCrypter::new(TOKEN, AES_KEY).unwrap();
    let opened = crypter.decrypt(&body, None).unwrap();
    assert_eq!(opened.message, b"<xml>OK</xml>");
    assert_eq!(opened.app_id, APP_ID);
}

#[actix_rt::test]
async fn test_bad_signature_is_dropped_when_enforced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<xml>OK</xml>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = GatewayConfig {
        verify_msg_signature: true,
        ..base_config()
    };
    let app = test::init_service(
        App::new()
            .app_data(make_state(config))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!(
        "/msg?timestamp=1&nonce=2&encrypt_type=aes&msg_signature=deadbeef&token={}&aes={}&call={}",
        urlencoding::encode(TOKEN),
        urlencoding::encode(AES_KEY),
        call(&server, "/sub")
    );
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload(ENCRYPTED_FIXTURE)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(test::read_body(resp).await.is_empty());
}

#[actix_rt::test]
async fn test_valid_signature_passes_when_enforced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sub"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<xml>OK</xml>"))
        .expect(1)
        .mount(&server)
        .await;

    let crypter = MsgCrypter::new(TOKEN, AES_KEY).unwrap();
    let inbound = crypter.seal(b"<xml><MsgType>text</MsgType></xml>", APP_ID).unwrap();

    let config = GatewayConfig {
        verify_msg_signature: true,
        ..base_config()
    };
    let app = test::init_service(
        App::new()
            .app_data(make_state(config))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!(
        "/msg?timestamp={}&nonce={}&encrypt_type=aes&msg_signature={}&token={}&aes={}&call={}",
        inbound.timestamp,
        inbound.nonce,
        inbound.msg_signature,
        urlencoding::encode(TOKEN),
        urlencoding::encode(AES_KEY),
        call(&server, "/sub")
    );
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload(inbound.to_xml())
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let opened = crypter.decrypt(&body, None).unwrap();
    assert_eq!(opened.message, b"<xml>OK</xml>");
}

#[actix_rt::test]
async fn test_json_mode_translates_both_ways() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(serde_json::json!({
            "MsgType": "text",
            "Content": "ping",
            "FromUserName": "user"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ToUserName": "user",
            "FromUserName": "account",
            "CreateTime": 12345678,
            "MsgType": "text",
            "Content": "pong"
        })))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let uri = format!("/msg/json?call={}", call(&server, "/json"));
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_payload(
            "<xml><ToUserName><![CDATA[account]]></ToUserName><FromUserName><![CDATA[user]]></FromUserName>\
<CreateTime>1</CreateTime><MsgType><![CDATA[text]]></MsgType><Content><![CDATA[ping]]></Content>\
<MsgId>42</MsgId></xml>",
        )
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.starts_with("<xml><ToUserName><![CDATA[user]]></ToUserName>"));
    assert!(xml.contains("<Content><![CDATA[pong]]></Content>"));
}

#[actix_rt::test]
async fn test_api_token_passthrough_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("appid", "wx1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"access_token":"TOKEN","expires_in":7200}"#),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("appid", "bad"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errcode":40013,"errmsg":"invalid appid"}"#),
        )
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(upstream_config(&server)))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    // first call fetches, second is cached, /api/new refetches
    for uri in ["/api?appid=wx1&secret=s", "/api?appid=wx1&secret=s", "/api/new?appid=wx1&secret=s"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["access_token"], "TOKEN");
    }

    let req = test::TestRequest::get().uri("/api?appid=bad&secret=s").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errcode"], 40013);
    assert_eq!(body["errmsg"], "invalid appid");

    let req = test::TestRequest::get().uri("/api?appid=wx1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errcode"], -10001);
}

#[actix_rt::test]
async fn test_qyapi_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .and(query_param("corpid", "corp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"errcode":0,"errmsg":"ok","access_token":"CORP_TOKEN","expires_in":7200}"#,
        ))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(upstream_config(&server)))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/qyapi?corpid=corp&corpsecret=cs")
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["access_token"], "CORP_TOKEN");
}

#[actix_rt::test]
async fn test_tickets_and_js_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"access_token":"TOKEN","expires_in":7200}"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("type", "jsapi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"errcode":0,"errmsg":"ok","ticket":"JS_TICKET","expires_in":7200}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("type", "wx_card"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"errcode":0,"errmsg":"ok","ticket":"CARD_TICKET","expires_in":7200}"#,
        ))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(make_state(upstream_config(&server)))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/js/ticket?access_token=TOKEN")
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["ticket"], "JS_TICKET");

    let req = test::TestRequest::get()
        .uri("/js/card?appid=wx1&secret=s")
        .to_request();
    let body: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["ticket"], "CARD_TICKET");

    let req = test::TestRequest::get()
        .uri("/js/config?appid=wx1&secret=s&debug=true&apilist=scanQRCode")
        .insert_header(("Referer", "http://example.com/page"))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let script = String::from_utf8(body.to_vec()).unwrap();
    assert!(script.starts_with("wx.config({\"appId\":\"wx1\",\"debug\":true,"));
    assert!(script.contains("\"jsApiList\":[\"scanQRCode\"]"));

    let req = test::TestRequest::get()
        .uri("/js/config?appid=wx1&secret=s")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_echo_returns_body() {
    let app = test::init_service(
        App::new()
            .app_data(make_state(base_config()))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/echo")
        .set_payload("<xml>echo</xml>")
        .to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, "<xml>echo</xml>");
}

#[actix_rt::test]
async fn test_signed_delivery_reaches_echo() {
    let config = GatewayConfig {
        dispatch_hmac_secret: Some(b"shared-dispatch-secret".to_vec()),
        ..base_config()
    };

    let app = test::init_service(
        App::new()
            .app_data(make_state(config))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let signature = wxproxy::signature::compute_hmac(b"shared-dispatch-secret", b"<xml>echo</xml>");
    let req = test::TestRequest::post()
        .uri("/echo")
        .insert_header(("X-Webhook-Signature", signature))
        .set_payload("<xml>echo</xml>")
        .to_request();
    assert_eq!(test::call_and_read_body(&app, req).await, "<xml>echo</xml>");

    let req = test::TestRequest::post()
        .uri("/echo")
        .set_payload("<xml>echo</xml>")
        .to_request();
    assert!(test::call_and_read_body(&app, req).await.is_empty());
}

#[actix_rt::test]
async fn test_metrics_requires_bearer_token_when_configured() {
    let config = GatewayConfig {
        metrics_token: Some("scrape-token".to_string()),
        ..base_config()
    };
    let app = test::init_service(
        App::new()
            .app_data(make_state(config))
            .configure(wxproxy_gateway::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errcode"], -10001);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer scrape-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
