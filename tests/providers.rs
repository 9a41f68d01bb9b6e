use std::sync::{Arc, Mutex};

use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use session_locator::fraud::{FraudApi, IpQualityScoreApi};
use session_locator::geo::{GeoProvider, IpApiProvider, IpifyResolver, PublicIpResolver};
use session_locator::{
    DegradeReason, FraudScreener, FraudSignal, LookupError, Lookup, VpnSignal,
};

/// A local HTTP endpoint answering every request with a fixed response.
struct Endpoint {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Endpoint {
    async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorder = requests.clone();

        let app = Router::new().fallback(move |uri: Uri| {
            let recorder = recorder.clone();
            let body = body.clone();
            async move {
                recorder.lock().unwrap().push(uri.to_string());
                (status, Json(body))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn ip_api(endpoint: &Endpoint) -> IpApiProvider {
    IpApiProvider::new(reqwest::Client::new(), format!("{}/json/", endpoint.base_url))
}

fn ipqs(endpoint: &Endpoint) -> IpQualityScoreApi {
    IpQualityScoreApi::new(
        reqwest::Client::new(),
        format!("{}/api/json/ip", endpoint.base_url),
        "secret-key".to_string(),
    )
}

#[tokio::test]
async fn ip_api_maps_a_successful_answer() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({
            "status": "success",
            "country": "Germany",
            "countryCode": "DE",
            "city": "Berlin",
            "lat": 52.52,
            "lon": 13.405,
            "isp": "Example Telecom",
            "timezone": "Europe/Berlin"
        }),
    )
    .await;

    let location = ip_api(&endpoint).lookup("8.8.8.8").await.unwrap();

    assert_eq!(endpoint.requests(), vec!["/json/8.8.8.8".to_string()]);
    assert_eq!(location.ip, "8.8.8.8");
    assert_eq!(location.country, "Germany");
    assert_eq!(location.city, "Berlin");
    assert_eq!(location.latitude, Some(52.52));
    assert_eq!(location.longitude, Some(13.405));
    assert_eq!(location.isp, "Example Telecom");
    assert_eq!(location.timezone.as_deref(), Some("Europe/Berlin"));
}

#[tokio::test]
async fn ip_api_falls_back_to_country_code() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({"status": "success", "country": "", "countryCode": "FR"}),
    )
    .await;

    let location = ip_api(&endpoint).lookup("2.2.2.2").await.unwrap();

    assert_eq!(location.country, "FR");
    assert_eq!(location.city, "Unknown");
    assert_eq!(location.isp, "Unknown");
    assert_eq!(location.timezone, None);
}

#[tokio::test]
async fn ip_api_fail_status_is_rejected() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({"status": "fail", "message": "reserved range"}),
    )
    .await;

    let result = ip_api(&endpoint).lookup("8.8.8.8").await;
    assert!(matches!(result, Err(LookupError::Rejected(message)) if message == "reserved range"));
}

#[tokio::test]
async fn ip_api_non_success_status_is_an_error() {
    let endpoint = Endpoint::start(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;

    let result = ip_api(&endpoint).lookup("8.8.8.8").await;
    assert!(matches!(result, Err(LookupError::Status { status: 503 })));
}

#[tokio::test]
async fn ipify_returns_the_trimmed_address() {
    let endpoint = Endpoint::start(StatusCode::OK, json!({"ip": " 198.51.100.7 "})).await;
    let resolver = IpifyResolver::new(
        reqwest::Client::new(),
        format!("{}/?format=json", endpoint.base_url),
    );

    assert_eq!(resolver.public_ip().await.unwrap(), "198.51.100.7");
    assert_eq!(endpoint.requests(), vec!["/?format=json".to_string()]);
}

#[tokio::test]
async fn ipqs_request_carries_key_ip_and_strictness() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({
            "success": true,
            "is_vpn": true,
            "is_proxy": true,
            "is_tor": false,
            "is_crawler": true,
            "fraud_score": 80,
            "host": "us-ny12.nordvpn.com"
        }),
    )
    .await;

    let report = ipqs(&endpoint).query("8.8.8.8").await.unwrap();

    assert_eq!(
        endpoint.requests(),
        vec!["/api/json/ip/secret-key/8.8.8.8?strictness=1".to_string()]
    );
    let signal = report.into_signal();
    assert!(signal.is_vpn);
    assert!(signal.is_proxy);
    assert!(!signal.is_tor);
    assert_eq!(signal.provider.as_deref(), Some("NordVPN"));
    assert_eq!(signal.fraud_score, 80);
    assert_eq!(signal.confidence, 100);
}

#[tokio::test]
async fn ipqs_unsuccessful_answer_is_rejected() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({"success": false, "message": "Invalid or unauthorized key"}),
    )
    .await;

    let result = ipqs(&endpoint).query("8.8.8.8").await;
    assert!(
        matches!(result, Err(LookupError::Rejected(message)) if message == "Invalid or unauthorized key")
    );
}

#[tokio::test]
async fn ipqs_flags_must_be_real_booleans() {
    let endpoint = Endpoint::start(
        StatusCode::OK,
        json!({"success": true, "is_vpn": "true", "is_proxy": 1, "is_tor": null, "fraud_score": 12}),
    )
    .await;

    let signal = ipqs(&endpoint).query("8.8.8.8").await.unwrap().into_signal();
    assert!(!signal.is_vpn);
    assert!(!signal.is_proxy);
    assert!(!signal.is_tor);
    assert_eq!(signal.fraud_score, 12);
}

#[tokio::test]
async fn screener_degrades_on_provider_errors() {
    let endpoint = Endpoint::start(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    let screener = FraudScreener::new(Arc::new(ipqs(&endpoint)));

    let verdict = screener.assess("8.8.8.8").await;

    assert_eq!(endpoint.requests().len(), 1);
    assert_eq!(
        verdict,
        Lookup::Degraded(
            VpnSignal::clean(),
            DegradeReason::Unavailable("provider returned 500".to_string())
        )
    );
}

#[tokio::test]
async fn screener_skips_the_provider_for_local_addresses() {
    let endpoint = Endpoint::start(StatusCode::OK, json!({"success": true, "is_vpn": true})).await;
    let screener = FraudScreener::new(Arc::new(ipqs(&endpoint)));

    assert_eq!(screener.assess("192.168.1.20").await, Lookup::Confirmed(VpnSignal::clean()));
    assert!(endpoint.requests().is_empty());
}
