//! Route definitions

use axum::{Router, routing::get};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::ApiError, error::panic_response, handlers, state::AppState};

/// Create the router with all routes and middleware attached.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::health::index))
        .route("/api/health", get(handlers::health::health_check))
        // Static segment wins over the capture below.
        .route("/api/weather/current", get(handlers::weather::current_weather))
        .route("/api/weather/{city}", get(handlers::weather::city_weather))
        .fallback(|| async { ApiError::RouteNotFound })
        .method_not_allowed_fallback(|| async { ApiError::RouteNotFound })
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::{
        net::{IpAddr, SocketAddr},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::{Request, StatusCode},
    };
    use cwa_weather_core::{
        CityForecast, CityNames, CityResolver, ForecastError, ForecastPeriod, ForecastProvider,
        GeoLocator,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    /// Records requested cities and answers from a canned outcome.
    struct StubProvider {
        calls: Arc<std::sync::Mutex<Vec<String>>>,
        outcome: fn(&str) -> Result<CityForecast, ForecastError>,
    }

    impl std::fmt::Debug for StubProvider {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("StubProvider").finish_non_exhaustive()
        }
    }

    #[async_trait]
    impl ForecastProvider for StubProvider {
        async fn fetch_forecast(&self, city: &str) -> Result<CityForecast, ForecastError> {
            self.calls.lock().expect("lock").push(city.to_string());
            (self.outcome)(city)
        }
    }

    #[derive(Debug)]
    struct TableLocator;

    impl GeoLocator for TableLocator {
        fn lookup_city(&self, ip: IpAddr) -> Option<String> {
            match ip.to_string().as_str() {
                "8.8.8.8" => Some("Kaohsiung".to_string()),
                "9.9.9.9" => Some("Nowhereville".to_string()),
                _ => None,
            }
        }
    }

    fn four_periods(city: &str) -> Result<CityForecast, ForecastError> {
        let period = |i: usize| ForecastPeriod {
            start_time: format!("2024-01-0{i} 06:00:00"),
            end_time: format!("2024-01-0{i} 18:00:00"),
            weather: "多雲".into(),
            rain: "20%".into(),
            min_temp: "18°C".into(),
            max_temp: "24°C".into(),
            ..ForecastPeriod::default()
        };
        Ok(CityForecast {
            city: city.to_string(),
            update_time: "三十六小時天氣預報".into(),
            forecasts: (1..=4).map(period).collect(),
        })
    }

    fn app_with(
        outcome: fn(&str) -> Result<CityForecast, ForecastError>,
        trust_proxy_headers: bool,
    ) -> (Router, Arc<std::sync::Mutex<Vec<String>>>) {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let state = AppState {
            provider: Arc::new(StubProvider { calls: Arc::clone(&calls), outcome }),
            resolver: Arc::new(CityResolver::new(Arc::new(TableLocator), CityNames::taiwan())),
            trust_proxy_headers,
        };
        (create_router(state), calls)
    }

    async fn get(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.expect("infallible");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn city_route_returns_success_envelope() {
        let (app, calls) = app_with(four_periods, true);

        let (status, body) = get(app, request("/api/weather/%E8%87%BA%E5%8C%97%E5%B8%82")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["city"], "臺北市");
        assert_eq!(body["data"]["updateTime"], "三十六小時天氣預報");

        let forecasts = body["data"]["forecasts"].as_array().expect("array");
        assert_eq!(forecasts.len(), 4);
        assert!(forecasts.iter().all(|f| f["rain"].as_str().is_some_and(|r| r.ends_with('%'))));
        assert_eq!(forecasts[0]["minTemp"], "18°C");

        assert_eq!(calls.lock().expect("lock").as_slice(), ["臺北市"]);
    }

    #[tokio::test]
    async fn current_route_resolves_from_forwarded_header() {
        let (app, calls) = app_with(four_periods, true);

        let req = Request::builder()
            .uri("/api/weather/current")
            .header("x-forwarded-for", "8.8.8.8, 10.0.0.1")
            .body(Body::empty())
            .expect("request");
        let (status, body) = get(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["city"], "高雄市");
        assert_eq!(calls.lock().expect("lock").as_slice(), ["高雄市"]);
    }

    #[tokio::test]
    async fn current_route_uses_peer_address_when_headers_untrusted() {
        let (app, calls) = app_with(four_periods, false);

        let mut req = Request::builder()
            .uri("/api/weather/current")
            .header("x-forwarded-for", "8.8.8.8")
            .body(Body::empty())
            .expect("request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([9, 9, 9, 9], 40000))));

        let (status, _) = get(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.lock().expect("lock").as_slice(), ["臺北市"]);
    }

    #[tokio::test]
    async fn current_route_from_loopback_uses_default_city() {
        let (app, calls) = app_with(four_periods, true);

        let mut req = request("/api/weather/current");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));

        let (status, body) = get(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["city"], "臺北市");
        assert_eq!(calls.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn not_found_city_maps_to_404() {
        let (app, _) = app_with(|city| Err(ForecastError::CityNotFound { city: city.into() }), true);

        let (status, body) = get(app, request("/api/weather/Atlantis")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No data found");
        assert!(body["message"].as_str().is_some_and(|m| m.contains("Atlantis")));
    }

    #[tokio::test]
    async fn missing_key_maps_to_500() {
        let (app, _) = app_with(|_| Err(ForecastError::MissingApiKey), true);

        let (status, body) = get(app, request("/api/weather/Taipei")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server configuration error");
    }

    #[tokio::test]
    async fn upstream_status_is_mirrored_with_details() {
        let (app, _) = app_with(
            |_| {
                Err(ForecastError::Upstream {
                    status: 401,
                    message: "Unauthorized".into(),
                    body: serde_json::json!({ "message": "Unauthorized" }),
                })
            },
            true,
        );

        let (status, body) = get(app, request("/api/weather/Taipei")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "CWA API error");
        assert_eq!(body["details"]["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn unknown_route_is_generic_404() {
        let (app, calls) = app_with(four_periods, true);

        let (status, body) = get(app, request("/api/unknown")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "error": "Route not found" }));
        assert!(calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_generic_404() {
        let (app, calls) = app_with(four_periods, true);

        let req = Request::builder()
            .method("POST")
            .uri("/api/weather/Taipei")
            .body(Body::empty())
            .expect("request");
        let (status, body) = get(app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "error": "Route not found" }));
        assert!(calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn undecodable_city_segment_gets_json_400() {
        let (app, calls) = app_with(four_periods, true);

        let res = app.oneshot(request("/api/weather/%FF")).await.expect("infallible");
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body["error"], "Invalid parameter");
        assert!(body["message"].is_string());
        assert!(calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn handler_panic_is_caught_as_500() {
        static PANICS: AtomicUsize = AtomicUsize::new(0);
        let (app, _) = app_with(
            |_| {
                PANICS.fetch_add(1, Ordering::SeqCst);
                panic!("provider exploded")
            },
            true,
        );

        let (status, body) = get(app, request("/api/weather/Taipei")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server error");
        assert_eq!(PANICS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn health_and_index_respond() {
        let (app, _) = app_with(four_periods, true);

        let (status, body) = get(app.clone(), request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");

        let (status, body) = get(app, request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"]["cityWeather"].is_string());
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let (app, _) = app_with(four_periods, true);

        let req = Request::builder()
            .uri("/api/health")
            .header("origin", "https://example.com")
            .body(Body::empty())
            .expect("request");
        let res = app.oneshot(req).await.expect("infallible");

        assert_eq!(
            res.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn end_to_end_against_mock_datastore() {
        use std::time::Duration;

        use cwa_weather_core::CwaProvider;
        use wiremock::{
            Mock, MockServer, ResponseTemplate,
            matchers::{method, path, query_param},
        };

        let upstream = MockServer::start().await;
        let element = |code: &str, values: [&str; 4]| {
            let time: Vec<Value> = values
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "startTime": "2024-05-01 06:00:00",
                        "endTime": "2024-05-01 18:00:00",
                        "parameter": { "parameterName": v }
                    })
                })
                .collect();
            serde_json::json!({ "elementName": code, "time": time })
        };

        Mock::given(method("GET"))
            .and(path("/v1/rest/datastore/F-C0032-001"))
            .and(query_param("locationName", "臺北市"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": {
                    "datasetDescription": "三十六小時天氣預報",
                    "location": [{
                        "locationName": "臺北市",
                        "weatherElement": [
                            element("Wx", ["晴", "多雲", "陰", "雨"]),
                            element("PoP", ["0", "10", "40", "90"]),
                            element("MinT", ["20", "19", "18", "17"]),
                            element("MaxT", ["28", "27", "25", "22"]),
                        ]
                    }]
                }
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let provider = CwaProvider::new(
            Some("TEST-KEY".into()),
            upstream.uri(),
            "F-C0032-001".into(),
            Duration::from_secs(2),
        )
        .expect("client builds");
        let state = AppState {
            provider: Arc::new(provider),
            resolver: Arc::new(CityResolver::new(Arc::new(TableLocator), CityNames::taiwan())),
            trust_proxy_headers: true,
        };

        let (status, body) = get(
            create_router(state),
            request("/api/weather/%E8%87%BA%E5%8C%97%E5%B8%82"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let forecasts = body["data"]["forecasts"].as_array().expect("array");
        assert_eq!(forecasts.len(), 4);
        assert!(forecasts.iter().all(|f| f["rain"].as_str().is_some_and(|r| r.ends_with('%'))));
        assert_eq!(forecasts[3]["weather"], "雨");
        assert_eq!(forecasts[3]["maxTemp"], "22°C");
    }
}
