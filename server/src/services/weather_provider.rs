use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use cyclops_shared::WeatherSample;
use serde::Deserialize;
use tracing::warn;

use crate::config::{upstream_connect_timeout, upstream_http_timeout};

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<WeatherSample, ProviderError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream status {status}; body preview: {preview}")]
    Status {
        status: reqwest::StatusCode,
        preview: String,
    },
    #[error("failed to decode weather payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of current conditions for a single coordinate.
pub trait WeatherProvider: Send + Sync {
    fn fetch_sample(&self, lat: f64, lon: f64) -> FetchFuture<'_>;
}

/// OpenWeatherMap "current weather" endpoint, metric units.
#[derive(Clone)]
pub struct OpenWeatherMapProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenWeatherMapProvider {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSample, ProviderError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let preview = String::from_utf8_lossy(&bytes)
                .chars()
                .take(200)
                .collect::<String>();
            return Err(ProviderError::Status { status, preview });
        }

        Ok(parse_weather_payload(bytes.as_ref())?)
    }
}

impl WeatherProvider for OpenWeatherMapProvider {
    fn fetch_sample(&self, lat: f64, lon: f64) -> FetchFuture<'_> {
        Box::pin(self.fetch(lat, lon))
    }
}

/// HTTP client with explicit per-request bounds so one slow city cannot stall a tick.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    build_http_client_with(upstream_http_timeout(), upstream_connect_timeout())
}

fn build_http_client_with(
    request_timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent("cyclops/0.1")
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .build()
        .or_else(|e| {
            warn!(
                error = %e,
                "failed to build configured HTTP client, retrying without custom user-agent"
            );
            reqwest::Client::builder()
                .timeout(request_timeout)
                .connect_timeout(connect_timeout)
                .build()
        })
}

#[derive(Deserialize)]
struct RawWeather {
    #[serde(default)]
    clouds: Option<RawClouds>,
    #[serde(default)]
    main: Option<RawMain>,
}

#[derive(Deserialize)]
struct RawClouds {
    #[serde(default)]
    all: Option<f64>,
}

#[derive(Deserialize)]
struct RawMain {
    #[serde(default)]
    temp: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
}

/// Missing fields read as zero; anything that is not a JSON object is an error.
pub fn parse_weather_payload(bytes: &[u8]) -> Result<WeatherSample, serde_json::Error> {
    let raw: RawWeather = serde_json::from_slice(bytes)?;
    let clouds = raw.clouds.and_then(|clouds| clouds.all);
    let (temp, humidity, pressure) = match raw.main {
        Some(main) => (main.temp, main.humidity, main.pressure),
        None => (None, None, None),
    };

    Ok(WeatherSample {
        cloud_pct: clouds.unwrap_or(0.0),
        temp_c: temp.unwrap_or(0.0),
        humidity_pct: humidity.unwrap_or(0.0),
        pressure_hpa: pressure.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use cyclops_shared::WeatherSample;

    use super::{
        OpenWeatherMapProvider, ProviderError, WeatherProvider, build_http_client_with,
        parse_weather_payload,
    };

    async fn spawn_upstream(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn parses_full_payload() {
        let payload = r#"{
            "coord": {"lon": -0.1278, "lat": 51.5074},
            "clouds": {"all": 75},
            "main": {"temp": 14.2, "feels_like": 13.1, "pressure": 1012, "humidity": 81},
            "name": "London"
        }"#;

        let sample = parse_weather_payload(payload.as_bytes()).expect("payload should parse");
        assert_eq!(
            sample,
            WeatherSample {
                cloud_pct: 75.0,
                temp_c: 14.2,
                humidity_pct: 81.0,
                pressure_hpa: 1012.0,
            }
        );
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let sample = parse_weather_payload(br#"{"main": {"temp": -3.5}}"#)
            .expect("partial payload should parse");
        assert_eq!(
            sample,
            WeatherSample {
                temp_c: -3.5,
                ..WeatherSample::ZERO
            }
        );

        let sample = parse_weather_payload(br#"{"cod": 401, "message": "Invalid API key"}"#)
            .expect("error body is still an object");
        assert!(sample.is_zero());

        let sample = parse_weather_payload(br#"{"clouds": null, "main": {"humidity": 40}}"#)
            .expect("null sections should parse");
        assert_eq!(sample.humidity_pct, 40.0);
        assert_eq!(sample.cloud_pct, 0.0);
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(parse_weather_payload(b"<html>bad gateway</html>").is_err());
        assert!(parse_weather_payload(b"[1, 2, 3]").is_err());
        assert!(parse_weather_payload(br#"{"main": {"temp": "warm"}}"#).is_err());
    }

    #[tokio::test]
    async fn sends_metric_query_with_credentials() {
        let app = Router::new().route(
            "/weather",
            get(
                |Query(params): Query<std::collections::HashMap<String, String>>| async move {
                    let ok = params.get("appid").map(String::as_str) == Some("secret")
                        && params.get("units").map(String::as_str) == Some("metric")
                        && params.get("lat").map(String::as_str) == Some("37.9838")
                        && params.get("lon").map(String::as_str) == Some("23.7275");
                    if ok {
                        (
                            StatusCode::OK,
                            r#"{"clouds":{"all":10},"main":{"temp":28.4,"humidity":33,"pressure":1009}}"#,
                        )
                    } else {
                        (StatusCode::BAD_REQUEST, r#"{"cod":400}"#)
                    }
                },
            ),
        );
        let (addr, server_handle) = spawn_upstream(app).await;

        let provider = OpenWeatherMapProvider::new(
            reqwest::Client::new(),
            format!("http://{addr}/weather"),
            "secret",
        );
        let sample = provider
            .fetch_sample(37.9838, 23.7275)
            .await
            .expect("fetch should succeed");

        assert_eq!(sample.temp_c, 28.4);
        assert_eq!(sample.cloud_pct, 10.0);
        assert_eq!(sample.humidity_pct, 33.0);
        assert_eq!(sample.pressure_hpa, 1009.0);

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/weather",
            get(|| async { (StatusCode::UNAUTHORIZED, r#"{"cod":401}"#) }),
        );
        let (addr, server_handle) = spawn_upstream(app).await;

        let provider = OpenWeatherMapProvider::new(
            reqwest::Client::new(),
            format!("http://{addr}/weather"),
            "wrong",
        );
        let err = provider
            .fetch_sample(0.0, 0.0)
            .await
            .expect_err("401 should fail");
        assert!(matches!(
            err,
            ProviderError::Status { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED
        ));

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn slow_upstream_hits_request_timeout() {
        let app = Router::new().route(
            "/weather",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let (addr, server_handle) = spawn_upstream(app).await;

        let client = build_http_client_with(Duration::from_millis(100), Duration::from_secs(1))
            .expect("client should build");
        let provider = OpenWeatherMapProvider::new(client, format!("http://{addr}/weather"), "k");
        let err = provider
            .fetch_sample(0.0, 0.0)
            .await
            .expect_err("request should time out");
        assert!(matches!(err, ProviderError::Request(ref e) if e.is_timeout()));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
