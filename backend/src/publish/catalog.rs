//! Catalog API client.
//!
//! One endpoint: POST the payload map, get back which item codes the
//! catalog does not know and the ids it created.

use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::config::{API_KEY_HEADER, API_TIMEOUT};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogPayload, CatalogResponse};

pub struct CatalogClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Send the payload and parse the answer.
    pub async fn submit(&self, payload: &CatalogPayload) -> CatalogResult<CatalogResponse> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        if !status.is_success() {
            // Error bodies usually carry the same shape with a message
            if let Ok(error) = serde_json::from_str::<CatalogResponse>(&body) {
                if !error.message.is_empty() {
                    return Err(CatalogError::Server(error.message));
                }
            }
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| CatalogError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DefaultFlag, PayloadItem};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/sync", addr)
    }

    fn payload() -> CatalogPayload {
        let mut payload = CatalogPayload::new();
        payload.insert(
            "A_01.jpg".into(),
            PayloadItem {
                item_code: "A".into(),
                remote_path: "/image/GoodsColor/20240101/A_01.jpg".into(),
                sort: 1,
                default_flag: DefaultFlag::Primary,
                swatch_path: String::new(),
            },
        );
        payload
    }

    #[tokio::test]
    async fn test_submit_sends_key_and_parses_answer() {
        let app = Router::new().route(
            "/sync",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers.get("key").and_then(|v| v.to_str().ok()).unwrap_or("");
                assert_eq!(key, "secret");
                assert_eq!(body["A_01.jpg"]["excel_col_d"], "A");
                assert_eq!(body["A_01.jpg"]["is_def"], 1);
                Json(json!({
                    "status": "success",
                    "massage": "ok",
                    "not_found_sns": ["B"],
                    "success_goods_color_pic_ids": [11, 12],
                    "success_goods_color_ids": [7]
                }))
            }),
        );
        let url = serve(app).await;

        let client = CatalogClient::new(url, "secret").unwrap();
        let response = client.submit(&payload()).await.unwrap();

        assert_eq!(response.status, "success");
        assert_eq!(response.not_found, vec!["B".to_string()]);
        assert_eq!(response.color_pic_ids, vec![11, 12]);
        assert_eq!(response.color_ids, vec![7]);
    }

    #[tokio::test]
    async fn test_error_status_with_message() {
        let app = Router::new().route(
            "/sync",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"status": "error", "massage": "invalid key"})),
                )
            }),
        );
        let url = serve(app).await;

        let err = CatalogClient::new(url, "wrong").unwrap().submit(&payload()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Server(ref m) if m == "invalid key"));
    }

    #[tokio::test]
    async fn test_error_status_without_message() {
        let app = Router::new().route(
            "/sync",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let url = serve(app).await;

        let err = CatalogClient::new(url, "k").unwrap().submit(&payload()).await.unwrap_err();
        match err {
            CatalogError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let app = Router::new().route("/sync", post(|| async { "<html>ok</html>" }));
        let url = serve(app).await;

        let err = CatalogClient::new(url, "k").unwrap().submit(&payload()).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let err = CatalogClient::new("http://127.0.0.1:1/sync", "k")
            .unwrap()
            .submit(&payload())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Request(_)));
    }
}
