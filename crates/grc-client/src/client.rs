use grc_core::AppConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;

use crate::error::{ClientError, ClientResult};
use crate::session_pool::SessionPool;
use crate::user::User;

/// Client for the application's REST API.
///
/// Relative URLs are joined onto the app URL the way a browser resolves
/// links, so `"api/people"` and `"/api/people"` both work against
/// `http://host/`.
#[derive(Debug)]
pub struct RestClient {
    app_url: Url,
    sessions: SessionPool,
    current_user: RwLock<User>,
}

impl RestClient {
    pub fn new(app_url: &str) -> ClientResult<Self> {
        let app_url = Url::parse(app_url).map_err(|e| ClientError::InvalidUrl {
            url: app_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            app_url,
            sessions: SessionPool::new(),
            current_user: RwLock::new(User::superuser()),
        })
    }

    pub fn from_config(config: &AppConfig) -> ClientResult<Self> {
        Self::new(&config.app_url)
    }

    pub fn app_url(&self) -> &Url {
        &self.app_url
    }

    pub fn current_user(&self) -> User {
        self.current_user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Later requests go out with `user`'s session.
    pub fn set_current_user(&self, user: User) {
        *self
            .current_user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = user;
    }

    pub fn resolve(&self, url: &str) -> ClientResult<Url> {
        self.app_url.join(url).map_err(|e| ClientError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn send_get(&self, url: &str) -> ClientResult<Response> {
        let url = self.resolve(url)?;
        tracing::debug!(%url, "GET");
        Ok(self.user_session()?.get(url).send().await?)
    }

    pub async fn send_post<B: Serialize + ?Sized>(&self, url: &str, json_body: &B) -> ClientResult<Response> {
        let url = self.resolve(url)?;
        tracing::debug!(%url, "POST");
        Ok(self.user_session()?.post(url).json(json_body).send().await?)
    }

    pub async fn send_put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        json_body: &B,
        headers: &[(&str, &str)],
    ) -> ClientResult<Response> {
        let url = self.resolve(url)?;
        tracing::debug!(%url, "PUT");
        Ok(self
            .user_session()?
            .put(url)
            .headers(Self::extra_headers(headers)?)
            .json(json_body)
            .send()
            .await?)
    }

    /// Decodes a JSON body, turning non-success statuses into errors.
    pub async fn json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "Request failed");
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    fn user_session(&self) -> ClientResult<reqwest::Client> {
        self.sessions.get_session(&self.current_user())
    }

    fn extra_headers(headers: &[(&str, &str)]) -> ClientResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    /// Compares the whole header value; the JSON identity contains commas.
    fn identity(expected: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
        move |request: &Request| {
            request
                .headers
                .get("X-ggrc-user")
                .and_then(|value| value.to_str().ok())
                == Some(expected)
        }
    }

    #[test]
    fn test_resolve_joins_like_a_browser() {
        let client = RestClient::from_config(&AppConfig::default()).unwrap();
        assert_eq!(client.app_url().as_str(), "http://localhost:8080/");
        assert_eq!(
            client.resolve("api/people").unwrap().as_str(),
            "http://localhost:8080/api/people"
        );
        assert_eq!(
            client.resolve("/dashboard").unwrap().as_str(),
            "http://localhost:8080/dashboard"
        );
        assert_eq!(
            client.resolve("http://other:9000/x").unwrap().as_str(),
            "http://other:9000/x"
        );
    }

    #[test]
    fn test_invalid_app_url() {
        assert!(matches!(
            RestClient::new("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_sends_identity_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/people"))
            .and(header("X-Requested-By", "GGRC"))
            .and(identity(r#"{"email":"user@example.com","name":"Example User"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"people": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri()).unwrap();
        let response = client.send_get("api/people").await.unwrap();
        let body: serde_json::Value = RestClient::json(response).await.unwrap();
        assert_eq!(body, json!({"people": []}));
    }

    #[tokio::test]
    async fn test_switching_user_changes_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/labels"))
            .and(identity(r#"{"email":"ann@example.com","name":"Ann"}"#))
            .and(body_json(json!([{"label": {"title": "Urgent"}}])))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([[201, {"label": {"id": 1}}]])))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri()).unwrap();
        client.set_current_user(User::new("ann@example.com", "Ann"));
        assert_eq!(client.current_user().email, "ann@example.com");

        let response = client
            .send_post("/api/labels", &json!([{"label": {"title": "Urgent"}}]))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    #[tokio::test]
    async fn test_put_with_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/labels/1"))
            .and(header("If-Match", "etag-1"))
            .and(header("X-Requested-By", "GGRC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"label": {"id": 1}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri()).unwrap();
        let response = client
            .send_put("api/labels/1", &json!({"label": {"title": "Blocked"}}), &[("If-Match", "etag-1")])
            .await
            .unwrap();
        let body: serde_json::Value = RestClient::json(response).await.unwrap();
        assert_eq!(body["label"]["id"], 1);
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri()).unwrap();
        let response = client.send_get("api/missing").await.unwrap();
        let err = RestClient::json::<serde_json::Value>(response).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
        assert!(err.to_string().contains("Not Found"));
    }
}
