//! The authorized HTTP transport: the one path every API call takes.
//!
//! For each call it:
//!   1. Merges caller headers over a default `application/json` content type
//!      (skipped for multipart bodies)
//!   2. Injects `Authorization: Bearer <token>` and the legacy `accessToken`
//!      header when a session token is stored
//!   3. Sends the request and classifies the response:
//!      401 → clear session, redirect to login, `Unauthorized`;
//!      other non-2xx → `Http { status, message }`;
//!      2xx → parsed body (an empty body parses as JSON `null`)

use std::fmt;
use std::sync::Arc;

use medconsole_session::SessionManager;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::navigator::{LOGIN_ROUTE, Navigator};
use crate::request::{ListQuery, RequestBody, RequestOptions};
use crate::TransportError;

/// Legacy credential header some admin endpoints still read.
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("accesstoken");

/// Issues authorized requests against the API.
///
/// Cheap to clone; clones share the HTTP connection pool, the session, and
/// the navigator.
#[derive(Clone)]
pub struct AuthorizedTransport {
    base_url: Url,
    http: reqwest::Client,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for AuthorizedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthorizedTransport {
    /// Creates a transport for the API at `base_url`.
    ///
    /// # Errors
    /// [`TransportError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        session: SessionManager,
        navigator: impl Navigator,
    ) -> Result<Self, TransportError> {
        Self::with_client(base_url, reqwest::Client::new(), session, Arc::new(navigator))
    }

    /// Creates a transport around an existing `reqwest` client.
    pub fn with_client(
        base_url: &str,
        http: reqwest::Client,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http,
            session,
            navigator,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// Joins `path` onto the base URL by concatenation, so a base URL with
    /// a path prefix (`https://host/api`) keeps it.
    pub fn url(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Ok(Url::parse(&url)?)
    }

    /// Sends one request and classifies the response.
    ///
    /// # Errors
    /// - [`TransportError::Unauthorized`] on 401, after the session was
    ///   cleared and the login redirect issued
    /// - [`TransportError::Http`] on any other non-success status
    /// - [`TransportError::Network`] if no response arrived
    /// - [`TransportError::Decode`] if a success body does not fit `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, TransportError> {
        let url = self.url(path)?;
        let RequestOptions {
            method,
            headers,
            body,
            query,
        } = options;
        let headers = self.build_headers(headers, body.is_form())?;

        tracing::debug!(%method, %url, "sending API request");

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                builder.body(serde_json::to_vec(&value).map_err(TransportError::Encode)?)
            }
            RequestBody::Form(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!(%method, %url, error = %e, "API request failed");
            TransportError::Network(e)
        })?;

        self.classify(response).await
    }

    // -- Verbs --------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request(path, RequestOptions::get()).await
    }

    /// GET with paging/search parameters passed straight through.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        list: &ListQuery,
    ) -> Result<T, TransportError> {
        self.request(path, RequestOptions::get().list(list)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::post().json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::put().json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, RequestOptions::patch().json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request(path, RequestOptions::delete()).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, TransportError> {
        self.request(path, RequestOptions::post().form(form)).await
    }

    pub async fn put_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, TransportError> {
        self.request(path, RequestOptions::put().form(form)).await
    }

    pub async fn patch_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, TransportError> {
        self.request(path, RequestOptions::patch().form(form)).await
    }

    // -- Internal helpers ---------------------------------------------------

    fn build_headers(
        &self,
        caller: HeaderMap,
        is_form: bool,
    ) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        if !is_form {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for name in caller.keys() {
            headers.remove(name);
        }
        for (name, value) in &caller {
            headers.append(name.clone(), value.clone());
        }
        // The multipart encoder owns the content type.
        if is_form {
            headers.remove(CONTENT_TYPE);
        }

        if let Some(token) = self.session.current_token() {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidHeader(format!("authorization: {e}")))?;
            bearer.set_sensitive(true);
            let mut raw = HeaderValue::from_str(&token)
                .map_err(|e| TransportError::InvalidHeader(format!("accessToken: {e}")))?;
            raw.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
            headers.insert(ACCESS_TOKEN_HEADER, raw);
        }
        Ok(headers)
    }

    async fn classify<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let url = response.url().clone();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%url, "API rejected credentials, ending session");
            if let Err(e) = self.session.clear_session() {
                tracing::warn!(error = %e, "failed to clear session after 401");
            }
            self.navigator.navigate(LOGIN_ROUTE);
            return Err(TransportError::Unauthorized);
        }

        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&body, status.as_u16());
            tracing::warn!(%url, status = status.as_u16(), %message, "API error");
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }

        parse_body(&body)
    }
}

/// Parses a success body; an empty body is treated as JSON `null`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(TransportError::Decode);
    }
    serde_json::from_slice(body).map_err(TransportError::Decode)
}

/// Pulls `message` out of an error body (a string, or an array of strings
/// as validation layers emit), falling back to `HTTP <status>`.
pub(crate) fn error_message(body: &[u8], status: u16) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| match value.get("message") {
            Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}
