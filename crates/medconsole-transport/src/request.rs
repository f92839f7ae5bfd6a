//! Per-call request options.
//!
//! An API call is described by a [`RequestOptions`] value: method, caller
//! headers, body, and query parameters. Header names and values are checked
//! when they are added, so a built value is always sendable.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::TransportError;

/// What to send as the request body.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as `application/json`.
    Json(Value),
    /// Sent as `multipart/form-data`; the client computes the boundary and
    /// its own content type.
    Form(Form),
}

impl RequestBody {
    pub fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }
}

/// Paging and search parameters for list endpoints, forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs
    }
}

/// Everything the transport needs to issue one call.
#[derive(Debug)]
pub struct RequestOptions {
    pub(crate) method: Method,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
    pub(crate) query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            query: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    /// [`TransportError::Encode`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, TransportError> {
        self.body = RequestBody::Json(serde_json::to_value(body).map_err(TransportError::Encode)?);
        Ok(self)
    }

    /// Sets a multipart body.
    pub fn form(mut self, form: Form) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Adds a caller header. Caller headers override the default content
    /// type but not the credential headers.
    ///
    /// # Errors
    /// [`TransportError::InvalidHeader`] for an invalid name or value.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn list(mut self, list: &ListQuery) -> Self {
        self.query.extend(list.to_pairs());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}
