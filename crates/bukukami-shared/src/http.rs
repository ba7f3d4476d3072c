//! Transport-neutral HTTP request/response model.
//!
//! Both the background worker and the foreground API client speak in these
//! types so that a request can travel from the client, through the worker's
//! caching policies, to the real network without either side depending on a
//! particular HTTP library.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::constants::{OFFLINE_HEADER, OFFLINE_MESSAGE};
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(TransportError::InvalidRequest(format!(
                "unsupported method: {other}"
            ))),
        }
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        data: Bytes,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Attach a JSON body and the matching content type.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, TransportError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let mut req = self.header("Content-Type", "application/json");
        req.body = Body::Bytes(Bytes::from(bytes));
        Ok(req)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    /// Key under which a response to this request is cached: method plus
    /// full URL, query string included.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::from(value.to_string()),
        }
    }

    /// The response served when neither the network nor a cache can answer.
    pub fn offline() -> Self {
        let mut resp = Self::json(503, &serde_json::json!({ "message": OFFLINE_MESSAGE }));
        resp.headers
            .push((OFFLINE_HEADER.to_string(), "1".to_string()));
        resp
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_synthesized_offline(&self) -> bool {
        self.header(OFFLINE_HEADER).is_some()
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can carry an [`HttpRequest`] to its destination.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_method_and_query() {
        let url = Url::parse("https://story-api.dicoding.dev/v1/stories?page=1&size=8").unwrap();
        let req = HttpRequest::get(url);
        assert_eq!(
            req.cache_key(),
            "GET https://story-api.dicoding.dev/v1/stories?page=1&size=8"
        );
    }

    #[test]
    fn offline_response_is_marked_503_json() {
        let resp = HttpResponse::offline();
        assert_eq!(resp.status, 503);
        assert!(resp.is_synthesized_offline());
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let body = resp.json_body().unwrap();
        assert_eq!(body["message"], OFFLINE_MESSAGE);
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn json_body_sets_content_type() {
        let url = Url::parse("https://example.com/x").unwrap();
        let req = HttpRequest::new(Method::Post, url)
            .json(&serde_json::json!({ "a": 1 }))
            .unwrap();
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
        assert_eq!(req.body, Body::Bytes(Bytes::from_static(b"{\"a\":1}")));
    }
}
