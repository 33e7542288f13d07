// ==============================================================================
// upstream.rs - Downstream Request Forwarding
// ==============================================================================
// Description: Outbound request value and HTTP dispatch to services
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
//
// The router builds an OutboundRequest from the inbound one (new value, the
// inbound request is consumed); the UpstreamClient sends it and relays the
// service's status, headers and body back unchanged. Redirects are passed
// through to the caller, never followed.
//
// ==============================================================================

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, HeaderMap, HeaderName, Method},
    response::Response,
};
use tracing::debug;

use crate::error::GatewayError;
use crate::middleware::{apply_identity_headers, strip_identity_headers};
use crate::models::Identity;
use crate::routing::Service;

/// Connection-scoped headers that must not cross the gateway
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Copy of `headers` without hop-by-hop headers, including any named in
/// `Connection`
fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_hop_by_hop(name) && !connection_listed.contains(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Request as it will be dispatched to a downstream service
#[derive(Debug)]
pub struct OutboundRequest {
    pub service: Service,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    /// Retarget the inbound request at `{base_url}{path}[?query]`
    ///
    /// Method and end-to-end headers carry over. `Host` is dropped so the
    /// client sets it for the new target, and identity headers are dropped on
    /// every route; only `with_identity` may add them back.
    pub fn from_parts(service: Service, base_url: &str, parts: &Parts) -> Self {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut headers = end_to_end_headers(&parts.headers);
        headers.remove(header::HOST);
        strip_identity_headers(&mut headers);

        Self {
            service,
            method: parts.method.clone(),
            url: format!("{}{}", base_url, path_and_query),
            headers,
            body: Bytes::new(),
        }
    }

    pub fn with_identity(mut self, identity: &Identity) -> Result<Self, GatewayError> {
        apply_identity_headers(&mut self.headers, identity)?;
        Ok(self)
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }
}

/// HTTP client for forwarding requests to downstream services
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        // Configure connection pooling and keep-alive
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client })
    }

    /// Send the request and relay the service's reply
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<Response, GatewayError> {
        let OutboundRequest {
            service,
            method,
            url,
            headers,
            body,
        } = request;

        debug!(service = %service, method = %method, url = %url, "Dispatching request");

        let mut outbound = self.client.request(method, &url).headers(headers);
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| GatewayError::Dispatch {
                service,
                reason: e.to_string(),
            })?;

        let status = response.status();
        let headers = end_to_end_headers(response.headers());
        let body = response.bytes().await.map_err(|e| GatewayError::Dispatch {
            service,
            reason: format!("failed to read response body: {}", e),
        })?;

        let mut relayed = Response::new(Body::from(body));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;

        Ok(relayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request, StatusCode};
    use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parts_of(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_from_parts_retargets_and_drops_connection_headers() {
        let parts = parts_of(
            Request::builder()
                .method("PATCH")
                .uri("/room/42/settings?verbose=true")
                .header("host", "gateway.example.com")
                .header("connection", "keep-alive, x-hop")
                .header("x-hop", "1")
                .header("keep-alive", "timeout=5")
                .header("authorization", "Bearer abc")
                .header("content-type", "application/json")
                .header("x-user-id", "999")
                .header("x-role", "USER")
                .body(())
                .unwrap(),
        );

        let outbound = OutboundRequest::from_parts(Service::Room, "http://room:8082", &parts);

        assert_eq!(outbound.service, Service::Room);
        assert_eq!(outbound.method, Method::PATCH);
        assert_eq!(outbound.url, "http://room:8082/room/42/settings?verbose=true");
        assert!(outbound.headers.get(header::HOST).is_none());
        assert!(outbound.headers.get(header::CONNECTION).is_none());
        assert!(outbound.headers.get("keep-alive").is_none());
        assert!(outbound.headers.get("x-hop").is_none());
        assert_eq!(outbound.headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(outbound.headers[header::CONTENT_TYPE], "application/json");
        assert!(outbound.headers.get("x-user-id").is_none());
        assert!(outbound.headers.get("x-role").is_none());
        assert!(outbound.body.is_empty());
    }

    #[test]
    fn test_with_identity_overrides_spoofed_headers() {
        let parts = parts_of(
            Request::builder()
                .uri("/vote/1")
                .header("x-user-id", "999")
                .body(())
                .unwrap(),
        );

        let outbound = OutboundRequest::from_parts(Service::Vote, "http://vote", &parts)
            .with_identity(&Identity::User { user_id: 1 })
            .unwrap();

        assert_eq!(outbound.headers["x-user-id"], "1");
        assert_eq!(outbound.headers["x-role"], "USER");
    }

    #[tokio::test]
    async fn test_dispatch_forwards_and_relays() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vote/10/ballots"))
            .and(query_param("draft", "false"))
            .and(header_eq("x-role", "USER"))
            .and(body_string(r#"{"choice":"yes"}"#))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-ballot-id", "b-1")
                    .set_body_string("created"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-role", HeaderValue::from_static("USER"));
        let request = OutboundRequest {
            service: Service::Vote,
            method: Method::POST,
            url: format!("{}/vote/10/ballots?draft=false", server.uri()),
            headers,
            body: Bytes::from_static(br#"{"choice":"yes"}"#),
        };

        let client = UpstreamClient::new(Duration::from_secs(5)).unwrap();
        let response = client.dispatch(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-ballot-id"], "b-1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "created");
    }

    #[tokio::test]
    async fn test_dispatch_does_not_follow_redirects() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/user/new"))
            .mount(&server)
            .await;

        let request = OutboundRequest {
            service: Service::User,
            method: Method::GET,
            url: format!("{}/user/old", server.uri()),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };

        let client = UpstreamClient::new(Duration::from_secs(5)).unwrap();
        let response = client.dispatch(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/user/new");
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = OutboundRequest {
            service: Service::Room,
            method: Method::GET,
            url: format!("http://{}/room/1", addr),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };

        let client = UpstreamClient::new(Duration::from_secs(5)).unwrap();
        let err = client.dispatch(request).await.unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Dispatch {
                service: Service::Room,
                ..
            }
        ));
    }
}
