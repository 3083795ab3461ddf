// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::certs::{CertificateAuthority, TlsBundle};
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request the mock received
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

/// A mock HTTP service standing in for the API server.
///
/// Canned responses registered with `on_*` win. Anything else falls through
/// to an in-memory object store: POST to a collection stores the object under
/// `<collection>/<metadata.name>` (409 if present), GET returns it (404 if
/// absent) and PUT replaces it (404 if absent).
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    objects: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            objects: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Seed the object store with an existing object at its item path
    pub fn with_object(self, path: &str, object: serde_json::Value) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), object);
        self
    }

    /// Serve discovery for one API group exposing `resources` in every version
    pub fn with_api_group(
        self,
        group: &str,
        versions: &[&str],
        resources: &[(&str, &str)],
    ) -> Self {
        let mut mock = self.on_get("/apis", 200, &api_group_list_json(group, versions));
        for version in versions {
            let group_version = format!("{}/{}", group, version);
            mock = mock.on_get(
                &format!("/apis/{}", group_version),
                200,
                &api_resource_list_json(&group_version, resources),
            );
        }
        mock
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Object currently stored at an item path
    pub fn stored<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    fn canned_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }

    fn store_response(&self, method: &str, path: &str, body: &[u8]) -> (u16, String) {
        let mut objects = self.objects.lock().unwrap();
        match method {
            "GET" => match objects.get(path) {
                Some(obj) => (200, obj.to_string()),
                None => (404, not_found_json(path)),
            },
            "POST" => {
                let obj: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
                let name = obj["metadata"]["name"].as_str().unwrap_or_default();
                let key = format!("{}/{}", path, name);
                if objects.contains_key(&key) {
                    return (
                        409,
                        status_json(409, "AlreadyExists", &format!("{} already exists", key)),
                    );
                }
                objects.insert(key, obj.clone());
                (201, obj.to_string())
            }
            "PUT" => {
                if !objects.contains_key(path) {
                    return (404, not_found_json(path));
                }
                let obj: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
                objects.insert(path.to_string(), obj.clone());
                (200, obj.to_string())
            }
            _ => (405, status_json(405, "MethodNotAllowed", method)),
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let mock = self.clone();

        mock.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
        });

        Box::pin(async move {
            let body = req
                .into_body()
                .collect()
                .await
                .map_err(|e| tower::BoxError::from(e.to_string()))?
                .to_bytes();

            let (status, body) = match mock.canned_response(&method, &path) {
                Some(resp) => resp,
                None => mock.store_response(&method, &path, &body),
            };

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a Status response body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(path: &str) -> String {
    status_json(404, "NotFound", &format!("{} not found", path))
}

/// Discovery listing of a single API group
pub fn api_group_list_json(group: &str, versions: &[&str]) -> String {
    let versions: Vec<serde_json::Value> = versions
        .iter()
        .map(|v| serde_json::json!({ "groupVersion": format!("{}/{}", group, v), "version": v }))
        .collect();
    serde_json::json!({
        "kind": "APIGroupList",
        "apiVersion": "v1",
        "groups": [{
            "name": group,
            "versions": versions,
            "preferredVersion": versions.first().cloned(),
        }]
    })
    .to_string()
}

/// Discovery listing of the resources in one group version
pub fn api_resource_list_json(group_version: &str, resources: &[(&str, &str)]) -> String {
    let resources: Vec<serde_json::Value> = resources
        .iter()
        .map(|(plural, kind)| {
            serde_json::json!({
                "name": plural,
                "singularName": kind.to_lowercase(),
                "namespaced": false,
                "kind": kind,
                "verbs": ["create", "delete", "get", "list", "update", "watch"]
            })
        })
        .collect();
    serde_json::json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
    .to_string()
}

/// Output sink whose contents stay readable after the installer takes it
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Issues `ca:<dns name>` style bundles and remembers what was asked for
#[derive(Clone, Default)]
pub struct StaticAuthority {
    issued: Arc<Mutex<Vec<String>>>,
}

impl StaticAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }
}

impl CertificateAuthority for StaticAuthority {
    fn issue(&self, dns_names: &[String]) -> crate::error::Result<TlsBundle> {
        let primary = dns_names.first().cloned().unwrap_or_default();
        self.issued.lock().unwrap().push(primary.clone());
        Ok(TlsBundle {
            ca_cert: format!("ca:{}", primary).into_bytes(),
            public_cert: format!("cert:{}", primary).into_bytes(),
            private_key: format!("key:{}", primary).into_bytes(),
        })
    }
}
