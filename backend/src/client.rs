//! REST API client used by front ends and the grid layer.
//!
//! Every call returns an [`Outcome`]: the server's envelope when it sent
//! one, or a failure describing the transport problem.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};

use crate::grid::GridDataSource;
use crate::models::{
    Department, MedicalDevice, MedicalStaff, Medication, Partner, Patient, UserInfo,
};
use crate::outcome::Outcome;
use crate::paging::{GroupedResult, PagedQuery, PagedResult};
use crate::services::auth::{LoginRequest, LoginResponse};

/// Client for one ValyanMed server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Log in and keep the issued token for later calls.
    pub async fn login(&self, username: &str, password: &str) -> Outcome<LoginResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let outcome: Outcome<LoginResponse> =
            self.send(Method::POST, "/api/auth/login", Some(&request)).await;
        if let Some(response) = &outcome.value {
            self.set_token(Some(response.token.clone()));
        }
        outcome
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    pub async fn me(&self) -> Outcome<UserInfo> {
        self.get("/api/auth/me").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Outcome<T> {
        execute(self.request(Method::GET, path)).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Outcome<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        execute(self.request(Method::GET, path).query(query)).await
    }

    pub async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Outcome<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        execute(builder).await
    }

    /// Typed access to one resource collection, e.g. `"patients"`.
    pub fn resource<T>(&self, name: &str) -> Resource<T> {
        Resource {
            client: self.clone(),
            path: format!("/api/{}", name.trim_matches('/')),
            _marker: PhantomData,
        }
    }

    pub fn patients(&self) -> Resource<Patient> {
        self.resource("patients")
    }

    pub fn medical_staff(&self) -> Resource<MedicalStaff> {
        self.resource("medical-staff")
    }

    pub fn medical_devices(&self) -> Resource<MedicalDevice> {
        self.resource("medical-devices")
    }

    pub fn medications(&self) -> Resource<Medication> {
        self.resource("medications")
    }

    pub fn partners(&self) -> Resource<Partner> {
        self.resource("partners")
    }

    pub fn departments(&self) -> Resource<Department> {
        self.resource("departments")
    }

    pub fn users(&self) -> Resource<UserInfo> {
        self.resource("users")
    }
}

async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Outcome<T> {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("API request failed: {}", e);
            return Outcome::failure_message(format!("Request failed: {}", e));
        }
    };

    let status = response.status();
    match response.json::<Outcome<T>>().await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("Unreadable API response ({}): {}", status, e);
            Outcome::failure_message(format!("Unexpected response from server ({})", status))
        }
    }
}

/// CRUD and listing calls for one entity.
#[derive(Debug, Clone)]
pub struct Resource<T> {
    client: ApiClient,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Resource<T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn list(&self, include_inactive: bool) -> Outcome<Vec<T>> {
        self.client
            .get_query(&self.path, &[("includeInactive", include_inactive)])
            .await
    }

    pub async fn get(&self, id: i64) -> Outcome<T> {
        self.client.get(&format!("{}/{}", self.path, id)).await
    }

    pub async fn get_paged(&self, query: &PagedQuery) -> Outcome<PagedResult<T>> {
        self.client
            .get_query(&format!("{}/paged", self.path), &query.normalized())
            .await
    }

    pub async fn get_grouped(&self, query: &PagedQuery) -> Outcome<GroupedResult<T>> {
        self.client
            .get_query(&format!("{}/grouped", self.path), &query.normalized())
            .await
    }

    pub async fn create<I: Serialize + ?Sized>(&self, input: &I) -> Outcome<T> {
        self.client.send(Method::POST, &self.path, Some(input)).await
    }

    pub async fn update<I: Serialize + ?Sized>(&self, id: i64, input: &I) -> Outcome<T> {
        self.client
            .send(Method::PUT, &format!("{}/{}", self.path, id), Some(input))
            .await
    }

    /// Soft delete.
    pub async fn delete(&self, id: i64) -> Outcome<()> {
        self.client
            .send::<(), ()>(Method::DELETE, &format!("{}/{}", self.path, id), None)
            .await
    }
}

#[async_trait]
impl<T> GridDataSource for Resource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch_page(&self, query: &PagedQuery) -> Outcome<PagedResult<T>> {
        self.get_paged(query).await
    }

    async fn fetch_groups(&self, query: &PagedQuery) -> Outcome<GroupedResult<T>> {
        self.get_grouped(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_paths() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.patients().path(), "/api/patients");
        assert_eq!(client.resource::<Partner>("/partners/").path(), "/api/partners");
    }

    #[test]
    fn test_token_handling() {
        let client = ApiClient::new("http://localhost:8080");
        assert!(!client.is_authenticated());
        client.set_token(Some("abc".to_string()));
        let copy = client.clone();
        assert_eq!(copy.token().as_deref(), Some("abc"));
        copy.logout();
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_failure_outcome() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let outcome = client.patients().list(false).await;
        assert!(!outcome.is_success);
        assert!(outcome.first_error().unwrap().starts_with("Request failed"));
    }
}
