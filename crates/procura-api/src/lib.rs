// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use procura_app::{
    AccountStatus, OfferId, OfferRecord, OfferStatus, PortalCounts, Role, SessionContext, UserId,
    UserRecord, VerificationId, VerificationRecord, VerificationStatus,
};

/// Blocking client for the portal REST API. Holds no session state; the
/// caller passes the bearer token from its `SessionContext` per request.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url)
            .map_err(|error| anyhow!("api.base_url {base_url:?} is not a valid URL: {error}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn login(&self, email: &str, password: &str) -> Result<SessionContext> {
        let request = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }));
        let data: LoginData = self.request_data(request, "login")?;
        session_from_login(data)
    }

    pub fn fetch_users(&self, token: &str) -> Result<Vec<UserRecord>> {
        let request = self
            .http
            .get(format!("{}/users", self.base_url))
            .bearer_auth(token);
        let rows: Vec<UserRow> = self.request_data(request, "users")?;
        rows.into_iter().map(user_from_row).collect()
    }

    pub fn fetch_offers(&self, token: &str) -> Result<Vec<OfferRecord>> {
        let request = self
            .http
            .get(format!("{}/offers", self.base_url))
            .bearer_auth(token);
        let rows: Vec<OfferRow> = self.request_data(request, "offers")?;
        rows.into_iter().map(offer_from_row).collect()
    }

    pub fn fetch_verifications(&self, token: &str) -> Result<Vec<VerificationRecord>> {
        let request = self
            .http
            .get(format!("{}/verifications", self.base_url))
            .bearer_auth(token);
        let rows: Vec<VerificationRow> = self.request_data(request, "verifications")?;
        rows.into_iter().map(verification_from_row).collect()
    }

    pub fn fetch_counts(&self, token: &str) -> Result<PortalCounts> {
        let request = self
            .http
            .get(format!("{}/dashboard/summary", self.base_url))
            .bearer_auth(token);
        let data: SummaryData = self.request_data(request, "dashboard summary")?;
        Ok(PortalCounts {
            users: data.users.max(0) as usize,
            offers_pending: data.offers_pending.max(0) as usize,
            verifications_pending: data.verifications_pending.max(0) as usize,
        })
    }

    pub fn set_user_status(&self, token: &str, id: UserId, status: AccountStatus) -> Result<()> {
        let request = self
            .http
            .patch(format!("{}/users/{}/status", self.base_url, id.get()))
            .bearer_auth(token)
            .json(&serde_json::json!({ "status": status.as_str() }));
        self.request_ack(request, "user status")
    }

    pub fn delete_user(&self, token: &str, id: UserId) -> Result<()> {
        let request = self
            .http
            .delete(format!("{}/users/{}", self.base_url, id.get()))
            .bearer_auth(token);
        self.request_ack(request, "user delete")
    }

    pub fn decide_offer(&self, token: &str, id: OfferId, decision: OfferStatus) -> Result<()> {
        if decision == OfferStatus::Pending {
            bail!("offer decision must be accepted or declined");
        }
        let request = self
            .http
            .post(format!("{}/offers/{}/decision", self.base_url, id.get()))
            .bearer_auth(token)
            .json(&serde_json::json!({ "decision": decision.as_str() }));
        self.request_ack(request, "offer decision")
    }

    pub fn decide_verification(
        &self,
        token: &str,
        id: VerificationId,
        decision: VerificationStatus,
    ) -> Result<()> {
        if decision == VerificationStatus::Pending {
            bail!("verification decision must be verified or rejected");
        }
        let request = self
            .http
            .post(format!(
                "{}/verifications/{}/decision",
                self.base_url,
                id.get()
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({ "decision": decision.as_str() }));
        self.request_ack(request, "verification decision")
    }

    fn request_data<T: DeserializeOwned>(
        &self,
        request: reqwest::blocking::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let (status, body) = self.send(request)?;
        let envelope = decode_envelope::<T>(status, &body, what)?;
        envelope
            .data
            .ok_or_else(|| anyhow!("{what} response carried no data"))
    }

    fn request_ack(&self, request: reqwest::blocking::RequestBuilder, what: &str) -> Result<()> {
        let (status, body) = self.send(request)?;
        decode_envelope::<serde_json::Value>(status, &body, what)?;
        Ok(())
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Ok((status, body))
    }
}

/// Decodes the portal envelope. A logical failure (`status: false` on a 2xx
/// response) becomes an error whose message is exactly the server-provided
/// text, so the UI can show it verbatim.
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    what: &str,
) -> Result<ApiEnvelope<T>> {
    if !status.is_success() {
        return Err(clean_error_response(status, body));
    }

    let envelope: ApiEnvelope<T> =
        serde_json::from_str(body).with_context(|| format!("decode {what} response"))?;
    if !envelope.status {
        return Err(anyhow!(
            "{}",
            failure_text(envelope.error.as_ref(), envelope.message.as_deref())
        ));
    }
    Ok(envelope)
}

/// Server text for a logical failure: `error` wins (arrays joined with
/// ", "), then `message`, then a generic fallback.
fn failure_text(error: Option<&ErrorText>, message: Option<&str>) -> String {
    if let Some(error) = error {
        let joined = error.joined();
        if !joined.is_empty() {
            return joined;
        }
    }
    if let Some(message) = message
        && !message.is_empty()
    {
        return message.to_owned();
    }
    "request failed".to_owned()
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!("cannot reach {} ({})", base_url, error)
}

/// Non-2xx responses: the body is not trusted for data, but server-provided
/// error text is still worth showing when it parses.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body) {
        let text = failure_text(envelope.error.as_ref(), envelope.message.as_deref());
        if text != "request failed" {
            return anyhow!("server error ({}): {}", status.as_u16(), text);
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: bool,
    data: Option<T>,
    message: Option<String>,
    error: Option<ErrorText>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorText {
    Single(String),
    Many(Vec<String>),
}

impl ErrorText {
    fn joined(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Many(parts) => parts.join(", "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    name: String,
    email: String,
    role: String,
    company: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    status: String,
    company: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct OfferRow {
    id: i64,
    tender: String,
    company: String,
    price: Option<String>,
    status: String,
    submitted_at: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct VerificationRow {
    id: i64,
    company: String,
    email: Option<String>,
    status: String,
    submitted_at: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    users: i64,
    offers_pending: i64,
    verifications_pending: i64,
}

fn session_from_login(data: LoginData) -> Result<SessionContext> {
    if data.token.is_empty() {
        bail!("login response carried an empty token");
    }
    let role = Role::parse(&data.role)
        .ok_or_else(|| anyhow!("login response carried unknown role {:?}", data.role))?;
    Ok(SessionContext {
        token: data.token,
        name: data.name,
        email: data.email,
        role,
        company: data.company,
    })
}

// Unknown discriminants are decode errors naming the value, never a silent
// fallback to some default state.
fn user_from_row(row: UserRow) -> Result<UserRecord> {
    let role = Role::parse(&row.role)
        .ok_or_else(|| anyhow!("user {}: unknown role {:?}", row.id, row.role))?;
    let status = AccountStatus::parse(&row.status)
        .ok_or_else(|| anyhow!("user {}: unknown status {:?}", row.id, row.status))?;
    Ok(UserRecord {
        id: UserId::new(row.id),
        name: row.name,
        email: row.email,
        role,
        status,
        company: row.company,
        deleted: row.deleted,
    })
}

fn offer_from_row(row: OfferRow) -> Result<OfferRecord> {
    let status = OfferStatus::parse(&row.status)
        .ok_or_else(|| anyhow!("offer {}: unknown status {:?}", row.id, row.status))?;
    Ok(OfferRecord {
        id: OfferId::new(row.id),
        tender: row.tender,
        company: row.company,
        price: row.price,
        status,
        submitted_at: row.submitted_at,
        deleted: row.deleted,
    })
}

fn verification_from_row(row: VerificationRow) -> Result<VerificationRecord> {
    let status = VerificationStatus::parse(&row.status)
        .ok_or_else(|| anyhow!("verification {}: unknown status {:?}", row.id, row.status))?;
    Ok(VerificationRecord {
        id: VerificationId::new(row.id),
        company: row.company,
        email: row.email,
        status,
        submitted_at: row.submitted_at,
        deleted: row.deleted,
    })
}
