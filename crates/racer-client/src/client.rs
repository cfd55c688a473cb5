use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use racer_config::{EndpointsConfig, RacerConfig};
use racer_core::{
    Credentials, FireRequest, FireResponse, NetworkPath, ReserveEndpoint, SnapshotData,
};
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use tracing::{debug, info};

use crate::agent::{FORM_CONTENT_TYPE, REFERER_URL, user_agent};
use crate::audit::{AuditRecord, AuditSink};
use crate::decode::{decode_fire_reply, decode_snapshot};

/// Client for the park reservation API.
///
/// Holds one HTTP client per network path. The fallback client routes every
/// request through the configured proxy; the direct client ignores proxy
/// environment variables.
#[derive(Debug)]
pub struct BwsClient {
    direct: reqwest::Client,
    fallback: Option<reqwest::Client>,
    credentials: Credentials,
    endpoints: EndpointsConfig,
    reserve_dates: Vec<String>,
    audit: Option<AuditSink>,
}

impl BwsClient {
    pub fn new(config: &RacerConfig, credentials: Credentials) -> Result<Self> {
        let timeout = Duration::from_millis(config.racing.request_timeout_ms);
        let agent = user_agent(&config.buvid);

        let direct = reqwest::Client::builder()
            .user_agent(agent.clone())
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to build direct HTTP client")?;

        let fallback = match config.fallback_proxy() {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url)
                    .with_context(|| format!("Invalid proxy URL: {proxy_url}"))?;
                let client = reqwest::Client::builder()
                    .user_agent(agent)
                    .timeout(timeout)
                    .proxy(proxy)
                    .build()
                    .context("Failed to build fallback HTTP client")?;
                info!(proxy = %proxy_url, "fallback path configured");
                Some(client)
            }
            None => None,
        };

        Ok(Self {
            direct,
            fallback,
            credentials,
            endpoints: config.endpoints.clone(),
            reserve_dates: config.reserve_dates.clone(),
            audit: None,
        })
    }

    /// Record every firing reply into `sink`.
    pub fn with_audit(mut self, sink: AuditSink) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn snapshot_url(&self) -> String {
        let separator = if self.endpoints.info_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}csrf={}&reserve_date={}",
            self.endpoints.info_url,
            separator,
            self.credentials.csrf(),
            self.reserve_dates.join(",")
        )
    }

    /// Fetch the reservation snapshot over the direct path.
    pub async fn fetch_snapshot(&self) -> Result<SnapshotData> {
        let response = self
            .direct
            .get(self.snapshot_url())
            .header(COOKIE, self.credentials.cookie())
            .send()
            .await
            .context("Snapshot request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read snapshot response body")?;
        debug!(status = status.as_u16(), bytes = body.len(), "snapshot received");
        decode_snapshot(&body).with_context(|| format!("Snapshot unusable (HTTP {status})"))
    }

    fn reserve_body(&self, request: &FireRequest) -> String {
        format!(
            "csrf={}&inter_reserve_id={}&ticket_no={}",
            self.credentials.csrf(),
            request.slot_id,
            request.ticket_id
        )
    }

    fn client_for(&self, path: NetworkPath) -> &reqwest::Client {
        match (path, &self.fallback) {
            (NetworkPath::Fallback, Some(fallback)) => fallback,
            _ => &self.direct,
        }
    }
}

#[async_trait]
impl ReserveEndpoint for BwsClient {
    fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    async fn fire(&self, request: &FireRequest, path: NetworkPath) -> Result<FireResponse> {
        let response = self
            .client_for(path)
            .post(&self.endpoints.reserve_url)
            .header(COOKIE, self.credentials.cookie())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(REFERER, REFERER_URL)
            .body(self.reserve_body(request))
            .send()
            .await
            .with_context(|| format!("Reservation request failed over {path} path"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read reservation response body")?;

        if let Some(audit) = &self.audit {
            audit.record(AuditRecord::new(request, path, status.as_u16(), &body));
        }
        let reply = decode_fire_reply(status, &body);
        debug!(
            slot = request.slot_id,
            path = %path,
            status = status.as_u16(),
            code = reply.code,
            "reservation reply"
        );
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
