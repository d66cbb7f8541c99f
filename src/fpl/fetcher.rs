//! HTTP client for FPL snapshots

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use super::retry::{self, RetryPolicy};
use super::types::{Bootstrap, EntryInfo, Fixture, LiveData, Picks};
use super::{DataSource, Snapshot, SnapshotSource, format};
use crate::config::FplConfig;
use crate::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Fetches FPL data from the mirror or the official API
#[derive(Clone)]
pub struct FplClient {
    http: reqwest::Client,
    source: DataSource,
    mirror_url: String,
    api_url: String,
    retry: RetryPolicy,
}

impl FplClient {
    /// Create a client for the given source and base URLs
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        source: DataSource,
        mirror_url: impl Into<String>,
        api_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            source,
            mirror_url: mirror_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &FplConfig) -> Result<Self> {
        Self::new(
            config.source,
            &config.mirror_url,
            &config.api_url,
            config.retry.clone(),
        )
    }

    /// GET with retry on 403; returns the final response whatever its status
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?;

            let status = response.status();
            if !retry::is_retryable(status.as_u16()) || attempt >= max_attempts {
                return Ok(response);
            }

            let delay = retry::delay_for_attempt(&self.retry, attempt);
            tracing::warn!(
                url,
                status = status.as_u16(),
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "FPL request forbidden, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{status} for url {url}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("invalid response from {url}: {e}")))
    }

    /// GET an entry endpoint, mapping 404 to `TeamNotFound`
    async fn get_entry_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::TeamNotFound),
            status if !status.is_success() => Err(Error::Fetch(format!("{status} for url {url}"))),
            _ => response
                .json()
                .await
                .map_err(|e| Error::Fetch(format!("invalid response from {url}: {e}"))),
        }
    }

    async fn fetch_mirror(&self) -> Result<(Bootstrap, Vec<Fixture>, LiveData, Vec<Fixture>)> {
        let base = &self.mirror_url;
        let bootstrap: Bootstrap = self.get_json(&format!("{base}/bootstrap-static.json")).await?;
        let fixtures: Vec<Fixture> = self.get_json(&format!("{base}/fixtures.json")).await?;
        let live: LiveData = self.get_json(&format!("{base}/live.json")).await?;
        let current: Vec<Fixture> = self.get_json(&format!("{base}/fixtures-current.json")).await?;
        Ok((bootstrap, fixtures, live, current))
    }

    async fn fetch_official(&self) -> Result<(Bootstrap, Vec<Fixture>, LiveData, Vec<Fixture>)> {
        let base = &self.api_url;
        let bootstrap: Bootstrap = self.get_json(&format!("{base}/bootstrap-static/")).await?;
        let fixtures: Vec<Fixture> = self.get_json(&format!("{base}/fixtures/")).await?;

        let (live, current) = match format::current_gameweek(&bootstrap) {
            Some(gw) => (
                self.get_json(&format!("{base}/event/{gw}/live/")).await?,
                self.get_json(&format!("{base}/fixtures/?event={gw}")).await?,
            ),
            None => {
                tracing::debug!("no current gameweek, skipping live data");
                (LiveData::default(), Vec::new())
            }
        };

        Ok((bootstrap, fixtures, live, current))
    }

    /// Render the squad for an FPL entry
    ///
    /// # Errors
    ///
    /// Returns `TeamNotFound` if the entry does not exist
    pub async fn fetch_squad(&self, bootstrap: &Bootstrap, user_id: &str) -> Result<String> {
        let gw = format::current_gameweek(bootstrap).ok_or_else(|| {
            Error::Fetch("could not determine the current or next gameweek".to_string())
        })?;

        let base = &self.api_url;
        let picks: Picks = self
            .get_entry_json(&format!("{base}/entry/{user_id}/event/{gw}/picks/"))
            .await?;
        let entry: EntryInfo = self.get_entry_json(&format!("{base}/entry/{user_id}/")).await?;

        Ok(format::squad(bootstrap, &picks, &entry))
    }
}

#[async_trait]
impl SnapshotSource for FplClient {
    async fn fetch(&self, user_id: Option<&str>) -> Result<Snapshot> {
        let (bootstrap, fixtures, live, current) = match self.source {
            DataSource::Mirror => self.fetch_mirror().await?,
            DataSource::Official => self.fetch_official().await?,
        };

        let squad = match user_id {
            Some(id) => Some(self.fetch_squad(&bootstrap, id).await?),
            None => None,
        };

        let snapshot = Snapshot {
            players: format::players(&bootstrap, &live),
            fixtures: format::fixtures(&bootstrap, &fixtures),
            fixtures_current: format::current_fixtures(&bootstrap, &current),
            current_gameweek: format::current_gameweek(&bootstrap),
            fetched_at: chrono::Local::now(),
            squad,
        };

        tracing::info!(
            source = self.source.as_str(),
            players = bootstrap.elements.len(),
            fixtures = fixtures.len(),
            gameweek = ?snapshot.current_gameweek,
            "fetched FPL snapshot"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        }
    }

    fn bootstrap_json() -> serde_json::Value {
        serde_json::json!({
            "elements": [
                {"id": 1, "web_name": "Saka", "team": 1, "element_type": 3,
                 "now_cost": 100, "total_points": 150, "form": "6.1", "status": "a"}
            ],
            "teams": [{"id": 1, "name": "Arsenal"}, {"id": 2, "name": "Chelsea"}],
            "element_types": [{"id": 3, "singular_name_short": "MID"}],
            "events": [{"id": 5, "is_current": true, "is_next": false}]
        })
    }

    async fn mount_mirror(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/bootstrap-static.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bootstrap_json()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"event": 6, "team_h": 1, "team_a": 2}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/live.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "elements": {"1": {"stats": {"total_points": 8}}}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures-current.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"event": 5, "team_h": 2, "team_a": 1, "team_h_score": 0, "team_a_score": 3}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn mirror_snapshot_is_formatted() {
        let server = MockServer::start().await;
        mount_mirror(&server).await;

        let client = FplClient::new(DataSource::Mirror, server.uri(), server.uri(), fast_retry(3)).unwrap();
        let snapshot = client.fetch(None).await.unwrap();

        assert_eq!(snapshot.current_gameweek, Some(5));
        assert!(snapshot.players.contains("Saka (Arsenal, MID, £10.0m)"));
        assert!(snapshot.players.contains("Live Points: 8"));
        assert_eq!(snapshot.fixtures, "- GW 6: Arsenal vs Chelsea");
        assert_eq!(snapshot.fixtures_current, "- GW 5: Chelsea 0 - 3 Arsenal");
        assert!(snapshot.squad.is_none());
    }

    #[tokio::test]
    async fn forbidden_then_success_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bootstrap-static.json"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        mount_mirror(&server).await;

        let client = FplClient::new(DataSource::Mirror, server.uri(), server.uri(), fast_retry(3)).unwrap();
        let snapshot = client.fetch(None).await.unwrap();
        assert!(snapshot.players.contains("Saka"));
    }

    #[tokio::test]
    async fn forbidden_on_every_attempt_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bootstrap-static.json"))
            .respond_with(ResponseTemplate::new(403))
            .expect(3)
            .mount(&server)
            .await;

        let client = FplClient::new(DataSource::Mirror, server.uri(), server.uri(), fast_retry(3)).unwrap();
        let err = client.fetch(None).await.unwrap_err();
        assert!(err.to_string().starts_with("Error fetching FPL data:"), "{err}");
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bootstrap-static.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = FplClient::new(DataSource::Mirror, server.uri(), server.uri(), fast_retry(3)).unwrap();
        assert!(client.fetch(None).await.is_err());
    }

    #[tokio::test]
    async fn official_source_uses_api_paths_and_squad() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bootstrap-static/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bootstrap_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures/"))
            .and(query_param("event", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"event": 5, "team_h": 1, "team_a": 2, "team_h_score": null, "team_a_score": null}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/event/5/live/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "elements": [{"id": 1, "stats": {"total_points": 4}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/entry/42/event/5/picks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "picks": [{"element": 1, "position": 1, "is_captain": true, "is_vice_captain": false}],
                "entry_history": {"event_transfers": 0}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/entry/42/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "last_deadline_bank": 23
            })))
            .mount(&server)
            .await;

        let client = FplClient::new(DataSource::Official, server.uri(), server.uri(), fast_retry(3)).unwrap();
        let snapshot = client.fetch(Some("42")).await.unwrap();

        assert!(snapshot.players.contains("Live Points: 4"));
        assert_eq!(snapshot.fixtures_current, "- GW 5: Arsenal Not started Chelsea");
        let squad = snapshot.squad.unwrap();
        assert!(squad.contains("- Saka (C) [Starter]"));
        assert!(squad.contains("Bank: £2.3m"));
    }

    #[tokio::test]
    async fn missing_entry_is_team_not_found() {
        let server = MockServer::start().await;
        mount_mirror(&server).await;
        Mock::given(method("GET"))
            .and(path("/entry/999/event/5/picks/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = FplClient::new(DataSource::Mirror, server.uri(), server.uri(), fast_retry(3)).unwrap();
        let err = client.fetch(Some("999")).await.unwrap_err();
        assert!(matches!(err, Error::TeamNotFound));
    }
}
