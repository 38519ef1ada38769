use std::{sync::Arc, time::Duration};

use futures::{
    StreamExt,
    future::BoxFuture,
    stream,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    MatchProvider, MatchSnapshot, MatchStats, ProviderError, ProviderResult, SquadPlayer,
    models::{Envelope, MatchPoints, SUCCESS, ScoreRow, SquadData},
};

const CRIC_SCORE: &str = "cricScore";
const MATCH_POINTS: &str = "match_points";
const MATCH_SQUAD: &str = "match_squad";
/// Upper bound on concurrent `match_points` requests per feed refresh.
const POINTS_CONCURRENCY: usize = 4;

/// [`MatchProvider`] backed by the CricAPI v1 REST endpoints.
#[derive(Clone)]
pub struct CricApiProvider {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl CricApiProvider {
    /// Build a client for `base_url`. Requests fail with [`ProviderError::MissingApiKey`]
    /// until a key is configured.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| ProviderError::ClientBuilder { source })?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            api_key: api_key
                .filter(|key| !key.trim().is_empty())
                .map(Arc::from),
        })
    }

    async fn get<T>(&self, endpoint: &'static str, params: &[(&str, &str)]) -> ProviderResult<T>
    where
        T: DeserializeOwned,
    {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(url)
            .query(&[("apikey", api_key)])
            .query(params)
            .send()
            .await
            .map_err(|source| ProviderError::Request { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { endpoint, status });
        }

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|source| ProviderError::Decode { endpoint, source })?;

        match envelope {
            Envelope {
                status,
                data: Some(data),
            } if status == SUCCESS => Ok(data),
            Envelope { status, .. } => Err(ProviderError::Failed { endpoint, status }),
        }
    }

    async fn fetch_points(&self, match_id: &str) -> ProviderResult<MatchStats> {
        let points = self
            .get::<MatchPoints>(MATCH_POINTS, &[("id", match_id)])
            .await?;
        Ok(MatchStats::from_points(
            points
                .totals
                .into_iter()
                .map(|total| (total.id, total.points)),
        ))
    }

    async fn fetch_feed(&self) -> ProviderResult<Vec<MatchSnapshot>> {
        let rows = self.get::<Vec<ScoreRow>>(CRIC_SCORE, &[]).await?;
        debug!(count = rows.len(), "fetched match feed");
        Ok(rows.into_iter().map(ScoreRow::into_snapshot).collect())
    }

    /// Feed rows enriched with `match_points` for every match that publishes them.
    async fn fetch_matches(&self) -> ProviderResult<Vec<MatchSnapshot>> {
        let feed = self.fetch_feed().await?;

        let snapshots = stream::iter(feed)
            .map(|mut snapshot| async move {
                if snapshot.state.has_points() {
                    match self.fetch_points(&snapshot.id).await {
                        Ok(stats) => snapshot.stats = Some(stats),
                        Err(err) => {
                            warn!(
                                match_id = %snapshot.id,
                                error = %err,
                                "failed to fetch match points; match skipped this tick"
                            );
                        }
                    }
                }
                snapshot
            })
            .buffered(POINTS_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(snapshots)
    }

    async fn fetch_squad(&self, match_id: String) -> ProviderResult<Vec<SquadPlayer>> {
        let squad = self
            .get::<SquadData>(MATCH_SQUAD, &[("id", match_id.as_str())])
            .await?;
        Ok(squad.into_players())
    }
}

impl MatchProvider for CricApiProvider {
    fn fetch_feed(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        let provider = self.clone();
        Box::pin(async move { provider.fetch_feed().await })
    }

    fn fetch_matches(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>> {
        let provider = self.clone();
        Box::pin(async move { provider.fetch_matches().await })
    }

    fn fetch_squad(&self, match_id: String) -> BoxFuture<'static, ProviderResult<Vec<SquadPlayer>>> {
        let provider = self.clone();
        Box::pin(async move { provider.fetch_squad(match_id).await })
    }
}
