use super::util::{check_status, decode_json, endpoint};
use crate::core::advisor::{
    AdviceRequest, AdvisorService, GameweekInfo, SavedSquad, SavedSquadRepository, SearchPlayer,
    SearchQuery, WildcardPlan,
};
use crate::core::cache::Cache;
use crate::core::suggestion::SuggestionResponse;
use crate::core::task::{Task, TaskBackend, TaskKind, TaskReceipt, TaskRequest};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, instrument};

const GAMEWEEK_TTL: Duration = Duration::from_secs(5 * 60);
const SEARCH_TTL: Duration = Duration::from_secs(60);

/// HTTP client for the prediction service.
pub struct HttpAdvisor {
    base_url: Url,
    client: Client,
    gameweek_cache: Cache<&'static str, GameweekInfo>,
    search_cache: Cache<String, Vec<SearchPlayer>>,
}

impl HttpAdvisor {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid service base URL: {base_url}"))?;
        let client = Client::builder()
            .user_agent(concat!("squadplan/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            base_url,
            client,
            gameweek_cache: Cache::new(),
            search_cache: Cache::new(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.base_url, segments)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        debug!("Requesting {} from {}", what, url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {}", e, what))?;
        decode_json(check_status(response, what).await?, what).await
    }

    async fn send_json<B, T>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        debug!("Sending {} to {}", what, url);
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {}", e, what))?;
        decode_json(check_status(response, what).await?, what).await
    }
}

#[async_trait]
impl AdvisorService for HttpAdvisor {
    async fn gameweek(&self) -> Result<GameweekInfo> {
        if let Some(cached) = self.gameweek_cache.get(&"gameweek").await {
            return Ok(cached);
        }
        let info: GameweekInfo = self.get_json(self.url(&["gameweek"])?, "gameweek").await?;
        self.gameweek_cache
            .put("gameweek", info.clone(), Some(GAMEWEEK_TTL))
            .await;
        Ok(info)
    }

    #[instrument(name = "AdvisorSearch", skip(self), fields(q = %query.text))]
    async fn search_players(&self, query: &SearchQuery) -> Result<Vec<SearchPlayer>> {
        let mut params = vec![("q", query.text.clone())];
        if let Some(position) = query.position {
            params.push(("position", position.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        let url = Url::parse_with_params(self.url(&["players", "search"])?.as_str(), &params)?;

        let key = url.to_string();
        if let Some(cached) = self.search_cache.get(&key).await {
            return Ok(cached);
        }
        let players: Vec<SearchPlayer> = self.get_json(url, "player search").await?;
        self.search_cache
            .put(key, players.clone(), Some(SEARCH_TTL))
            .await;
        Ok(players)
    }

    #[instrument(
        name = "AdvisorSuggestions",
        skip(self, request),
        fields(players = request.squad.len(), free_transfers = request.free_transfers)
    )]
    async fn transfer_suggestions(&self, request: &AdviceRequest) -> Result<SuggestionResponse> {
        self.send_json(
            reqwest::Method::POST,
            self.url(&["transfer-suggestions"])?,
            request,
            "transfer suggestions",
        )
        .await
    }

    #[instrument(name = "AdvisorWildcard", skip(self, request))]
    async fn wildcard(&self, request: &AdviceRequest) -> Result<WildcardPlan> {
        self.send_json(
            reqwest::Method::POST,
            self.url(&["wildcard"])?,
            request,
            "wildcard plan",
        )
        .await
    }
}

#[async_trait]
impl TaskBackend for HttpAdvisor {
    async fn submit(&self, request: &TaskRequest) -> Result<TaskReceipt> {
        match request {
            TaskRequest::WildcardTrajectory(body) => {
                self.send_json(
                    reqwest::Method::POST,
                    self.url(&["chips", "wildcard-trajectory"])?,
                    body,
                    "wildcard trajectory",
                )
                .await
            }
        }
    }

    async fn status(&self, task_id: &str) -> Result<Task> {
        self.get_json(self.url(&["tasks", task_id])?, "task status")
            .await
    }

    async fn result(&self, kind: TaskKind, task_id: &str) -> Result<serde_json::Value> {
        let url = match kind {
            TaskKind::WildcardTrajectory => self.url(&["chips", "wildcard-trajectory", task_id])?,
            _ => self.url(&["tasks", task_id, "result"])?,
        };
        self.get_json(url, "task result").await
    }
}

#[async_trait]
impl SavedSquadRepository for HttpAdvisor {
    async fn list(&self) -> Result<Vec<SavedSquad>> {
        self.get_json(self.url(&["saved-squads"])?, "saved squads")
            .await
    }

    async fn create(&self, squad: &SavedSquad) -> Result<SavedSquad> {
        self.send_json(
            reqwest::Method::POST,
            self.url(&["saved-squads"])?,
            squad,
            "saved squad",
        )
        .await
    }

    async fn update(&self, squad: &SavedSquad) -> Result<SavedSquad> {
        self.send_json(
            reqwest::Method::PUT,
            self.url(&["saved-squads", &squad.name])?,
            squad,
            "saved squad",
        )
        .await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let what = "saved squad";
        let response = self
            .client
            .delete(self.url(&["saved-squads", name])?)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {}", e, what))?;
        check_status(response, what).await?;
        Ok(())
    }
}
