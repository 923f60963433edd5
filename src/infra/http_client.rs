use crate::app::ports::{ArtistLookup, ArtistMetadata};
use crate::error::{LookupError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    genres: Vec<String>,
}

/// Metadata client for `GET {api_base}/artists/{id}`.
pub struct ReqwestArtistClient {
    client: reqwest::Client,
    api_base: String,
}

impl ReqwestArtistClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn artist_url(&self, artist_uri: &str) -> String {
        format!("{}/artists/{}", self.api_base, artist_id(artist_uri))
    }
}

/// `spotify:artist:XYZ` -> `XYZ`. Bare ids pass through unchanged.
pub fn artist_id(artist_uri: &str) -> &str {
    artist_uri.rsplit(':').next().unwrap_or(artist_uri)
}

/// Map a response status and body onto the lookup contract.
pub fn classify_response(
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<ArtistLookup, LookupError> {
    match status {
        StatusCode::OK => {
            let parsed: ArtistResponse =
                serde_json::from_slice(body).map_err(|e| LookupError::Body(e.to_string()))?;
            Ok(ArtistLookup::Found {
                genres: parsed.genres,
            })
        }
        StatusCode::NOT_FOUND => Ok(ArtistLookup::Absent),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(LookupError::Unauthorized(status.as_u16()))
        }
        other => Err(LookupError::Status(other.as_u16())),
    }
}

#[async_trait]
impl ArtistMetadata for ReqwestArtistClient {
    async fn fetch_artist(
        &self,
        artist_uri: &str,
        token: &str,
    ) -> std::result::Result<ArtistLookup, LookupError> {
        let url = self.artist_url(artist_uri);
        debug!(%url, "Fetching artist metadata");
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        classify_response(status, &body)
    }
}
