//! Client for the Upload-Post aggregation API
//!
//! The aggregation service performs the actual per-platform publishing; this
//! client only submits jobs, polls their status, and reads connected-account
//! profiles. Responses are loosely structured upstream, so the parsing
//! helpers here normalize the handful of shapes the API is known to return.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;

const UPLOAD_POST_API_URL: &str = "https://api.upload-post.com/api";

#[derive(Debug)]
pub enum UploadPostError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for UploadPostError {
    fn from(e: reqwest::Error) -> Self {
        UploadPostError::Http(e)
    }
}

impl std::fmt::Display for UploadPostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadPostError::Http(e) => write!(f, "HTTP error: {}", e),
            UploadPostError::Api(s) => write!(f, "Upload-Post API error: {}", s),
        }
    }
}

impl std::error::Error for UploadPostError {}

/// Media payload of a publish job, chosen by content-shape classification.
/// Text-only posts go through the photo endpoint with an empty media array.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    Video { url: String },
    Photos { urls: Vec<String> },
    Text { link: Option<String> },
}

/// One publish job submission, fanned out by the aggregation service to
/// every platform in `platforms`
#[derive(Debug, Clone)]
pub struct UploadJobRequest {
    /// Aggregation-side profile username the job posts as
    pub user: String,
    pub platforms: Vec<String>,
    pub title: String,
    pub description: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub payload: UploadPayload,
}

impl UploadJobRequest {
    /// Endpoint is selected by payload shape: videos have their own route,
    /// photos and text posts share one
    pub fn endpoint_path(&self) -> &'static str {
        match self.payload {
            UploadPayload::Video { .. } => "/upload",
            UploadPayload::Photos { .. } | UploadPayload::Text { .. } => "/upload_photos",
        }
    }
}

/// Connect-URL generation parameters (OAuth hand-off hosted by the
/// aggregation service)
#[derive(Debug, Clone)]
pub struct ConnectUrlRequest {
    pub username: String,
    pub redirect_url: String,
    pub redirect_button_text: String,
    pub connect_title: String,
    pub connect_description: String,
    pub platforms: Vec<String>,
}

#[derive(Clone)]
pub struct UploadPostClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl UploadPostClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: UPLOAD_POST_API_URL.to_string(),
            http: Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Apikey {}", self.api_key)
    }

    /// Submit a publish job. Always async on the aggregation side; the
    /// returned payload carries a job reference for later status polls.
    pub async fn submit(&self, req: &UploadJobRequest) -> Result<Value, UploadPostError> {
        let mut form = reqwest::multipart::Form::new()
            .text("user", req.user.clone())
            .text("async_upload", "true")
            .text("title", req.title.clone())
            .text("description", req.description.clone());

        // platform[] is a repeated field, one entry per target platform
        for platform in &req.platforms {
            form = form.text("platform[]", platform.clone());
        }

        if let Some(scheduled) = req.scheduled_date {
            form = form.text("scheduled_date", scheduled.to_rfc3339());
        }

        match &req.payload {
            UploadPayload::Video { url } => {
                form = form.text("video", url.clone());
            }
            UploadPayload::Photos { urls } => {
                for url in urls {
                    form = form.text("photos[]", url.clone());
                }
            }
            UploadPayload::Text { link } => {
                if let Some(link) = link {
                    form = form.text("link", link.clone());
                }
            }
        }

        let url = format!("{}{}", self.base_url, req.endpoint_path());
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;

        if !status.is_success() {
            return Err(UploadPostError::Api(api_error_message(&body, status)));
        }

        Ok(body)
    }

    /// Poll the status of a previously submitted job
    pub async fn job_status(&self, request_id: &str) -> Result<Value, UploadPostError> {
        let url = format!(
            "{}/uploadposts/status?request_id={}",
            self.base_url, request_id
        );

        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(UploadPostError::Api(api_error_message(&body, status)));
        }

        Ok(resp.json().await?)
    }

    /// Fetch an aggregation-side profile by synthetic username.
    /// 404 means "not yet connected" and is not an error.
    pub async fn fetch_profile(&self, username: &str) -> Result<Option<Value>, UploadPostError> {
        let url = format!("{}/uploadposts/users/{}", self.base_url, username);

        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(UploadPostError::Api(api_error_message(&body, status)));
        }

        Ok(Some(resp.json().await?))
    }

    /// Create the aggregation-side profile for a synthetic username.
    /// An already-existing profile is success.
    pub async fn ensure_profile(&self, username: &str) -> Result<(), UploadPostError> {
        let url = format!("{}/uploadposts/users", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }

        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let message = api_error_message(&body, status);
        if message.contains("already exists") {
            return Ok(());
        }
        Err(UploadPostError::Api(message))
    }

    /// Generate the hosted connect URL a user is redirected to for the
    /// OAuth hand-off
    pub async fn generate_connect_url(
        &self,
        req: &ConnectUrlRequest,
    ) -> Result<String, UploadPostError> {
        let url = format!("{}/uploadposts/users/generate-jwt", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "username": req.username,
                "redirect_url": req.redirect_url,
                "redirect_button_text": req.redirect_button_text,
                "connect_title": req.connect_title,
                "connect_description": req.connect_description,
                "platforms": req.platforms,
                "show_calendar": false,
            }))
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;

        if !status.is_success() {
            return Err(UploadPostError::Api(api_error_message(&body, status)));
        }

        body.get("access_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                UploadPostError::Api("Upload-Post did not return a connect URL".to_string())
            })
    }
}

fn api_error_message(body: &Value, status: reqwest::StatusCode) -> String {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Upload-Post API error: {}", status))
}

// ============================================================================
// Response normalization
//
// The aggregation API is inconsistent about field names and shapes; these
// helpers turn whatever it sends into canonical values.
// ============================================================================

/// Overall state of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Completed,
    Failed,
    Partial,
    Pending,
}

impl JobState {
    /// Map the reported state token. Unrecognized tokens are treated as
    /// pending so an upstream vocabulary change never flips a draft into a
    /// wrong terminal state.
    pub fn from_token(token: &str) -> JobState {
        match token {
            "completed" | "success" => JobState::Completed,
            "failed" | "error" => JobState::Failed,
            "partial" => JobState::Partial,
            _ => JobState::Pending,
        }
    }
}

/// Job reference under any of the spellings the API uses
pub fn extract_job_reference(body: &Value) -> Option<String> {
    ["request_id", "job_id", "id"]
        .iter()
        .find_map(|key| value_to_string(body.get(*key)?))
}

/// Normalized per-platform outcome from a status poll
#[derive(Debug, Clone)]
pub struct PlatformResult {
    pub platform: String,
    pub success: bool,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub error: Option<String>,
    pub raw: Value,
}

/// Pull per-platform results out of a status response, tolerating the
/// field-name variants (`success`/`status`, `post_id`/`id`, `url`/`post_url`,
/// `error`/`message`)
pub fn parse_platform_results(body: &Value) -> Vec<PlatformResult> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|entry| {
            let platform = entry.get("platform").and_then(Value::as_str)?;
            let success = entry.get("success").and_then(Value::as_bool).unwrap_or(false)
                || entry.get("status").and_then(Value::as_str) == Some("success");
            Some(PlatformResult {
                platform: platform.to_string(),
                success,
                post_id: entry
                    .get("post_id")
                    .or_else(|| entry.get("id"))
                    .and_then(value_to_string),
                post_url: entry
                    .get("url")
                    .or_else(|| entry.get("post_url"))
                    .and_then(value_to_string),
                error: entry
                    .get("error")
                    .or_else(|| entry.get("message"))
                    .and_then(value_to_string),
                raw: entry.clone(),
            })
        })
        .collect()
}

/// One connected platform account extracted from a profile response
#[derive(Debug, Clone)]
pub struct ConnectedPlatform {
    pub platform: String,
    /// Human-readable name, preferred for display
    pub display_name: Option<String>,
    /// Aggregation-internal account username (often an opaque id)
    pub username: Option<String>,
    /// Platform-side account id when reported
    pub external_id: Option<String>,
    pub raw: Value,
}

/// Extract the connected platforms from a profile response.
///
/// The API returns platform data in one of three shapes; each gets its own
/// extractor, tried in priority order, and the first that yields anything
/// wins. Results are alias-normalized and deduplicated by platform.
pub fn extract_connected_platforms(body: &Value) -> Vec<ConnectedPlatform> {
    let extractors: [fn(&Value) -> Vec<ConnectedPlatform>; 3] = [
        extract_from_social_accounts,
        extract_from_platforms_array,
        extract_from_connected_accounts,
    ];

    let mut platforms = Vec::new();
    for extract in extractors {
        platforms = extract(body);
        if !platforms.is_empty() {
            break;
        }
    }

    let mut seen = std::collections::HashSet::new();
    platforms
        .into_iter()
        .filter(|p| seen.insert(p.platform.clone()))
        .collect()
}

/// Primary shape: `profile.social_accounts` keyed by platform, where null or
/// an empty string means "not connected"
fn extract_from_social_accounts(body: &Value) -> Vec<ConnectedPlatform> {
    let profile = body.get("profile").unwrap_or(body);
    let Some(accounts) = profile
        .get("social_accounts")
        .or_else(|| profile.get("socialAccounts"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    accounts
        .iter()
        .filter_map(|(platform_key, value)| match value {
            Value::Object(acc) => Some(ConnectedPlatform {
                platform: normalize_platform_name(platform_key),
                display_name: ["display_name", "displayName", "name", "full_name"]
                    .iter()
                    .find_map(|k| acc.get(*k).and_then(value_to_string)),
                username: acc.get("username").and_then(value_to_string),
                external_id: ["id", "user_id", "account_id"]
                    .iter()
                    .find_map(|k| acc.get(*k).and_then(value_to_string)),
                raw: value.clone(),
            }),
            Value::String(s) if !s.is_empty() => Some(ConnectedPlatform {
                platform: normalize_platform_name(platform_key),
                display_name: Some(s.clone()),
                username: Some(s.clone()),
                external_id: None,
                raw: value.clone(),
            }),
            _ => None, // null, empty string, false: not connected
        })
        .collect()
}

/// Fallback shape: a flat `platforms` array of platform objects
fn extract_from_platforms_array(body: &Value) -> Vec<ConnectedPlatform> {
    let Some(entries) = body.get("platforms").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let platform = entry.get("platform").and_then(Value::as_str)?;
            if entry.get("connected").and_then(Value::as_bool) == Some(false) {
                return None;
            }
            Some(ConnectedPlatform {
                platform: normalize_platform_name(platform),
                display_name: ["name", "handle"]
                    .iter()
                    .find_map(|k| entry.get(*k).and_then(value_to_string)),
                username: entry.get("username").and_then(value_to_string),
                external_id: ["id", "platform_id", "user_id"]
                    .iter()
                    .find_map(|k| entry.get(*k).and_then(value_to_string)),
                raw: entry.clone(),
            })
        })
        .collect()
}

/// Fallback shape: a `connected_accounts` array of generic account objects
fn extract_from_connected_accounts(body: &Value) -> Vec<ConnectedPlatform> {
    let Some(entries) = body.get("connected_accounts").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let platform = entry
                .get("platform")
                .or_else(|| entry.get("type"))
                .and_then(Value::as_str)?;
            Some(ConnectedPlatform {
                platform: normalize_platform_name(platform),
                display_name: entry.get("name").and_then(value_to_string),
                username: entry.get("username").and_then(value_to_string),
                external_id: ["id", "account_id"]
                    .iter()
                    .find_map(|k| entry.get(*k).and_then(value_to_string)),
                raw: entry.clone(),
            })
        })
        .collect()
}

/// Normalize platform name aliases to our canonical identifiers
pub fn normalize_platform_name(name: &str) -> String {
    let normalized = name.trim().to_lowercase();
    match normalized.as_str() {
        "twitter" => "x".to_string(),
        _ => normalized,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_reference_spellings() {
        assert_eq!(
            extract_job_reference(&json!({"request_id": "req-1"})),
            Some("req-1".to_string())
        );
        assert_eq!(
            extract_job_reference(&json!({"job_id": "job-2"})),
            Some("job-2".to_string())
        );
        assert_eq!(
            extract_job_reference(&json!({"id": 42})),
            Some("42".to_string())
        );
        assert_eq!(extract_job_reference(&json!({"other": "x"})), None);
    }

    #[test]
    fn test_job_state_tokens() {
        assert_eq!(JobState::from_token("completed"), JobState::Completed);
        assert_eq!(JobState::from_token("success"), JobState::Completed);
        assert_eq!(JobState::from_token("failed"), JobState::Failed);
        assert_eq!(JobState::from_token("error"), JobState::Failed);
        assert_eq!(JobState::from_token("partial"), JobState::Partial);
        assert_eq!(JobState::from_token("pending"), JobState::Pending);
        assert_eq!(JobState::from_token("processing"), JobState::Pending);
        // unknown vocabulary stays pending
        assert_eq!(JobState::from_token("queued"), JobState::Pending);
    }

    #[test]
    fn test_parse_partial_results() {
        let body = json!({
            "status": "partial",
            "results": [
                {"platform": "x", "success": true, "post_id": "1"},
                {"platform": "linkedin", "success": false, "error": "rate limited"},
            ]
        });

        let results = parse_platform_results(&body);
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].post_id.as_deref(), Some("1"));
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_parse_results_field_variants() {
        let body = json!({
            "results": [
                {"platform": "tiktok", "status": "success", "id": 99, "post_url": "https://t/99"},
                {"platform": "youtube", "message": "quota exceeded"},
            ]
        });

        let results = parse_platform_results(&body);
        assert!(results[0].success);
        assert_eq!(results[0].post_id.as_deref(), Some("99"));
        assert_eq!(results[0].post_url.as_deref(), Some("https://t/99"));
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_extract_social_accounts_shape() {
        let body = json!({
            "success": true,
            "profile": {
                "username": "personal_u1",
                "social_accounts": {
                    "linkedin": {"username": "urn:12345", "display_name": "Jane Doe"},
                    "instagram": null,
                    "tiktok": "",
                    "twitter": "jdoe",
                }
            }
        });

        let mut platforms = extract_connected_platforms(&body);
        platforms.sort_by(|a, b| a.platform.cmp(&b.platform));

        assert_eq!(platforms.len(), 2);
        assert_eq!(platforms[0].platform, "linkedin");
        assert_eq!(platforms[0].display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(platforms[0].username.as_deref(), Some("urn:12345"));
        // alias normalized, bare string doubles as display name
        assert_eq!(platforms[1].platform, "x");
        assert_eq!(platforms[1].display_name.as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_extract_platforms_array_shape() {
        let body = json!({
            "platforms": [
                {"platform": "facebook", "username": "page-1", "connected": true},
                {"platform": "youtube", "connected": false},
            ]
        });

        let platforms = extract_connected_platforms(&body);
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].platform, "facebook");
    }

    #[test]
    fn test_extract_connected_accounts_shape() {
        let body = json!({
            "connected_accounts": [
                {"type": "Twitter", "name": "Jane", "account_id": "a1"},
                {"type": "twitter", "name": "dupe"},
            ]
        });

        let platforms = extract_connected_platforms(&body);
        // deduplicated by normalized platform
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].platform, "x");
        assert_eq!(platforms[0].external_id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_endpoint_selection() {
        let base = UploadJobRequest {
            user: "personal_u1".to_string(),
            platforms: vec!["x".to_string()],
            title: "t".to_string(),
            description: "d".to_string(),
            scheduled_date: None,
            payload: UploadPayload::Video {
                url: "https://m/a.mp4".to_string(),
            },
        };
        assert_eq!(base.endpoint_path(), "/upload");

        let photos = UploadJobRequest {
            payload: UploadPayload::Photos {
                urls: vec!["https://m/a.jpg".to_string()],
            },
            ..base.clone()
        };
        assert_eq!(photos.endpoint_path(), "/upload_photos");

        let text = UploadJobRequest {
            payload: UploadPayload::Text { link: None },
            ..base
        };
        assert_eq!(text.endpoint_path(), "/upload_photos");
    }
}
