use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::CurioError;

/// Title used for a search result the API sent without one
pub const DEFAULT_RESULT_TITLE: &str = "Resource";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Backend model offered by the search API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "sonar")]
    Sonar,
    #[serde(rename = "sonar-pro")]
    SonarPro,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Sonar => "sonar",
            Model::SonarPro => "sonar-pro",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sonar" => Ok(Model::Sonar),
            "sonar-pro" => Ok(Model::SonarPro),
            other => Err(CurioError::ParsingError(format!(
                "Unknown model '{}', expected one of: sonar, sonar-pro",
                other
            ))),
        }
    }
}

/// Recency window applied to the web search behind a completion.
/// `Any` means no filter and is left out of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchRecency {
    #[default]
    #[serde(rename = "")]
    Any,
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "year")]
    Year,
}

impl SearchRecency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchRecency::Any => "",
            SearchRecency::Day => "day",
            SearchRecency::Week => "week",
            SearchRecency::Month => "month",
            SearchRecency::Year => "year",
        }
    }

    /// The value to send as `search_recency_filter`, if any
    pub fn as_filter(&self) -> Option<&'static str> {
        match self {
            SearchRecency::Any => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for SearchRecency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchRecency::Any => f.write_str("any"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for SearchRecency {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "any" | "none" => Ok(SearchRecency::Any),
            "day" => Ok(SearchRecency::Day),
            "week" => Ok(SearchRecency::Week),
            "month" => Ok(SearchRecency::Month),
            "year" => Ok(SearchRecency::Year),
            other => Err(CurioError::ParsingError(format!(
                "Unknown search recency '{}', expected one of: any, day, week, month, year",
                other
            ))),
        }
    }
}

/// One web search hit backing the assistant's answer.
/// Citation markers `[n]` address these by 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SearchResult {
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title,
            date: None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_RESULT_TITLE)
    }
}

/// Side-channel data collected while a response streams in.
/// Later chunks overwrite earlier values for the same key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

impl StreamMetadata {
    /// Search results, or an empty slice when none arrived
    pub fn results(&self) -> &[SearchResult] {
        self.search_results.as_deref().unwrap_or(&[])
    }

    pub fn has_results(&self) -> bool {
        !self.results().is_empty()
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.usage
            .as_ref()
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64)
    }
}

/// Request body for the chat-completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: Model,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_round_trip_spelling() {
        assert_eq!("sonar-pro".parse::<Model>().unwrap(), Model::SonarPro);
        assert_eq!(" Sonar ".parse::<Model>().unwrap(), Model::Sonar);
        assert!(matches!(
            "gpt-4".parse::<Model>(),
            Err(CurioError::ParsingError(_))
        ));
        assert_eq!(serde_json::to_value(Model::SonarPro).unwrap(), json!("sonar-pro"));
    }

    #[test]
    fn test_recency_filter_omits_any() {
        assert_eq!(SearchRecency::Any.as_filter(), None);
        assert_eq!(SearchRecency::Week.as_filter(), Some("week"));
        assert_eq!("".parse::<SearchRecency>().unwrap(), SearchRecency::Any);
        assert_eq!("month".parse::<SearchRecency>().unwrap(), SearchRecency::Month);
        assert!("decade".parse::<SearchRecency>().is_err());
    }

    #[test]
    fn test_search_result_defaults() {
        let result: SearchResult = serde_json::from_value(json!({"url": "https://a.org"})).unwrap();
        assert_eq!(result.display_title(), "Resource");

        let result: SearchResult = serde_json::from_value(json!({
            "url": "https://b.org",
            "title": "Intro",
            "date": "2024-01-02"
        }))
        .unwrap();
        assert_eq!(result.display_title(), "Intro");
        assert_eq!(result.date.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: Model::Sonar,
            messages: vec![Message::system("rules"), Message::user("hi")],
            temperature: 0.5,
            stream: true,
            search_recency_filter: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "sonar");
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert!(value.get("search_recency_filter").is_none());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut metadata = StreamMetadata::default();
        assert!(!metadata.has_results());
        assert_eq!(metadata.total_tokens(), None);

        metadata.search_results = Some(vec![SearchResult::new("u", None)]);
        metadata.usage = Some(json!({"total_tokens": 42}));
        assert!(metadata.has_results());
        assert_eq!(metadata.total_tokens(), Some(42));
    }
}
