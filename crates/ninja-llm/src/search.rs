//! Live search settings
//!
//! Both supported providers can ground an answer on fresh web results, which
//! matters for anything quoting a current price. OpenAI exposes this as a
//! built-in `web_search` tool; xAI takes `search_parameters` with a list of
//! sources. [`LiveSearch`] captures the common intent and each provider
//! translates it.

use serde::{Deserialize, Serialize};

/// When the provider should run a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Never search
    Off,
    /// Let the model decide
    #[default]
    Auto,
    /// Always search
    On,
}

/// Where search results may come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// General web
    Web,
    /// News outlets
    News,
    /// Posts on X
    X,
}

/// Live search request attached to a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSearch {
    pub mode: SearchMode,
    pub sources: Vec<SearchSource>,
}

impl LiveSearch {
    /// Always search across web, news and X.
    pub fn everywhere() -> Self {
        Self {
            mode: SearchMode::On,
            sources: vec![SearchSource::X, SearchSource::News, SearchSource::Web],
        }
    }

    /// Whether any search is requested at all
    pub fn is_enabled(&self) -> bool {
        self.mode != SearchMode::Off
    }
}

impl Default for LiveSearch {
    fn default() -> Self {
        Self {
            mode: SearchMode::Auto,
            sources: vec![SearchSource::Web],
        }
    }
}
