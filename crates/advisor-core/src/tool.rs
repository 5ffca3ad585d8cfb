//! Tool Registry
//!
//! The analysis tools offered by the dashboard. A tool id is the stable key
//! used by the result cache.

use serde::{Deserialize, Serialize};

/// Stable identifier of an analysis tool
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ToolId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Grouping used for navigation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Trend,
    Stock,
    Fund,
    Asset,
    Advanced,
}

/// Static description of one tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolConfig {
    pub id: ToolId,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,

    /// Whether the tool is listed in the navigation bar
    pub in_navigation: bool,
}

impl ToolConfig {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        category: ToolCategory,
        in_navigation: bool,
    ) -> Self {
        Self {
            id: ToolId::new(id),
            name: name.into(),
            description: description.into(),
            category,
            in_navigation,
        }
    }
}

/// Registry of available tools
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolConfig>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tools shipped with the dashboard
    pub fn builtin() -> Self {
        use ToolCategory::{Advanced, Asset, Fund, Stock, Trend};

        let mut registry = Self::new();
        for tool in [
            ToolConfig::new(
                "trend-dashboard",
                "Trend Dashboard",
                "Sector-wide trend overview",
                Trend,
                true,
            ),
            ToolConfig::new(
                "ai-stock-analyst",
                "AI Stock Analyst",
                "Undervalued TW/US stocks for a trend",
                Stock,
                true,
            ),
            ToolConfig::new(
                "gemini-stock-prophet",
                "Gemini Stock Prophet",
                "Price outlook and deep dive for one stock",
                Stock,
                true,
            ),
            ToolConfig::new(
                "fund-assistant",
                "Fund Assistant",
                "Entry and exit timing for funds",
                Fund,
                true,
            ),
            ToolConfig::new(
                "fund-risk-analysis",
                "Fund Risk Analysis",
                "News risk across a fund's latest holdings",
                Fund,
                true,
            ),
            ToolConfig::new(
                "asset-analysis",
                "Asset Analysis",
                "Personal asset allocation check-up",
                Asset,
                true,
            ),
            ToolConfig::new(
                "alphastrategist",
                "AlphaStrategist",
                "General investment assistant",
                Advanced,
                false,
            ),
            ToolConfig::new(
                "fund-insight",
                "Fund Insight",
                "Stocks shared across top funds' holdings",
                Advanced,
                false,
            ),
        ] {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool, replacing any tool with the same id
    pub fn register(&mut self, tool: ToolConfig) {
        match self.tools.iter_mut().find(|t| t.id == tool.id) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ToolConfig> {
        self.tools.iter().find(|t| t.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<&ToolId> {
        self.tools.iter().map(|t| &t.id).collect()
    }

    pub fn all(&self) -> &[ToolConfig] {
        &self.tools
    }

    /// Navigation tools ordered trend, stock, fund, asset
    pub fn navigation(&self) -> Vec<&ToolConfig> {
        let mut tools: Vec<_> = self.tools.iter().filter(|t| t.in_navigation).collect();
        tools.sort_by_key(|t| t.category);
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
