//! Pipeline stages and their data dependencies

use crate::error::AnalyticsError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One algorithm of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Degree,
    PageRank,
    Betweenness,
    /// Label propagation; exposed under the historical name `louvain`
    Community,
    Bottleneck,
}

impl Stage {
    pub const COUNT: usize = 5;

    /// Full-pipeline execution order
    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Degree,
        Stage::PageRank,
        Stage::Betweenness,
        Stage::Community,
        Stage::Bottleneck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Degree => "degree",
            Stage::PageRank => "pagerank",
            Stage::Betweenness => "betweenness",
            Stage::Community => "louvain",
            Stage::Bottleneck => "bottleneck",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Degree => "Out/in follow counts and their sum",
            Stage::PageRank => "Fixed-iteration damped PageRank over follows",
            Stage::Betweenness => "Structural betweenness proxy from in/out degree balance",
            Stage::Community => "Community detection by synchronous label propagation",
            Stage::Bottleneck => "Composite bottleneck score from betweenness, PageRank and bridging",
        }
    }

    /// Stages whose fresh output this stage requires
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Bottleneck => &[Stage::PageRank, Stage::Betweenness],
            _ => &[],
        }
    }

    /// Whether committing this stage supersedes existing bottleneck outputs
    pub fn invalidates_bottleneck(&self) -> bool {
        matches!(self, Stage::PageRank | Stage::Betweenness | Stage::Community)
    }

    pub(crate) fn ordinal(&self) -> usize {
        match self {
            Stage::Degree => 0,
            Stage::PageRank => 1,
            Stage::Betweenness => 2,
            Stage::Community => 3,
            Stage::Bottleneck => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degree" => Ok(Stage::Degree),
            "pagerank" => Ok(Stage::PageRank),
            "betweenness" => Ok(Stage::Betweenness),
            "louvain" | "community" => Ok(Stage::Community),
            "bottleneck" => Ok(Stage::Bottleneck),
            _ => Err(AnalyticsError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Entry of the algorithm catalogue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub depends_on: Vec<&'static str>,
}

/// Catalogue of runnable algorithms in pipeline order
pub fn available_algorithms() -> Vec<AlgorithmInfo> {
    Stage::ALL
        .iter()
        .map(|stage| AlgorithmInfo {
            name: stage.name(),
            description: stage.description(),
            depends_on: stage.dependencies().iter().map(Stage::name).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("pagerank".parse::<Stage>().unwrap(), Stage::PageRank);
        assert_eq!("louvain".parse::<Stage>().unwrap(), Stage::Community);
        assert_eq!("community".parse::<Stage>().unwrap(), Stage::Community);
        assert_eq!(" Degree ".parse::<Stage>().unwrap(), Stage::Degree);

        let err = "closeness".parse::<Stage>().unwrap_err();
        assert_eq!(err, AnalyticsError::UnknownAlgorithm("closeness".to_string()));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_ordinals_match_pipeline_order() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.ordinal(), i);
        }
    }

    #[test]
    fn test_serde_uses_names() {
        assert_eq!(serde_json::to_string(&Stage::Community).unwrap(), "\"louvain\"");
        let stage: Stage = serde_json::from_str("\"bottleneck\"").unwrap();
        assert_eq!(stage, Stage::Bottleneck);
        assert!(serde_json::from_str::<Stage>("\"closeness\"").is_err());
    }

    #[test]
    fn test_catalogue() {
        let catalogue = available_algorithms();
        assert_eq!(catalogue.len(), 5);
        assert_eq!(catalogue[4].name, "bottleneck");
        assert_eq!(catalogue[4].depends_on, vec!["pagerank", "betweenness"]);
    }
}
