//! # Dependency Graph
//!
//! Static weights of each tier in the overall score, the capabilities each tier backs, and
//! the impact analysis that turns low node scores into user-facing consequences.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{ConfigResult, ConfigurationError, DependencyConfig, DependencyNodeConfig};
use crate::constants::{clamp_score, system, ImpactLevel, Layer};
use crate::models::{DependencyImpact, LayerScore, NodeImpact};

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNodeConfig>,
}

impl DependencyGraph {
    /// Build a graph, rejecting negative weights and weights that do not sum to one
    pub fn new(nodes: Vec<DependencyNodeConfig>) -> ConfigResult<Self> {
        if let Some(node) = nodes.iter().find(|n| !n.weight.is_finite() || n.weight < 0.0) {
            return Err(ConfigurationError::invalid_value(
                format!("dependency.nodes.{}.weight", node.layer),
                node.weight.to_string(),
                "node weights must be non-negative",
            ));
        }
        let sum: f64 = nodes.iter().map(|n| n.weight).sum();
        if (sum - 1.0).abs() > system::WEIGHT_TOLERANCE {
            return Err(ConfigurationError::weight_sum_mismatch(
                "dependency.nodes",
                1.0,
                sum,
            ));
        }
        Ok(Self { nodes })
    }

    pub fn from_config(config: &DependencyConfig) -> ConfigResult<Self> {
        Self::new(config.nodes.clone())
    }

    pub fn nodes(&self) -> &[DependencyNodeConfig] {
        &self.nodes
    }

    pub fn weight(&self, layer: Layer) -> f64 {
        self.node(layer).map_or(0.0, |n| n.weight)
    }

    pub fn capabilities(&self, layer: Layer) -> &[String] {
        self.node(layer).map_or(&[], |n| n.capabilities.as_slice())
    }

    fn node(&self, layer: Layer) -> Option<&DependencyNodeConfig> {
        self.nodes.iter().find(|n| n.layer == layer)
    }

    /// Score per graph node, taken from the layer scores of one evaluation
    pub fn node_scores(&self, layer_scores: &[LayerScore]) -> BTreeMap<Layer, f64> {
        self.nodes
            .iter()
            .map(|node| {
                let score = layer_scores
                    .iter()
                    .find(|s| s.layer == node.layer)
                    .map_or(0.0, |s| s.score);
                (node.layer, score)
            })
            .collect()
    }

    /// Weighted overall score; a tier without a score contributes zero
    pub fn combine(&self, layer_scores: &[LayerScore]) -> f64 {
        let total: f64 = self
            .nodes
            .iter()
            .map(|node| {
                let score = layer_scores
                    .iter()
                    .find(|s| s.layer == node.layer)
                    .map_or(0.0, |s| s.score);
                node.weight * score
            })
            .sum();
        clamp_score(total.round())
    }
}

/// Flags tiers scoring below the impact threshold and estimates what users lose
#[derive(Debug, Clone)]
pub struct DependencyImpactAnalyzer {
    impact_threshold: f64,
    critical_below: f64,
    high_below: f64,
}

impl DependencyImpactAnalyzer {
    pub fn new(config: &DependencyConfig) -> Self {
        Self {
            impact_threshold: config.impact_threshold,
            critical_below: config.critical_below,
            high_below: config.high_below,
        }
    }

    pub fn impact_level(&self, score: f64) -> ImpactLevel {
        if score < self.critical_below {
            ImpactLevel::Critical
        } else if score < self.high_below {
            ImpactLevel::High
        } else {
            ImpactLevel::Medium
        }
    }

    pub fn analyze(&self, node_scores: &BTreeMap<Layer, f64>, graph: &DependencyGraph) -> DependencyImpact {
        let impacts: Vec<NodeImpact> = node_scores
            .iter()
            .filter(|(_, score)| **score < self.impact_threshold)
            .map(|(layer, score)| NodeImpact {
                node: *layer,
                health_score: *score,
                impact_level: self.impact_level(*score),
                affected_capabilities: graph.capabilities(*layer).to_vec(),
            })
            .collect();

        if impacts.is_empty() {
            return DependencyImpact::none();
        }

        let overall_impact_level = impacts
            .iter()
            .map(|i| i.impact_level)
            .max()
            .unwrap_or(ImpactLevel::None);
        let impacted_capability_count = impacts.iter().map(|i| i.affected_capabilities.len()).sum();
        let estimated_user_impact_pct = impacts
            .iter()
            .map(|i| graph.weight(i.node) * (100.0 - clamp_score(i.health_score)))
            .sum::<f64>();

        debug!(
            impacted_nodes = impacts.len(),
            overall_impact_level = ?overall_impact_level,
            "🕸️ Dependency impact analyzed"
        );

        DependencyImpact {
            impacts,
            overall_impact_level,
            impacted_capability_count,
            estimated_user_impact_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> DependencyGraph {
        DependencyGraph::from_config(&DependencyConfig::default()).unwrap()
    }

    fn scores(client: f64, service: f64, storage: f64) -> BTreeMap<Layer, f64> {
        BTreeMap::from([
            (Layer::Client, client),
            (Layer::Service, service),
            (Layer::Storage, storage),
        ])
    }

    #[test]
    fn test_default_graph_weights_sum_to_one() {
        let graph = graph();
        let total: f64 = graph.nodes().iter().map(|n| n.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(graph.weight(Layer::Storage), 0.3);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut nodes = DependencyConfig::default().nodes;
        nodes[0].weight = 0.5;
        assert!(DependencyGraph::new(nodes.clone()).is_err());
        nodes[0].weight = -0.1;
        assert!(DependencyGraph::new(nodes).is_err());
    }

    #[test]
    fn test_combine_treats_missing_layer_as_zero() {
        let graph = graph();
        let full = |layer| LayerScore {
            layer,
            score: 100.0,
            factors: Vec::new(),
            weights_used: BTreeMap::new(),
            failed_factors: Vec::new(),
            reachable: true,
        };
        assert_eq!(graph.combine(&[full(Layer::Client), full(Layer::Service)]), 70.0);
        assert_eq!(
            graph.combine(&[full(Layer::Client), full(Layer::Service), full(Layer::Storage)]),
            100.0
        );

        let nodes = graph.node_scores(&[full(Layer::Service)]);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[&Layer::Service], 100.0);
        assert_eq!(nodes[&Layer::Storage], 0.0);
    }

    #[test]
    fn test_healthy_nodes_have_no_impact() {
        let impact = DependencyImpactAnalyzer::new(&DependencyConfig::default())
            .analyze(&scores(95.0, 90.0, 70.0), &graph());
        assert_eq!(impact, DependencyImpact::none());
    }

    #[test]
    fn test_impact_levels_and_aggregation() {
        let analyzer = DependencyImpactAnalyzer::new(&DependencyConfig::default());
        let graph = graph();
        let impact = analyzer.analyze(&scores(95.0, 65.0, 0.0), &graph);

        assert_eq!(impact.impacts.len(), 2);
        assert_eq!(impact.overall_impact_level, ImpactLevel::Critical);
        let storage = impact.impacts.iter().find(|i| i.node == Layer::Storage).unwrap();
        assert_eq!(storage.impact_level, ImpactLevel::Critical);
        let service = impact.impacts.iter().find(|i| i.node == Layer::Service).unwrap();
        assert_eq!(service.impact_level, ImpactLevel::High);

        let expected_caps = graph.capabilities(Layer::Service).len() + graph.capabilities(Layer::Storage).len();
        assert_eq!(impact.impacted_capability_count, expected_caps);
        // 0.4 * 35 + 0.3 * 100
        assert!((impact.estimated_user_impact_pct - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_medium_level_when_thresholds_diverge() {
        let config = DependencyConfig {
            impact_threshold: 80.0,
            ..DependencyConfig::default()
        };
        let analyzer = DependencyImpactAnalyzer::new(&config);
        assert_eq!(analyzer.impact_level(75.0), ImpactLevel::Medium);
        assert_eq!(analyzer.impact_level(60.0), ImpactLevel::High);
        assert_eq!(analyzer.impact_level(10.0), ImpactLevel::Critical);
    }
}
