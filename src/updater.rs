//! Lifelong edge revision from live navigation outcomes.
//!
//! Every traversal attempt between two adjacent nodes teaches the map
//! something: a discrete Bayesian filter revises the pair's
//! connectivity belief, and on success a conjugate-Gaussian merge
//! refines the distance estimate. Both directions of a reciprocal pair
//! move in lockstep — connectivity is a property of the pair, not of a
//! direction. An edge whose belief collapses below the removal
//! threshold after a failure is deleted outright; path planners should
//! replan when that happens.
//!
//! Updates are all-or-nothing per pair: the oracle is consulted before
//! any state is touched, so a crashed probe leaves the edge exactly as
//! it was.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{GraphError, WaymarkResult};
use crate::graph::topology::TopologyGraph;
use crate::graph::{EdgeBelief, NodeHandle};
use crate::oracle::ReachabilityOracle;
use crate::waypoint::Waypoint;

/// Result of one navigation attempt, reported by the locomotion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The agent arrived at the target node.
    Reached,
    /// The agent got stuck (obstacle, local minimum).
    Stuck,
    /// The attempt was cut off (step limit, shutdown).
    Terminated,
}

impl NavigationOutcome {
    /// Only a confirmed arrival counts as success.
    pub fn is_success(self) -> bool {
        matches!(self, NavigationOutcome::Reached)
    }
}

/// What a navigation report did to the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeOutcome {
    /// A brand-new edge pair was created ("first success creates trust").
    Created,
    /// The pair's belief was revised in place.
    Updated { connectivity: f64 },
    /// The pair's belief collapsed and both directions were removed.
    /// Structural change — callers holding a planned path should replan.
    Removed { connectivity: f64 },
    /// Nothing to learn (self-loop, or a failure on a non-edge).
    Unchanged,
}

/// Tuning knobs for lifelong updates.
#[derive(Debug, Clone)]
pub struct LifelongConfig {
    /// Fixed observation stddev for the Gaussian distance merge, and the
    /// prior stddev for edges created by the trust rule.
    pub sigma: f64,
    /// Connectivity below this after a failure deletes the pair.
    pub removal_threshold: f64,
    /// Likelihood of a successful traversal given the edge is real.
    pub p_success_given_reachable: f64,
    /// Likelihood of a successful traversal given the edge is not real.
    pub p_success_given_unreachable: f64,
    /// Ceiling for the connectivity posterior; keeps the belief revisable.
    pub max_connectivity: f64,
    /// Allow the trust rule to create edges.
    pub add_edges: bool,
    /// Allow collapsed edges to be removed.
    pub remove_edges: bool,
    /// Minimum out-degree before a node can be considered a duplicate.
    pub min_degree_for_dedup: usize,
    /// Maximum non-shared neighbors a duplicate pair may have.
    pub max_unique_neighbors: usize,
}

impl Default for LifelongConfig {
    fn default() -> Self {
        Self {
            sigma: 0.015,
            removal_threshold: 0.5,
            p_success_given_reachable: 0.55,
            p_success_given_unreachable: 0.15,
            max_connectivity: 0.95,
            add_edges: true,
            remove_edges: true,
            min_degree_for_dedup: 4,
            max_unique_neighbors: 2,
        }
    }
}

/// Online update policy: folds navigation outcomes into edge beliefs.
pub struct EdgeUpdater {
    config: LifelongConfig,
    rng: StdRng,
}

impl EdgeUpdater {
    /// Create an updater with entropy-seeded weight resampling.
    pub fn new(config: LifelongConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an updater with a fixed seed for reproducible runs.
    pub fn with_seed(config: LifelongConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: LifelongConfig, rng: StdRng) -> Self {
        assert!(config.sigma > 0.0, "lifelong sigma must be positive");
        assert!(
            (0.0..=1.0).contains(&config.removal_threshold),
            "removal threshold must be in [0, 1]"
        );
        Self { config, rng }
    }

    /// Incorporate one navigation attempt from `from` toward `to`.
    ///
    /// `observation` is the waypoint describing where the agent actually
    /// was just before reaching (or failing to reach) `to`; on success it
    /// is scored against the target to produce the fresh distance
    /// observation.
    pub fn record_navigation<O>(
        &mut self,
        oracle: &O,
        graph: &mut TopologyGraph,
        from: NodeHandle,
        to: NodeHandle,
        observation: &Waypoint,
        outcome: NavigationOutcome,
    ) -> WaymarkResult<EdgeOutcome>
    where
        O: ReachabilityOracle + ?Sized,
    {
        if from == to {
            return Ok(EdgeOutcome::Unchanged);
        }
        if !graph.contains(from) {
            return Err(GraphError::NodeNotFound { handle: from.get() }.into());
        }
        if !graph.contains(to) {
            return Err(GraphError::NodeNotFound { handle: to.get() }.into());
        }

        let success = outcome.is_success();

        let Some(edge) = graph.edge(from, to) else {
            // First success between non-adjacent nodes creates trust:
            // the traversal itself just proved the connection.
            if success && self.config.add_edges {
                tracing::debug!(%from, %to, "creating edge from successful traversal");
                graph.add_edge_pair(from, to, EdgeBelief::new(1.0, self.config.sigma, 1.0, 1.0));
                return Ok(EdgeOutcome::Created);
            }
            return Ok(EdgeOutcome::Unchanged);
        };

        let posterior = self.posterior(edge.connectivity_probability, success);

        if !success {
            for (a, b) in [(from, to), (to, from)] {
                graph.update_edge(a, b, |e| e.connectivity_probability = posterior);
            }
            if self.config.remove_edges && posterior < self.config.removal_threshold {
                graph.remove_edge_pair(from, to);
                tracing::debug!(%from, %to, connectivity = posterior, "removing collapsed edge pair");
                return Ok(EdgeOutcome::Removed {
                    connectivity: posterior,
                });
            }
            return Ok(EdgeOutcome::Updated {
                connectivity: posterior,
            });
        }

        // Success: score the actual position against the target BEFORE
        // mutating anything, so an oracle failure abandons the update
        // with edge state untouched.
        let target = graph
            .waypoint(to)
            .expect("target was checked to be a live node");
        let (_, score) = oracle.get_reachability(observation, target)?;

        let (mu_prior, sigma_prior) = {
            let e = graph
                .edge(from, to)
                .expect("edge presence was checked above");
            (e.mu, e.sigma)
        };
        let fixed_sq = self.config.sigma * self.config.sigma;
        let prior_sq = sigma_prior * sigma_prior;
        let mu = (fixed_sq * mu_prior + prior_sq * score) / (prior_sq + fixed_sq);
        let sigma = (1.0 / (1.0 / prior_sq + 1.0 / fixed_sq)).sqrt();
        let weight = Normal::new(mu, sigma)
            .expect("merged sigma is positive")
            .sample(&mut self.rng)
            .max(0.0);

        for (a, b) in [(from, to), (to, from)] {
            graph.update_edge(a, b, |e| {
                e.connectivity_probability = posterior;
                e.mu = mu;
                e.sigma = sigma;
                e.weight = weight;
            });
        }
        tracing::debug!(%from, %to, connectivity = posterior, mu, "revised edge pair");
        Ok(EdgeOutcome::Updated {
            connectivity: posterior,
        })
    }

    /// Discrete Bayesian posterior for the pair's connectivity belief.
    fn posterior(&self, prior: f64, success: bool) -> f64 {
        let l_reachable = self.likelihood(success, true);
        let l_unreachable = self.likelihood(success, false);
        let joint = l_reachable * prior;
        let posterior = joint / (joint + l_unreachable * (1.0 - prior));
        posterior.min(self.config.max_connectivity)
    }

    fn likelihood(&self, success: bool, reachable: bool) -> f64 {
        match (success, reachable) {
            (true, true) => self.config.p_success_given_reachable,
            (true, false) => self.config.p_success_given_unreachable,
            (false, true) => 1.0 - self.config.p_success_given_reachable,
            (false, false) => 1.0 - self.config.p_success_given_unreachable,
        }
    }

    /// Merge nodes that have become duplicates of a neighbor.
    ///
    /// Two adjacent nodes whose out-neighbor sets differ by at most
    /// `max_unique_neighbors` (both with out-degree at least
    /// `min_degree_for_dedup`) describe the same place; the first node's
    /// unique edges are grafted onto the survivor and the node is
    /// removed. Run after a full topological navigation cycle.
    ///
    /// Returns the handles of removed nodes.
    pub fn deduplicate_nodes(&mut self, graph: &mut TopologyGraph) -> Vec<NodeHandle> {
        let nodes = graph.handles();
        let mut deleted: Vec<NodeHandle> = Vec::new();

        for &p in &nodes {
            for &q in &nodes {
                if p == q || deleted.contains(&p) || deleted.contains(&q) {
                    continue;
                }
                if !graph.has_edge(q, p) {
                    continue;
                }
                if !self.are_duplicates(graph, p, q) {
                    continue;
                }
                tracing::debug!(duplicate = %p, survivor = %q, "merging duplicate node");
                for neighbor in graph.out_neighbors(p) {
                    if neighbor != q && !graph.has_edge(q, neighbor) {
                        if let Some(belief) = graph.edge(p, neighbor).cloned() {
                            graph.add_edge_pair(q, neighbor, belief);
                        }
                    }
                }
                deleted.push(p);
            }
        }

        for &handle in &deleted {
            graph.remove_node(handle);
        }
        deleted
    }

    fn are_duplicates(&self, graph: &TopologyGraph, p: NodeHandle, q: NodeHandle) -> bool {
        let set_p: std::collections::BTreeSet<NodeHandle> =
            graph.out_neighbors(p).into_iter().collect();
        let set_q: std::collections::BTreeSet<NodeHandle> =
            graph.out_neighbors(q).into_iter().collect();
        let common = set_p.intersection(&set_q).count();

        common + self.config.max_unique_neighbors >= set_p.len()
            && common + self.config.max_unique_neighbors >= set_q.len()
            && set_p.len() >= self.config.min_degree_for_dedup
            && set_q.len() >= self.config.min_degree_for_dedup
    }
}
