use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{Coordinate, RoadWay};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("road lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("road lookup returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed road lookup response: {0}")]
    Malformed(String),
    #[error("road lookup exceeded the snapping budget")]
    BudgetExhausted,
}

/// Road-network lookup: ways tagged as roads around a point.
pub trait RoadLookup: Send + Sync {
    fn roads_near(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> impl Future<Output = Result<Vec<RoadWay>, LookupError>> + Send;
}

/// How far and how often to search around an unresolved candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_radius_m: f64,
    pub growth_factor: f64,
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_radius_m: 50.0,
            growth_factor: 5.0,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Search radii in attempt order: 50, 250, 1250 with the defaults.
    pub fn radii(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::successors(Some(self.initial_radius_m), |r| Some(r * self.growth_factor))
            .take(self.max_attempts)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapOutcome {
    Resolved {
        candidate: Coordinate,
        road: Coordinate,
        radius_m: f64,
        attempts: usize,
    },
    Unresolved {
        candidate: Coordinate,
        attempts: usize,
    },
}

impl SnapOutcome {
    pub fn road(&self) -> Option<Coordinate> {
        match self {
            SnapOutcome::Resolved { road, .. } => Some(*road),
            SnapOutcome::Unresolved { .. } => None,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            SnapOutcome::Resolved { attempts, .. } | SnapOutcome::Unresolved { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Per-candidate result of snapping a candidate ring onto roads.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapReport {
    pub start: Coordinate,
    pub outcomes: Vec<SnapOutcome>,
}

impl SnapReport {
    /// Start followed by every resolved road node, in candidate order.
    pub fn waypoints(&self) -> Vec<Coordinate> {
        std::iter::once(self.start)
            .chain(self.outcomes.iter().filter_map(SnapOutcome::road))
            .collect()
    }

    pub fn dropped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.road().is_none())
            .count()
    }
}

pub struct SnapResolver<'a, L> {
    lookup: &'a L,
    policy: RetryPolicy,
    budget: Option<Duration>,
}

impl<'a, L: RoadLookup> SnapResolver<'a, L> {
    pub fn new(lookup: &'a L, policy: RetryPolicy) -> Self {
        Self {
            lookup,
            policy,
            budget: None,
        }
    }

    /// Caps the wall-clock time spent across all candidates.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Keeps the first candidate as is and snaps every following one to a road.
    ///
    /// Candidates are handled one after another. A candidate whose lookups all
    /// miss is reported as [`SnapOutcome::Unresolved`] and contributes no waypoint.
    pub async fn resolve(&self, candidates: &[Coordinate]) -> Option<SnapReport> {
        let (&start, rest) = candidates.split_first()?;
        let deadline = self.budget.map(|budget| Instant::now() + budget);

        let mut outcomes = Vec::with_capacity(rest.len());
        for &candidate in rest {
            outcomes.push(self.snap(candidate, deadline).await);
        }

        let report = SnapReport { start, outcomes };
        let dropped = report.dropped();
        if dropped > 0 {
            tracing::warn!(
                "{} of {} candidates could not be snapped to a road",
                dropped,
                rest.len()
            );
        }
        Some(report)
    }

    async fn snap(&self, candidate: Coordinate, deadline: Option<Instant>) -> SnapOutcome {
        let mut attempts = 0;
        for radius_m in self.policy.radii() {
            attempts += 1;
            match self.lookup_once(candidate, radius_m, deadline).await {
                Ok(ways) => match first_node(&ways) {
                    Some(road) => {
                        tracing::debug!(
                            "snapped ({:.5}, {:.5}) -> ({:.5}, {:.5}) within {:.0} m",
                            candidate.lat,
                            candidate.lon,
                            road.lat,
                            road.lon,
                            radius_m
                        );
                        return SnapOutcome::Resolved {
                            candidate,
                            road,
                            radius_m,
                            attempts,
                        };
                    }
                    None => tracing::debug!(
                        "no road within {:.0} m of ({:.5}, {:.5})",
                        radius_m,
                        candidate.lat,
                        candidate.lon
                    ),
                },
                Err(err) => tracing::debug!(
                    "road lookup at {:.0} m around ({:.5}, {:.5}) failed: {}",
                    radius_m,
                    candidate.lat,
                    candidate.lon,
                    err
                ),
            }
        }

        SnapOutcome::Unresolved {
            candidate,
            attempts,
        }
    }

    async fn lookup_once(
        &self,
        candidate: Coordinate,
        radius_m: f64,
        deadline: Option<Instant>,
    ) -> Result<Vec<RoadWay>, LookupError> {
        let lookup = self.lookup.roads_near(candidate, radius_m);
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, lookup)
                .await
                .map_err(|_| LookupError::BudgetExhausted)?,
            None => lookup.await,
        }
    }
}

/// First node of the first way; an empty first way counts as a miss.
fn first_node(ways: &[RoadWay]) -> Option<Coordinate> {
    ways.first()?.nodes.first().copied()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Answers from a script of results and records every radius asked for.
    struct ScriptedLookup {
        script: Mutex<Vec<Result<Vec<RoadWay>, LookupError>>>,
        radii: Mutex<Vec<f64>>,
    }

    impl ScriptedLookup {
        fn new(mut script: Vec<Result<Vec<RoadWay>, LookupError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                radii: Mutex::new(Vec::new()),
            }
        }

        fn radii(&self) -> Vec<f64> {
            self.radii.lock().unwrap().clone()
        }
    }

    impl RoadLookup for ScriptedLookup {
        async fn roads_near(
            &self,
            _center: Coordinate,
            radius_m: f64,
        ) -> Result<Vec<RoadWay>, LookupError> {
            self.radii.lock().unwrap().push(radius_m);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LookupError::Malformed("script exhausted".into())))
        }
    }

    struct FailingLookup;

    impl RoadLookup for FailingLookup {
        async fn roads_near(
            &self,
            _center: Coordinate,
            _radius_m: f64,
        ) -> Result<Vec<RoadWay>, LookupError> {
            Err(LookupError::Malformed("offline".into()))
        }
    }

    struct SlowLookup;

    impl RoadLookup for SlowLookup {
        async fn roads_near(
            &self,
            center: Coordinate,
            _radius_m: f64,
        ) -> Result<Vec<RoadWay>, LookupError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(vec![way(center)])
        }
    }

    fn way(node: Coordinate) -> RoadWay {
        RoadWay { nodes: vec![node] }
    }

    fn ring() -> Vec<Coordinate> {
        vec![
            Coordinate::new(59.33, 18.07),
            Coordinate::new(59.34, 18.08),
            Coordinate::new(59.35, 18.07),
            Coordinate::new(59.33, 18.07),
        ]
    }

    #[test]
    fn default_radii_grow_fivefold() {
        let radii: Vec<f64> = RetryPolicy::default().radii().collect();
        assert_eq!(radii, vec![50.0, 250.0, 1250.0]);
    }

    #[tokio::test]
    async fn failing_lookup_leaves_only_start() {
        let candidates = ring();
        let report = SnapResolver::new(&FailingLookup, RetryPolicy::default())
            .resolve(&candidates)
            .await
            .unwrap();

        assert_eq!(report.waypoints(), vec![candidates[0]]);
        assert_eq!(report.dropped(), 3);
        assert!(report.outcomes.iter().all(|o| o.attempts() == 3));
    }

    #[tokio::test]
    async fn retries_stop_after_three_attempts() {
        let lookup = ScriptedLookup::new(vec![Ok(vec![]), Ok(vec![]), Ok(vec![])]);
        let candidates = &ring()[..2];
        let report = SnapResolver::new(&lookup, RetryPolicy::default())
            .resolve(candidates)
            .await
            .unwrap();

        assert_eq!(lookup.radii(), vec![50.0, 250.0, 1250.0]);
        assert_eq!(report.waypoints().len(), 1);
    }

    #[tokio::test]
    async fn second_attempt_resolves_candidate() {
        let road = Coordinate::new(59.341, 18.081);
        let lookup = ScriptedLookup::new(vec![
            Err(LookupError::Malformed("timeout".into())),
            Ok(vec![way(road), way(Coordinate::new(0.0, 0.0))]),
        ]);
        let candidates = &ring()[..2];
        let report = SnapResolver::new(&lookup, RetryPolicy::default())
            .resolve(candidates)
            .await
            .unwrap();

        assert_eq!(lookup.radii(), vec![50.0, 250.0]);
        assert_eq!(
            report.outcomes[0],
            SnapOutcome::Resolved {
                candidate: candidates[1],
                road,
                radius_m: 250.0,
                attempts: 2,
            }
        );
        assert_eq!(report.waypoints(), vec![candidates[0], road]);
    }

    #[tokio::test]
    async fn empty_first_way_counts_as_miss() {
        let road = Coordinate::new(59.35, 18.06);
        let lookup = ScriptedLookup::new(vec![
            Ok(vec![RoadWay { nodes: vec![] }, way(Coordinate::new(1.0, 1.0))]),
            Ok(vec![way(road)]),
        ]);
        let report = SnapResolver::new(&lookup, RetryPolicy::default())
            .resolve(&ring()[..2])
            .await
            .unwrap();

        assert_eq!(report.outcomes[0].road(), Some(road));
    }

    #[tokio::test]
    async fn dropped_candidates_keep_order_of_the_rest() {
        let a = Coordinate::new(59.341, 18.081);
        let c = Coordinate::new(59.331, 18.071);
        let lookup = ScriptedLookup::new(vec![
            Ok(vec![way(a)]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![way(c)]),
        ]);
        let candidates = ring();
        let report = SnapResolver::new(&lookup, RetryPolicy::default())
            .resolve(&candidates)
            .await
            .unwrap();

        assert_eq!(report.waypoints(), vec![candidates[0], a, c]);
        assert_eq!(report.dropped(), 1);
        assert!(matches!(
            report.outcomes[1],
            SnapOutcome::Unresolved { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn empty_candidate_list_yields_nothing() {
        let report = SnapResolver::new(&FailingLookup, RetryPolicy::default())
            .resolve(&[])
            .await;
        assert!(report.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_drops_remaining_candidates() {
        let candidates = ring();
        let report = SnapResolver::new(&SlowLookup, RetryPolicy::default())
            .with_budget(Duration::from_secs(1))
            .resolve(&candidates)
            .await
            .unwrap();

        assert_eq!(report.waypoints(), vec![candidates[0]]);
        assert_eq!(report.dropped(), 3);
    }
}
