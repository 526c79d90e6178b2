// -------------------------------------------------------------------------------------------------
//  Copyright (c) 2026 HyQuery Contributors
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// -------------------------------------------------------------------------------------------------

//! The aggregation view consumed by the request handler: merges
//! local host state with a coordinator's remote view. Purely derived, no
//! independent lifecycle of its own.

use std::sync::Arc;

use hyquery_coordinator::{Aggregate, FleetCoordinator};

/// Composes local state with an optional fleet coordinator. A non-primary
/// (or a primary with no coordinator configured) always reports the empty
/// aggregate.
pub struct AggregationView {
    coordinator: Option<Arc<dyn FleetCoordinator>>,
}

impl AggregationView {
    /// `coordinator` is `None` for a non-primary, or a primary that hasn't
    /// enabled networking.
    #[must_use]
    pub fn new(coordinator: Option<Arc<dyn FleetCoordinator>>) -> Self {
        Self { coordinator }
    }

    /// A view with no coordinator at all: every call returns the empty aggregate.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Returns the current fleet aggregate, or the empty one if this node
    /// isn't a primary with networking enabled.
    ///
    /// # Errors
    ///
    /// Propagates the coordinator's error per the fail-closed policy for
    /// shared-store mode; the caller must not substitute a local-only answer.
    pub async fn get_aggregate(&self, include_players: bool) -> anyhow::Result<Aggregate> {
        match &self.coordinator {
            Some(coordinator) => Ok(coordinator.get_aggregate(include_players).await?),
            None => Ok(Aggregate::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hyquery_coordinator::CoordinatorError;

    use super::*;

    struct FixedCoordinator(Aggregate);

    #[async_trait]
    impl FleetCoordinator for FixedCoordinator {
        async fn get_aggregate(&self, _include_players: bool) -> Result<Aggregate, CoordinatorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingCoordinator;

    #[async_trait]
    impl FleetCoordinator for FailingCoordinator {
        async fn get_aggregate(&self, _include_players: bool) -> Result<Aggregate, CoordinatorError> {
            Err(CoordinatorError::StoreUnavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn disabled_view_always_reports_empty() {
        let view = AggregationView::disabled();
        let aggregate = view.get_aggregate(true).await.unwrap();
        assert_eq!(aggregate, Aggregate::empty());
    }

    #[tokio::test]
    async fn view_passes_through_the_coordinators_aggregate() {
        let mut aggregate = Aggregate::empty();
        aggregate.total_online = 7;
        let view = AggregationView::new(Some(Arc::new(FixedCoordinator(aggregate.clone()))));
        assert_eq!(view.get_aggregate(false).await.unwrap(), aggregate);
    }

    #[tokio::test]
    async fn view_propagates_coordinator_errors_instead_of_falling_back() {
        let view = AggregationView::new(Some(Arc::new(FailingCoordinator)));
        assert!(view.get_aggregate(true).await.is_err());
    }
}
