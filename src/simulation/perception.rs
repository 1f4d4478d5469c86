//! Perception system - which agents each agent can see

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::AgentRegistry;
use crate::core::types::AgentId;
use crate::spatial::hex::HexCoord;

/// Another agent within perception range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceivedAgent {
    pub id: AgentId,
    pub coord: HexCoord,
    pub distance: u32,
}

#[derive(Debug, Clone)]
pub struct Perception {
    pub observer: AgentId,
    pub perceived: Vec<PerceivedAgent>,
}

/// Compute perceptions for `observers` from the registry's spatial index
///
/// Read-only over the registry, so observers are processed in parallel when
/// `parallel` is set. Results come back in observer order.
pub fn perception_system(
    registry: &AgentRegistry,
    observers: &[AgentId],
    range: u32,
    parallel: bool,
) -> Vec<Perception> {
    let perceive = |&observer: &AgentId| -> Option<Perception> {
        let center = registry.get(observer)?.position.coord;
        let perceived = registry
            .query_radius(center, range)
            .into_iter()
            .filter(|&id| id != observer)
            .filter_map(|id| {
                let other = registry.get(id)?;
                other.is_alive().then(|| PerceivedAgent {
                    id,
                    coord: other.position.coord,
                    distance: other.position.coord.distance(&center),
                })
            })
            .collect();
        Some(Perception { observer, perceived })
    };

    if parallel {
        observers.par_iter().filter_map(perceive).collect()
    } else {
        observers.iter().filter_map(perceive).collect()
    }
}
