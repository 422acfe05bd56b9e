use crate::models::{PathGeometry, Step};

/// Turn-by-turn instructions for a routed path.
///
/// The last step of every leg is the arrival at that leg's waypoint and is
/// skipped, so the result has `step_count - leg_count` entries.
pub fn extract_directions(path: &PathGeometry) -> Vec<String> {
    path.legs
        .iter()
        .flat_map(|leg| leg.steps.split_last().map_or(&[][..], |(_, rest)| rest))
        .map(format_step)
        .collect()
}

fn format_step(step: &Step) -> String {
    format!("{} ({} meters)", step.instruction, step.distance_m.round() as i64)
}
