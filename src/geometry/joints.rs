/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

use std::collections::HashMap;

use glam::DVec3;
use itertools::Itertools;
use log::{debug, warn};

use crate::config::EngineConfig;
use crate::error::GeometryError;
use crate::geometry::frame::LocalFrame;
use crate::geometry::segment::closest_endpoints;
use crate::model::{ElementId, Foundation, Joint, Member};

/// Everything the resolver derived from the member lines
#[derive(Debug, Clone, Default)]
pub struct ResolvedGeometry {
    pub joints: Vec<Joint>,
    pub frames: HashMap<ElementId, LocalFrame>,
    /// Well formed members that ended up in no joint
    pub disconnected: Vec<ElementId>,
    pub skipped: Vec<GeometryError>,
}

struct Candidate {
    position: DVec3,
    members: Vec<usize>,
}

/// Local frames of every well formed member. Degenerate members are skipped with a warning.
pub fn member_frames(members: &[Member]) -> (HashMap<ElementId, LocalFrame>, Vec<GeometryError>) {
    let mut frames = HashMap::new();
    let mut skipped = Vec::new();
    for member in members {
        match LocalFrame::for_member(member) {
            Ok(frame) => {
                frames.insert(member.id.clone(), frame);
            }
            Err(error) => {
                warn!("Skipping member: {error}");
                skipped.push(error);
            }
        }
    }
    (frames, skipped)
}

/// Mean of each member's endpoint nearest to `near`
pub fn intersection_point<'a>(members: impl IntoIterator<Item = &'a Member>, near: DVec3) -> Option<DVec3> {
    let ends: Vec<DVec3> = members
        .into_iter()
        .filter(|member| member.is_finite())
        .map(|member| member.nearest_end(near))
        .collect();
    if ends.is_empty() {
        return None;
    }
    Some(ends.iter().copied().sum::<DVec3>() / ends.len() as f64)
}

/// Infer joints from member endpoints.
///
/// Every pair of members whose nearest endpoints are within the joint tolerance
/// yields a candidate at the midpoint of those endpoints. Near-vertical members
/// standing on the base elevation yield a single-member support candidate.
/// Candidates within tolerance of each other are merged transitively.
pub fn resolve(members: &[Member], foundation: Option<&Foundation>, config: &EngineConfig) -> ResolvedGeometry {
    let tolerance = config.joint_tolerance_mm;
    let (frames, skipped) = member_frames(members);
    let usable: Vec<usize> = (0..members.len())
        .filter(|&index| frames.contains_key(&members[index].id))
        .collect();

    let mut candidates = Vec::new();
    for (&i, &j) in usable.iter().tuple_combinations() {
        let a = &members[i];
        let b = &members[j];
        let (p, q, distance) = closest_endpoints((a.start, a.end), (b.start, b.end));
        if distance < tolerance {
            candidates.push(Candidate {
                position: (p + q) / 2.0,
                members: vec![i, j],
            });
        }
    }

    let base = match foundation {
        Some(foundation) => foundation.elevation,
        None => usable
            .iter()
            .map(|&index| members[index].lowest_elevation())
            .min_by(f64::total_cmp)
            .unwrap_or(0.0),
    };
    for &index in &usable {
        let member = &members[index];
        let standing = frames
            .get(&member.id)
            .is_some_and(|frame| frame.is_vertical(config.vertical_tolerance()));
        if standing && (member.lowest_elevation() - base).abs() <= config.elevation_tolerance_mm {
            let foot = if member.start.z <= member.end.z {
                member.start
            } else {
                member.end
            };
            candidates.push(Candidate {
                position: foot,
                members: vec![index],
            });
        }
    }

    let groups = merge(&candidates, tolerance);
    let mut joints = Vec::with_capacity(groups.len());
    for group in groups {
        let centroid = group
            .iter()
            .map(|&c| candidates[c].position)
            .sum::<DVec3>()
            / group.len() as f64;
        let indices: Vec<usize> = group
            .iter()
            .flat_map(|&c| candidates[c].members.iter().copied())
            .sorted()
            .dedup()
            .collect();
        let joined: Vec<&Member> = indices.iter().map(|&index| &members[index]).collect();
        let Some(position) = intersection_point(joined.iter().copied(), centroid) else {
            continue;
        };
        let spread = joined
            .iter()
            .map(|member| member.nearest_end(position).distance(position))
            .fold(0.0, f64::max);
        let confidence = (1.0 - 0.5 * spread / tolerance).clamp(0.5, 1.0);
        joints.push(Joint {
            id: format!("J{}", joints.len() + 1),
            position,
            members: joined.iter().map(|member| member.id.clone()).collect(),
            confidence,
        });
    }

    let disconnected: Vec<ElementId> = usable
        .iter()
        .map(|&index| &members[index].id)
        .filter(|id| !joints.iter().any(|joint| joint.has_member(id)))
        .cloned()
        .collect();
    for id in &disconnected {
        warn!("Member {id} meets no other member within {tolerance} mm");
    }
    debug!(
        "Resolved {} joints from {} members ({} skipped)",
        joints.len(),
        members.len(),
        skipped.len()
    );
    ResolvedGeometry {
        joints,
        frames,
        disconnected,
        skipped,
    }
}

/// Transitive grouping of candidates closer than `tolerance`, in order of first appearance
fn merge(candidates: &[Candidate], tolerance: f64) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..candidates.len()).collect();
    fn root(parent: &mut [usize], mut index: usize) -> usize {
        while parent[index] != index {
            parent[index] = parent[parent[index]];
            index = parent[index];
        }
        index
    }
    for (a, b) in (0..candidates.len()).tuple_combinations() {
        if candidates[a].position.distance(candidates[b].position) < tolerance {
            let (ra, rb) = (root(&mut parent, a), root(&mut parent, b));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }
    }
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for index in 0..candidates.len() {
        let r = root(&mut parent, index);
        match slot.get(&r) {
            Some(&g) => groups[g].push(index),
            None => {
                slot.insert(r, groups.len());
                groups.push(vec![index]);
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Footprint;
    use glam::DVec2;

    fn beam(id: &str, start: (f64, f64, f64), end: (f64, f64, f64)) -> Member {
        Member::new(id, DVec3::from(start), DVec3::from(end), "IPE300")
    }

    #[test]
    fn test_shared_endpoint_makes_one_joint() {
        let members = vec![
            beam("M1", (0.0, 0.0, 0.0), (3000.0, 0.0, 0.0)),
            beam("M2", (3040.0, 30.0, 0.0), (6000.0, 0.0, 0.0)),
        ];
        let resolved = resolve(&members, None, &EngineConfig::default());
        assert_eq!(resolved.joints.len(), 1);
        let joint = &resolved.joints[0];
        assert_eq!(joint.members, vec!["M1", "M2"]);
        for member in &members {
            assert!(member.nearest_end(joint.position).distance(joint.position) < 100.0);
        }
        assert!(joint.confidence < 1.0 && joint.confidence >= 0.5);
        assert!(resolved.disconnected.is_empty());
    }

    #[test]
    fn test_distant_members_make_no_joint() {
        let members = vec![
            beam("M1", (0.0, 0.0, 0.0), (3000.0, 0.0, 0.0)),
            beam("M2", (3150.0, 0.0, 0.0), (6000.0, 0.0, 0.0)),
        ];
        let resolved = resolve(&members, None, &EngineConfig::default());
        assert!(resolved.joints.is_empty());
        assert_eq!(resolved.disconnected, vec!["M1", "M2"]);
    }

    #[test]
    fn test_three_members_merge_into_one_joint() {
        let members = vec![
            beam("C1", (0.0, 0.0, 0.0), (0.0, 0.0, 3000.0)),
            beam("B1", (0.0, 0.0, 3000.0), (4000.0, 0.0, 3000.0)),
            beam("B2", (0.0, 10.0, 3010.0), (0.0, 5000.0, 3000.0)),
        ];
        let resolved = resolve(&members, None, &EngineConfig::default());
        let top: Vec<&Joint> = resolved
            .joints
            .iter()
            .filter(|joint| joint.position.z > 1000.0)
            .collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].members.len(), 3);
    }

    #[test]
    fn test_column_on_foundation_gets_support_joint() {
        let members = vec![beam("C1", (500.0, 500.0, 0.0), (500.0, 500.0, 3000.0))];
        let foundation = Foundation {
            elevation: 0.0,
            footprint: Footprint {
                min: DVec2::ZERO,
                max: DVec2::splat(1000.0),
            },
        };
        let resolved = resolve(&members, Some(&foundation), &EngineConfig::default());
        assert_eq!(resolved.joints.len(), 1);
        assert_eq!(resolved.joints[0].position, DVec3::new(500.0, 500.0, 0.0));
        assert_eq!(resolved.joints[0].confidence, 1.0);
    }

    #[test]
    fn test_degenerate_member_skipped() {
        let members = vec![
            beam("M1", (0.0, 0.0, 0.0), (3000.0, 0.0, 0.0)),
            beam("BAD", (3000.0, 0.0, 0.0), (3000.0, 0.0, 0.0)),
            beam("M2", (3000.0, 0.0, 0.0), (6000.0, 0.0, 0.0)),
        ];
        let resolved = resolve(&members, None, &EngineConfig::default());
        assert_eq!(resolved.skipped.len(), 1);
        assert_eq!(resolved.joints.len(), 1);
        assert!(!resolved.frames.contains_key("BAD"));
    }
}
