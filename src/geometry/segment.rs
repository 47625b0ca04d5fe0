/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Distances between member lines, used for joint inference and member clash checks.

use glam::DVec3;

const EPSILON: f64 = 1e-10;

/// Closest approach of two segments, with the parameters of the closest points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closest {
    pub distance: f64,
    /// Parameter along the first segment, 0 at `p1` and 1 at `q1`
    pub s: f64,
    /// Parameter along the second segment
    pub t: f64,
}

/// Closest points of segments (p1, q1) and (p2, q2), after Ericson's
/// "Real-Time Collision Detection".
pub fn segment_closest(p1: DVec3, q1: DVec3, p2: DVec3, q2: DVec3) -> Closest {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return Closest {
            distance: r.length(),
            s: 0.0,
            t: 0.0,
        };
    }

    let (mut s, mut t);
    if a <= EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // parallel segments: any s will do
            s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }

    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    Closest {
        distance: c1.distance(c2),
        s,
        t,
    }
}

pub fn segment_min_distance(p1: DVec3, q1: DVec3, p2: DVec3, q2: DVec3) -> f64 {
    segment_closest(p1, q1, p2, q2).distance
}

pub fn point_segment_distance(point: DVec3, a: DVec3, b: DVec3) -> f64 {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared <= EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / length_squared).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// The nearest of the four endpoint pairings of two segments
pub fn closest_endpoints(a: (DVec3, DVec3), b: (DVec3, DVec3)) -> (DVec3, DVec3, f64) {
    [(a.0, b.0), (a.0, b.1), (a.1, b.0), (a.1, b.1)]
        .into_iter()
        .map(|(p, q)| (p, q, p.distance(q)))
        .fold((a.0, b.0, f64::INFINITY), |best, next| {
            if next.2 < best.2 {
                next
            } else {
                best
            }
        })
}
