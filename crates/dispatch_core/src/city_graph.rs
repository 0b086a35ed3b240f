//! Street graph of a grid city and shortest-path queries between continuous
//! positions.
//!
//! Vertices are intersections. Two intersections are joined by a street
//! segment when they share a row or a column and no other intersection lies
//! between them. All-pairs distances are precomputed once with Floyd–Warshall;
//! queries between arbitrary positions then reduce to a handful of matrix
//! lookups plus the residual distance along the segment each position sits on.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, GraphError, Result};
use crate::geometry::{Position, EPSILON};

/// Default number of memoized position-to-position routes.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 4_096;

/// Index of an intersection in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

/// Result of a route query between two positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Street distance along the route.
    pub distance: f64,
    /// Origin, every intersection passed, destination.
    pub waypoints: Vec<Position>,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: usize,
    b: usize,
    length: f64,
}

impl Segment {
    /// Whether `pos` lies strictly between the endpoints.
    fn contains_interior(&self, pos: &Position, positions: &[Position]) -> bool {
        let (pa, pb) = (positions[self.a], positions[self.b]);
        if pa.y == pb.y {
            pos.y == pa.y && pos.x > pa.x.min(pb.x) && pos.x < pa.x.max(pb.x)
        } else {
            pos.x == pa.x && pos.y > pa.y.min(pb.y) && pos.y < pa.y.max(pb.y)
        }
    }
}

/// Where a position attaches to the graph.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Vertex(usize),
    Segment(usize),
}

type RouteKey = ((u64, u64), (u64, u64));

pub struct CityGraph {
    positions: Vec<Position>,
    index: HashMap<(u64, u64), usize>,
    neighbors: Vec<Vec<(usize, f64)>>,
    segments: Vec<Segment>,
    distance: Vec<Vec<f64>>,
    predecessor: Vec<Vec<Option<usize>>>,
    route_cache: Mutex<LruCache<RouteKey, RouteResult>>,
}

impl fmt::Debug for CityGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CityGraph")
            .field("intersections", &self.positions.len())
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl CityGraph {
    /// Build the graph from a set of unique intersections.
    ///
    /// Fails when the set is empty, contains duplicates, or any corner of its
    /// bounding rectangle is not itself an intersection.
    pub fn new(intersections: &[Position]) -> Result<Self> {
        Self::with_cache_capacity(intersections, DEFAULT_ROUTE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(intersections: &[Position], capacity: usize) -> Result<Self> {
        if intersections.is_empty() {
            return Err(DispatchError::Configuration(
                "intersection list is empty".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(intersections.len());
        for (i, pos) in intersections.iter().enumerate() {
            if !pos.x.is_finite() || !pos.y.is_finite() {
                return Err(DispatchError::Configuration(format!(
                    "intersection {pos} has a non-finite coordinate"
                )));
            }
            if index.insert(pos.key(), i).is_some() {
                return Err(DispatchError::Configuration(format!(
                    "duplicated intersection {pos}"
                )));
            }
        }

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for pos in intersections {
            min_x = min_x.min(pos.x);
            max_x = max_x.max(pos.x);
            min_y = min_y.min(pos.y);
            max_y = max_y.max(pos.y);
        }
        for corner in [
            Position::new(min_x, min_y),
            Position::new(min_x, max_y),
            Position::new(max_x, min_y),
            Position::new(max_x, max_y),
        ] {
            if !index.contains_key(&corner.key()) {
                return Err(DispatchError::Configuration(format!(
                    "bounding corner {corner} is not an intersection"
                )));
            }
        }

        let positions = intersections.to_vec();
        let neighbors = axis_neighbors(&positions);

        let mut segments = Vec::new();
        for (u, adjacent) in neighbors.iter().enumerate() {
            for &(v, length) in adjacent {
                if u < v {
                    segments.push(Segment { a: u, b: v, length });
                }
            }
        }

        let (distance, predecessor) = floyd_warshall(&neighbors);

        Ok(Self {
            positions,
            index,
            neighbors,
            segments,
            distance,
            predecessor,
            route_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn intersections(&self) -> &[Position] {
        &self.positions
    }

    pub fn vertex_id(&self, pos: &Position) -> Option<VertexId> {
        self.index.get(&pos.key()).copied().map(VertexId)
    }

    /// Position of a vertex. Panics on an id from another graph.
    pub fn position(&self, vertex: VertexId) -> Position {
        self.positions[vertex.0]
    }

    /// Street segments leaving `vertex` as `(neighbor, length)` pairs.
    pub fn neighbors(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.neighbors[vertex.0]
            .iter()
            .map(|&(v, length)| (VertexId(v), length))
    }

    /// Precomputed shortest distance; `f64::INFINITY` when disconnected.
    pub fn shortest_distance(&self, u: VertexId, v: VertexId) -> f64 {
        self.distance[u.0][v.0]
    }

    /// Vertices along a shortest path from `u` to `v`, both included.
    pub fn shortest_path(&self, u: VertexId, v: VertexId) -> Result<Vec<VertexId>> {
        if u == v {
            return Ok(vec![u]);
        }
        if !self.distance[u.0][v.0].is_finite() {
            return Err(GraphError::Unreachable {
                from: self.positions[u.0],
                to: self.positions[v.0],
            }
            .into());
        }

        let mut path = vec![v];
        let mut current = v.0;
        while current != u.0 {
            current = self.predecessor[u.0][current].ok_or(GraphError::Unreachable {
                from: self.positions[u.0],
                to: self.positions[v.0],
            })?;
            path.push(VertexId(current));
        }
        path.reverse();
        Ok(path)
    }

    /// Shortest street route between two arbitrary positions.
    ///
    /// A position that is not an intersection must lie strictly inside one
    /// street segment; both endpoints of that segment are tried as anchors.
    pub fn position_distance(&self, from: &Position, to: &Position) -> Result<RouteResult> {
        let key = (from.key(), to.key());
        if let Ok(mut cache) = self.route_cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let route = self.compute_route(from, to)?;

        if let Ok(mut cache) = self.route_cache.lock() {
            cache.put(key, route.clone());
        }
        Ok(route)
    }

    fn compute_route(&self, from: &Position, to: &Position) -> Result<RouteResult> {
        let from_anchor = self.locate(from)?;
        let to_anchor = self.locate(to)?;

        let mut best_distance = f64::INFINITY;
        let mut best_pair: Option<(usize, usize)> = None;

        if let (Anchor::Segment(a), Anchor::Segment(b)) = (from_anchor, to_anchor) {
            if a == b {
                best_distance = from.manhattan(to);
            }
        }

        for (u, from_residual) in self.anchor_vertices(from, from_anchor) {
            for (v, to_residual) in self.anchor_vertices(to, to_anchor) {
                let candidate = from_residual + self.distance[u][v] + to_residual;
                if candidate < best_distance {
                    best_distance = candidate;
                    best_pair = Some((u, v));
                }
            }
        }

        if !best_distance.is_finite() {
            return Err(GraphError::Unreachable {
                from: *from,
                to: *to,
            }
            .into());
        }

        let mut waypoints = vec![*from];
        if let Some((u, v)) = best_pair {
            for vertex in self.shortest_path(VertexId(u), VertexId(v))? {
                push_waypoint(&mut waypoints, self.positions[vertex.0]);
            }
        }
        push_waypoint(&mut waypoints, *to);

        Ok(RouteResult {
            distance: best_distance,
            waypoints,
        })
    }

    /// Every continuous position whose shortest street distance from `start`
    /// is exactly `distance`.
    ///
    /// A point inside segment `(v, w)` reached through `v` is kept only when
    /// approaching it from `w` is not strictly shorter. Output is sorted and
    /// free of duplicates.
    pub fn positions_at_distance(&self, start: VertexId, distance: f64) -> Vec<Position> {
        let mut found: Vec<Position> = Vec::new();
        if !distance.is_finite() || distance < 0.0 {
            return found;
        }

        let row = &self.distance[start.0];
        for (v, &to_v) in row.iter().enumerate() {
            if to_v > distance {
                continue;
            }
            let residual = distance - to_v;
            let origin = self.positions[v];
            if residual <= EPSILON {
                push_unique(&mut found, origin);
            }
            for &(w, length) in &self.neighbors[v] {
                if residual >= length {
                    continue;
                }
                let target = self.positions[w];
                let t = residual / length;
                let point = Position::new(
                    origin.x + (target.x - origin.x) * t,
                    origin.y + (target.y - origin.y) * t,
                );
                let from_other_side = row[w] + (length - residual);
                if distance <= from_other_side + EPSILON {
                    push_unique(&mut found, point);
                }
            }
        }

        found.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        found
    }

    fn locate(&self, pos: &Position) -> Result<Anchor> {
        if let Some(&vertex) = self.index.get(&pos.key()) {
            return Ok(Anchor::Vertex(vertex));
        }
        self.segments
            .iter()
            .position(|segment| segment.contains_interior(pos, &self.positions))
            .map(Anchor::Segment)
            .ok_or_else(|| GraphError::UnknownPosition(*pos).into())
    }

    /// Candidate vertices for a located position with the residual distance
    /// between the position and each of them.
    fn anchor_vertices(&self, pos: &Position, anchor: Anchor) -> Vec<(usize, f64)> {
        match anchor {
            Anchor::Vertex(v) => vec![(v, 0.0)],
            Anchor::Segment(s) => {
                let segment = self.segments[s];
                vec![
                    (segment.a, pos.manhattan(&self.positions[segment.a])),
                    (segment.b, pos.manhattan(&self.positions[segment.b])),
                ]
            }
        }
    }
}

/// For each intersection, the nearest intersection in each of the four axis
/// directions.
fn axis_neighbors(positions: &[Position]) -> Vec<Vec<(usize, f64)>> {
    positions
        .iter()
        .map(|origin| {
            // left, right, down, up
            let mut nearest: [Option<(usize, f64)>; 4] = [None; 4];
            for (j, other) in positions.iter().enumerate() {
                let slot = if other.y == origin.y && other.x < origin.x {
                    0
                } else if other.y == origin.y && other.x > origin.x {
                    1
                } else if other.x == origin.x && other.y < origin.y {
                    2
                } else if other.x == origin.x && other.y > origin.y {
                    3
                } else {
                    continue;
                };
                let length = origin.manhattan(other);
                if nearest[slot].map_or(true, |(_, best)| length < best) {
                    nearest[slot] = Some((j, length));
                }
            }
            nearest.into_iter().flatten().collect()
        })
        .collect()
}

fn floyd_warshall(neighbors: &[Vec<(usize, f64)>]) -> (Vec<Vec<f64>>, Vec<Vec<Option<usize>>>) {
    let n = neighbors.len();
    let mut distance = vec![vec![f64::INFINITY; n]; n];
    let mut predecessor = vec![vec![None; n]; n];

    for (u, adjacent) in neighbors.iter().enumerate() {
        distance[u][u] = 0.0;
        predecessor[u][u] = Some(u);
        for &(v, length) in adjacent {
            distance[u][v] = length;
            predecessor[u][v] = Some(u);
        }
    }

    for k in 0..n {
        for i in 0..n {
            let via_k = distance[i][k];
            if !via_k.is_finite() {
                continue;
            }
            for j in 0..n {
                let candidate = via_k + distance[k][j];
                if candidate < distance[i][j] {
                    distance[i][j] = candidate;
                    predecessor[i][j] = predecessor[k][j];
                }
            }
        }
    }

    (distance, predecessor)
}

fn push_waypoint(waypoints: &mut Vec<Position>, pos: Position) {
    if waypoints.last().map_or(true, |last| !last.approx_eq(&pos)) {
        waypoints.push(pos);
    }
}

fn push_unique(found: &mut Vec<Position>, pos: Position) {
    if !found.iter().any(|existing| existing.approx_eq(&pos)) {
        found.push(pos);
    }
}
