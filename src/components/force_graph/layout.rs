//! Force-directed layout simulation.
//!
//! The step follows d3-force: every force adds to node velocities computed from
//! the previous positions, then positions are integrated in one pass. Forces are
//! scaled by `alpha`, which decays toward `alpha_target` and stops the
//! simulation once it falls below `alpha_min`.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::LayoutError;
use super::model::Graph;
use super::types::{Bounds, Point};

/// Alpha target held while a node is being dragged.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

const MIN_DISTANCE_SQ: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
	/// Strength of the mutual n-body repulsion.
	pub repulsion: f64,
	/// Rest length of the link springs.
	pub link_distance: f64,
	/// Pull toward the layout center, per unit of distance.
	pub center_strength: f64,
	/// Minimum separation radius of each node.
	pub collision_radius: f64,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	pub velocity_decay: f64,
}

impl Default for LayoutSettings {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			repulsion: 200.0,
			link_distance: 100.0,
			center_strength: 0.05,
			collision_radius: 12.0,
			alpha_min,
			// Reaches alpha_min after ~300 ticks from alpha = 1.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
		}
	}
}

impl LayoutSettings {
	/// Rejects non-finite values and clamps the rest into a stable range.
	pub fn validated(self) -> Result<Self, LayoutError> {
		let check = |name: &'static str, value: f64, lo: f64, hi: f64| {
			if !value.is_finite() {
				return Err(LayoutError::InvalidSetting { name, value });
			}
			let clamped = value.clamp(lo, hi);
			if clamped != value {
				warn!("layout setting {name}={value} clamped to {clamped}");
			}
			Ok(clamped)
		};
		Ok(Self {
			repulsion: check("repulsion", self.repulsion, 0.0, 10_000.0)?,
			link_distance: check("linkDistance", self.link_distance, 1.0, 2_000.0)?,
			center_strength: check("centerStrength", self.center_strength, 0.0, 1.0)?,
			collision_radius: check("collisionRadius", self.collision_radius, 0.0, 500.0)?,
			alpha_min: check("alphaMin", self.alpha_min, 1e-6, 0.5)?,
			alpha_decay: check("alphaDecay", self.alpha_decay, 1e-4, 1.0)?,
			velocity_decay: check("velocityDecay", self.velocity_decay, 0.0, 1.0)?,
		})
	}
}

/// Result of a single [`ForceLayout::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
	/// Nothing to simulate, positions unchanged.
	Idle,
	/// Positions moved this tick.
	Running,
	/// Positions moved and alpha dropped below the threshold; the simulation stopped.
	Settled,
}

#[derive(Clone, Debug)]
struct SimNode {
	id: String,
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	pin: Option<Point>,
}

#[derive(Clone, Debug)]
struct SimLink {
	source: usize,
	target: usize,
	strength: f64,
	bias: f64,
}

/// Deterministic jiggle source for breaking exact coincidences (xorshift64*).
#[derive(Clone, Debug)]
struct Jiggle(u64);

impl Jiggle {
	fn next(&mut self) -> f64 {
		self.0 ^= self.0 >> 12;
		self.0 ^= self.0 << 25;
		self.0 ^= self.0 >> 27;
		let unit = (self.0.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11) as f64 / (1u64 << 53) as f64;
		(unit - 0.5) * 1e-6
	}
}

pub struct ForceLayout {
	nodes: Vec<SimNode>,
	index: HashMap<String, usize>,
	links: Vec<SimLink>,
	settings: LayoutSettings,
	center: Point,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	jiggle: Jiggle,
}

impl ForceLayout {
	pub fn new(settings: LayoutSettings, center: Point) -> Self {
		Self {
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			settings,
			center,
			alpha: 1.0,
			alpha_target: 0.0,
			running: false,
			jiggle: Jiggle(0x9E37_79B9_7F4A_7C15),
		}
	}

	/// Rebuilds the simulation from `graph` and starts stepping.
	pub fn start(&mut self, graph: &Graph, settings: LayoutSettings) -> Result<(), LayoutError> {
		self.settings = settings.validated()?;
		self.nodes.clear();
		self.index.clear();
		self.sync_graph(graph);
		self.restart();
		debug!(
			"layout started with {} nodes and {} links",
			self.nodes.len(),
			self.links.len()
		);
		Ok(())
	}

	/// Reconciles simulation nodes with the graph after a structural change.
	///
	/// Surviving nodes keep their position, velocity and pin. New nodes take the
	/// graph position when present, otherwise a seat on a circle around the center.
	pub fn sync_graph(&mut self, graph: &Graph) {
		let mut previous: HashMap<String, SimNode> = self
			.nodes
			.drain(..)
			.map(|n| (n.id.clone(), n))
			.collect();
		let count = graph.nodes().len().max(1) as f64;
		let (center, radius) = (self.center, self.settings.link_distance);

		self.nodes = graph
			.nodes()
			.iter()
			.enumerate()
			.map(|(i, node)| {
				if let Some(existing) = previous.remove(&node.id) {
					return existing;
				}
				let seed = node.position().unwrap_or_else(|| {
					let angle = i as f64 * 2.0 * PI / count;
					Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
				});
				let pin = node.is_pinned().then_some(seed);
				SimNode {
					id: node.id.clone(),
					x: seed.x,
					y: seed.y,
					vx: 0.0,
					vy: 0.0,
					pin,
				}
			})
			.collect();
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();

		let mut degree = vec![0usize; self.nodes.len()];
		let pairs: Vec<(usize, usize)> = graph
			.edges()
			.iter()
			.filter_map(|e| Some((*self.index.get(&e.source)?, *self.index.get(&e.target)?)))
			.collect();
		for &(s, t) in &pairs {
			degree[s] += 1;
			degree[t] += 1;
		}
		self.links = pairs
			.into_iter()
			.map(|(source, target)| {
				let (ds, dt) = (degree[source] as f64, degree[target] as f64);
				SimLink {
					source,
					target,
					strength: 1.0 / ds.min(dt),
					bias: ds / (ds + dt),
				}
			})
			.collect();
	}

	/// Moves nodes to the positions recorded in `graph` and applies their pinned flag.
	pub fn adopt_positions(&mut self, graph: &Graph) {
		for node in graph.nodes() {
			let Some(&i) = self.index.get(&node.id) else {
				continue;
			};
			let sim = &mut self.nodes[i];
			if let Some(p) = node.position() {
				sim.x = p.x;
				sim.y = p.y;
				sim.vx = 0.0;
				sim.vy = 0.0;
			}
			sim.pin = node.is_pinned().then_some(Point::new(sim.x, sim.y));
		}
	}

	/// Advances the simulation by one step.
	pub fn tick(&mut self) -> TickStatus {
		if self.nodes.is_empty() || !self.running {
			return TickStatus::Idle;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.settings.alpha_decay;
		let alpha = self.alpha;

		self.apply_links(alpha);
		self.apply_repulsion(alpha);
		self.apply_center(alpha);
		self.apply_collision();
		self.integrate();

		if self.alpha < self.settings.alpha_min {
			self.running = false;
			debug!("layout settled");
			TickStatus::Settled
		} else {
			TickStatus::Running
		}
	}

	fn apply_links(&mut self, alpha: f64) {
		let distance = self.settings.link_distance;
		for link in &self.links {
			if link.source == link.target {
				continue;
			}
			let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
			let mut dx = t.x + t.vx - s.x - s.vx;
			let mut dy = t.y + t.vy - s.y - s.vy;
			if dx == 0.0 {
				dx = self.jiggle.next();
			}
			if dy == 0.0 {
				dy = self.jiggle.next();
			}
			let len = (dx * dx + dy * dy).sqrt();
			let l = (len - distance) / len * alpha * link.strength;
			let (fx, fy) = (dx * l, dy * l);

			let target = &mut self.nodes[link.target];
			target.vx -= fx * link.bias;
			target.vy -= fy * link.bias;
			let source = &mut self.nodes[link.source];
			source.vx += fx * (1.0 - link.bias);
			source.vy += fy * (1.0 - link.bias);
		}
	}

	fn apply_repulsion(&mut self, alpha: f64) {
		let strength = -self.settings.repulsion;
		if strength == 0.0 {
			return;
		}
		let n = self.nodes.len();
		let mut dv = vec![(0.0, 0.0); n];
		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = self.nodes[j].x - self.nodes[i].x;
				let mut dy = self.nodes[j].y - self.nodes[i].y;
				if dx == 0.0 {
					dx = self.jiggle.next();
				}
				if dy == 0.0 {
					dy = self.jiggle.next();
				}
				let mut l = dx * dx + dy * dy;
				if l < MIN_DISTANCE_SQ {
					l = (MIN_DISTANCE_SQ * l).sqrt();
				}
				let w = strength * alpha / l;
				dv[i].0 += dx * w;
				dv[i].1 += dy * w;
				dv[j].0 -= dx * w;
				dv[j].1 -= dy * w;
			}
		}
		for (node, (vx, vy)) in self.nodes.iter_mut().zip(dv) {
			node.vx += vx;
			node.vy += vy;
		}
	}

	fn apply_center(&mut self, alpha: f64) {
		let k = self.settings.center_strength * alpha;
		let center = self.center;
		for node in &mut self.nodes {
			node.vx += (center.x - node.x) * k;
			node.vy += (center.y - node.y) * k;
		}
	}

	fn apply_collision(&mut self) {
		let radius = self.settings.collision_radius;
		if radius <= 0.0 {
			return;
		}
		let r = radius * 2.0;
		let n = self.nodes.len();
		for i in 0..n {
			let (xi, yi) = (
				self.nodes[i].x + self.nodes[i].vx,
				self.nodes[i].y + self.nodes[i].vy,
			);
			for j in (i + 1)..n {
				let mut dx = xi - self.nodes[j].x - self.nodes[j].vx;
				let mut dy = yi - self.nodes[j].y - self.nodes[j].vy;
				let mut l = dx * dx + dy * dy;
				if l >= r * r {
					continue;
				}
				if dx == 0.0 {
					dx = self.jiggle.next();
					l += dx * dx;
				}
				if dy == 0.0 {
					dy = self.jiggle.next();
					l += dy * dy;
				}
				let len = l.sqrt();
				let push = (r - len) / len * 0.5;
				let (px, py) = (dx * push, dy * push);
				self.nodes[i].vx += px;
				self.nodes[i].vy += py;
				self.nodes[j].vx -= px;
				self.nodes[j].vy -= py;
			}
		}
	}

	fn integrate(&mut self) {
		let keep = 1.0 - self.settings.velocity_decay;
		for node in &mut self.nodes {
			if let Some(pin) = node.pin {
				node.x = pin.x;
				node.y = pin.y;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= keep;
			node.vy *= keep;
			if !node.vx.is_finite() || !node.vy.is_finite() {
				warn!("discarding non-finite velocity on node {}", node.id);
				node.vx = 0.0;
				node.vy = 0.0;
			}
			node.x += node.vx;
			node.y += node.vy;
		}
	}

	/// Fixes a node at `(x, y)`; forces no longer move it. Returns `false` for unknown ids.
	pub fn pin(&mut self, id: &str, x: f64, y: f64) -> bool {
		if !x.is_finite() || !y.is_finite() {
			return false;
		}
		match self.index.get(id) {
			Some(&i) => {
				let node = &mut self.nodes[i];
				node.pin = Some(Point::new(x, y));
				node.x = x;
				node.y = y;
				node.vx = 0.0;
				node.vy = 0.0;
				true
			}
			None => false,
		}
	}

	pub fn unpin(&mut self, id: &str) -> bool {
		match self.index.get(id) {
			Some(&i) => {
				self.nodes[i].pin = None;
				true
			}
			None => false,
		}
	}

	pub fn is_pinned(&self, id: &str) -> bool {
		self.index
			.get(id)
			.is_some_and(|&i| self.nodes[i].pin.is_some())
	}

	/// Reheats the simulation without touching positions.
	pub fn restart(&mut self) {
		self.alpha = 1.0;
		self.running = true;
	}

	/// Keeps the simulation warm (e.g. during a drag) until reset to zero.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
		if self.alpha_target > 0.0 {
			self.running = true;
			self.alpha = self.alpha.max(self.alpha_target);
		}
	}

	pub fn stop(&mut self) {
		self.running = false;
	}

	/// Hot-swaps force parameters; takes effect on the next tick.
	pub fn update_settings(&mut self, settings: LayoutSettings) -> Result<(), LayoutError> {
		self.settings = settings.validated()?;
		Ok(())
	}

	pub fn settings(&self) -> &LayoutSettings {
		&self.settings
	}

	pub fn set_center(&mut self, center: Point) {
		self.center = center;
	}

	pub fn center(&self) -> Point {
		self.center
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn position(&self, id: &str) -> Option<Point> {
		self.index
			.get(id)
			.map(|&i| Point::new(self.nodes[i].x, self.nodes[i].y))
	}

	pub fn positions(&self) -> impl Iterator<Item = (&str, Point)> + '_ {
		self.nodes
			.iter()
			.map(|n| (n.id.as_str(), Point::new(n.x, n.y)))
	}

	pub fn bounds(&self) -> Option<Bounds> {
		Bounds::from_points(self.positions().map(|(_, p)| p))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::ingest;
	use crate::components::force_graph::types::{Edge, GraphPayload, Node};

	fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
		ingest(GraphPayload {
			nodes: nodes.iter().map(|id| Node::new(*id, *id, "")).collect(),
			edges: edges
				.iter()
				.enumerate()
				.map(|(i, (s, t))| Edge::new(format!("e{i}"), *s, *t, ""))
				.collect(),
			..Default::default()
		})
		.unwrap()
	}

	fn settle(layout: &mut ForceLayout) -> usize {
		let mut ticks = 0;
		while layout.tick() == TickStatus::Running {
			ticks += 1;
			assert!(ticks < 10_000, "simulation never settled");
		}
		ticks
	}

	#[test]
	fn empty_graph_is_idle() {
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&Graph::new(), LayoutSettings::default()).unwrap();
		assert_eq!(layout.tick(), TickStatus::Idle);
		assert!(layout.bounds().is_none());
	}

	#[test]
	fn linked_pair_settles_near_link_distance() {
		let g = graph(&["n1", "n2"], &[("n1", "n2")]);
		let settings = LayoutSettings::default();
		let mut layout = ForceLayout::new(settings, Point::default());
		layout.start(&g, settings).unwrap();
		let ticks = settle(&mut layout);
		assert!(ticks > 100);

		let d = layout
			.position("n1")
			.unwrap()
			.distance(layout.position("n2").unwrap());
		let target = settings.link_distance;
		assert!((d - target).abs() <= target * 0.1, "distance {d}");
	}

	#[test]
	fn pinned_node_stays_exactly_in_place() {
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		assert!(layout.pin("b", 250.5, -40.25));
		for _ in 0..25 {
			layout.tick();
			assert_eq!(layout.position("b"), Some(Point::new(250.5, -40.25)));
		}
	}

	#[test]
	fn unpinned_node_rejoins_the_simulation() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		layout.pin("a", 900.0, 900.0);
		for _ in 0..10 {
			layout.tick();
		}
		layout.unpin("a");
		layout.restart();
		for _ in 0..10 {
			layout.tick();
		}
		assert_ne!(layout.position("a"), Some(Point::new(900.0, 900.0)));
	}

	#[test]
	fn isolated_nodes_still_spread_apart() {
		let g = graph(&["a", "b", "c"], &[]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		settle(&mut layout);
		let a = layout.position("a").unwrap();
		let b = layout.position("b").unwrap();
		assert!(a.distance(b) > 2.0 * LayoutSettings::default().collision_radius);
	}

	#[test]
	fn coincident_nodes_do_not_produce_nan() {
		let mut p = GraphPayload::default();
		for id in ["a", "b", "c"] {
			let mut n = Node::new(id, id, "");
			n.x = Some(10.0);
			n.y = Some(10.0);
			p.nodes.push(n);
		}
		let g = ingest(p).unwrap();
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		settle(&mut layout);
		for (_, pos) in layout.positions() {
			assert!(pos.x.is_finite() && pos.y.is_finite());
		}
		let a = layout.position("a").unwrap();
		assert!(a.distance(layout.position("b").unwrap()) > 1.0);
	}

	#[test]
	fn invalid_settings_are_rejected_or_clamped() {
		let bad = LayoutSettings {
			repulsion: f64::NAN,
			..Default::default()
		};
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		assert!(matches!(
			layout.update_settings(bad),
			Err(LayoutError::InvalidSetting { name: "repulsion", .. })
		));

		layout
			.update_settings(LayoutSettings {
				repulsion: -50.0,
				link_distance: 0.0,
				..Default::default()
			})
			.unwrap();
		assert_eq!(layout.settings().repulsion, 0.0);
		assert_eq!(layout.settings().link_distance, 1.0);
	}

	#[test]
	fn restart_keeps_positions() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		settle(&mut layout);
		let before: Vec<_> = layout.positions().map(|(_, p)| p).collect();
		layout.restart();
		assert!(layout.is_running());
		assert_eq!(layout.alpha(), 1.0);
		let after: Vec<_> = layout.positions().map(|(_, p)| p).collect();
		assert_eq!(before, after);
	}

	#[test]
	fn sync_graph_preserves_surviving_positions() {
		let mut g = graph(&["a", "b"], &[("a", "b")]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		for _ in 0..20 {
			layout.tick();
		}
		let a = layout.position("a").unwrap();
		g.add_node(Node::new("c", "c", "")).unwrap();
		layout.sync_graph(&g);
		assert_eq!(layout.position("a"), Some(a));
		assert!(layout.position("c").is_some());
		assert_eq!(layout.len(), 3);
	}

	#[test]
	fn drag_alpha_target_keeps_simulation_warm() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&g, LayoutSettings::default()).unwrap();
		settle(&mut layout);
		layout.set_alpha_target(DRAG_ALPHA_TARGET);
		for _ in 0..500 {
			assert_eq!(layout.tick(), TickStatus::Running);
		}
		layout.set_alpha_target(0.0);
		settle(&mut layout);
		assert!(!layout.is_running());
	}
}
