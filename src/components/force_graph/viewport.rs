use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::ViewportError;
use super::types::{Bounds, Point, Size};

const DEGENERATE_EXTENT: f64 = 1e-6;

/// Screen position = graph position * `k` + (`x`, `y`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
	pub min_scale: f64,
	pub max_scale: f64,
	/// Multiplier applied by a single zoom step.
	pub zoom_step: f64,
	/// Screen-space margin kept around the graph by fit-to-view.
	pub fit_padding: f64,
	/// Fit-to-view never zooms in past this scale.
	pub max_fit_scale: f64,
	/// Re-fit after the (debounced) container resize.
	pub auto_fit: bool,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 4.0,
			zoom_step: 1.2,
			fit_padding: 40.0,
			max_fit_scale: 2.0,
			auto_fit: false,
		}
	}
}

impl ViewportConfig {
	/// Rejects non-finite values and an inverted scale range; clamps the rest.
	pub fn validated(self) -> Result<Self, ViewportError> {
		let check = |name: &'static str, value: f64, lo: f64, hi: f64| {
			if !value.is_finite() {
				return Err(ViewportError::InvalidSetting { name, value });
			}
			let clamped = value.clamp(lo, hi);
			if clamped != value {
				warn!("viewport setting {name}={value} clamped to {clamped}");
			}
			Ok(clamped)
		};
		let min_scale = check("minScale", self.min_scale, 0.01, 100.0)?;
		let max_scale = check("maxScale", self.max_scale, 0.01, 100.0)?;
		if min_scale > max_scale {
			return Err(ViewportError::InvertedScaleRange {
				min: min_scale,
				max: max_scale,
			});
		}
		Ok(Self {
			min_scale,
			max_scale,
			zoom_step: check("zoomStep", self.zoom_step, 1.01, 10.0)?,
			fit_padding: check("fitPadding", self.fit_padding, 0.0, 1_000.0)?,
			max_fit_scale: check("maxFitScale", self.max_fit_scale, 0.01, 100.0)?,
			auto_fit: self.auto_fit,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
	In,
	Out,
}

#[derive(Clone, Debug)]
pub struct Viewport {
	transform: ViewTransform,
	size: Size,
	config: ViewportConfig,
	custom_center: Option<Point>,
}

impl Viewport {
	/// Starts with the graph origin in the middle of the viewport at scale 1.
	///
	/// A config that fails [`ViewportConfig::validated`] is replaced by the defaults.
	pub fn new(size: Size, config: ViewportConfig) -> Self {
		let config = config.validated().unwrap_or_else(|err| {
			warn!("{err}; using the default viewport config");
			ViewportConfig::default()
		});
		Self {
			transform: ViewTransform {
				x: size.width / 2.0,
				y: size.height / 2.0,
				k: 1.0,
			},
			size,
			config,
			custom_center: None,
		}
	}

	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	pub fn size(&self) -> Size {
		self.size
	}

	pub fn config(&self) -> &ViewportConfig {
		&self.config
	}

	pub fn set_transform(&mut self, transform: ViewTransform) -> ViewTransform {
		self.transform = ViewTransform {
			k: transform.k.clamp(self.config.min_scale, self.config.max_scale),
			..transform
		};
		self.transform
	}

	/// One zoom step about the middle of the viewport.
	pub fn zoom(&mut self, direction: ZoomDirection) -> ViewTransform {
		let factor = match direction {
			ZoomDirection::In => self.config.zoom_step,
			ZoomDirection::Out => 1.0 / self.config.zoom_step,
		};
		self.zoom_at(self.size.center(), factor)
	}

	/// Scales by `factor` keeping the graph point under `anchor` (screen space) fixed.
	pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> ViewTransform {
		let t = self.transform;
		let new_k = (t.k * factor).clamp(self.config.min_scale, self.config.max_scale);
		let ratio = new_k / t.k;
		self.transform = ViewTransform {
			x: anchor.x - (anchor.x - t.x) * ratio,
			y: anchor.y - (anchor.y - t.y) * ratio,
			k: new_k,
		};
		self.transform
	}

	pub fn pan_by(&mut self, dx: f64, dy: f64) -> ViewTransform {
		self.transform.x += dx;
		self.transform.y += dy;
		self.transform
	}

	/// Fits `bounds` (graph space) into `viewport_size` with padding.
	///
	/// The scale never drops below `min_scale`, so a graph too large to fit at
	/// that scale is centered and overflows the viewport edges.
	///
	/// Returns `None` and leaves the transform alone when there is nothing to fit:
	/// a box with no extent on either axis or an empty viewport.
	pub fn fit_to_view(&mut self, bounds: Bounds, viewport_size: Size) -> Option<ViewTransform> {
		let (w, h) = (bounds.width(), bounds.height());
		if (w <= DEGENERATE_EXTENT && h <= DEGENERATE_EXTENT)
			|| viewport_size.width <= 0.0
			|| viewport_size.height <= 0.0
		{
			debug!("fit-to-view skipped for degenerate bounds {w}x{h}");
			return None;
		}
		self.size = viewport_size;

		let pad = self.config.fit_padding;
		let avail_w = (viewport_size.width - 2.0 * pad).max(1.0);
		let avail_h = (viewport_size.height - 2.0 * pad).max(1.0);
		let sx = if w > DEGENERATE_EXTENT {
			avail_w / w
		} else {
			f64::INFINITY
		};
		let sy = if h > DEGENERATE_EXTENT {
			avail_h / h
		} else {
			f64::INFINITY
		};
		let k = sx
			.min(sy)
			.min(self.config.max_fit_scale)
			.clamp(self.config.min_scale, self.config.max_scale);

		let c = bounds.center();
		self.transform = ViewTransform {
			x: viewport_size.width / 2.0 - c.x * k,
			y: viewport_size.height / 2.0 - c.y * k,
			k,
		};
		Some(self.transform)
	}

	/// Tracks a container resize, keeping whatever was in the middle in the middle.
	pub fn resize(&mut self, size: Size) -> ViewTransform {
		self.transform.x += (size.width - self.size.width) / 2.0;
		self.transform.y += (size.height - self.size.height) / 2.0;
		self.size = size;
		self.transform
	}

	/// Overrides the point the layout pulls toward. Does not move the view.
	pub fn set_custom_center(&mut self, point: Option<Point>) {
		self.custom_center = point;
	}

	/// Center used by the layout's centering force, in graph space.
	pub fn layout_center(&self) -> Point {
		self.custom_center.unwrap_or_default()
	}

	pub fn screen_to_graph(&self, screen: Point) -> Point {
		let t = self.transform;
		Point::new((screen.x - t.x) / t.k, (screen.y - t.y) / t.k)
	}

	pub fn graph_to_screen(&self, graph: Point) -> Point {
		let t = self.transform;
		Point::new(graph.x * t.k + t.x, graph.y * t.k + t.y)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn viewport() -> Viewport {
		Viewport::new(Size::new(800.0, 600.0), ViewportConfig::default())
	}

	#[test]
	fn five_zoom_steps_compound_and_clamp() {
		let mut vp = viewport();
		for _ in 0..5 {
			vp.zoom(ZoomDirection::In);
		}
		assert!((vp.transform().k - 1.2f64.powi(5)).abs() < 1e-9);
		for _ in 0..10 {
			vp.zoom(ZoomDirection::In);
		}
		assert_eq!(vp.transform().k, 4.0);
		for _ in 0..40 {
			vp.zoom(ZoomDirection::Out);
		}
		assert_eq!(vp.transform().k, 0.1);
	}

	#[test]
	fn inverted_or_broken_scale_range_falls_back_to_defaults() {
		let config: ViewportConfig = serde_json::from_str(r#"{"minScale":5.0,"maxScale":1.0}"#).unwrap();
		assert_eq!(
			config.validated(),
			Err(ViewportError::InvertedScaleRange { min: 5.0, max: 1.0 })
		);
		let mut vp = Viewport::new(Size::new(800.0, 600.0), config);
		assert_eq!(vp.config(), &ViewportConfig::default());
		assert!((vp.zoom(ZoomDirection::In).k - 1.2).abs() < 1e-9);

		let nan = ViewportConfig {
			max_scale: f64::NAN,
			..ViewportConfig::default()
		};
		assert!(matches!(
			nan.validated(),
			Err(ViewportError::InvalidSetting { name: "maxScale", .. })
		));
	}

	#[test]
	fn zero_min_scale_is_clamped_so_screen_mapping_stays_finite() {
		let config = ViewportConfig {
			min_scale: 0.0,
			..ViewportConfig::default()
		}
		.validated()
		.unwrap();
		assert_eq!(config.min_scale, 0.01);
		let mut vp = Viewport::new(Size::new(800.0, 600.0), config);
		vp.zoom_at(Point::new(400.0, 300.0), 0.0);
		let p = vp.screen_to_graph(Point::new(10.0, 20.0));
		assert!(p.x.is_finite() && p.y.is_finite());
	}

	#[test]
	fn oversized_graph_fits_at_min_scale_centered() {
		let mut vp = viewport();
		let bounds = Bounds {
			min_x: -50_000.0,
			min_y: -10_000.0,
			max_x: 50_000.0,
			max_y: 10_000.0,
		};
		let t = vp.fit_to_view(bounds, Size::new(800.0, 600.0)).unwrap();
		assert_eq!(t.k, 0.1);
		let c = vp.graph_to_screen(bounds.center());
		assert!((c.x - 400.0).abs() < 1e-9 && (c.y - 300.0).abs() < 1e-9);
		assert!(vp.graph_to_screen(Point::new(bounds.max_x, 0.0)).x > 800.0);
	}

	#[test]
	fn zoom_keeps_anchor_point_fixed() {
		let mut vp = viewport();
		let anchor = Point::new(123.0, 77.0);
		let before = vp.screen_to_graph(anchor);
		vp.zoom_at(anchor, 1.5);
		let after = vp.screen_to_graph(anchor);
		assert!(before.distance(after) < 1e-9);
	}

	#[test]
	fn fit_centers_the_box_inside_padding() {
		let mut vp = viewport();
		let bounds = Bounds {
			min_x: -500.0,
			min_y: -100.0,
			max_x: 1500.0,
			max_y: 300.0,
		};
		let t = vp.fit_to_view(bounds, Size::new(800.0, 600.0)).unwrap();
		assert!((t.k - 720.0 / 2000.0).abs() < 1e-9);
		let top_left = vp.graph_to_screen(Point::new(bounds.min_x, bounds.min_y));
		let bottom_right = vp.graph_to_screen(Point::new(bounds.max_x, bounds.max_y));
		assert!((top_left.x - 40.0).abs() < 1e-9);
		assert!((bottom_right.x - 760.0).abs() < 1e-9);
		let mid = vp.graph_to_screen(bounds.center());
		assert!(mid.distance(Point::new(400.0, 300.0)) < 1e-9);
	}

	#[test]
	fn fit_skips_coincident_points_and_caps_scale() {
		let mut vp = viewport();
		let before = vp.transform();
		let point = Bounds::from_points([Point::new(5.0, 5.0)]).unwrap();
		assert!(vp.fit_to_view(point, Size::new(800.0, 600.0)).is_none());
		assert_eq!(vp.transform(), before);

		let line = Bounds::from_points([Point::new(0.0, 0.0), Point::new(10.0, 0.0)]).unwrap();
		let t = vp.fit_to_view(line, Size::new(800.0, 600.0)).unwrap();
		assert_eq!(t.k, 2.0);
	}

	#[test]
	fn custom_center_leaves_transform_alone() {
		let mut vp = viewport();
		let before = vp.transform();
		vp.set_custom_center(Some(Point::new(50.0, -20.0)));
		assert_eq!(vp.transform(), before);
		assert_eq!(vp.layout_center(), Point::new(50.0, -20.0));
	}

	#[test]
	fn resize_keeps_the_middle_in_the_middle() {
		let mut vp = viewport();
		let middle = vp.screen_to_graph(Point::new(400.0, 300.0));
		vp.resize(Size::new(1000.0, 400.0));
		let after = vp.screen_to_graph(Point::new(500.0, 200.0));
		assert!(middle.distance(after) < 1e-9);
	}
}
