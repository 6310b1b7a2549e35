//! The viewport state machine: position, resolution, CRS and animated
//! transitions between them.
//!
//! A [`Map`] is either *idle* or *animating*. Animation is cooperative: the
//! host calls [`Map::tick`] from its frame scheduler with the current time
//! injected, so tests can drive the clock explicitly. Each coalesced state
//! change fires the change callback exactly once.

use crate::animation::{easing::EasingFunction, interpolation::Interpolatable};
use crate::core::point::Point;
use crate::crs::graph::{CrsGraph, CrsId};
use crate::tiles::scheme::TileScheme;
use crate::{MapError, Result};
use instant::Instant;
use log::warn;
use std::fmt;
use std::time::Duration;

/// Default animation duration
const ANIMATION_DURATION: Duration = Duration::from_millis(300);

/// Default resolution: level 8 of the standard Web Mercator scheme
const DEFAULT_RESOLUTION: f64 = 611.496_226_281_250_5;

type ChangeCallback = Box<dyn Fn(Point, f64) + Send + Sync>;

/// An in-flight transition to a target position and resolution
struct Animation {
    start_position: Point,
    start_resolution: f64,
    target_position: Point,
    target_resolution: f64,
    started: Instant,
    /// Set by `stop_animation`; the next tick snaps to the target
    stopped: bool,
}

/// The current visible map state, independent of screen pixels
pub struct Map {
    position: Point,
    resolution: f64,
    crs: CrsId,
    min_resolution: Option<f64>,
    max_resolution: Option<f64>,
    tile_scheme: Option<TileScheme>,
    animation: Option<Animation>,
    animation_duration: Duration,
    on_change: Option<ChangeCallback>,
}

impl Map {
    /// Creates an idle viewport at the CRS-space origin with the default
    /// Web Mercator tile scheme
    pub fn new(crs: CrsId) -> Self {
        Self {
            position: Point::default(),
            resolution: DEFAULT_RESOLUTION,
            crs,
            min_resolution: None,
            max_resolution: None,
            tile_scheme: Some(TileScheme::web_mercator()),
            animation: None,
            animation_duration: ANIMATION_DURATION,
            on_change: None,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Map units per screen pixel; always a positive real
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn crs(&self) -> CrsId {
        self.crs
    }

    pub fn tile_scheme(&self) -> Option<&TileScheme> {
        self.tile_scheme.as_ref()
    }

    pub fn set_tile_scheme(&mut self, scheme: Option<TileScheme>) {
        self.tile_scheme = scheme;
    }

    pub fn min_resolution(&self) -> Option<f64> {
        self.min_resolution
    }

    pub fn max_resolution(&self) -> Option<f64> {
        self.max_resolution
    }

    pub fn animation_duration(&self) -> Duration {
        self.animation_duration
    }

    pub fn set_animation_duration(&mut self, duration: Duration) {
        self.animation_duration = duration;
    }

    /// Registers the callback fired once per coalesced viewport change
    pub fn set_on_change<F>(&mut self, callback: F)
    where
        F: Fn(Point, f64) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    /// Sets both resolution bounds, validating `min <= max`.
    ///
    /// On error the previous bounds stay in place.
    pub fn set_resolution_limits(&mut self, min: Option<f64>, max: Option<f64>) -> Result<()> {
        for bound in [min, max].into_iter().flatten() {
            validate_resolution(bound)?;
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(MapError::InvalidResolution(format!(
                    "min resolution {} exceeds max resolution {}",
                    min, max
                )));
            }
        }
        self.min_resolution = min;
        self.max_resolution = max;
        Ok(())
    }

    /// Direct synchronous move; one change notification after both fields
    /// are applied
    pub fn set_position(&mut self, position: Point, resolution: Option<f64>) -> Result<()> {
        if let Some(resolution) = resolution {
            validate_resolution(resolution)?;
        }
        self.apply(position, resolution.unwrap_or(self.resolution));
        Ok(())
    }

    /// Changes resolution while keeping `base` fixed on screen.
    ///
    /// The resolution snaps onto the tile scheme ladder unless
    /// `do_not_adjust` is set.
    pub fn set_resolution(
        &mut self,
        resolution: f64,
        base: Option<Point>,
        do_not_adjust: bool,
    ) -> Result<()> {
        validate_resolution(resolution)?;
        let new_resolution = if do_not_adjust {
            resolution
        } else {
            self.adjust_resolution(resolution)
        };
        let new_position = self.position_for_resolution(new_resolution, base);
        self.apply(new_position, new_resolution);
        Ok(())
    }

    /// Pans by an offset in map units
    pub fn translate(&mut self, dx: f64, dy: f64) {
        let position = self.position.add(&Point::new(dx, dy));
        self.apply(position, self.resolution);
    }

    /// Starts an animated transition, replacing any in-flight one.
    ///
    /// `now` is the host clock reading; pass the same clock to `tick`.
    pub fn animate_to(&mut self, position: Point, resolution: f64, now: Instant) -> Result<()> {
        validate_resolution(resolution)?;
        self.animation = Some(Animation {
            start_position: self.position,
            start_resolution: self.resolution,
            target_position: position,
            target_resolution: resolution,
            started: now,
            stopped: false,
        });
        Ok(())
    }

    /// Advances the in-flight animation; returns `true` when idle.
    ///
    /// Once the configured duration has elapsed, or the animation was
    /// stopped, the viewport snaps to the target and returns to idle.
    /// Intermediate steps interpolate with a symmetric quadratic
    /// ease-in-out. Each tick fires at most one change notification.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = &self.animation else {
            return true;
        };

        let elapsed = now.duration_since(animation.started);
        if animation.stopped || elapsed >= self.animation_duration {
            let position = animation.target_position;
            let resolution = animation.target_resolution;
            self.animation = None;
            self.apply(position, resolution);
            return true;
        }

        let t = elapsed.as_secs_f64() / self.animation_duration.as_secs_f64();
        let eased = EasingFunction::EaseInOutQuad.apply(t);
        let position = animation.start_position.lerp(&animation.target_position, eased);
        let resolution = animation
            .start_resolution
            .lerp(&animation.target_resolution, eased);
        self.apply(position, resolution);
        false
    }

    /// Marks the in-flight animation as stopped; the next tick snaps to its
    /// target. Safe to call when idle, and idempotent.
    pub fn stop_animation(&mut self) {
        if let Some(animation) = &mut self.animation {
            animation.stopped = true;
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Zooms by `k` steps, keeping `base` fixed on screen.
    ///
    /// With a tile scheme, each unit of `k` moves exactly one level along
    /// the ladder (positive `k` = finer), clamped to the available levels.
    /// Without a scheme the resolution is multiplied by `2^-k`. The result
    /// is clamped to the configured resolution bounds, then animated.
    pub fn zoom(&mut self, k: i32, base: Option<Point>, now: Instant) -> Result<()> {
        let current = self.resolution;
        let mut target = match &self.tile_scheme {
            Some(scheme) => {
                let index = scheme.level_index(current, false)? as i64;
                let last = scheme.levels().len() as i64 - 1;
                let stepped = (index - k as i64).clamp(0, last) as usize;
                scheme.levels()[stepped].resolution
            }
            None => current * 2f64.powi(-k),
        };
        if let Some(min) = self.min_resolution {
            target = target.max(min);
        }
        if let Some(max) = self.max_resolution {
            target = target.min(max);
        }

        let position = self.position_for_resolution(target, base);
        self.animate_to(position, target, now)
    }

    /// Switches the viewport CRS, re-projecting the current position.
    ///
    /// When the graph has no path between the two systems the position is
    /// reset to the CRS-space origin instead of failing; this fallback is
    /// deliberate, observable behavior.
    pub fn set_crs(&mut self, graph: &CrsGraph, crs: CrsId) {
        let position = match graph.projection_to(self.crs, crs) {
            Some(projection) => projection.apply(self.position),
            None => {
                warn!(
                    "no projection from {} to {}; resetting position to origin",
                    graph.describe(self.crs),
                    graph.describe(crs)
                );
                Point::default()
            }
        };
        self.crs = crs;
        self.apply(position, self.resolution);
    }

    /// Position that keeps `base` at the same screen location after the
    /// resolution changes
    fn position_for_resolution(&self, resolution: f64, base: Option<Point>) -> Point {
        match base {
            Some(base) => self
                .position
                .subtract(&base)
                .multiply(resolution / self.resolution)
                .add(&base),
            None => self.position,
        }
    }

    fn adjust_resolution(&self, resolution: f64) -> f64 {
        match &self.tile_scheme {
            Some(scheme) => scheme
                .adjusted_resolution(resolution, false)
                .unwrap_or(resolution),
            None => resolution,
        }
    }

    /// Applies both fields, then fires a single change notification
    fn apply(&mut self, position: Point, resolution: f64) {
        self.position = position;
        self.resolution = resolution;
        if let Some(callback) = &self.on_change {
            callback(self.position, self.resolution);
        }
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("position", &self.position)
            .field("resolution", &self.resolution)
            .field("crs", &self.crs)
            .field("animating", &self.animation.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) fn validate_resolution(resolution: f64) -> Result<()> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(MapError::InvalidResolution(format!(
            "resolution must be a positive real, got {}",
            resolution
        )));
    }
    Ok(())
}
