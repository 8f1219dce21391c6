//! Frame sweeps: one scalar parameter stepped across frames, injected into a fixed template.

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Axis, FrameIndex, FrameRange, Vec3};
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::scene::model::Scene;

/// Which scene field the swept value drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepParam {
    /// Light `light` circles `center` in the XZ plane; the value is the angle in radians.
    LightOrbit {
        light: usize,
        center: Vec3,
        radius: f64,
    },
    /// The value becomes light `light`'s coordinate on `axis`.
    LightAxis { light: usize, axis: Axis },
    /// The camera eye circles `center` in the XZ plane; the value is the angle in radians.
    CameraOrbit { center: Vec3, radius: f64 },
    /// The template is emitted unchanged for every sample.
    Fixed,
}

impl SweepParam {
    fn light(&self) -> Option<usize> {
        match self {
            SweepParam::LightOrbit { light, .. } | SweepParam::LightAxis { light, .. } => {
                Some(*light)
            }
            SweepParam::CameraOrbit { .. } | SweepParam::Fixed => None,
        }
    }

    fn apply(&self, scene: &mut Scene, v: f64) {
        match self {
            SweepParam::LightOrbit {
                light,
                center,
                radius,
            } => {
                if let Some(l) = scene.lights.get_mut(*light) {
                    l.position = orbit(*center, *radius, v);
                }
            }
            SweepParam::LightAxis { light, axis } => {
                if let Some(l) = scene.lights.get_mut(*light) {
                    l.position = l.position.with(*axis, v);
                }
            }
            SweepParam::CameraOrbit { center, radius } => {
                scene.camera.eye = orbit(*center, *radius, v);
            }
            SweepParam::Fixed => {}
        }
    }
}

fn orbit(center: Vec3, radius: f64, angle: f64) -> Vec3 {
    center + Vec3::new(angle.sin(), 0.0, angle.cos()) * radius
}

/// Sample `i` takes value `start + i * step` and frame index `frames.start + i`. Sampling stops
/// at the first value beyond `bound` in the direction of `step`, or at `frames.end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub frames: FrameRange,
    pub param: SweepParam,
    pub start: f64,
    pub step: f64,
    pub bound: f64,
}

impl SweepConfig {
    pub fn validate(&self) -> PhotonResult<()> {
        if !self.step.is_finite() || self.step == 0.0 {
            return Err(PhotonError::sweep(format!(
                "step must be finite and non-zero (got {})",
                self.step
            )));
        }
        if !self.start.is_finite() || !self.bound.is_finite() {
            return Err(PhotonError::sweep("start and bound must be finite"));
        }
        if self.start + self.step == self.start {
            return Err(PhotonError::sweep(format!(
                "step {} is too small to change start value {}",
                self.step, self.start
            )));
        }
        if (self.bound - self.start) * self.step.signum() < 0.0 {
            return Err(PhotonError::sweep(format!(
                "bound {} is not reachable from {} with step {}",
                self.bound, self.start, self.step
            )));
        }
        if self.frames.start.0 > self.frames.end.0 {
            return Err(PhotonError::sweep("frame range start must be <= end"));
        }
        Ok(())
    }

    /// Swept value of sample `i`.
    pub fn value_at(&self, i: u64) -> f64 {
        self.start + i as f64 * self.step
    }

    fn within(&self, v: f64) -> bool {
        if self.step > 0.0 {
            v <= self.bound
        } else {
            v >= self.bound
        }
    }

    /// Number of samples before the value passes `bound` or the frame range runs out.
    fn sample_count(&self) -> u64 {
        let cap = self.frames.len_frames();
        if cap == 0 {
            return 0;
        }
        let est = ((self.bound - self.start) / self.step).floor();
        // `as` saturates; the loops below correct any rounding in `value_at`.
        let mut last = if est > 0.0 { (est as u64).min(cap - 1) } else { 0 };
        while last > 0 && !self.within(self.value_at(last)) {
            last -= 1;
        }
        while last + 1 < cap && self.within(self.value_at(last + 1)) {
            last += 1;
        }
        last + 1
    }
}

/// One generated frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: FrameIndex,
    /// Swept parameter value for this frame.
    pub value: f64,
    pub scene: Scene,
}

/// Validated sweep over a scene template. Iterating it is lazy and can be repeated; every pass
/// yields the same frames.
#[derive(Debug, Clone)]
pub struct FrameSweep {
    template: Scene,
    config: SweepConfig,
    len: u64,
}

impl FrameSweep {
    pub fn new(template: Scene, config: SweepConfig) -> PhotonResult<Self> {
        config.validate()?;
        if let Some(light) = config.param.light()
            && light >= template.lights.len()
        {
            return Err(PhotonError::sweep(format!(
                "sweep targets light #{light} but the template has {} light(s)",
                template.lights.len()
            )));
        }
        let len = config.sample_count();
        Ok(Self {
            template,
            config,
            len,
        })
    }

    pub fn template(&self) -> &Scene {
        &self.template
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Number of frames a full pass yields.
    pub fn planned_len(&self) -> u64 {
        self.len
    }

    pub fn iter(&self) -> SweepIter<'_> {
        SweepIter {
            sweep: self,
            next: 0,
        }
    }

    /// Frame for sample `i`, or `None` past the end of the sweep.
    pub fn frame(&self, i: u64) -> Option<Frame> {
        if i >= self.len {
            return None;
        }
        let value = self.config.value_at(i);
        let mut scene = self.template.clone();
        self.config.param.apply(&mut scene, value);
        Some(Frame {
            index: FrameIndex(self.config.frames.start.0 + i),
            value,
            scene,
        })
    }
}

impl<'a> IntoIterator for &'a FrameSweep {
    type Item = Frame;
    type IntoIter = SweepIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SweepIter<'a> {
    sweep: &'a FrameSweep,
    next: u64,
}

impl Iterator for SweepIter<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let frame = self.sweep.frame(self.next)?;
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.sweep.len.saturating_sub(self.next);
        match usize::try_from(left) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
