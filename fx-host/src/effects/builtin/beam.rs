//! `beam`：来源到目标的持续光束
//!
//! 选项：`color`（`#rrggbb`）、`width`、`target`（覆盖上下文目标）。
//! 运行中可变更 `target`、`color`、`width`。

use crate::effects::context::{EffectContext, EffectDeps};
use crate::effects::error::EffectError;
use crate::effects::lifecycle::{Effect, Progress};
use crate::effects::options::Options;
use crate::render::{Color, Primitive, RenderHandle};
use anim_runtime::{ParamValue, Params};
use glam::Vec3;

pub struct BeamEffect {
    color: Color,
    width: f32,
    target: Option<Vec3>,
    from: Vec3,
    handle: Option<RenderHandle>,
}

pub fn construct(options: &Params) -> Result<Box<dyn Effect>, EffectError> {
    let options = Options::new(options);
    let width = options.f32_or("width", 0.1)?;
    if width <= 0.0 {
        return Err(EffectError::InvalidOption {
            name: "width".to_string(),
            message: format!("必须大于 0，实际为 {}", width),
        });
    }

    Ok(Box::new(BeamEffect {
        color: options.color_or("color", Color::WHITE)?,
        width,
        target: options.vec3("target")?,
        from: Vec3::ZERO,
        handle: None,
    }))
}

impl BeamEffect {
    fn primitive(&self, to: Vec3) -> Primitive {
        Primitive::Beam {
            from: self.from,
            to,
            color: self.color,
            width: self.width,
        }
    }

    fn refresh(&self, deps: &mut EffectDeps<'_>) -> Result<(), EffectError> {
        let (Some(handle), Some(to)) = (self.handle, self.target) else {
            return Ok(());
        };
        let surface = deps
            .surface()
            .ok_or(EffectError::MissingCollaborator("render surface"))?;
        surface.update(handle, self.primitive(to))?;
        Ok(())
    }
}

impl Effect for BeamEffect {
    fn kind(&self) -> &'static str {
        "beam"
    }

    fn is_steady(&self) -> bool {
        true
    }

    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let surface = deps
            .surface()
            .ok_or(EffectError::MissingCollaborator("render surface"))?;

        self.from = ctx.source_position().ok_or(EffectError::MissingPosition)?;
        let to = self
            .target
            .or_else(|| ctx.target_position())
            .ok_or(EffectError::MissingPosition)?;
        self.target = Some(to);

        self.handle = Some(surface.spawn(self.primitive(to))?);
        Ok(Progress::Active)
    }

    fn poll(&mut self, _ctx: &EffectContext, _deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        Ok(Progress::Active)
    }

    fn parameter_changed(
        &mut self,
        name: &str,
        value: &ParamValue,
        _ctx: &EffectContext,
        deps: &mut EffectDeps<'_>,
    ) -> Result<(), EffectError> {
        let changed = match (name, value) {
            ("target", ParamValue::Vector(to)) => {
                self.target = Some(*to);
                true
            }
            ("color", ParamValue::Text(hex)) => match Color::from_hex(hex) {
                Some(color) => {
                    self.color = color;
                    true
                }
                None => false,
            },
            ("width", ParamValue::Number(width)) if *width > 0.0 => {
                self.width = *width as f32;
                true
            }
            _ => false,
        };

        if changed {
            self.refresh(deps)?;
        }
        Ok(())
    }

    fn release(&mut self, deps: &mut EffectDeps<'_>) {
        if let Some(handle) = self.handle.take()
            && let Some(surface) = deps.surface()
        {
            surface.despawn(handle);
        }
    }
}
