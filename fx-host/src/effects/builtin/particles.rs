//! `particles`：一次性粒子爆发
//!
//! 选项：`count`（默认 16）、`color`、`lifetime`（毫秒，默认 1000）。

use crate::effects::context::{EffectContext, EffectDeps};
use crate::effects::error::EffectError;
use crate::effects::lifecycle::{Effect, Progress};
use crate::effects::options::Options;
use crate::render::{Color, Primitive, RenderHandle};
use anim_runtime::Params;
use std::time::Duration;

pub struct ParticlesEffect {
    count: u32,
    color: Color,
    lifetime: Duration,
    started_at: Option<Duration>,
    handle: Option<RenderHandle>,
}

pub fn construct(options: &Params) -> Result<Box<dyn Effect>, EffectError> {
    let options = Options::new(options);
    Ok(Box::new(ParticlesEffect {
        count: options.count_or("count", 16)?,
        color: options.color_or("color", Color::WHITE)?,
        lifetime: Duration::from_millis(options.count_or("lifetime", 1000)? as u64),
        started_at: None,
        handle: None,
    }))
}

impl Effect for ParticlesEffect {
    fn kind(&self) -> &'static str {
        "particles"
    }

    fn is_steady(&self) -> bool {
        false
    }

    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let now = deps.now;
        let surface = deps
            .surface()
            .ok_or(EffectError::MissingCollaborator("render surface"))?;
        let origin = ctx
            .source_position()
            .or_else(|| ctx.target_position())
            .ok_or(EffectError::MissingPosition)?;

        self.handle = Some(surface.spawn(Primitive::Particles {
            origin,
            count: self.count,
            color: self.color,
            lifetime_ms: self.lifetime.as_millis() as i64,
        })?);
        self.started_at = Some(now);

        if self.lifetime.is_zero() {
            Ok(Progress::Finished)
        } else {
            Ok(Progress::Active)
        }
    }

    fn poll(&mut self, _ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        match self.started_at {
            Some(started_at) if deps.now.saturating_sub(started_at) >= self.lifetime => {
                Ok(Progress::Finished)
            }
            _ => Ok(Progress::Active),
        }
    }

    fn release(&mut self, deps: &mut EffectDeps<'_>) {
        if let Some(handle) = self.handle.take()
            && let Some(surface) = deps.surface()
        {
            surface.despawn(handle);
        }
    }
}
