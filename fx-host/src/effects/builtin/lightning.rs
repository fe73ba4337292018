//! `lightning`：一次性闪电
//!
//! 选项：
//! - `flashes`：闪烁次数，默认 3
//! - `flash_interval`：每次闪烁的时长（毫秒），默认 100
//! - `height`：云层高度，默认 30
//! - `color`
//! - `thunder`：雷声资源键（可选），`thunder_volume` 默认 1.0
//!
//! 落点取第一个目标，没有目标时取来源。
//! 全部闪烁结束且雷声条目已归还时效果完成。

use super::sound::{SlotStatus, SoundSlot};
use crate::audio::SoundRequest;
use crate::effects::context::{EffectContext, EffectDeps};
use crate::effects::error::EffectError;
use crate::effects::lifecycle::{Effect, Progress};
use crate::effects::options::Options;
use crate::render::{Color, Primitive, RenderHandle};
use anim_runtime::Params;
use glam::Vec3;
use std::time::Duration;
use tracing::debug;

pub struct LightningEffect {
    flashes: u32,
    flash_interval: Duration,
    height: f32,
    color: Color,
    thunder: Option<String>,
    thunder_volume: f32,

    strike: Vec3,
    started_at: Duration,
    /// 当前显示的是第几次闪烁
    current_flash: Option<u32>,
    bolt: Option<RenderHandle>,
    thunder_slot: SoundSlot,
}

pub fn construct(options: &Params) -> Result<Box<dyn Effect>, EffectError> {
    let options = Options::new(options);
    let flash_interval = options.count_or("flash_interval", 100)?;
    if flash_interval == 0 {
        return Err(EffectError::InvalidOption {
            name: "flash_interval".to_string(),
            message: "必须大于 0".to_string(),
        });
    }

    Ok(Box::new(LightningEffect {
        flashes: options.count_or("flashes", 3)?,
        flash_interval: Duration::from_millis(flash_interval as u64),
        height: options.f32_or("height", 30.0)?,
        color: options.color_or("color", Color::rgb(0.8, 0.85, 1.0))?,
        thunder: options.str("thunder")?,
        thunder_volume: options.unit_or("thunder_volume", 1.0)?,
        strike: Vec3::ZERO,
        started_at: Duration::ZERO,
        current_flash: None,
        bolt: None,
        thunder_slot: SoundSlot::Empty,
    }))
}

impl LightningEffect {
    fn bolt_primitive(&self, flash: u32) -> Primitive {
        // 每次闪烁的起点稍微偏移
        let jitter = if flash % 2 == 0 { 1.0 } else { -1.0 };
        Primitive::Bolt {
            from: self.strike + Vec3::new(jitter, self.height, 0.0),
            to: self.strike,
            color: self.color,
        }
    }

    /// 推进闪烁；返回是否全部结束
    fn step_flashes(&mut self, deps: &mut EffectDeps<'_>) -> Result<bool, EffectError> {
        let elapsed = deps.now.saturating_sub(self.started_at);
        let flash = (elapsed.as_millis() / self.flash_interval.as_millis()) as u32;

        if flash >= self.flashes {
            if let Some(handle) = self.bolt.take()
                && let Some(surface) = deps.surface()
            {
                surface.despawn(handle);
            }
            self.current_flash = Some(self.flashes);
            return Ok(true);
        }

        if self.current_flash != Some(flash) {
            let primitive = self.bolt_primitive(flash);
            let surface = deps
                .surface()
                .ok_or(EffectError::MissingCollaborator("render surface"))?;
            match self.bolt {
                Some(handle) => surface.update(handle, primitive)?,
                None => self.bolt = Some(surface.spawn(primitive)?),
            }
            self.current_flash = Some(flash);
        }
        Ok(false)
    }

    /// 推进雷声；返回是否已归还
    ///
    /// 雷声的任何失败都只结束雷声本身，闪烁照常进行。
    fn step_thunder(&mut self, deps: &mut EffectDeps<'_>) -> bool {
        if self.thunder_slot.is_done() {
            return true;
        }
        let Some(audio) = deps.audio() else {
            return true;
        };

        let played = match self.thunder_slot.poll(audio) {
            Ok(SlotStatus::Acquired) => match self.thunder_slot.sound() {
                Some(sound) => audio
                    .play(sound, self.thunder_volume)
                    .map(|_| false)
                    .map_err(EffectError::from),
                None => Ok(false),
            },
            Ok(SlotStatus::Waiting | SlotStatus::Playing) => Ok(false),
            Ok(SlotStatus::Done) => Ok(true),
            Err(e) => Err(e),
        };

        match played {
            Ok(done) => done,
            Err(e) => {
                debug!(key = ?self.thunder, error = %e, "雷声失败，闪电继续");
                self.thunder_slot.release(Some(audio));
                true
            }
        }
    }

    fn progress(&mut self, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let flashes_done = self.step_flashes(deps)?;
        let thunder_done = self.step_thunder(deps);
        if flashes_done && thunder_done {
            Ok(Progress::Finished)
        } else {
            Ok(Progress::Active)
        }
    }
}

impl Effect for LightningEffect {
    fn kind(&self) -> &'static str {
        "lightning"
    }

    fn is_steady(&self) -> bool {
        false
    }

    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        if deps.surface.is_none() {
            return Err(EffectError::MissingCollaborator("render surface"));
        }
        self.strike = ctx
            .target_position()
            .or_else(|| ctx.source_position())
            .ok_or(EffectError::MissingPosition)?;
        self.started_at = deps.now;

        if let Some(key) = &self.thunder {
            let now = deps.now;
            match deps.audio() {
                Some(audio) => {
                    let request = SoundRequest::new(key).at(Some(self.strike));
                    // 雷声失败不影响闪电本身
                    match self.thunder_slot.request(request, audio, now) {
                        Ok(SlotStatus::Acquired) => {
                            if let Some(sound) = self.thunder_slot.sound()
                                && let Err(e) = audio.play(sound, self.thunder_volume)
                            {
                                debug!(key = %key, error = %e, "雷声播放失败");
                                self.thunder_slot.release(Some(audio));
                            }
                        }
                        Ok(_) => {}
                        Err(e) => debug!(key = %key, error = %e, "雷声不可用"),
                    }
                }
                None => debug!(key = %key, "音频子系统不可用，跳过雷声"),
            }
        }

        self.progress(deps)
    }

    fn poll(&mut self, _ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        self.progress(deps)
    }

    fn release(&mut self, deps: &mut EffectDeps<'_>) {
        if let Some(handle) = self.bolt.take()
            && let Some(surface) = deps.surface()
        {
            surface.despawn(handle);
        }
        self.thunder_slot.release(deps.audio());
    }
}
