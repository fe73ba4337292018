//! `loop_sound`：持续的循环音效
//!
//! 选项：`sound`（必填）、`volume`、`max_distance`。
//! 运行中可变更 `volume` 与 `position`。

use super::sound::{SlotStatus, SoundSlot};
use crate::audio::SoundRequest;
use crate::effects::context::{EffectContext, EffectDeps};
use crate::effects::error::EffectError;
use crate::effects::lifecycle::{Effect, Progress};
use crate::effects::options::Options;
use anim_runtime::{ParamValue, Params};
use glam::Vec3;

pub struct LoopSoundEffect {
    key: String,
    volume: f32,
    max_distance: Option<f32>,
    position: Option<Vec3>,
    slot: SoundSlot,
}

pub fn construct(options: &Params) -> Result<Box<dyn Effect>, EffectError> {
    let options = Options::new(options);
    Ok(Box::new(LoopSoundEffect {
        key: options.required_str("sound")?,
        volume: options.unit_or("volume", 1.0)?,
        max_distance: options.f32("max_distance")?,
        position: None,
        slot: SoundSlot::Empty,
    }))
}

impl LoopSoundEffect {
    fn advance(&mut self, status: SlotStatus, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        match status {
            SlotStatus::Waiting => Ok(Progress::Pending),
            SlotStatus::Acquired => {
                let audio = deps
                    .audio()
                    .ok_or(EffectError::MissingCollaborator("audio"))?;
                if let Some(sound) = self.slot.sound() {
                    audio.play(sound, self.volume)?;
                }
                Ok(Progress::Active)
            }
            SlotStatus::Playing => Ok(Progress::Active),
            // 池满被跳过，或条目被外部回收（例如池被销毁）
            SlotStatus::Done => Ok(Progress::Finished),
        }
    }
}

impl Effect for LoopSoundEffect {
    fn kind(&self) -> &'static str {
        "loop_sound"
    }

    fn is_steady(&self) -> bool {
        true
    }

    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let now = deps.now;
        self.position = ctx.source_position();

        let mut request = SoundRequest::new(&self.key)
            .at(self.position)
            .looping(true);
        if let Some(distance) = self.max_distance {
            request = request.max_distance(distance);
        }

        let audio = deps
            .audio()
            .ok_or(EffectError::MissingCollaborator("audio"))?;
        let status = self.slot.request(request, audio, now)?;
        self.advance(status, deps)
    }

    fn poll(&mut self, _ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let audio = deps
            .audio()
            .ok_or(EffectError::MissingCollaborator("audio"))?;
        let status = self.slot.poll(audio)?;
        self.advance(status, deps)
    }

    fn parameter_changed(
        &mut self,
        name: &str,
        value: &ParamValue,
        _ctx: &EffectContext,
        deps: &mut EffectDeps<'_>,
    ) -> Result<(), EffectError> {
        match name {
            "volume" => {
                if let Some(volume) = value.as_f32() {
                    self.volume = volume.clamp(0.0, 1.0);
                    if let (Some(sound), Some(audio)) = (self.slot.sound(), deps.audio()) {
                        audio.set_volume(sound, self.volume);
                    }
                }
            }
            "position" => {
                if let Some(position) = value.as_vec3() {
                    self.position = Some(position);
                    if let (Some(sound), Some(audio)) = (self.slot.sound(), deps.audio()) {
                        audio.set_emitter(sound, self.position, self.max_distance);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn release(&mut self, deps: &mut EffectDeps<'_>) {
        self.slot.release(deps.audio());
    }
}
