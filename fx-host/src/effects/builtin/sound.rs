//! `sound`：一次性的池化空间音效
//!
//! 选项：
//! - `sound`（必填）：资源键
//! - `volume`：0.0 - 1.0，默认 1.0
//! - `max_distance`：最大听觉距离
//! - `narration`：长语音，兜底时长更长
//! - `spatial`：默认 true；上下文没有坐标时自动退化为非空间化
//!
//! 播放结束（或被回收）时效果完成。非空间化音效在等不到结束信号时，
//! 超过兜底时长被强制完成。

use crate::audio::{Acquire, AcquireError, AudioService, PooledSound, SoundRequest, TicketPoll};
use crate::effects::context::{EffectContext, EffectDeps};
use crate::effects::error::EffectError;
use crate::effects::lifecycle::{Effect, Progress};
use crate::effects::options::Options;
use anim_runtime::{ParamValue, Params};
use glam::Vec3;
use std::time::Duration;
use tracing::debug;

/// 效果持有的一个池条目（可能仍在等待加载）
#[derive(Debug, Default)]
pub(crate) enum SoundSlot {
    #[default]
    Empty,
    Waiting(crate::audio::AcquireTicket),
    Holding(PooledSound),
    Done,
}

/// 推进后的槽状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotStatus {
    Waiting,
    /// 本次推进刚拿到条目（尚未开始播放）
    Acquired,
    Playing,
    /// 播放已结束、被回收或被跳过
    Done,
}

impl SoundSlot {
    /// 发起获取；池满时直接标记为结束
    pub fn request(
        &mut self,
        request: SoundRequest,
        audio: &mut AudioService,
        now: Duration,
    ) -> Result<SlotStatus, EffectError> {
        match audio.acquire(request, now) {
            Ok(Acquire::Ready(sound)) => {
                *self = SoundSlot::Holding(sound);
                Ok(SlotStatus::Acquired)
            }
            Ok(Acquire::Pending(ticket)) => {
                *self = SoundSlot::Waiting(ticket);
                Ok(SlotStatus::Waiting)
            }
            Err(AcquireError::PoolAtCapacity { key }) => {
                debug!(key = %key, "音效被跳过");
                *self = SoundSlot::Done;
                Ok(SlotStatus::Done)
            }
            Err(e) => {
                *self = SoundSlot::Done;
                Err(e.into())
            }
        }
    }

    /// 推进等待中的票据与播放状态
    pub fn poll(&mut self, audio: &AudioService) -> Result<SlotStatus, EffectError> {
        match std::mem::take(self) {
            SoundSlot::Empty => Ok(SlotStatus::Done),
            SoundSlot::Done => {
                *self = SoundSlot::Done;
                Ok(SlotStatus::Done)
            }
            SoundSlot::Waiting(ticket) => match ticket.poll() {
                TicketPoll::Pending => {
                    *self = SoundSlot::Waiting(ticket);
                    Ok(SlotStatus::Waiting)
                }
                TicketPoll::Ready(sound) => {
                    *self = SoundSlot::Holding(sound);
                    Ok(SlotStatus::Acquired)
                }
                TicketPoll::Failed(AcquireError::PoolAtCapacity { key }) => {
                    debug!(key = %key, "音效被跳过");
                    *self = SoundSlot::Done;
                    Ok(SlotStatus::Done)
                }
                TicketPoll::Failed(e) => {
                    *self = SoundSlot::Done;
                    Err(e.into())
                }
                TicketPoll::Closed => {
                    *self = SoundSlot::Done;
                    Ok(SlotStatus::Done)
                }
            },
            SoundSlot::Holding(sound) => {
                if audio.is_held(&sound) {
                    *self = SoundSlot::Holding(sound);
                    Ok(SlotStatus::Playing)
                } else {
                    *self = SoundSlot::Done;
                    Ok(SlotStatus::Done)
                }
            }
        }
    }

    pub fn sound(&self) -> Option<&PooledSound> {
        match self {
            SoundSlot::Holding(sound) => Some(sound),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, SoundSlot::Done | SoundSlot::Empty)
    }

    /// 释放：等待中的票据被取消，持有的条目归还池
    pub fn release(&mut self, audio: Option<&mut AudioService>) {
        match std::mem::replace(self, SoundSlot::Done) {
            SoundSlot::Waiting(ticket) => ticket.cancel(),
            SoundSlot::Holding(sound) => match audio {
                Some(audio) => {
                    audio.release(sound);
                }
                None => {
                    debug!(key = %sound.key(), "音频子系统不可用，条目交由兜底计时器回收");
                }
            },
            SoundSlot::Empty | SoundSlot::Done => {}
        }
    }
}

/// 一次性音效
pub struct SoundEffect {
    key: String,
    volume: f32,
    max_distance: Option<f32>,
    narration: bool,
    spatial: bool,
    slot: SoundSlot,
    /// 非空间化音效的强制完成时刻
    deadline: Option<Duration>,
}

pub fn construct(options: &Params) -> Result<Box<dyn Effect>, EffectError> {
    let options = Options::new(options);
    Ok(Box::new(SoundEffect {
        key: options.required_str("sound")?,
        volume: options.unit_or("volume", 1.0)?,
        max_distance: options.f32("max_distance")?,
        narration: options.bool_or("narration", false)?,
        spatial: options.bool_or("spatial", true)?,
        slot: SoundSlot::Empty,
        deadline: None,
    }))
}

impl SoundEffect {
    fn request(&self, position: Option<Vec3>) -> SoundRequest {
        let mut request = SoundRequest::new(&self.key)
            .at(position)
            .long_form(self.narration);
        if let Some(distance) = self.max_distance {
            request = request.max_distance(distance);
        }
        request
    }

    fn advance(&mut self, status: SlotStatus, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let now = deps.now;
        match status {
            SlotStatus::Waiting => Ok(Progress::Pending),
            SlotStatus::Acquired => {
                let Some(audio) = deps.audio() else {
                    return Err(EffectError::MissingCollaborator("audio"));
                };
                if let Some(sound) = self.slot.sound() {
                    audio.play(sound, self.volume)?;
                    if !self.spatial && self.deadline.is_none() {
                        let settings = audio.settings();
                        let ceiling = if self.narration {
                            settings.narration_fallback
                        } else {
                            settings.release_fallback
                        };
                        self.deadline = Some(now + ceiling);
                    }
                }
                Ok(Progress::Active)
            }
            SlotStatus::Playing => match self.deadline {
                Some(deadline) if now >= deadline => {
                    debug!(key = %self.key, "等不到播放结束信号，强制完成");
                    Ok(Progress::Finished)
                }
                _ => Ok(Progress::Active),
            },
            SlotStatus::Done => Ok(Progress::Finished),
        }
    }
}

impl Effect for SoundEffect {
    fn kind(&self) -> &'static str {
        "sound"
    }

    fn is_steady(&self) -> bool {
        false
    }

    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let now = deps.now;
        let position = if self.spatial {
            ctx.source_position()
        } else {
            None
        };
        self.spatial = position.is_some();

        let request = self.request(position);
        let Some(audio) = deps.audio() else {
            return Err(EffectError::MissingCollaborator("audio"));
        };
        let status = self.slot.request(request, audio, now)?;
        self.advance(status, deps)
    }

    fn poll(&mut self, _ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
        let Some(audio) = deps.audio() else {
            return Err(EffectError::MissingCollaborator("audio"));
        };
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
                if let (Some(position), Some(sound), Some(audio)) =
                    (value.as_vec3(), self.slot.sound(), deps.audio())
                {
                    audio.set_emitter(sound, Some(position), self.max_distance);
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
