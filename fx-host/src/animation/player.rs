//! # Player 模块
//!
//! 逐帧驱动已绑定的时间轴。
//!
//! ## 每帧流程
//!
//! 1. 换算播放头（轮次、轮内时刻）；进入新一轮时先以 `local = duration` 收尾上一轮
//! 2. 推进所有存活实例
//! 3. 停止窗口已关闭的持续效果
//! 4. 按列表顺序为到期条目生成实例（每轮每个条目只生成一次）
//! 5. 移除已结束的实例
//!
//! 一次性效果不会被窗口关闭打断，而是自然结束；播放头结束且一次性效果全部完成后，
//! 这次播放被丢弃。

use super::{PlaybackEvent, PlayError};
use crate::effects::{EffectContext, EffectDeps, EffectFactory, EffectInstance, Subject};
use anim_runtime::{ParamValue, Playhead, Timeline};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 播放 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 存活的效果实例
struct LiveEffect {
    entry: usize,
    iteration: u32,
    context: EffectContext,
    instance: EffectInstance,
}

/// 一次播放
struct Playback {
    id: PlaybackId,
    timeline: Timeline,
    playhead: Playhead,
    started_at: Duration,
    iteration: u32,
    /// 本轮已生成过实例的条目
    spawned: Vec<bool>,
    live: Vec<LiveEffect>,
}

impl Playback {
    fn elapsed_ms(&self, now: Duration) -> i64 {
        now.saturating_sub(self.started_at).as_millis() as i64
    }

    /// 条目的效果上下文：第一个固定坐标为来源，其余为目标
    fn entry_context(&self, entry: usize) -> EffectContext {
        let mut context = EffectContext::new(self.timeline.name.clone());
        let mut positions = self.timeline.effects[entry]
            .positions
            .iter()
            .filter_map(|p| p.fixed());

        if let Some(source) = positions.next() {
            context = context.with_source(Subject::Point(source));
        }
        for target in positions {
            context = context.with_target(Subject::Point(target));
        }
        context
    }

    fn poll_live(&mut self, deps: &mut EffectDeps<'_>) {
        for live in &mut self.live {
            live.instance.poll(&live.context, deps);
        }
    }

    /// 停止窗口已关闭的持续效果
    fn close_windows(&mut self, local: i64, deps: &mut EffectDeps<'_>) {
        let iteration = self.iteration;
        for live in &mut self.live {
            if !live.instance.is_steady() || live.instance.is_finished() {
                continue;
            }
            let end = self.timeline.effects[live.entry].effective_end_time();
            if live.iteration != iteration || local > end {
                debug!(
                    playback = self.id.0,
                    entry = live.entry,
                    local,
                    end,
                    "效果窗口结束，停止持续效果"
                );
                live.instance.stop(deps);
            }
        }
    }

    fn stop_steady(&mut self, deps: &mut EffectDeps<'_>) {
        for live in &mut self.live {
            if live.instance.is_steady() {
                live.instance.stop(deps);
            }
        }
    }

    /// 为到期条目生成实例
    fn spawn_due(
        &mut self,
        local: i64,
        factory: &mut EffectFactory,
        deps: &mut EffectDeps<'_>,
        events: &mut Vec<PlaybackEvent>,
    ) {
        for entry in 0..self.timeline.effects.len() {
            if self.spawned[entry] || self.timeline.effects[entry].start_time > local {
                continue;
            }
            self.spawned[entry] = true;

            let def = &self.timeline.effects[entry];
            let mut instance = match factory.create(&def.type_id, &def.params) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!(
                        playback = self.id.0,
                        timeline = %self.timeline.name,
                        entry,
                        type_id = %def.type_id,
                        params = ?def.params,
                        error = %e,
                        "无法生成效果实例"
                    );
                    events.push(PlaybackEvent::SpawnFailed {
                        playback: self.id,
                        entry,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            events.push(PlaybackEvent::EffectSpawned {
                playback: self.id,
                entry,
                type_id: def.type_id.clone(),
            });

            let context = self.entry_context(entry);
            instance.execute(&context, deps);
            self.live.push(LiveEffect {
                entry,
                iteration: self.iteration,
                context,
                instance,
            });
        }
    }

    fn sweep(&mut self) {
        self.live.retain(|live| !live.instance.is_finished());
    }

    /// 推进一帧；返回播放是否已经可以丢弃
    fn advance(
        &mut self,
        factory: &mut EffectFactory,
        deps: &mut EffectDeps<'_>,
        events: &mut Vec<PlaybackEvent>,
    ) -> bool {
        let position = self.playhead.locate(self.elapsed_ms(deps.now));

        if position.iteration != self.iteration {
            // 收尾上一轮：恰好落在轮末的条目也要生成一次
            let duration = self.playhead.duration();
            self.spawn_due(duration, factory, deps, events);
            self.stop_steady(deps);

            self.iteration = position.iteration;
            self.spawned.iter_mut().for_each(|s| *s = false);
            events.push(PlaybackEvent::IterationStarted {
                playback: self.id,
                iteration: self.iteration,
            });
        }

        let local = position.local_time;
        self.poll_live(deps);
        self.close_windows(local, deps);
        self.spawn_due(local, factory, deps, events);

        if position.finished {
            self.stop_steady(deps);
        }
        self.sweep();

        position.finished && self.live.is_empty()
    }

    fn stop(&mut self, deps: &mut EffectDeps<'_>) {
        for live in &mut self.live {
            live.instance.stop(deps);
        }
        self.live.clear();
    }
}

/// 时间轴播放器
///
/// 同时驱动任意数量的播放；同一帧内按开始顺序推进。
#[derive(Default)]
pub struct TimelinePlayer {
    playbacks: Vec<Playback>,
    next_id: u64,
    events: Vec<PlaybackEvent>,
}

impl fmt::Debug for TimelinePlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelinePlayer")
            .field("playbacks", &self.playbacks.len())
            .field("live_effects", &self.live_effect_count())
            .finish()
    }
}

impl TimelinePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验并开始播放
    ///
    /// 第一批条目在下一次 [`update`](Self::update) 时生成。
    pub fn play(&mut self, timeline: Timeline, now: Duration) -> Result<PlaybackId, PlayError> {
        timeline.validate()?;

        if let Some((stored, derived)) = timeline.duration_mismatch() {
            debug!(
                timeline = %timeline.name,
                stored,
                derived,
                "存储的时长与推导值不一致，以推导值为准"
            );
        }

        self.next_id += 1;
        let id = PlaybackId(self.next_id);
        let playhead = Playhead::for_timeline(&timeline);

        info!(
            playback = id.0,
            timeline = %timeline.name,
            duration = playhead.duration(),
            looping = playhead.is_looping(),
            "开始播放动画"
        );
        self.events.push(PlaybackEvent::Started {
            playback: id,
            name: timeline.name.clone(),
        });

        self.playbacks.push(Playback {
            id,
            spawned: vec![false; timeline.effects.len()],
            timeline,
            playhead,
            started_at: now,
            iteration: 0,
            live: Vec::new(),
        });
        Ok(id)
    }

    /// 推进所有播放
    pub fn update(&mut self, factory: &mut EffectFactory, deps: &mut EffectDeps<'_>) {
        let events = &mut self.events;
        self.playbacks.retain_mut(|playback| {
            let done = playback.advance(factory, deps, events);
            if done {
                debug!(playback = playback.id.0, timeline = %playback.timeline.name, "动画播放完毕");
                events.push(PlaybackEvent::Finished {
                    playback: playback.id,
                });
            }
            !done
        });
    }

    /// 停止一次播放，释放它的全部效果
    pub fn stop(&mut self, id: PlaybackId, deps: &mut EffectDeps<'_>) -> bool {
        let Some(index) = self.playbacks.iter().position(|p| p.id == id) else {
            return false;
        };
        let mut playback = self.playbacks.remove(index);
        playback.stop(deps);
        self.events.push(PlaybackEvent::Stopped { playback: id });
        true
    }

    pub fn stop_all(&mut self, deps: &mut EffectDeps<'_>) {
        for mut playback in std::mem::take(&mut self.playbacks) {
            playback.stop(deps);
            self.events.push(PlaybackEvent::Stopped {
                playback: playback.id,
            });
        }
    }

    /// 运行中重定向条目参数
    ///
    /// 新值同时写回条目，后续轮次生成的实例也会使用它。
    /// 返回收到变更的运行中实例数量。
    pub fn retarget(
        &mut self,
        id: PlaybackId,
        entry_id: &str,
        name: &str,
        value: ParamValue,
        deps: &mut EffectDeps<'_>,
    ) -> Result<usize, PlayError> {
        let playback = self
            .playbacks
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PlayError::UnknownPlayback(id))?;
        let entry = playback
            .timeline
            .entry_index(entry_id)
            .ok_or_else(|| PlayError::UnknownEntry {
                timeline: playback.timeline.name.clone(),
                entry: entry_id.to_string(),
            })?;

        let mut notified = 0;
        for live in playback.live.iter_mut().filter(|l| l.entry == entry) {
            if live.instance.is_live() {
                live.instance
                    .parameter_changed(name, &value, &live.context, deps);
                notified += 1;
            }
        }

        playback.timeline.effects[entry]
            .params
            .insert(name.to_string(), value);
        Ok(notified)
    }

    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.iter().any(|p| p.id == id)
    }

    pub fn playback_count(&self) -> usize {
        self.playbacks.len()
    }

    /// 所有播放中存活的效果实例数量
    pub fn live_effect_count(&self) -> usize {
        self.playbacks.iter().map(|p| p.live.len()).sum()
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }
}
