//! # Audio Pool 模块
//!
//! 单个音效资源的句柄池。池成员只在 [`super::AudioService`] 内部变化。
//!
//! 条目状态：`available → blocked`（被获取），`blocked → available`
//! （播放结束、显式释放、兜底计时器或卡死回收）。

use super::backend::{AudioBackend, AudioError, Emitter, PlaybackHandle, SoundAsset};
use std::time::Duration;
use tracing::debug;

/// 池中的一个条目
pub(crate) struct AudioPoolItem {
    handle: Box<dyn PlaybackHandle>,
    /// 被占用的时刻；`None` 表示可用
    blocked_at: Option<Duration>,
    /// 当前占用的代号，旧代号的释放请求为 no-op
    generation: u64,
    looping: bool,
    /// 兜底释放时刻（后端无法通知播放结束时）
    release_deadline: Option<Duration>,
}

impl AudioPoolItem {
    fn new(handle: Box<dyn PlaybackHandle>) -> Self {
        Self {
            handle,
            blocked_at: None,
            generation: 0,
            looping: false,
            release_deadline: None,
        }
    }

    pub fn in_use(&self) -> bool {
        self.blocked_at.is_some()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn handle_mut(&mut self) -> &mut dyn PlaybackHandle {
        self.handle.as_mut()
    }

    /// 被同一次占用持有
    pub fn is_held_by(&self, generation: u64) -> bool {
        self.in_use() && self.generation == generation
    }

    fn free(&mut self) {
        self.handle.stop();
        self.blocked_at = None;
        self.release_deadline = None;
        self.looping = false;
    }
}

/// 占用参数
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockRequest {
    pub emitter: Emitter,
    pub looping: bool,
    pub generation: u64,
    /// 后端无法通知结束时的兜底释放时长
    pub fallback: Duration,
}

/// 单个资源键的句柄池
pub(crate) struct AudioPool {
    key: String,
    asset: SoundAsset,
    items: Vec<AudioPoolItem>,
    created_at: Duration,
    max_size: usize,
}

impl AudioPool {
    /// 用加载得到的第一个句柄创建池
    pub fn new(
        asset: SoundAsset,
        first: Box<dyn PlaybackHandle>,
        now: Duration,
        max_size: usize,
    ) -> Self {
        Self {
            key: asset.key.clone(),
            asset,
            items: vec![AudioPoolItem::new(first)],
            created_at: now,
            max_size: max_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_size
    }

    pub fn in_use_count(&self) -> usize {
        self.items.iter().filter(|item| item.in_use()).count()
    }

    pub fn item(&self, index: usize) -> Option<&AudioPoolItem> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut AudioPoolItem> {
        self.items.get_mut(index)
    }

    /// 第一个可用条目
    pub fn find_available(&self) -> Option<usize> {
        self.items.iter().position(|item| !item.in_use())
    }

    /// 从已加载的字节再实例化一个句柄并追加
    pub fn grow(&mut self, backend: &mut dyn AudioBackend) -> Result<usize, AudioError> {
        let handle = backend.instantiate(&self.asset)?;
        self.items.push(AudioPoolItem::new(handle));
        Ok(self.items.len() - 1)
    }

    /// 强制回收占用超过阈值的条目，返回 `(index, 占用时长)`
    ///
    /// 循环播放的条目不会被视为卡死。
    pub fn recover_stuck(&mut self, now: Duration, threshold: Duration) -> Vec<(usize, Duration)> {
        let mut recovered = Vec::new();
        for (index, item) in self.items.iter_mut().enumerate() {
            if item.looping {
                continue;
            }
            if let Some(blocked_at) = item.blocked_at {
                let blocked_for = now.saturating_sub(blocked_at);
                if blocked_for > threshold {
                    item.free();
                    recovered.push((index, blocked_for));
                }
            }
        }
        recovered
    }

    /// 占用条目
    pub fn block(&mut self, index: usize, now: Duration, request: BlockRequest) {
        let Some(item) = self.items.get_mut(index) else {
            return;
        };

        item.blocked_at = Some(now);
        item.generation = request.generation;
        item.looping = request.looping;
        item.release_deadline = if !request.looping && !item.handle.signals_end() {
            Some(now + request.fallback)
        } else {
            None
        };
        item.handle.set_emitter(request.emitter);
    }

    /// 释放条目（仅当代号匹配）；返回是否真的释放了
    pub fn release(&mut self, index: usize, generation: u64) -> bool {
        match self.items.get_mut(index) {
            Some(item) if item.is_held_by(generation) => {
                item.free();
                true
            }
            _ => false,
        }
    }

    /// 兜底计时器到期的条目
    pub fn expire_deadlines(&mut self, now: Duration) -> Vec<usize> {
        let mut expired = Vec::new();
        for (index, item) in self.items.iter_mut().enumerate() {
            if let Some(deadline) = item.release_deadline
                && now >= deadline
            {
                item.free();
                expired.push(index);
            }
        }
        expired
    }

    /// 销毁池：停止所有句柄
    pub fn dispose(&mut self) {
        if !self.items.is_empty() {
            debug!(key = %self.key, items = self.items.len(), "销毁音效池");
        }
        for item in &mut self.items {
            item.free();
        }
        self.items.clear();
    }
}

impl Drop for AudioPool {
    fn drop(&mut self) {
        self.dispose();
    }
}
