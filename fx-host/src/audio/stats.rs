//! 音效池事件与统计

use std::time::Duration;

/// 条目被释放的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// 后端通知播放结束
    PlaybackEnded,
    /// 持有者显式释放
    Explicit,
    /// 后端无法通知结束，兜底计时器到期
    FallbackTimer,
    /// 等待中的获取被取消，结果到达后立即归还
    Cancelled,
}

/// 音效池事件
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    /// 首次加载完成，池已创建
    PoolCreated { key: String },
    /// 池扩容
    Grown { key: String, size: usize },
    /// 条目被获取
    Acquired { key: String, index: usize },
    /// 条目被释放
    Released {
        key: String,
        index: usize,
        reason: ReleaseReason,
    },
    /// 卡死条目被强制回收
    Recovered {
        key: String,
        index: usize,
        blocked_for: Duration,
    },
    /// 池已满，本次播放被跳过
    Skipped { key: String },
    /// 资源加载失败
    LoadFailed { key: String, message: String },
}

/// 音效服务统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// 池数量
    pub pools: usize,
    /// 条目总数
    pub items: usize,
    /// 占用中的条目
    pub in_use: usize,
    /// 在途加载
    pub pending_loads: usize,
    /// 成功获取次数
    pub acquired: u64,
    /// 因池满跳过的次数
    pub skipped: u64,
    /// 卡死回收次数
    pub recovered: u64,
    /// 加载失败次数
    pub load_failures: u64,
}

impl PoolStats {
    /// 格式化为可读字符串
    pub fn format(&self) -> String {
        format!(
            "Audio: {} pools, {}/{} items in use, pending loads: {}, acquired: {}, skipped: {}, recovered: {}, load failures: {}",
            self.pools,
            self.in_use,
            self.items,
            self.pending_loads,
            self.acquired,
            self.skipped,
            self.recovered,
            self.load_failures,
        )
    }
}
