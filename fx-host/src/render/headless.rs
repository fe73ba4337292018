//! Headless 渲染表面：只记录图元，不绘制。

use super::{Primitive, RenderError, RenderHandle, RenderSurface};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// 表面记录
#[derive(Debug, Default)]
pub struct SurfaceLog {
    next_handle: u64,
    live: BTreeMap<RenderHandle, Primitive>,
    /// 历史上生成过的图元总数
    pub spawned: usize,
    pub updated: usize,
    pub despawned: usize,
    /// 为 true 时拒绝所有生成请求
    pub reject_spawns: bool,
}

/// Headless 渲染表面
///
/// 克隆共享同一份记录。
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 拒绝所有生成请求的表面
    pub fn rejecting() -> Self {
        let surface = Self::new();
        surface.log.borrow_mut().reject_spawns = true;
        surface
    }

    /// 当前存活的图元数量
    pub fn live_count(&self) -> usize {
        self.log.borrow().live.len()
    }

    /// 当前存活的图元（按句柄顺序）
    pub fn live(&self) -> Vec<Primitive> {
        self.log.borrow().live.values().cloned().collect()
    }

    pub fn get(&self, handle: RenderHandle) -> Option<Primitive> {
        self.log.borrow().live.get(&handle).cloned()
    }

    pub fn spawned(&self) -> usize {
        self.log.borrow().spawned
    }

    pub fn despawned(&self) -> usize {
        self.log.borrow().despawned
    }

    pub fn updated(&self) -> usize {
        self.log.borrow().updated
    }
}

impl RenderSurface for HeadlessSurface {
    fn spawn(&mut self, primitive: Primitive) -> Result<RenderHandle, RenderError> {
        let mut log = self.log.borrow_mut();
        if log.reject_spawns {
            return Err(RenderError::Rejected {
                kind: primitive.kind().to_string(),
                message: "headless 表面已禁用".to_string(),
            });
        }

        log.next_handle += 1;
        let handle = RenderHandle(log.next_handle);
        log.live.insert(handle, primitive);
        log.spawned += 1;
        Ok(handle)
    }

    fn update(&mut self, handle: RenderHandle, primitive: Primitive) -> Result<(), RenderError> {
        let mut log = self.log.borrow_mut();
        match log.live.get_mut(&handle) {
            Some(slot) => {
                *slot = primitive;
                log.updated += 1;
                Ok(())
            }
            None => Err(RenderError::UnknownHandle(handle)),
        }
    }

    fn despawn(&mut self, handle: RenderHandle) {
        let mut log = self.log.borrow_mut();
        if log.live.remove(&handle).is_some() {
            log.despawned += 1;
        }
    }
}
