//! # Effect Lifecycle 模块
//!
//! 效果实例的生命周期。
//!
//! ## 状态机
//!
//! ```text
//! 持续效果:  Created → Executing → Running ⟲ parameter_changed → Stopped
//!                          └──────(失败)──────────────────────→ Stopped
//! 一次性效果: Created → Executing → Completed（自然结束或被强制停止）
//! ```
//!
//! `stop()` 在任何状态下都是安全的，资源恰好释放一次。
//! `execute` 中的失败在这里被捕获并记录，不会传播给驱动器。

use super::context::{EffectContext, EffectDeps};
use super::error::EffectError;
use anim_runtime::ParamValue;
use tracing::{debug, warn};

/// 一次推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// 仍在等待资源（`execute` 挂起中）
    Pending,
    /// 资源已就绪，效果正在运行
    Active,
    /// 效果自然结束
    Finished,
}

/// 效果实现
///
/// 实现者只负责构建、推进和释放自己的资源；状态机由 [`EffectInstance`] 维护。
pub trait Effect {
    /// 效果类型名（用于日志）
    fn kind(&self) -> &'static str;

    /// 是否为持续效果（创建后固定不变）
    fn is_steady(&self) -> bool;

    /// 构建资源
    ///
    /// 持续效果返回 `Active` 表示"搭建完成"；一次性效果返回 `Finished` 表示已经结束。
    fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError>;

    /// 每帧推进（等待中的资源到达、一次性效果计时）
    fn poll(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError>;

    /// 运行中的参数变更；未知参数名为 no-op
    fn parameter_changed(
        &mut self,
        _name: &str,
        _value: &ParamValue,
        _ctx: &EffectContext,
        _deps: &mut EffectDeps<'_>,
    ) -> Result<(), EffectError> {
        Ok(())
    }

    /// 释放全部资源（包括执行到一半的部分资源）
    fn release(&mut self, deps: &mut EffectDeps<'_>);
}

/// 效果实例 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

/// 实例状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Created,
    Executing,
    Running,
    Completed,
    Stopped,
}

/// 效果实例
pub struct EffectInstance {
    id: EffectId,
    type_id: String,
    steady: bool,
    state: EffectState,
    released: bool,
    effect: Box<dyn Effect>,
}

impl std::fmt::Debug for EffectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectInstance")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("steady", &self.steady)
            .field("state", &self.state)
            .finish()
    }
}

impl EffectInstance {
    pub(crate) fn new(id: EffectId, type_id: impl Into<String>, effect: Box<dyn Effect>) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            steady: effect.is_steady(),
            state: EffectState::Created,
            released: false,
            effect,
        }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn kind(&self) -> &'static str {
        self.effect.kind()
    }

    pub fn is_steady(&self) -> bool {
        self.steady
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    /// 一次性效果：执行后直到结束前为 true；
    /// 持续效果：仅在执行成功（进入 `Running`）后直到停止前为 true，
    /// 仍在等待资源的 `Executing` 不算运行
    pub fn is_running(&self) -> bool {
        match self.state {
            EffectState::Running => true,
            EffectState::Executing => !self.steady,
            _ => false,
        }
    }

    /// 已执行且尚未结束（包括仍在等待资源的持续效果）
    pub fn is_live(&self) -> bool {
        matches!(self.state, EffectState::Executing | EffectState::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, EffectState::Completed | EffectState::Stopped)
    }

    /// 执行（只能执行一次）
    pub fn execute(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) {
        if self.state != EffectState::Created {
            debug!(id = self.id.0, state = ?self.state, "效果已执行过，忽略");
            return;
        }

        self.state = EffectState::Executing;
        let result = self.effect.execute(ctx, deps);
        self.advance(result, deps);
    }

    /// 每帧推进
    pub fn poll(&mut self, ctx: &EffectContext, deps: &mut EffectDeps<'_>) {
        if !self.is_live() {
            return;
        }
        let result = self.effect.poll(ctx, deps);
        self.advance(result, deps);
    }

    /// 运行中的参数变更；已停止或尚未执行时为 no-op
    pub fn parameter_changed(
        &mut self,
        name: &str,
        value: &ParamValue,
        ctx: &EffectContext,
        deps: &mut EffectDeps<'_>,
    ) {
        if !self.is_live() {
            debug!(id = self.id.0, name, state = ?self.state, "效果未在运行，忽略参数变更");
            return;
        }

        if let Err(e) = self.effect.parameter_changed(name, value, ctx, deps) {
            warn!(
                id = self.id.0,
                type_id = %self.type_id,
                name,
                error = %e,
                "参数变更失败"
            );
        }
    }

    /// 停止；幂等，任何状态下都安全
    pub fn stop(&mut self, deps: &mut EffectDeps<'_>) {
        if self.is_finished() {
            return;
        }
        self.finish(deps);
    }

    fn advance(&mut self, result: Result<Progress, EffectError>, deps: &mut EffectDeps<'_>) {
        match result {
            Ok(Progress::Pending) => {}
            Ok(Progress::Active) => {
                if self.steady {
                    self.state = EffectState::Running;
                }
            }
            Ok(Progress::Finished) => self.finish(deps),
            Err(e) => {
                match &e {
                    EffectError::MissingCollaborator(what) => {
                        warn!(id = self.id.0, type_id = %self.type_id, collaborator = *what, "缺少协作者，效果不执行");
                    }
                    _ => {
                        warn!(id = self.id.0, type_id = %self.type_id, error = %e, "效果执行失败");
                    }
                }
                self.finish(deps);
            }
        }
    }

    fn finish(&mut self, deps: &mut EffectDeps<'_>) {
        if !self.released {
            self.released = true;
            self.effect.release(deps);
        }
        self.state = if self.steady {
            EffectState::Stopped
        } else {
            EffectState::Completed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// 可控的测试效果
    struct ScriptedEffect {
        steady: bool,
        on_execute: Result<Progress, EffectError>,
        releases: Rc<Cell<u32>>,
        changes: Rc<Cell<u32>>,
    }

    impl Effect for ScriptedEffect {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn is_steady(&self) -> bool {
            self.steady
        }

        fn execute(&mut self, _ctx: &EffectContext, _deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
            self.on_execute.clone()
        }

        fn poll(&mut self, _ctx: &EffectContext, _deps: &mut EffectDeps<'_>) -> Result<Progress, EffectError> {
            Ok(Progress::Active)
        }

        fn parameter_changed(
            &mut self,
            _name: &str,
            _value: &ParamValue,
            _ctx: &EffectContext,
            _deps: &mut EffectDeps<'_>,
        ) -> Result<(), EffectError> {
            self.changes.set(self.changes.get() + 1);
            Ok(())
        }

        fn release(&mut self, _deps: &mut EffectDeps<'_>) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    fn scripted(steady: bool, on_execute: Result<Progress, EffectError>) -> (EffectInstance, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let releases = Rc::new(Cell::new(0));
        let changes = Rc::new(Cell::new(0));
        let instance = EffectInstance::new(
            EffectId(1),
            "scripted",
            Box::new(ScriptedEffect {
                steady,
                on_execute,
                releases: releases.clone(),
                changes: changes.clone(),
            }),
        );
        (instance, releases, changes)
    }

    #[test]
    fn test_steady_running_until_stop() {
        let (mut instance, releases, _) = scripted(true, Ok(Progress::Active));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        assert!(instance.is_running());
        assert_eq!(instance.state(), EffectState::Running);

        instance.stop(&mut deps);
        assert!(!instance.is_running());
        assert_eq!(instance.state(), EffectState::Stopped);

        instance.stop(&mut deps);
        instance.stop(&mut deps);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_stop_before_execute_is_safe() {
        let (mut instance, releases, _) = scripted(true, Ok(Progress::Active));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.stop(&mut deps);
        assert_eq!(releases.get(), 1);

        // 停止后不能再执行
        instance.execute(&ctx, &mut deps);
        assert!(!instance.is_running());
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_failed_execute_is_contained() {
        let (mut instance, releases, _) =
            scripted(true, Err(EffectError::MissingCollaborator("render surface")));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        assert_eq!(instance.state(), EffectState::Stopped);
        assert_eq!(releases.get(), 1);

        instance.stop(&mut deps);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_one_shot_completes() {
        let (mut instance, releases, _) = scripted(false, Ok(Progress::Finished));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        assert_eq!(instance.state(), EffectState::Completed);
        assert!(!instance.is_running());
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_parameter_changed_after_stop_is_noop() {
        let (mut instance, _, changes) = scripted(true, Ok(Progress::Active));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        instance.parameter_changed("volume", &ParamValue::Number(0.5), &ctx, &mut deps);
        assert_eq!(changes.get(), 1);

        instance.stop(&mut deps);
        instance.parameter_changed("volume", &ParamValue::Number(0.5), &ctx, &mut deps);
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn test_steady_waiting_on_resources_is_not_running() {
        let (mut instance, _, changes) = scripted(true, Ok(Progress::Pending));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        assert_eq!(instance.state(), EffectState::Executing);
        assert!(!instance.is_running());
        assert!(instance.is_live());

        // 等待期间的参数变更仍会送达
        instance.parameter_changed("volume", &ParamValue::Number(0.5), &ctx, &mut deps);
        assert_eq!(changes.get(), 1);

        instance.poll(&ctx, &mut deps);
        assert_eq!(instance.state(), EffectState::Running);
        assert!(instance.is_running());
    }

    #[test]
    fn test_one_shot_waiting_on_resources_is_running() {
        let (mut instance, _, _) = scripted(false, Ok(Progress::Pending));
        let ctx = EffectContext::new("test");
        let mut deps = EffectDeps::new(Duration::ZERO);

        instance.execute(&ctx, &mut deps);
        assert_eq!(instance.state(), EffectState::Executing);
        assert!(instance.is_running());
    }
}
