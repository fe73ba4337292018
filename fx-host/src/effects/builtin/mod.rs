//! # 内置效果
//!
//! | 类型 ID | 类别 | 说明 |
//! |---|---|---|
//! | `sound` | 一次性 | 池化空间音效 |
//! | `loop_sound` | 持续 | 循环音效 |
//! | `beam` | 持续 | 来源到目标的光束 |
//! | `particles` | 一次性 | 粒子爆发 |
//! | `lightning` | 一次性 | 闪电，可带雷声 |

mod beam;
mod lightning;
mod loop_sound;
mod particles;
mod sound;

use super::registry::EffectConstructor;

pub use beam::BeamEffect;
pub use lightning::LightningEffect;
pub use loop_sound::LoopSoundEffect;
pub use particles::ParticlesEffect;
pub use sound::SoundEffect;

/// 启动时注册的内置效果
pub(crate) const BUILTIN_EFFECTS: &[(&str, EffectConstructor)] = &[
    ("sound", sound::construct),
    ("loop_sound", loop_sound::construct),
    ("beam", beam::construct),
    ("particles", particles::construct),
    ("lightning", lightning::construct),
];

#[cfg(test)]
mod tests;
