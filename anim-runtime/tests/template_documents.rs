//! # 模板文档集成测试
//!
//! 测试 JSON 模板 → 代入 → 校验 → 活跃窗口 的完整链路。

use anim_runtime::{
    AnimationTemplate, Bindings, InvalidReason, Playhead, Timeline, TimelineError, Vec3,
};

const LIGHTNING_TEMPLATE: &str = r##"{
    "name": "lightning_strike",
    "placeholders": ["caster", "target"],
    "duration": 5000,
    "effects": [
        { "id": "bolt", "typeId": "lightning", "startTime": 0, "duration": 400,
          "positions": [{ "placeholder": "target" }], "blocking": true,
          "params": { "flashes": 3 } },
        { "typeId": "sound", "startTime": 400,
          "positions": [{ "placeholder": "target" }],
          "params": { "sound": "weather/thunder", "volume": 0.8 } },
        { "id": "link", "typeId": "beam", "startTime": 0, "endTime": 1200,
          "positions": [{ "placeholder": "caster" }, { "placeholder": "target" }],
          "params": { "color": "#88ccff" } }
    ]
}"##;

fn bindings() -> Bindings {
    let mut b = Bindings::new();
    b.insert("caster".to_string(), Vec3::new(0.0, 64.0, 0.0));
    b.insert("target".to_string(), Vec3::new(10.0, 64.0, -4.0));
    b
}

#[test]
fn test_template_instantiation() {
    let template = AnimationTemplate::from_json(LIGHTNING_TEMPLATE).unwrap();
    assert_eq!(template.name(), "lightning_strike");

    // 模板本身不可派发
    assert!(matches!(
        template.timeline().validate(),
        Err(TimelineError::InvalidTimeline {
            reason: InvalidReason::UnresolvedPlaceholders { .. },
            ..
        })
    ));

    let bound = template.instantiate(&bindings()).unwrap();
    assert!(bound.validate().is_ok());
    assert_eq!(
        bound.effects[2].positions[1].fixed(),
        Some(Vec3::new(10.0, 64.0, -4.0))
    );

    // 存储的 duration 与推导值不一致，以推导值为准
    assert_eq!(bound.calculate_duration(), 1200);
    assert_eq!(bound.duration_mismatch(), Some((5000, 1200)));
    assert_eq!(Playhead::for_timeline(&bound).total_duration(), Some(1200));
}

#[test]
fn test_bound_timeline_survives_transport() {
    let template = AnimationTemplate::from_json(LIGHTNING_TEMPLATE).unwrap();
    let bound = template.instantiate(&bindings()).unwrap();

    let wire = serde_json::to_string(&bound).unwrap();
    let received = Timeline::from_json(&wire).unwrap();
    assert_eq!(received, bound);
    assert!(received.is_bound());
}

#[test]
fn test_active_entries_over_time() {
    let template = AnimationTemplate::from_json(LIGHTNING_TEMPLATE).unwrap();
    let bound = template.instantiate(&bindings()).unwrap();

    let active = |t| bound.active_entries(t).map(|(i, _)| i).collect::<Vec<_>>();
    assert_eq!(active(0), vec![0, 2]);
    assert_eq!(active(400), vec![0, 1, 2]);
    assert_eq!(active(800), vec![2]);
    assert!(active(1300).is_empty());
}

#[test]
fn test_missing_binding_drops_trigger() {
    let template = AnimationTemplate::from_json(LIGHTNING_TEMPLATE).unwrap();
    let mut partial = Bindings::new();
    partial.insert("target".to_string(), Vec3::ZERO);

    let err = template.instantiate(&partial).unwrap_err();
    assert!(matches!(err, TimelineError::MissingPlaceholder { ref name, .. } if name == "caster"));
}
