//! Blender Tests
//!
//! Tests for:
//! - Override and additive layer composition
//! - Single-write-per-frame and zero-weight skipping
//! - Binding failures (missing assembler / component, domain and length mismatches)
//! - Crossfade merging inside a layer
//! - Assembler registry behaviour
//! - Parameter-driven transitions through the blender

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Quat, Vec3};
use smallvec::smallvec;

use kinema::animation::assembler::{AssemblerRegistry, ComponentRef, TargetResolver};
use kinema::animation::blender::{Blender, BlenderSettings};
use kinema::animation::clip::{AnimationClip, AnimationCurve, CurveBinding};
use kinema::animation::layer::{BlendingMode, Layer};
use kinema::animation::parameters::Condition;
use kinema::animation::state::AnimationState;
use kinema::animation::state_machine::StateMachine;
use kinema::animation::tracks::{InterpolationMode, Keyframe, KeyframeTrack, TrackData, WrapMode};
use kinema::animation::transition::Transition;
use kinema::animation::values::{AnimationValue, FloatArray, ValueDomain};
use kinema::errors::{AnimationError, BindingError, ConfigurationError, SampleDomainError};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Test Scene
// ============================================================================

#[derive(Debug, Default)]
struct Light {
    intensity: f32,
    writes: usize,
}

#[derive(Debug, Default)]
struct Transform {
    rotation: Quat,
}

#[derive(Debug, Default)]
struct SkinnedMesh {
    weights: FloatArray,
}

#[derive(Default)]
struct TestScene {
    components: HashMap<(String, String), ComponentRef>,
}

impl TestScene {
    fn insert<C: 'static>(&mut self, path: &str, kind: &str, component: C) -> Rc<RefCell<C>> {
        let shared = Rc::new(RefCell::new(component));
        let erased: Rc<dyn Any> = shared.clone();
        self.components
            .insert((path.to_string(), kind.to_string()), erased);
        shared
    }
}

impl TargetResolver for TestScene {
    fn resolve_component(&self, path: &str, target_kind: &str) -> Option<ComponentRef> {
        self.components
            .get(&(path.to_string(), target_kind.to_string()))
            .cloned()
    }
}

fn registry() -> AssemblerRegistry {
    let mut registry = AssemblerRegistry::new();
    registry
        .register_field::<Light, f32>(
            "Light",
            "intensity",
            |light| light.intensity,
            |light, value| {
                light.intensity = value;
                light.writes += 1;
            },
        )
        .unwrap();
    registry
        .register_field::<Transform, Quat>(
            "Transform",
            "rotation",
            |t| t.rotation,
            |t, value| t.rotation = value,
        )
        .unwrap();
    registry
        .register_field::<SkinnedMesh, FloatArray>(
            "SkinnedMesh",
            "blendShapeWeights",
            |mesh| mesh.weights.clone(),
            |mesh, value| mesh.weights = value,
        )
        .unwrap();
    registry
}

fn intensity() -> CurveBinding {
    CurveBinding::new("Lamp", "Light", "intensity")
}

fn constant(value: f32) -> TrackData {
    TrackData::Scalar(KeyframeTrack::new(
        vec![Keyframe::flat(0.0, value), Keyframe::flat(1.0, value)],
        InterpolationMode::Linear,
    ))
}

fn ramp(from: f32, to: f32) -> TrackData {
    TrackData::Scalar(KeyframeTrack::new(
        vec![Keyframe::flat(0.0, from), Keyframe::flat(1.0, to)],
        InterpolationMode::Linear,
    ))
}

fn single_state(name: &str, curves: Vec<AnimationCurve>) -> StateMachine {
    let clip = Arc::new(AnimationClip::new(name, curves));
    StateMachine::new(vec![AnimationState::new(name, clip)], name).unwrap()
}

fn constant_layer(name: &str, value: f32, weight: f32, mode: BlendingMode) -> Layer {
    let machine = single_state(name, vec![AnimationCurve::new(intensity(), constant(value))]);
    Layer::new(name, machine)
        .with_weight(weight)
        .with_blending_mode(mode)
}

fn lamp_scene(default: f32) -> (TestScene, Rc<RefCell<Light>>) {
    let mut scene = TestScene::default();
    let lamp = scene.insert(
        "Lamp",
        "Light",
        Light {
            intensity: default,
            writes: 0,
        },
    );
    (scene, lamp)
}

// ============================================================================
// Layer Composition
// ============================================================================

#[test]
fn override_layers_compose_in_order() {
    init_logger();
    let (scene, lamp) = lamp_scene(0.0);
    let mut blender = Blender::new(vec![
        constant_layer("Base", 10.0, 0.3, BlendingMode::Override),
        constant_layer("Top", 20.0, 0.7, BlendingMode::Override),
    ]);
    assert!(blender.bind(&registry(), &scene).is_complete());

    blender.update(0.1);

    let expected = {
        let base = 0.0 + (10.0 - 0.0) * 0.3;
        base + (20.0 - base) * 0.7
    };
    assert!(approx(lamp.borrow().intensity, expected));
    assert!(approx(lamp.borrow().intensity, 14.9));
}

#[test]
fn additive_layer_adds_weighted_delta() {
    let (scene, lamp) = lamp_scene(4.0);
    let mut blender = Blender::new(vec![constant_layer(
        "Add",
        10.0,
        0.5,
        BlendingMode::Additive,
    )]);
    blender.bind(&registry(), &scene);

    blender.update(0.1);
    assert!(approx(lamp.borrow().intensity, 7.0));
}

#[test]
fn additive_layers_commute() {
    let run = |order: [(f32, f32); 2]| {
        let (scene, lamp) = lamp_scene(4.0);
        let layers = order
            .iter()
            .enumerate()
            .map(|(i, &(value, weight))| {
                constant_layer(&format!("Add{i}"), value, weight, BlendingMode::Additive)
            })
            .collect();
        let mut blender = Blender::new(layers);
        blender.bind(&registry(), &scene);
        blender.update(0.1);
        let value = lamp.borrow().intensity;
        value
    };

    let forward = run([(10.0, 0.5), (6.0, 0.25)]);
    let backward = run([(6.0, 0.25), (10.0, 0.5)]);
    assert!(approx(forward, 7.5));
    assert!(approx(forward, backward));
}

#[test]
fn single_full_override_is_exact_sample() {
    let (scene, lamp) = lamp_scene(-1.0);
    let track = ramp(0.0, 10.0);
    let expected = match track.sample(0.25) {
        AnimationValue::Scalar(v) => v,
        other => panic!("unexpected {other:?}"),
    };
    let machine = single_state("Ramp", vec![AnimationCurve::new(intensity(), track)]);
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    blender.bind(&registry(), &scene);

    blender.update(0.25);
    assert_eq!(lamp.borrow().intensity, expected);
}

#[test]
fn first_layer_weight_is_honored() {
    let (scene, lamp) = lamp_scene(2.0);
    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        10.0,
        0.5,
        BlendingMode::Override,
    )]);
    blender.bind(&registry(), &scene);
    blender.update(0.1);
    assert!(approx(lamp.borrow().intensity, 6.0));
}

#[test]
fn zero_weight_owner_is_never_written() {
    let (scene, lamp) = lamp_scene(3.0);
    let mut blender = Blender::new(vec![constant_layer(
        "Muted",
        10.0,
        0.0,
        BlendingMode::Override,
    )]);
    blender.bind(&registry(), &scene);

    for _ in 0..5 {
        blender.update(0.1);
    }
    assert_eq!(lamp.borrow().writes, 0);
    assert_eq!(lamp.borrow().intensity, 3.0);
    // The state machine keeps running while muted.
    assert!(approx(
        blender.layer("Muted").unwrap().state_machine().current_playback().time,
        0.5
    ));
}

#[test]
fn shared_owner_written_once_per_frame() {
    let (scene, lamp) = lamp_scene(0.0);
    let mut blender = Blender::new(vec![
        constant_layer("Base", 1.0, 1.0, BlendingMode::Override),
        constant_layer("Add", 5.0, 1.0, BlendingMode::Additive),
        constant_layer("Top", 2.0, 0.5, BlendingMode::Override),
    ]);
    let report = blender.bind(&registry(), &scene);
    assert_eq!(report.bound_curves, 3);
    assert_eq!(report.owners_created, 1);
    assert_eq!(blender.owner_count(), 1);

    blender.update(0.1);
    blender.update(0.1);
    assert_eq!(lamp.borrow().writes, 2);
    assert_eq!(blender.frame_count(), 2);
}

// ============================================================================
// Binding Failures
// ============================================================================

#[test]
fn missing_assembler_skips_only_that_curve() {
    init_logger();
    let (scene, lamp) = lamp_scene(0.0);
    let machine = single_state(
        "Both",
        vec![
            AnimationCurve::new(CurveBinding::new("Lamp", "Light", "range"), constant(3.0)),
            AnimationCurve::new(intensity(), constant(8.0)),
        ],
    );
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    let report = blender.bind(&registry(), &scene);

    assert_eq!(report.bound_curves, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        AnimationError::Binding(BindingError::MissingAssembler { .. })
    ));
    assert_eq!(report.failures[0].binding.property_str(), "range");

    blender.update(0.1);
    assert_eq!(lamp.borrow().intensity, 8.0);
}

#[test]
fn missing_component_is_reported() {
    let scene = TestScene::default();
    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        1.0,
        1.0,
        BlendingMode::Override,
    )]);
    let report = blender.bind(&registry(), &scene);
    assert_eq!(
        report.failures[0].error,
        AnimationError::Binding(BindingError::MissingComponent {
            path: "Lamp".into(),
            target_kind: "Light".into(),
        })
    );
    assert_eq!(blender.owner_count(), 0);

    // Does not panic without owners.
    blender.update(0.1);
}

#[test]
fn domain_mismatch_is_reported() {
    let (scene, lamp) = lamp_scene(1.0);
    let track = TrackData::Vec3(KeyframeTrack::new(
        vec![Keyframe::flat(0.0, Vec3::ONE)],
        InterpolationMode::Linear,
    ));
    let machine = single_state("Wrong", vec![AnimationCurve::new(intensity(), track)]);
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    let report = blender.bind(&registry(), &scene);

    assert_eq!(
        report.failures[0].error,
        AnimationError::Binding(BindingError::DomainMismatch {
            property: "intensity".into(),
            expected: ValueDomain::Vec3,
            found: ValueDomain::Scalar,
        })
    );
    blender.update(0.1);
    assert_eq!(lamp.borrow().writes, 0);
}

#[test]
fn array_length_mismatch_is_reported() {
    let mut scene = TestScene::default();
    scene.insert(
        "Body",
        "SkinnedMesh",
        SkinnedMesh {
            weights: smallvec![0.0, 0.0, 0.0],
        },
    );
    let track = TrackData::FloatArray(KeyframeTrack::new(
        vec![Keyframe::flat(0.0, smallvec![1.0, 1.0])],
        InterpolationMode::Linear,
    ));
    let binding = CurveBinding::new("Body", "SkinnedMesh", "blendShapeWeights");
    let machine = single_state("Smile", vec![AnimationCurve::new(binding, track)]);
    let mut blender = Blender::new(vec![Layer::new("Face", machine)]);
    let report = blender.bind(&registry(), &scene);

    assert_eq!(
        report.failures[0].error,
        AnimationError::SampleDomain(SampleDomainError::TargetLengthMismatch {
            property: "blendShapeWeights".into(),
            track: 2,
            target: 3,
        })
    );
}

#[test]
fn malformed_track_is_reported() {
    let (scene, _lamp) = lamp_scene(0.0);
    let track = TrackData::Scalar(KeyframeTrack::new(Vec::new(), InterpolationMode::Linear));
    let machine = single_state("Empty", vec![AnimationCurve::new(intensity(), track)]);
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    let report = blender.bind(&registry(), &scene);
    assert_eq!(
        report.failures[0].error,
        AnimationError::SampleDomain(SampleDomainError::EmptyTrack)
    );
}

#[test]
fn rebinding_reuses_owners() {
    let (scene, _lamp) = lamp_scene(0.0);
    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        1.0,
        1.0,
        BlendingMode::Override,
    )]);
    let first = blender.bind(&registry(), &scene);
    assert_eq!(first.owners_created, 1);

    blender.add_layer(constant_layer("Extra", 2.0, 1.0, BlendingMode::Additive));
    let second = blender.bind(&registry(), &scene);
    assert_eq!(second.owners_created, 0);
    assert_eq!(second.bound_curves, 2);
    assert_eq!(blender.owner_count(), 1);
    assert!(blender.layers().iter().all(Layer::is_bound));
}

// ============================================================================
// Value Domains
// ============================================================================

#[test]
fn rotation_blend_stays_unit_length() {
    let mut scene = TestScene::default();
    let transform = scene.insert("Arm", "Transform", Transform::default());
    let binding = CurveBinding::new("Arm", "Transform", "rotation");

    let rotation_layer = |name: &str, q: Quat, weight: f32, mode: BlendingMode| {
        let track = TrackData::Rotation(KeyframeTrack::new(
            vec![Keyframe::flat(0.0, q), Keyframe::flat(1.0, q)],
            InterpolationMode::Linear,
        ));
        Layer::new(name, single_state(name, vec![AnimationCurve::new(binding, track)]))
            .with_weight(weight)
            .with_blending_mode(mode)
    };

    let mut blender = Blender::new(vec![
        rotation_layer("Base", Quat::from_rotation_y(1.2), 1.0, BlendingMode::Override),
        rotation_layer("Aim", Quat::from_rotation_x(-0.7), 0.6, BlendingMode::Override),
        rotation_layer("Breath", Quat::from_rotation_z(0.3), 0.4, BlendingMode::Additive),
    ]);
    blender.bind(&registry(), &scene);
    blender.update(0.1);

    let rotation = transform.borrow().rotation;
    assert!((rotation.length() - 1.0).abs() < 1e-5);
    assert!(!rotation.abs_diff_eq(Quat::IDENTITY, 1e-3));
}

#[test]
fn additive_rotations_compose_in_layer_order() {
    let binding = CurveBinding::new("Arm", "Transform", "rotation");
    let additive = |name: &str, q: Quat| {
        let track = TrackData::Rotation(KeyframeTrack::new(
            vec![Keyframe::flat(0.0, q), Keyframe::flat(1.0, q)],
            InterpolationMode::Linear,
        ));
        Layer::new(name, single_state(name, vec![AnimationCurve::new(binding, track)]))
            .with_blending_mode(BlendingMode::Additive)
    };
    let run = |first: Quat, second: Quat| {
        let mut scene = TestScene::default();
        let transform = scene.insert("Arm", "Transform", Transform::default());
        let mut blender = Blender::new(vec![additive("First", first), additive("Second", second)]);
        blender.bind(&registry(), &scene);
        blender.update(0.1);
        let rotation = transform.borrow().rotation;
        rotation
    };

    let x = Quat::from_rotation_x(0.8);
    let y = Quat::from_rotation_y(0.6);
    let xy = run(x, y);
    let yx = run(y, x);

    // Rotation deltas compose in fixed layer order, unlike linear domains.
    assert!(xy.angle_between(x * y) < 1e-4);
    assert!(yx.angle_between(y * x) < 1e-4);
    assert!(xy.angle_between(yx) > 1e-2);
}

#[test]
fn float_array_blends_component_wise() {
    let mut scene = TestScene::default();
    let mesh = scene.insert(
        "Body",
        "SkinnedMesh",
        SkinnedMesh {
            weights: smallvec![0.0, 0.5],
        },
    );
    let track = TrackData::FloatArray(KeyframeTrack::new(
        vec![
            Keyframe::flat(0.0, smallvec![1.0, 1.0]),
            Keyframe::flat(1.0, smallvec![1.0, 1.0]),
        ],
        InterpolationMode::Linear,
    ));
    let binding = CurveBinding::new("Body", "SkinnedMesh", "blendShapeWeights");
    let machine = single_state("Smile", vec![AnimationCurve::new(binding, track)]);
    let mut blender = Blender::new(vec![Layer::new("Face", machine).with_weight(0.5)]);
    blender.bind(&registry(), &scene);
    blender.update(0.1);

    let weights = mesh.borrow().weights.clone();
    assert!(approx(weights[0], 0.5));
    assert!(approx(weights[1], 0.75));
}

// ============================================================================
// Crossfade & Parameters
// ============================================================================

#[test]
fn crossfade_merges_within_layer() {
    let (scene, lamp) = lamp_scene(100.0);
    let clip = |name: &str, value: f32| {
        Arc::new(AnimationClip::new(
            name,
            vec![AnimationCurve::new(intensity(), constant(value))],
        ))
    };
    let machine = StateMachine::new(
        vec![
            AnimationState::new("A", clip("A", 0.0)),
            AnimationState::new("B", clip("B", 10.0)),
        ],
        "A",
    )
    .unwrap();
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    blender.bind(&registry(), &scene);

    blender.cross_fade("Base", "B", 1.0).unwrap();
    blender.update(0.5);
    assert!(approx(lamp.borrow().intensity, 5.0));

    blender.update(0.5);
    assert!(approx(lamp.borrow().intensity, 10.0));
}

#[test]
fn parameters_drive_transitions() {
    let (scene, lamp) = lamp_scene(0.0);
    let clip = |name: &str, value: f32| {
        Arc::new(AnimationClip::new(
            name,
            vec![AnimationCurve::new(intensity(), constant(value))],
        ))
    };
    let idle = AnimationState::new("Idle", clip("Idle", 1.0))
        .with_transition(Transition::to("Run").when(Condition::is_true("running")));
    let run = AnimationState::new("Run", clip("Run", 2.0));
    let machine = StateMachine::new(vec![idle, run], "Idle").unwrap();
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]);
    blender.bind(&registry(), &scene);

    blender.update(0.1);
    assert_eq!(lamp.borrow().intensity, 1.0);

    blender.set_bool("running", true);
    blender.update(0.1);
    assert_eq!(lamp.borrow().intensity, 2.0);
    assert_eq!(
        blender.layer("Base").unwrap().state_machine().current_state().name,
        "Run"
    );
}

#[test]
fn layer_control_errors() {
    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        1.0,
        1.0,
        BlendingMode::Override,
    )]);
    assert_eq!(
        blender.play("Nope", "Base"),
        Err(ConfigurationError::LayerNotFound("Nope".into()))
    );
    assert_eq!(
        blender.play("Base", "Nope"),
        Err(ConfigurationError::StateNotFound("Nope".into()))
    );
}

#[test]
fn revert_defaults_restores_baseline() {
    let (scene, lamp) = lamp_scene(0.25);
    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        10.0,
        1.0,
        BlendingMode::Override,
    )]);
    blender.bind(&registry(), &scene);
    blender.update(0.1);
    assert_eq!(lamp.borrow().intensity, 10.0);

    blender.revert_defaults();
    assert_eq!(lamp.borrow().intensity, 0.25);
}

#[test]
fn speed_setting_scales_dt() {
    let (scene, lamp) = lamp_scene(0.0);
    let clip = Arc::new(AnimationClip::new(
        "Ramp",
        vec![AnimationCurve::new(intensity(), ramp(0.0, 10.0))],
    ));
    let state = AnimationState::new("Ramp", clip).with_wrap_mode(WrapMode::Clamp);
    let machine = StateMachine::new(vec![state], "Ramp").unwrap();
    let mut blender = Blender::new(vec![Layer::new("Base", machine)]).with_settings(
        BlenderSettings {
            speed: 0.5,
            ..Default::default()
        },
    );
    blender.bind(&registry(), &scene);

    blender.update(1.0);
    assert!(approx(lamp.borrow().intensity, 5.0));
}

// ============================================================================
// Assembler Registry
// ============================================================================

#[test]
fn registry_last_write_wins() {
    let (scene, lamp) = lamp_scene(0.0);
    let mut registry = registry();
    registry
        .register_field::<Light, f32>(
            "Light",
            "intensity",
            |light| light.intensity,
            |light, value| light.intensity = value * 2.0,
        )
        .unwrap();

    let mut blender = Blender::new(vec![constant_layer(
        "Base",
        3.0,
        1.0,
        BlendingMode::Override,
    )]);
    blender.bind(&registry, &scene);
    blender.update(0.1);
    assert_eq!(lamp.borrow().intensity, 6.0);
}

#[test]
fn sealed_registry_rejects_registration() {
    let mut registry = registry();
    registry.seal();
    assert!(registry.is_sealed());
    assert!(registry.contains("Light", "intensity"));

    let err = registry
        .register_field::<Light, f32>("Light", "color", |l| l.intensity, |l, v| l.intensity = v)
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::RegistrySealed {
            target_kind: "Light".into(),
            property: "color".into(),
        }
    );
    assert!(!registry.contains("Light", "color"));
}

#[test]
fn component_type_mismatch() {
    let mut scene = TestScene::default();
    scene.insert("Lamp", "Light", Transform::default());
    let binding = intensity();
    let result = registry().bind(&binding, &scene);
    assert!(matches!(
        result,
        Err(BindingError::ComponentTypeMismatch { .. })
    ));
}

#[test]
fn global_registry_is_shared() {
    AssemblerRegistry::global()
        .write()
        .register_field::<Light, f32>(
            "GlobalProbe",
            "intensity",
            |l| l.intensity,
            |l, v| l.intensity = v,
        )
        .unwrap();
    assert!(AssemblerRegistry::global().read().contains("GlobalProbe", "intensity"));
}
