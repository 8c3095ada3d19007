use std::{
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use cocoa_core::{
    Classification, ClassificationModel, ClassifyError, EncodedTensor, InferenceEngine,
    InferenceError, ModelKind, PipelineConfig, PipelineObserver, RoastClassifier, SourceImage,
    Stage,
};
use cocoa_utils::{
    AppSettings, ImageStats, load_fixture_bytes, load_fixture_image,
    config::{ModelSettings, TensorEncoding},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Returns fixed scores and remembers the last input it saw.
#[derive(Debug)]
struct ScriptedModel {
    name: &'static str,
    scores: Vec<f32>,
    calls: AtomicUsize,
    last_input: Mutex<Option<EncodedTensor>>,
}

impl ScriptedModel {
    fn new(name: &'static str, scores: &[f32]) -> Arc<Self> {
        Arc::new(Self {
            name,
            scores: scores.to_vec(),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        })
    }
}

impl ClassificationModel for ScriptedModel {
    fn name(&self) -> &str {
        self.name
    }

    fn num_classes(&self) -> usize {
        self.scores.len()
    }

    fn infer(&self, input: &EncodedTensor) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        Ok(self.scores.clone())
    }
}

#[derive(Debug)]
struct FailingModel;

impl ClassificationModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    fn num_classes(&self) -> usize {
        2
    }

    fn infer(&self, _input: &EncodedTensor) -> Result<Vec<f32>> {
        anyhow::bail!("interpreter crashed")
    }
}

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<(Stage, u32, u32)>>,
    outputs: Mutex<Vec<(ModelKind, String)>>,
    errors: Mutex<Vec<ModelKind>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_image(&self, stage: Stage, stats: &ImageStats) {
        self.stages
            .lock()
            .unwrap()
            .push((stage, stats.width, stats.height));
    }

    fn on_model_output(&self, kind: ModelKind, _scores: &[f32], result: &Classification) {
        self.outputs.lock().unwrap().push((kind, result.label.clone()));
    }

    fn on_inference_error(&self, kind: ModelKind, _error: &InferenceError) {
        self.errors.lock().unwrap().push(kind);
    }
}

fn classifier(skin: &[f32], color: &[f32]) -> RoastClassifier {
    let engine = InferenceEngine::new(ScriptedModel::new("skin", skin), ScriptedModel::new("color", color));
    RoastClassifier::new(engine, PipelineConfig::default())
}

fn gray(width: u32, height: u32) -> SourceImage {
    SourceImage::upright(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb([128, 128, 128]),
    )))
}

#[test]
fn gray_photo_end_to_end() {
    let skin = ScriptedModel::new("skin", &[0.9, 0.1]);
    let color = ScriptedModel::new("color", &[0.1, 0.1, 0.8]);
    let engine = InferenceEngine::new(skin.clone(), color.clone());
    let classifier = RoastClassifier::new(engine, PipelineConfig::default());

    let report = classifier.classify_image(&gray(512, 512)).expect("classify");

    assert_eq!(report.skin.label, "dikupas");
    assert!((report.skin.confidence - 0.9).abs() < 1e-6);
    assert_eq!(report.color.label, "hitam");
    assert!((report.color.confidence - 0.8).abs() < 1e-6);

    let view = &report.presentation;
    assert_eq!(view.skin_condition_text(), "peeled (90%)");
    assert_eq!(view.bean_color, "black");
    assert_eq!(view.color_confidence_pct, 80);
    assert_eq!(view.roast_status, "over-roasted");

    // Both models read the same 256x256 raw-encoded gray tensor.
    for model in [&skin, &color] {
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        let input = model.last_input.lock().unwrap().clone().expect("input recorded");
        assert_eq!(input.len(), 196_608);
        assert!(input.as_slice().iter().all(|&v| v == 128.0));
    }
}

#[test]
fn tied_scores_pick_the_first_label() {
    let report = classifier(&[0.5, 0.5], &[0.2, 0.6, 0.2])
        .classify_image(&gray(64, 64))
        .expect("classify");
    assert_eq!(report.skin.label, "dikupas");
    assert_eq!(report.skin.confidence, 0.5);
    assert_eq!(report.presentation.skin_condition, "peeled");
    assert_eq!(report.presentation.bean_color, "light brown");
    assert_eq!(report.presentation.roast_status, "not mature");
}

#[test]
fn logits_are_softmaxed() {
    let report = classifier(&[-1.2, 2.3], &[3.0, 1.0, 0.5])
        .classify_image(&gray(300, 200))
        .expect("classify");
    assert!(report.skin.softmax_applied);
    assert_eq!(report.skin.label, "tidak_dikupas");
    assert_eq!(report.presentation.skin_condition_text(), "not peeled (97%)");
    assert_eq!(report.color.label, "cokelat");
    assert_eq!(report.presentation.roast_status, "mature");
    let sum: f32 = report.color.probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
}

#[test]
fn failing_model_only_affects_its_own_result() {
    let observer = Arc::new(RecordingObserver::default());
    let engine = InferenceEngine::new(
        Arc::new(FailingModel),
        ScriptedModel::new("color", &[0.7, 0.2, 0.1]),
    );
    let classifier =
        RoastClassifier::new(engine, PipelineConfig::default()).with_observer(observer.clone());

    let report = classifier.classify_image(&gray(32, 32)).expect("request still succeeds");
    assert!(report.skin.is_error());
    assert_eq!(report.skin.confidence, 0.0);
    assert_eq!(report.presentation.skin_condition_text(), "error (0%)");
    assert_eq!(report.color.label, "cokelat");
    assert_eq!(report.presentation.roast_status, "mature");

    assert_eq!(*observer.errors.lock().unwrap(), vec![ModelKind::SkinCondition]);
    assert_eq!(
        *observer.outputs.lock().unwrap(),
        vec![(ModelKind::BeanColor, "cokelat".to_string())]
    );
}

#[test]
fn parallel_inference_matches_sequential() {
    let skin = ScriptedModel::new("skin", &[0.3, 0.7]);
    let color = ScriptedModel::new("color", &[0.2, 1.5, -0.4]);
    let sequential = RoastClassifier::new(
        InferenceEngine::new(skin.clone(), color.clone()),
        PipelineConfig::default(),
    );
    let parallel = RoastClassifier::new(
        InferenceEngine::new(skin, color).with_parallel(true),
        PipelineConfig::default(),
    );

    let source = gray(100, 80);
    let a = sequential.classify_image(&source).expect("sequential");
    let b = parallel.classify_image(&source).expect("parallel");
    assert_eq!(a, b);
}

#[test]
fn observer_sees_every_stage_after_rotation() {
    let observer = Arc::new(RecordingObserver::default());
    let classifier = classifier(&[0.9, 0.1], &[0.1, 0.1, 0.8]).with_observer(observer.clone());

    let source = SourceImage::new(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([90, 60, 40]))),
        cocoa_core::Orientation::Rotate90,
    );
    classifier.classify_image(&source).expect("classify");

    assert_eq!(
        *observer.stages.lock().unwrap(),
        vec![
            (Stage::Original, 40, 20),
            (Stage::Oriented, 20, 40),
            (Stage::Normalized, 256, 256),
        ]
    );
    assert_eq!(observer.outputs.lock().unwrap().len(), 2);
}

#[test]
fn encoded_fixture_bytes_are_classified() {
    let bytes = load_fixture_bytes("images/bean_pattern.png").expect("fixture");
    let report = classifier(&[0.2, 0.8], &[0.6, 0.3, 0.1])
        .classify_bytes(&bytes)
        .expect("classify");
    assert_eq!(report.presentation.skin_condition_text(), "not peeled (80%)");
    assert_eq!(report.presentation.bean_color, "brown");
}

#[test]
fn unit_encoding_reaches_the_models() {
    let skin = ScriptedModel::new("skin", &[0.9, 0.1]);
    let config = PipelineConfig {
        encoding: TensorEncoding::Unit,
        ..PipelineConfig::default()
    };
    let classifier = RoastClassifier::new(
        InferenceEngine::new(skin.clone(), ScriptedModel::new("color", &[0.1, 0.1, 0.8])),
        config,
    );

    let image = load_fixture_image("images/overexposed.png").expect("fixture");
    classifier
        .classify_image(&SourceImage::upright(image))
        .expect("classify");

    let input = skin.last_input.lock().unwrap().clone().expect("input recorded");
    assert!(input.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!((input.as_slice()[0] - 252.0 / 255.0).abs() < 1e-6);
}

#[test]
fn undecodable_bytes_fail_before_inference() {
    let skin = ScriptedModel::new("skin", &[0.9, 0.1]);
    let classifier = RoastClassifier::new(
        InferenceEngine::new(skin.clone(), ScriptedModel::new("color", &[0.1, 0.1, 0.8])),
        PipelineConfig::default(),
    );

    let err = classifier
        .classify_bytes(b"this is not a photo")
        .expect_err("decode should fail");
    assert!(matches!(err, ClassifyError::ImageDecode { .. }));
    assert_eq!(skin.calls.load(Ordering::SeqCst), 0);

    let err = classifier
        .classify_path("fixtures/images/does_not_exist.jpg")
        .expect_err("missing file");
    assert!(matches!(err, ClassifyError::ImageDecode { .. }));
}

#[test]
fn missing_model_files_fail_to_load() {
    let settings = AppSettings {
        skin_model: ModelSettings {
            path: "does/not/exist/skin.tflite".into(),
            labels: Vec::new(),
        },
        ..AppSettings::default()
    };

    let err = RoastClassifier::from_settings(&settings).expect_err("missing model");
    assert!(matches!(
        err,
        ClassifyError::ModelLoad {
            kind: ModelKind::SkinCondition,
            ..
        }
    ));
    assert!(err.to_string().contains("skin condition"));
}

#[test]
fn negative_sum_tolerance_is_a_config_error() {
    let mut settings = AppSettings::default();
    settings.interpretation.sum_tolerance = -0.1;

    let err = PipelineConfig::from_settings(&settings).expect_err("negative tolerance");
    assert!(matches!(err, ClassifyError::Config(_)));
    let err = RoastClassifier::from_settings(&settings).expect_err("rejected before model load");
    assert!(matches!(err, ClassifyError::Config(_)));
}

#[test]
fn released_classifier_drops_models() {
    let skin = ScriptedModel::new("skin", &[0.9, 0.1]);
    let classifier = RoastClassifier::new(
        InferenceEngine::new(skin.clone(), ScriptedModel::new("color", &[0.1, 0.1, 0.8])),
        PipelineConfig::default(),
    );
    assert_eq!(Arc::strong_count(&skin), 2);
    classifier.release();
    assert_eq!(Arc::strong_count(&skin), 1);
}

#[test]
fn png_round_trip_keeps_upright_orientation() {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 10, Rgb([10, 20, 30])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let source = SourceImage::from_bytes(&bytes).expect("decode");
    assert!(source.orientation.is_upright());
    assert_eq!((source.image.width(), source.image.height()), (30, 10));
}
