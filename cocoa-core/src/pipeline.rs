use std::{fs, path::Path, sync::Arc};

use image::DynamicImage;
use log::{debug, info};
use serde::Serialize;

use cocoa_utils::{
    config::{AppSettings, TensorEncoding},
    decode_image,
    diagnostics::ImageStats,
    telemetry::timing_guard,
};

use crate::{
    encode::{EncodedTensor, encode},
    engine::InferenceEngine,
    error::{ClassifyError, InferenceError},
    interpret::{Classification, InterpretConfig, interpret},
    labels::{LabelSet, ModelKind},
    model::ModelShape,
    normalize::{NormalizeConfig, normalize},
    observer::{LogObserver, PipelineObserver, Stage},
    orientation::Orientation,
    presentation::RoastPresentation,
};

/// A decoded photo together with the rotation needed to make it upright.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub orientation: Orientation,
}

impl SourceImage {
    pub fn new(image: DynamicImage, orientation: Orientation) -> Self {
        Self { image, orientation }
    }

    /// An image that needs no rotation.
    pub fn upright(image: DynamicImage) -> Self {
        Self::new(image, Orientation::Upright)
    }

    /// Decode an encoded photo and read its EXIF orientation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifyError> {
        let image = decode_image(bytes).map_err(|source| ClassifyError::ImageDecode { source })?;
        Ok(Self::new(image, Orientation::read_from_bytes(bytes)))
    }

    /// Read, decode and orient a photo stored on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| ClassifyError::ImageDecode {
            source: anyhow::Error::new(err).context(format!("failed to read {}", path.display())),
        })?;
        Self::from_bytes(&bytes)
    }
}

/// Everything but the models that a request needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub normalize: NormalizeConfig,
    pub encoding: TensorEncoding,
    pub skin_labels: LabelSet,
    pub color_labels: LabelSet,
    pub interpret: InterpretConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeConfig::default(),
            encoding: TensorEncoding::default(),
            skin_labels: LabelSet::skin_condition(),
            color_labels: LabelSet::bean_color(),
            interpret: InterpretConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Derive the request configuration from application settings.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ClassifyError> {
        settings.encoding.validate().map_err(ClassifyError::Config)?;
        settings
            .interpretation
            .validate()
            .map_err(ClassifyError::Config)?;
        let skin_labels = LabelSet::from_settings(ModelKind::SkinCondition, &settings.skin_model)
            .map_err(ClassifyError::Config)?;
        let color_labels = LabelSet::from_settings(ModelKind::BeanColor, &settings.color_model)
            .map_err(ClassifyError::Config)?;
        Ok(Self {
            normalize: (&settings.input).into(),
            encoding: settings.encoding,
            skin_labels,
            color_labels,
            interpret: (&settings.interpretation).into(),
        })
    }

    pub fn labels(&self, kind: ModelKind) -> &LabelSet {
        match kind {
            ModelKind::SkinCondition => &self.skin_labels,
            ModelKind::BeanColor => &self.color_labels,
        }
    }

    /// Expected input resolution and class count of the `kind` model.
    pub fn model_shape(&self, kind: ModelKind) -> ModelShape {
        ModelShape::new(
            self.normalize.width,
            self.normalize.height,
            self.labels(kind).len(),
        )
    }
}

/// Outcome of classifying one photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoastReport {
    pub skin: Classification,
    pub color: Classification,
    pub presentation: RoastPresentation,
}

/// Couples the two models with the normalization, encoding and interpretation settings.
///
/// This is the main entry point for classifying a cocoa bean photo.
pub struct RoastClassifier {
    engine: InferenceEngine,
    config: PipelineConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl std::fmt::Debug for RoastClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoastClassifier")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RoastClassifier {
    /// Build a classifier around an already loaded engine.
    pub fn new(engine: InferenceEngine, config: PipelineConfig) -> Self {
        Self {
            engine,
            config,
            observer: None,
        }
    }

    /// Load both models named in `settings`.
    ///
    /// Enabling `diagnostics` attaches a [`LogObserver`].
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ClassifyError> {
        let _guard = timing_guard("cocoa_core::RoastClassifier::from_settings", log::Level::Debug);
        let config = PipelineConfig::from_settings(settings)?;
        let engine = InferenceEngine::load(
            &settings.skin_model.path,
            config.model_shape(ModelKind::SkinCondition),
            &settings.color_model.path,
            config.model_shape(ModelKind::BeanColor),
        )?
        .with_parallel(settings.inference.parallel);

        let classifier = Self::new(engine, config);
        Ok(if settings.diagnostics.enabled {
            classifier.with_observer(Arc::new(LogObserver))
        } else {
            classifier
        })
    }

    /// Attach diagnostics hooks.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Classify a photo stored on disk.
    pub fn classify_path<P: AsRef<Path>>(&self, path: P) -> Result<RoastReport, ClassifyError> {
        let _guard = timing_guard("cocoa_core::classify_path", log::Level::Debug);
        let source = SourceImage::from_path(path)?;
        self.classify_image(&source)
    }

    /// Classify an encoded photo held in memory.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<RoastReport, ClassifyError> {
        let _guard = timing_guard("cocoa_core::classify_bytes", log::Level::Debug);
        let source = SourceImage::from_bytes(bytes)?;
        self.classify_image(&source)
    }

    /// Run normalization, encoding, both models and interpretation on a decoded photo.
    ///
    /// Only decode, normalization and load problems fail the request; a model that fails at
    /// inference time yields the `("error", 0.0)` result for that model alone.
    pub fn classify_image(&self, source: &SourceImage) -> Result<RoastReport, ClassifyError> {
        let _guard = timing_guard("cocoa_core::classify_image", log::Level::Debug);

        let tensor = self.prepare(source)?;
        let outputs = {
            let _guard = timing_guard("cocoa_core::inference", log::Level::Debug);
            self.engine.infer_both(&tensor)
        };

        let skin = self.interpret_output(ModelKind::SkinCondition, outputs.skin);
        let color = self.interpret_output(ModelKind::BeanColor, outputs.color);
        let presentation = RoastPresentation::from_results(&skin, &color);
        info!(
            "classified bean: {} / {} ({})",
            presentation.skin_condition_text(),
            presentation.bean_color_text(),
            presentation.roast_status
        );

        Ok(RoastReport {
            skin,
            color,
            presentation,
        })
    }

    /// Normalize and encode a photo into the shared model input.
    pub fn prepare(&self, source: &SourceImage) -> Result<EncodedTensor, ClassifyError> {
        let normalized = match &self.observer {
            None => normalize(&source.image, source.orientation, &self.config.normalize)?,
            Some(observer) => {
                observer.on_image(Stage::Original, &ImageStats::sample(&source.image.to_rgb8()));
                let oriented = source.orientation.apply(&source.image);
                observer.on_image(Stage::Oriented, &ImageStats::sample(&oriented.to_rgb8()));
                let normalized =
                    normalize(&oriented, Orientation::Upright, &self.config.normalize)?;
                observer.on_image(Stage::Normalized, &ImageStats::sample(&normalized));
                normalized
            }
        };
        debug!(
            "normalized {}x{} ({:?}) to {}x{}",
            source.image.width(),
            source.image.height(),
            source.orientation,
            normalized.width(),
            normalized.height()
        );
        Ok(encode(&normalized, &self.config.encoding))
    }

    fn interpret_output(
        &self,
        kind: ModelKind,
        output: Result<Vec<f32>, InferenceError>,
    ) -> Classification {
        match output {
            Ok(scores) => {
                let result = interpret(&scores, self.config.labels(kind), &self.config.interpret);
                if let Some(observer) = &self.observer {
                    observer.on_model_output(kind, &scores, &result);
                }
                result
            }
            Err(err) => {
                log::error!("{err}");
                if let Some(observer) = &self.observer {
                    observer.on_inference_error(kind, &err);
                }
                Classification::error()
            }
        }
    }

    /// Release both models. The classifier cannot be used afterwards.
    pub fn release(self) {
        let mut engine = self.engine;
        engine.release();
    }
}
