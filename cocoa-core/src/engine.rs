//! Ownership and scheduling of the two classification models.

use std::{path::Path, sync::Arc};

use log::{debug, info};

use cocoa_utils::telemetry::timing_guard;

use crate::{
    encode::EncodedTensor,
    error::{ClassifyError, InferenceError},
    labels::ModelKind,
    model::{ClassificationModel, ModelShape, TractClassifier},
};

/// Shared handle to a loaded model.
pub type SharedModel = Arc<dyn ClassificationModel>;

/// Score vectors of both models for one encoded input.
#[derive(Debug)]
pub struct ModelOutputs {
    pub skin: Result<Vec<f32>, InferenceError>,
    pub color: Result<Vec<f32>, InferenceError>,
}

/// Holds the skin-condition and bean-color models.
///
/// Models are loaded once and only read afterwards. [`InferenceEngine::release`] drops them;
/// inference after release fails with [`InferenceError::Released`].
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    skin: Option<SharedModel>,
    color: Option<SharedModel>,
    parallel: bool,
}

impl InferenceEngine {
    /// Wrap two already loaded models.
    pub fn new(skin: SharedModel, color: SharedModel) -> Self {
        Self {
            skin: Some(skin),
            color: Some(color),
            parallel: false,
        }
    }

    /// Load both models from disk.
    pub fn load<P, Q>(
        skin_path: P,
        skin_shape: ModelShape,
        color_path: Q,
        color_shape: ModelShape,
    ) -> Result<Self, ClassifyError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let skin = load_model(ModelKind::SkinCondition, skin_path.as_ref(), skin_shape)?;
        let color = load_model(ModelKind::BeanColor, color_path.as_ref(), color_shape)?;
        Ok(Self::new(skin, color))
    }

    /// Run the two models on separate worker threads.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn is_loaded(&self) -> bool {
        self.skin.is_some() && self.color.is_some()
    }

    /// The model for `kind`, if it has not been released.
    pub fn model(&self, kind: ModelKind) -> Option<&SharedModel> {
        match kind {
            ModelKind::SkinCondition => self.skin.as_ref(),
            ModelKind::BeanColor => self.color.as_ref(),
        }
    }

    /// One forward pass of the `kind` model.
    ///
    /// A score vector whose length differs from the model's class count is reported as an
    /// error.
    pub fn infer(
        &self,
        kind: ModelKind,
        input: &EncodedTensor,
    ) -> Result<Vec<f32>, InferenceError> {
        let model = self.model(kind).ok_or(InferenceError::Released { kind })?;
        let _guard = timing_guard(format!("cocoa_core::infer::{}", model.name()), log::Level::Debug);

        let scores = model
            .infer(input)
            .map_err(|source| InferenceError::Execution { kind, source })?;
        let expected = model.num_classes();
        if scores.len() != expected {
            return Err(InferenceError::OutputLength {
                kind,
                expected,
                actual: scores.len(),
            });
        }
        debug!("{kind} scores: {scores:?}");
        Ok(scores)
    }

    /// Run both models on the same input. A failure in one does not affect the other.
    pub fn infer_both(&self, input: &EncodedTensor) -> ModelOutputs {
        let (skin, color) = if self.parallel {
            rayon::join(
                || self.infer(ModelKind::SkinCondition, input),
                || self.infer(ModelKind::BeanColor, input),
            )
        } else {
            (
                self.infer(ModelKind::SkinCondition, input),
                self.infer(ModelKind::BeanColor, input),
            )
        };
        ModelOutputs { skin, color }
    }

    /// Drop both models. Safe to call more than once.
    pub fn release(&mut self) {
        let skin = self.skin.take();
        let color = self.color.take();
        if skin.is_some() || color.is_some() {
            info!("classification models released");
        }
    }
}

fn load_model(
    kind: ModelKind,
    path: &Path,
    shape: ModelShape,
) -> Result<SharedModel, ClassifyError> {
    let _guard = timing_guard(format!("cocoa_core::load::{kind}"), log::Level::Debug);
    let model = TractClassifier::load(path, shape).map_err(|source| ClassifyError::ModelLoad {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "{kind} model loaded from {} ({} classes)",
        path.display(),
        shape.num_classes
    );
    Ok(Arc::new(model))
}
