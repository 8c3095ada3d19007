use std::{fmt::Write, fs, io::Cursor, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Datum, DatumExt, Framework, Graph, InferenceModelExt, SimplePlan, Tensor, TypedFact,
    TypedModel, TypedOp, tvec,
};

use crate::encode::{CHANNELS, EncodedTensor};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// TFLite flatbuffer file identifier, stored at byte offset 4.
const TFLITE_IDENTIFIER: &[u8; 4] = b"TFL3";

/// A loaded image classifier producing one score per class.
///
/// Implementations must be safe to call repeatedly and from several threads; the encoded input
/// is only read.
pub trait ClassificationModel: Send + Sync + std::fmt::Debug {
    /// Human readable identifier used in logs.
    fn name(&self) -> &str;

    /// Length of the score vector returned by [`ClassificationModel::infer`].
    fn num_classes(&self) -> usize;

    /// Run one forward pass and return the raw class scores.
    fn infer(&self, input: &EncodedTensor) -> Result<Vec<f32>>;
}

/// On-disk model formats understood by [`TractClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    TfLite,
    Onnx,
}

impl ModelFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tflite" => Some(ModelFormat::TfLite),
            "onnx" => Some(ModelFormat::Onnx),
            _ => None,
        }
    }

    /// Detect the format from the model bytes: TFLite when the `TFL3` identifier is present,
    /// ONNX otherwise.
    pub fn sniff(bytes: &[u8]) -> Self {
        if find_tflite_slice(bytes).is_some() {
            ModelFormat::TfLite
        } else {
            ModelFormat::Onnx
        }
    }
}

/// Input resolution and class count a classifier is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub width: u32,
    pub height: u32,
    pub num_classes: usize,
}

impl ModelShape {
    pub const fn new(width: u32, height: u32, num_classes: usize) -> Self {
        Self {
            width,
            height,
            num_classes,
        }
    }

    fn input_dims(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }
}

/// Classifier backed by a `tract` runnable plan, loaded from a TFLite or ONNX file.
#[derive(Debug)]
pub struct TractClassifier {
    name: String,
    runnable: RunnableModel,
    shape: ModelShape,
    format: ModelFormat,
}

impl TractClassifier {
    /// Load and optimize a model file for the given input resolution and class count.
    pub fn load<P: AsRef<Path>>(model_path: P, shape: ModelShape) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let bytes =
            fs::read(path).with_context(|| format!("failed to read model {}", path.display()))?;
        let format = ModelFormat::from_path(path).unwrap_or_else(|| ModelFormat::sniff(&bytes));
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model")
            .to_string();

        Self::from_bytes(name, &bytes, Some(format), shape)
            .with_context(|| format!("failed to load model {}", path.display()))
    }

    /// Load a model held in memory. The format is sniffed when not given.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        format: Option<ModelFormat>,
        shape: ModelShape,
    ) -> Result<Self> {
        let name = name.into();
        anyhow::ensure!(!bytes.is_empty(), "model {name} is empty");
        anyhow::ensure!(shape.num_classes > 0, "model {name} must have at least one class");
        let format = format.unwrap_or_else(|| ModelFormat::sniff(bytes));

        let runnable = match load_runnable_model(bytes, format, shape, true) {
            Ok(model) => {
                debug!(
                    "{name} model optimized successfully ({}x{}, {} classes)",
                    shape.width, shape.height, shape.num_classes
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "{name} model failed optimized load ({optimize_msg}); falling back to decluttered graph.\nError chain:\n{}",
                    chain_msg.trim_end()
                );
                load_runnable_model(bytes, format, shape, false).with_context(|| {
                    format!(
                        "fallback to decluttered {name} graph failed after optimize error: {optimize_msg}"
                    )
                })?
            }
        };

        Ok(Self {
            name,
            runnable,
            shape,
            format,
        })
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }
}

impl ClassificationModel for TractClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.shape.num_classes
    }

    fn infer(&self, input: &EncodedTensor) -> Result<Vec<f32>> {
        anyhow::ensure!(
            (input.width(), input.height()) == (self.shape.width, self.shape.height),
            "{} expects {}x{} input, got {}x{}",
            self.name,
            self.shape.width,
            self.shape.height,
            input.width(),
            input.height()
        );

        // Each call builds its own runtime tensor; the encoded buffer stays shared.
        let tensor = Tensor::from_shape(&input.shape(), input.as_slice())
            .map_err(|e| anyhow::anyhow!("failed to build input tensor: {e}"))?;
        let outputs = self
            .runnable
            .run(tvec![tensor.into()])
            .map_err(|e| anyhow::anyhow!("{} execution failed: {e}", self.name))?;

        let output = outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("{} produced no outputs", self.name))?;
        let scores = output
            .cast_to::<f32>()
            .map_err(|e| anyhow::anyhow!("{} output is not numeric: {e}", self.name))?;
        let scores = scores
            .as_slice::<f32>()
            .map_err(|e| anyhow::anyhow!("{} output is not contiguous f32: {e}", self.name))?;
        Ok(scores.to_vec())
    }
}

fn load_runnable_model(
    bytes: &[u8],
    format: ModelFormat,
    shape: ModelShape,
    optimized: bool,
) -> Result<RunnableModel> {
    let typed = parse_typed_model(bytes, format, shape)?;
    check_output_shape(&typed, shape)?;

    if optimized {
        typed
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    } else {
        typed
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    }
}

fn parse_typed_model(bytes: &[u8], format: ModelFormat, shape: ModelShape) -> Result<TypedModel> {
    let input_fact = f32::fact(shape.input_dims());
    match format {
        ModelFormat::TfLite => {
            let slice = find_tflite_slice(bytes)
                .ok_or_else(|| anyhow::anyhow!("could not locate TFLite buffer (TFL3 id)"))?;
            let model = tract_tflite::tflite()
                .model_for_read(&mut Cursor::new(slice))
                .map_err(|e| anyhow::anyhow!("failed to parse TFLite graph: {e}"))?;
            check_declared_input(&model, shape)?;
            model
                .with_input_fact(0, input_fact)
                .map_err(|e| anyhow::anyhow!("unable to set TFLite input fact: {e}"))
        }
        ModelFormat::Onnx => tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))
            .map_err(|e| anyhow::anyhow!("failed to parse ONNX graph: {e}"))?
            .with_input_fact(0, input_fact.into())
            .map_err(|e| anyhow::anyhow!("unable to set ONNX input fact: {e}"))?
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check ONNX graph: {e}")),
    }
}

fn check_declared_input(model: &TypedModel, shape: ModelShape) -> Result<()> {
    let fact = model
        .input_fact(0)
        .map_err(|e| anyhow::anyhow!("model has no input: {e}"))?;
    debug!(
        "declared input: {:?} {:?}",
        fact.datum_type,
        fact.shape.as_concrete()
    );
    anyhow::ensure!(
        fact.datum_type == f32::datum_type(),
        "model input must be f32, found {:?}",
        fact.datum_type
    );
    if let Some(dims) = fact.shape.as_concrete() {
        anyhow::ensure!(
            dims == shape.input_dims(),
            "model input shape {dims:?} does not match expected {:?}",
            shape.input_dims()
        );
    }
    Ok(())
}

fn check_output_shape(model: &TypedModel, shape: ModelShape) -> Result<()> {
    let fact = model
        .output_fact(0)
        .map_err(|e| anyhow::anyhow!("model has no output: {e}"))?;
    debug!(
        "declared output: {:?} {:?}",
        fact.datum_type,
        fact.shape.as_concrete()
    );
    if let Some(dims) = fact.shape.as_concrete() {
        let elements: usize = dims.iter().product();
        anyhow::ensure!(
            elements == shape.num_classes,
            "model output shape {dims:?} does not hold {} classes",
            shape.num_classes
        );
    }
    Ok(())
}

fn find_tflite_slice(buf: &[u8]) -> Option<&[u8]> {
    if buf.len() < 8 {
        return None;
    }
    (0..=buf.len() - 8)
        .find(|&i| &buf[i + 4..i + 8] == TFLITE_IDENTIFIER)
        .map(|i| &buf[i..])
}
