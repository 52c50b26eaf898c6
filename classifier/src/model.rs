use std::fmt;
use std::io::Read;

use tract_core::internal::*;

use crate::errors::LoadError;
use crate::source::{AssetSource, fetch_success};

/// Anything that maps an input tensor to output tensors.
pub trait Predictor: fmt::Debug {
    fn predict(&self, input: TValue) -> TractResult<TVec<TValue>>;
}

/// Builds the predictor once metadata is known to be there.
pub trait ModelLoader {
    fn load_model(&self, source: &dyn AssetSource) -> Result<Box<dyn Predictor>, LoadError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Onnx,
    Tensorflow,
    Nnef,
}

impl ModelFormat {
    /// Guess the format from a file name, the same way tract's command line
    /// does.
    pub fn guess(name: &str) -> Option<ModelFormat> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".onnx") {
            Some(ModelFormat::Onnx)
        } else if name.ends_with(".pb") {
            Some(ModelFormat::Tensorflow)
        } else if [".nnef.tgz", ".nnef.tar", ".nnef.tar.gz"].iter().any(|ext| name.ends_with(ext)) {
            Some(ModelFormat::Nnef)
        } else {
            None
        }
    }

    /// Decode a model. Formats without fixed input facts (ONNX, TensorFlow)
    /// get `input_shape` as f32 input 0.
    pub fn typed_model(
        self,
        reader: &mut dyn Read,
        input_shape: &[usize],
    ) -> TractResult<TypedModel> {
        match self {
            ModelFormat::Nnef => tract_nnef::nnef().with_tract_core().model_for_read(reader),
            #[cfg(feature = "onnx")]
            ModelFormat::Onnx => {
                use tract_onnx::prelude::{InferenceFact, InferenceModelExt};
                let fact = InferenceFact::dt_shape(f32::datum_type(), input_shape.to_vec());
                tract_onnx::onnx().model_for_read(reader)?.with_input_fact(0, fact)?.into_typed()
            }
            #[cfg(feature = "tf")]
            ModelFormat::Tensorflow => {
                use tract_tensorflow::prelude::{InferenceFact, InferenceModelExt};
                let fact = InferenceFact::dt_shape(f32::datum_type(), input_shape.to_vec());
                tract_tensorflow::tensorflow()
                    .model_for_read(reader)?
                    .with_input_fact(0, fact)?
                    .into_typed()
            }
            #[allow(unreachable_patterns)]
            other => bail!("{:?} support was not compiled in", other),
        }
    }
}

/// A model loaded and optimized by tract, ready to run.
pub struct ClassifierModel {
    format: ModelFormat,
    plan: TypedRunnableModel<TypedModel>,
}

impl fmt::Debug for ClassifierModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClassifierModel({:?}, {} nodes)", self.format, self.plan.model().nodes().len())
    }
}

impl ClassifierModel {
    pub fn load(
        source: &dyn AssetSource,
        name: &str,
        input_shape: &[usize],
    ) -> Result<ClassifierModel, LoadError> {
        let format = ModelFormat::guess(name).ok_or_else(|| {
            LoadError::Model(format_err!("Can not guess model format from {:?}", name))
        })?;
        let asset = fetch_success(source, name)?;
        info!("Loading {:?} model {} ({} bytes)", format, name, asset.body.len());
        let model = Self::from_bytes(format, &asset.body, input_shape).map_err(LoadError::Model)?;
        info!("Model loaded: {:?}", model);
        Ok(model)
    }

    pub fn from_bytes(
        format: ModelFormat,
        bytes: &[u8],
        input_shape: &[usize],
    ) -> TractResult<ClassifierModel> {
        let model = format
            .typed_model(&mut &*bytes, input_shape)
            .with_context(|| format!("Decoding {format:?} model"))?;
        Self::from_typed(format, model)
    }

    pub fn from_typed(format: ModelFormat, model: TypedModel) -> TractResult<ClassifierModel> {
        let plan = model.into_optimized()?.into_runnable()?;
        Ok(ClassifierModel { format, plan })
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }
}

impl Predictor for ClassifierModel {
    fn predict(&self, input: TValue) -> TractResult<TVec<TValue>> {
        self.plan.run(tvec!(input))
    }
}

/// Loads `model_file` through tract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TractLoader {
    pub model_file: String,
    pub input_shape: [usize; 4],
}

impl ModelLoader for TractLoader {
    fn load_model(&self, source: &dyn AssetSource) -> Result<Box<dyn Predictor>, LoadError> {
        Ok(Box::new(ClassifierModel::load(source, &self.model_file, &self.input_shape)?))
    }
}
