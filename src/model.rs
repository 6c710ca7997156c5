use std::path::Path;

use crate::{
    device::Device,
    errors::{Result, SiloError},
    traits::{ClassificationModel, SegmentationModel},
};
use log::{debug, info};
use ndarray::prelude::*;
use ort::{
    ep::CUDA as CUDAExecutionProvider,
    session::{builder::SessionBuilder, Session},
    value::TensorRef,
};
use parking_lot::Mutex;

/// Open an ONNX session for `device`.
///
/// GPUs go through the CUDA execution provider; ONNX Runtime falls back to the CPU
/// provider when CUDA is unavailable.
fn open_session(model_path: &Path, device: Device) -> Result<Session> {
    let mut builder = SessionBuilder::new().map_err(|e| SiloError::Model {
        operation: "session builder init".to_string(),
        source: Box::new(e),
    })?;

    if let Device::Gpu(device_id) = device {
        builder = builder
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build()])
            .map_err(|e| SiloError::Model {
                operation: "execution provider setup".to_string(),
                source: Box::new(ort::Error::<()>::from(e)),
            })?;
    }

    let session = builder
        .with_memory_pattern(true)
        .map_err(|e| SiloError::Model {
            operation: "memory pattern setup".to_string(),
            source: Box::new(ort::Error::<()>::from(e)),
        })?
        .commit_from_file(model_path)
        .map_err(|e| SiloError::Model {
            operation: format!("load model file: {}", model_path.display()),
            source: Box::new(e),
        })?;

    info!("loaded {} on {device}", model_path.display());
    Ok(session)
}

/// Names of the first input and the first output of a session.
fn io_names(session: &Session, model_path: &Path) -> Result<(String, String)> {
    let missing = |what: &str| SiloError::Model {
        operation: format!("read {what} metadata: {}", model_path.display()),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("model declares no {what}"),
        )),
    };

    let input = session
        .inputs()
        .first()
        .map(|i| i.name().to_string())
        .ok_or_else(|| missing("input"))?;
    let output = session
        .outputs()
        .first()
        .map(|o| o.name().to_string())
        .ok_or_else(|| missing("output"))?;
    Ok((input, output))
}

// ort links its own ndarray major version, so tensors cross the boundary as
// (shape, contiguous slice) pairs.
fn tensor_view<'a>(array: &'a CowArray<'_, f32, Ix4>) -> (Vec<usize>, &'a [f32]) {
    let data = array
        .as_slice()
        .expect("as_standard_layout yields a contiguous array");
    (array.shape().to_vec(), data)
}

fn extract_array(value: &ort::value::DynValue) -> Result<ArrayD<f32>> {
    let (shape, data) = value.try_extract_tensor::<f32>()?;
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
}

fn ensure_device(expected: Device, requested: Device) -> Result<()> {
    if expected == requested {
        Ok(())
    } else {
        Err(SiloError::Validation {
            field: "device".to_string(),
            reason: format!("session was created for {expected}, not {requested}"),
        })
    }
}

/// Segmentation network exported to ONNX, `[1, 3, H, W]` in, `[1, 2, H, W]` logits out.
pub struct OnnxSegmentationModel {
    device: Device,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl OnnxSegmentationModel {
    pub fn new(model_path: &Path, device: Device) -> Result<Self> {
        let session = open_session(model_path, device)?;
        let (input_name, output_name) = io_names(&session, model_path)?;

        Ok(Self {
            device,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub const fn device(&self) -> Device {
        self.device
    }
}

impl SegmentationModel for OnnxSegmentationModel {
    // ONNX graphs are exported in eval mode and never track gradients.
    fn enter_inference_mode(&self) {}

    fn forward(&self, input: ArrayView4<f32>, device: Device) -> Result<Array4<f32>> {
        ensure_device(self.device, device)?;

        let mut session = self.session.lock();
        let input = input.as_standard_layout();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(tensor_view(&input))?
        ])?;
        debug!("segmentation forward pass done on {device}");

        Ok(extract_array(&outputs[self.output_name.as_str()])?.into_dimensionality::<Ix4>()?)
    }
}

/// Silo presence classifier exported to ONNX, `[1, H, W, 3]` in, one probability out.
pub struct OnnxClassificationModel {
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl OnnxClassificationModel {
    pub fn new(model_path: &Path, device: Device) -> Result<Self> {
        let session = open_session(model_path, device)?;
        let (input_name, output_name) = io_names(&session, model_path)?;

        Ok(Self {
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }
}

impl ClassificationModel for OnnxClassificationModel {
    fn predict_probability(&self, batch: ArrayView4<f32>) -> Result<f32> {
        let mut session = self.session.lock();
        let batch = batch.as_standard_layout();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(tensor_view(&batch))?
        ])?;

        let scores = extract_array(&outputs[self.output_name.as_str()])?;
        scores.iter().next().copied().ok_or_else(|| {
            SiloError::shape_mismatch("classification output", "[1, 1]", scores.shape())
        })
    }
}
