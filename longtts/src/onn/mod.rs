pub mod ort_koko;
pub mod vocab;

use crate::error::SynthesisError;

/// Initialize ONNX Runtime. Must be called before loading a model when the
/// `load-dynamic` feature is enabled.
///
/// For CUDA builds either set `ORT_DYLIB_PATH` to `libonnxruntime.so` or pass
/// the library path explicitly.
#[cfg(feature = "cuda")]
pub fn init_ort(dylib_path: Option<&str>) -> Result<(), SynthesisError> {
    if let Some(path) = dylib_path {
        let builder = ort::init_from(path)
            .map_err(|e| SynthesisError::Inference(format!("failed to load ort from {path}: {e}")))?;
        if !builder.commit() {
            return Err(SynthesisError::Inference(
                "failed to commit ort environment (already initialized?)".to_string(),
            ));
        }
    } else if std::env::var("ORT_DYLIB_PATH").is_ok() {
        if !ort::init().commit() {
            tracing::debug!("ONNX Runtime environment was already initialized");
        }
    } else {
        return Err(SynthesisError::Inference(
            "CUDA feature requires ORT_DYLIB_PATH environment variable or explicit path. \
             Download ONNX Runtime GPU from https://github.com/microsoft/onnxruntime/releases \
             and set ORT_DYLIB_PATH to the path of libonnxruntime.so"
                .to_string(),
        ));
    }
    Ok(())
}

/// Non-CUDA builds use the bundled ONNX Runtime, nothing to initialize.
#[cfg(not(feature = "cuda"))]
pub fn init_ort(_dylib_path: Option<&str>) -> Result<(), SynthesisError> {
    Ok(())
}
