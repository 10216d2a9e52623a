//! Python bindings for the detpost detection post-processing library.
//!
//! Exposes the detector, prior generation, and standalone NMS to Python via
//! PyO3, exchanging data as numpy arrays.

use numpy::{
    PyArray1, PyArray2, PyArray4, PyArrayMethods, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArray3, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use detpost::{
    BBox, ConfLayout, DetPostError, DetectConfig as RustDetectConfig, Detector as RustDetector,
    FeatureMapSpec, Predictions, PriorConfig, PriorSet, Variance,
};

/// Convert a DetPostError to a Python exception.
fn to_py_err(err: DetPostError) -> PyErr {
    match err {
        DetPostError::InvalidConfig { .. } | DetPostError::ShapeMismatch { .. } => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn parse_layout(layout: &str) -> PyResult<ConfLayout> {
    match layout.to_lowercase().as_str() {
        "anchor_major" => Ok(ConfLayout::AnchorMajor),
        "class_major" => Ok(ConfLayout::ClassMajor),
        _ => Err(PyValueError::new_err(
            "layout must be 'anchor_major' or 'class_major'",
        )),
    }
}

fn check_dims(what: &str, shape: &[usize], expected: [usize; 2]) -> PyResult<()> {
    if shape[1..] != expected {
        return Err(PyValueError::new_err(format!(
            "{what} must have shape (batch, {}, {}), got {shape:?}",
            expected[0], expected[1]
        )));
    }
    Ok(())
}

fn priors_to_array<'py>(py: Python<'py>, priors: &PriorSet) -> PyResult<Bound<'py, PyArray2<f32>>> {
    PyArray1::from_vec(py, priors.to_flat()).reshape([priors.len(), 4])
}

/// Detector configuration.
#[pyclass]
#[derive(Clone)]
pub struct DetectConfig {
    inner: RustDetectConfig,
}

#[pymethods]
impl DetectConfig {
    /// Create a new DetectConfig.
    ///
    /// Args:
    ///     num_classes: Number of classes including background (default: 21)
    ///     background_label: Class index never reported (default: 0)
    ///     conf_thresh: Scores must exceed this value (default: 0.01)
    ///     iou_thresh: NMS overlap threshold in [0, 1] (default: 0.45)
    ///     top_k: Detections kept per class per image (default: 200)
    ///     variance: (center, size) offset scales (default: (0.1, 0.2))
    ///     parallel: Process images in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        num_classes = 21,
        background_label = 0,
        conf_thresh = 0.01,
        iou_thresh = 0.45,
        top_k = 200,
        variance = (0.1, 0.2),
        parallel = false
    ))]
    fn new(
        num_classes: usize,
        background_label: usize,
        conf_thresh: f32,
        iou_thresh: f32,
        top_k: usize,
        variance: (f32, f32),
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustDetectConfig {
            num_classes,
            background_label,
            conf_thresh,
            iou_thresh,
            top_k,
            variance: Variance::new(variance.0, variance.1),
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "DetectConfig(num_classes={}, background_label={}, conf_thresh={}, iou_thresh={}, top_k={}, variance=({}, {}), parallel={})",
            self.inner.num_classes,
            self.inner.background_label,
            self.inner.conf_thresh,
            self.inner.iou_thresh,
            self.inner.top_k,
            self.inner.variance.center,
            self.inner.variance.size,
            self.inner.parallel
        )
    }
}

/// Detection post-processor bound to a prior set.
#[pyclass]
pub struct Detector {
    inner: RustDetector,
}

#[pymethods]
impl Detector {
    /// Create a detector.
    ///
    /// Args:
    ///     priors: 2D float32 array (num_priors x 4) of (cx, cy, w, h)
    ///     config: DetectConfig (default: DetectConfig())
    #[new]
    #[pyo3(signature = (priors, config = None))]
    fn new(priors: PyReadonlyArray2<'_, f32>, config: Option<DetectConfig>) -> PyResult<Self> {
        if priors.shape()[1] != 4 {
            return Err(PyValueError::new_err("priors must have shape (num_priors, 4)"));
        }
        let priors = PriorSet::from_flat(priors.as_slice()?).map_err(to_py_err)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustDetector::new(priors, cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Number of priors the detector decodes against.
    #[getter]
    fn num_priors(&self) -> usize {
        self.inner.priors().len()
    }

    /// Prior boxes as a (num_priors x 4) float32 array.
    fn priors<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f32>>> {
        priors_to_array(py, self.inner.priors())
    }

    /// Run decode, threshold, and NMS over a batch.
    ///
    /// Args:
    ///     loc: float32 array (batch x num_priors x 4)
    ///     conf: float32 array (batch x num_priors x num_classes), or
    ///         (batch x num_classes x num_priors) with layout="class_major"
    ///     layout: "anchor_major" or "class_major" (default: "anchor_major")
    ///
    /// Returns:
    ///     float32 array (batch x num_classes x top_k x 5) of
    ///     [score, x_min, y_min, x_max, y_max] rows, zero where unused
    #[pyo3(signature = (loc, conf, layout = "anchor_major"))]
    fn detect<'py>(
        &self,
        py: Python<'py>,
        loc: PyReadonlyArray3<'py, f32>,
        conf: PyReadonlyArray3<'py, f32>,
        layout: &str,
    ) -> PyResult<Bound<'py, PyArray4<f32>>> {
        let layout = parse_layout(layout)?;
        let batch = loc.shape()[0];
        if conf.shape()[0] != batch {
            return Err(PyValueError::new_err("loc and conf batch sizes differ"));
        }
        check_dims("loc", loc.shape(), self.inner.loc_dims())?;
        check_dims("conf", conf.shape(), self.inner.conf_dims(layout))?;
        let preds =
            Predictions::new(loc.as_slice()?, conf.as_slice()?, batch).with_layout(layout);
        let out = self.inner.detect(preds).map_err(to_py_err)?;
        let shape = out.shape();
        PyArray1::from_vec(py, out.into_vec()).reshape(shape)
    }

    fn __repr__(&self) -> String {
        format!(
            "Detector(num_priors={}, num_classes={}, top_k={})",
            self.inner.priors().len(),
            self.inner.config().num_classes,
            self.inner.config().top_k
        )
    }
}

/// Generate SSD-style prior boxes.
///
/// Args:
///     image_size: Input side length in pixels
///     sizes: Feature map sizes (cells per side)
///     steps: Input pixels per cell for each map
///     min_sizes: Smallest box side per map
///     max_sizes: Optional larger box side per map
///     aspect_ratios: Extra aspect ratios per map
///     clip: Clamp coordinates to [0, 1] (default: True)
///
/// Returns:
///     float32 array (num_priors x 4) of (cx, cy, w, h)
#[pyfunction]
#[pyo3(signature = (image_size, sizes, steps, min_sizes, max_sizes = None, aspect_ratios = None, clip = true))]
#[allow(clippy::too_many_arguments)]
fn generate_priors<'py>(
    py: Python<'py>,
    image_size: f32,
    sizes: Vec<usize>,
    steps: Vec<f32>,
    min_sizes: Vec<f32>,
    max_sizes: Option<Vec<f32>>,
    aspect_ratios: Option<Vec<Vec<f32>>>,
    clip: bool,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let n = sizes.len();
    if steps.len() != n
        || min_sizes.len() != n
        || max_sizes.as_ref().is_some_and(|v| v.len() != n)
        || aspect_ratios.as_ref().is_some_and(|v| v.len() != n)
    {
        return Err(PyValueError::new_err(
            "per-map lists must all have the same length",
        ));
    }
    let feature_maps = (0..n)
        .map(|i| FeatureMapSpec {
            size: sizes[i],
            step: steps[i],
            min_size: min_sizes[i],
            max_size: max_sizes.as_ref().map(|v| v[i]),
            aspect_ratios: aspect_ratios
                .as_ref()
                .map(|v| v[i].clone())
                .unwrap_or_default(),
        })
        .collect();
    let cfg = PriorConfig {
        image_size,
        feature_maps,
        clip,
    };
    let priors = PriorSet::generate(&cfg).map_err(to_py_err)?;
    priors_to_array(py, &priors)
}

/// The SSD300 prior layout (8732 priors).
#[pyfunction]
fn ssd300_priors(py: Python<'_>) -> PyResult<Bound<'_, PyArray2<f32>>> {
    let priors = PriorSet::generate(&PriorConfig::ssd300()).map_err(to_py_err)?;
    priors_to_array(py, &priors)
}

/// Greedy IoU non-maximum suppression.
///
/// Args:
///     boxes: float32 array (N x 4) of (x_min, y_min, x_max, y_max)
///     scores: float32 array (N,)
///     iou_thresh: Overlap threshold in [0, 1]
///     top_k: Maximum number of boxes to keep
///
/// Returns:
///     List of kept indices, best first
#[pyfunction]
#[pyo3(signature = (boxes, scores, iou_thresh = 0.45, top_k = 200))]
fn nms(
    boxes: PyReadonlyArray2<'_, f32>,
    scores: PyReadonlyArray1<'_, f32>,
    iou_thresh: f32,
    top_k: usize,
) -> PyResult<Vec<usize>> {
    if boxes.shape()[1] != 4 {
        return Err(PyValueError::new_err("boxes must have shape (N, 4)"));
    }
    let boxes: Vec<BBox> = boxes
        .as_slice()?
        .chunks_exact(4)
        .map(|c| BBox::new(c[0], c[1], c[2], c[3]))
        .collect();
    detpost::nms(&boxes, scores.as_slice()?, iou_thresh, top_k).map_err(to_py_err)
}

/// Python module for detpost.
#[pymodule]
fn _detpost(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DetectConfig>()?;
    m.add_class::<Detector>()?;
    m.add_function(wrap_pyfunction!(generate_priors, m)?)?;
    m.add_function(wrap_pyfunction!(ssd300_priors, m)?)?;
    m.add_function(wrap_pyfunction!(nms, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
