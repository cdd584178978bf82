//! Web worker entry point for clearcut raster operations.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. It receives decoded RGBA pixels, an operation name, and the
//! operation's parameters as JSON via `postMessage`, runs the operation
//! through [`dispatch`], and posts the result back.
//!
//! Pixels travel as raw `Uint8Array` buffers in both directions so the
//! browser never JSON-encodes megabytes of pixel data. Small results
//! (aspect ratio, palette) and errors are sent as JSON strings.
//!
//! The flood fill is O(pixels); running it here keeps the browser's main
//! thread free while a large photo is being edited.

use clearcut_raster::{
    AspectRatio, ColorSample, RasterBuffer, RasterError, ResampleFilter, ResizeTarget,
    SelectionTolerance,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Errors reported back to the main thread as `errorJson`.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum WorkerError {
    /// The message named an unknown operation or carried malformed
    /// parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The operation itself failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Raw RGBA pixels as they arrive from the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawImage {
    fn into_buffer(self) -> Result<RasterBuffer, RasterError> {
        RasterBuffer::from_raw(self.width, self.height, self.pixels)
    }
}

/// One decoded worker message.
#[derive(Debug, Clone)]
pub struct Request {
    /// `aspect`, `composite`, `select`, `resample` or `palette`.
    pub op: String,
    /// The operand image.
    pub image: RawImage,
    /// JSON parameters for `op`.
    pub params_json: String,
    /// Segmentation mask, required by `composite`.
    pub mask: Option<RawImage>,
}

/// Parameters for `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectParams {
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub tolerance: SelectionTolerance,
}

/// Parameters for `resample`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleParams {
    pub target: ResizeTarget,
    #[serde(default)]
    pub filter: ResampleFilter,
}

/// Parameters for `palette`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteParams {
    #[serde(default = "default_max_colors")]
    pub max_colors: usize,
}

const fn default_max_colors() -> usize {
    clearcut_raster::DEFAULT_MAX_COLORS
}

/// A parsed operation with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Aspect,
    Composite,
    Select(SelectParams),
    Resample(ResampleParams),
    Palette(PaletteParams),
}

impl Operation {
    /// Parse an operation name and its JSON parameters.
    ///
    /// `aspect` and `composite` ignore their parameters.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidRequest`] for an unknown `op` or
    /// parameters that do not deserialize.
    pub fn parse(op: &str, params_json: &str) -> Result<Self, WorkerError> {
        let invalid = |e: serde_json::Error| {
            WorkerError::InvalidRequest(format!("failed to parse {op} params: {e}"))
        };
        match op {
            "aspect" => Ok(Self::Aspect),
            "composite" => Ok(Self::Composite),
            "select" => serde_json::from_str(params_json)
                .map(Self::Select)
                .map_err(invalid),
            "resample" => serde_json::from_str(params_json)
                .map(Self::Resample)
                .map_err(invalid),
            "palette" => serde_json::from_str(params_json)
                .map(Self::Palette)
                .map_err(invalid),
            other => Err(WorkerError::InvalidRequest(format!(
                "unknown operation {other:?}"
            ))),
        }
    }
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new image (composite, select, resample).
    Raster(RasterBuffer),
    /// A JSON value (aspect ratio identifier, palette).
    Json(String),
}

/// Run one request. Pure and synchronous so it can be tested natively.
///
/// # Errors
///
/// Returns [`WorkerError::InvalidRequest`] for a malformed request and
/// [`WorkerError::Raster`] when the operation fails.
pub fn dispatch(request: Request) -> Result<Outcome, WorkerError> {
    let operation = Operation::parse(&request.op, &request.params_json)?;
    let image = request.image.into_buffer()?;
    log::debug!(
        "worker: {} on {}x{}",
        request.op,
        image.width(),
        image.height()
    );

    match operation {
        Operation::Aspect => {
            let ratio: AspectRatio =
                clearcut_raster::match_aspect_ratio(image.width(), image.height())?;
            to_json(&ratio).map(Outcome::Json)
        }
        Operation::Composite => {
            let mask = request
                .mask
                .ok_or_else(|| {
                    WorkerError::InvalidRequest("composite requires a mask".to_string())
                })?
                .into_buffer()?;
            Ok(Outcome::Raster(clearcut_raster::composite_mask(
                &image, &mask,
            )?))
        }
        Operation::Select(params) => Ok(Outcome::Raster(clearcut_raster::select_region(
            &image,
            params.x,
            params.y,
            params.tolerance,
        )?)),
        Operation::Resample(params) => {
            let target = params.target.resolve(image.dimensions())?;
            Ok(Outcome::Raster(clearcut_raster::resample_with(
                &image,
                target.width,
                target.height,
                params.filter,
            )?))
        }
        Operation::Palette(params) => {
            let palette: Vec<ColorSample> =
                clearcut_raster::extract_palette(&image, params.max_colors)?;
            to_json(&palette).map(Outcome::Json)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, WorkerError> {
    serde_json::to_string(value)
        .map_err(|e| WorkerError::InvalidRequest(format!("failed to serialize result: {e}")))
}

/// Message protocol: the main thread sends a JS object with:
/// - `op`: `String` operation name
/// - `width`, `height`: `f64` operand dimensions
/// - `pixels`: `Uint8Array` operand RGBA pixels
/// - `paramsJson`: `String` JSON parameters for `op`
/// - `generation`: `f64` generation counter (passed through to response)
/// - `maskWidth`, `maskHeight`, `maskPixels`: optional mask for `composite`
///
/// On success the worker responds with a JS object containing:
/// - `generation`: `f64` matching the request generation
/// - `ok`: `true`
/// - `width`, `height`, `pixels` for raster results, or
/// - `resultJson`: `String` for aspect ratio and palette results
///
/// On error the worker responds with:
/// - `generation`: `f64`
/// - `ok`: `false`
/// - `errorJson`: `String` JSON-serialized [`WorkerError`]
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() {
    console_error_panic_hook::set_once();

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not running in a DedicatedWorkerGlobalScope");

    let onmessage =
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            handle_message(event);
        });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // lives for the worker lifetime
}

#[allow(clippy::needless_pass_by_value)]
fn handle_message(event: web_sys::MessageEvent) {
    let data = event.data();

    let generation = get(&data, "generation")
        .as_f64()
        .expect_throw("generation is not a number");

    let request = match read_request(&data) {
        Ok(request) => request,
        Err(e) => {
            post_error(generation, &e);
            return;
        }
    };

    match dispatch(request) {
        Ok(outcome) => post_success_response(generation, &outcome),
        Err(e) => post_error(generation, &e),
    }
}

fn get(data: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(data, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn read_request(data: &JsValue) -> Result<Request, WorkerError> {
    let op = get(data, "op")
        .as_string()
        .ok_or_else(|| WorkerError::InvalidRequest("op is not a string".to_string()))?;
    let params_json = get(data, "paramsJson")
        .as_string()
        .unwrap_or_else(|| "{}".to_string());
    let image = read_image(data, "width", "height", "pixels")?;

    let mask = if get(data, "maskPixels").is_undefined() {
        None
    } else {
        Some(read_image(data, "maskWidth", "maskHeight", "maskPixels")?)
    };

    Ok(Request {
        op,
        image,
        params_json,
        mask,
    })
}

fn read_image(
    data: &JsValue,
    width_key: &str,
    height_key: &str,
    pixels_key: &str,
) -> Result<RawImage, WorkerError> {
    let pixels: js_sys::Uint8Array = get(data, pixels_key).dyn_into().map_err(|_| {
        WorkerError::InvalidRequest(format!("{pixels_key} is not a Uint8Array"))
    })?;
    Ok(RawImage {
        width: read_u32(data, width_key)?,
        height: read_u32(data, height_key)?,
        pixels: pixels.to_vec(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn read_u32(data: &JsValue, key: &str) -> Result<u32, WorkerError> {
    get(data, key)
        .as_f64()
        .filter(|v| v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(v))
        .map(|v| v as u32)
        .ok_or_else(|| WorkerError::InvalidRequest(format!("{key} is not a pixel count")))
}

/// Post a successful result back to the main thread.
fn post_success_response(generation: f64, outcome: &Outcome) {
    let response = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        js_sys::Reflect::set(&response, &JsValue::from_str(key), val)
            .expect_throw("failed to set response field");
    };

    set("generation", &JsValue::from_f64(generation));
    set("ok", &JsValue::from_bool(true));

    match outcome {
        Outcome::Raster(buffer) => {
            set("width", &JsValue::from_f64(f64::from(buffer.width())));
            set("height", &JsValue::from_f64(f64::from(buffer.height())));
            set("pixels", &js_sys::Uint8Array::from(buffer.pixels()));
        }
        Outcome::Json(json) => set("resultJson", &JsValue::from_str(json)),
    }

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not in worker scope");
    global
        .post_message(&response)
        .expect_throw("failed to postMessage");
}

/// Post an error response back to the main thread.
fn post_error(generation: f64, error: &WorkerError) {
    let error_json = serde_json::to_string(error)
        .unwrap_or_else(|ser_err| format!("\"serialization error: {ser_err}\""));

    let response = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("generation"),
        &JsValue::from_f64(generation),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("ok"),
        &JsValue::from_bool(false),
    );
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("errorJson"),
        &JsValue::from_str(&error_json),
    );

    if let Ok(global) = js_sys::global().dyn_into::<web_sys::DedicatedWorkerGlobalScope>() {
        let _ = global.post_message(&response);
    }
}
