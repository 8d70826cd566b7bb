//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resolve size** | [`geometry::resolve`] (pure) |
//! | **Plan crop** | [`crop::plan`] (pure) |
//! | **Crop / scale → encode** | `crop_imm` + `resize_exact` (Lanczos3) + format encoder |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for dimension math (unit testable)
//! - **Crop**: Pure crop-rectangle planning per anchor
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod crop;
pub mod geometry;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use crop::plan as plan_crop;
pub use geometry::{fit_within, resolve};
pub use operations::{Operation, execute, get_dimensions, plan_rendition};
pub use params::{CropParams, CropRect, FitParams, OutputFormat, Quality};
pub use rust_backend::RustBackend;
