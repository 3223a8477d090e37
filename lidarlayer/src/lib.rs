//! LidarLayer - LiDAR raster processing and map overlays
//!
//! This library drives a remote point-cloud processing backend: it uploads
//! LiDAR files, runs multi-stage raster generation jobs, and presents the
//! resulting rasters as georeferenced map overlays without exhausting
//! memory on oversized images.
//!
//! # Modules
//!
//! - [`backend`] - typed HTTP client for the processing backend
//! - [`processing`] - job queues, step execution and progress reporting
//! - [`overlay`] - overlay store, map surface trait and rendering engine
//! - [`optimizer`] - downscaling and re-encoding of oversized rasters
//! - [`validation`] - bounds and image payload checks
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup

pub mod backend;
pub mod config;
pub mod geo;
pub mod logging;
pub mod notify;
pub mod optimizer;
pub mod overlay;
pub mod processing;
pub mod validation;

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
