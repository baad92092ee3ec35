//! Weighted reductions producing the monitoring indices
//!
//! Every reduction takes a field by reference and returns a new,
//! lower-rank field tagged with the run's job id.
//!
//! # Organization
//!
//! - [`operations`]: collapse methods and the generic field collapse
//! - [`kernels`]: parallel masked reduction kernels
//! - [`area`]: area-weighted horizontal means
//! - [`volume`]: volume-weighted global means
//! - [`integral`]: sea-ice area integrals with hemispheric split
//! - [`derived`]: soil moisture total and net TOA flux

pub mod area;
pub mod derived;
pub mod integral;
pub mod kernels;
pub mod operations;
pub mod volume;

pub use area::area_mean;
pub use derived::{soil_moisture_total, toa_net_flux};
pub use integral::{sea_ice_area_integrals, Hemisphere};
pub use operations::{collapse, AxisReduction, CollapseMethod};
pub use volume::volume_mean;
