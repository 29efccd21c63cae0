//! Simulation of charged particles crossing a three-shell cylindrical
//! tracker, and reconstruction of the collision's z-vertex from their hits.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub mod distribution;
pub mod track;
pub mod store;
pub mod transport;
pub mod generator;
pub mod noise;
pub mod simulation;
pub mod calibration;
pub mod reconstruction;
pub mod analysis;
pub mod utils;

pub use geometry::{Geometry, Point, Vector};
