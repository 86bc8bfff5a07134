//! The HDBSCAN model surface.
//!
//! [`HdbscanBuilder`] validates configuration up front; [`Hdbscan::fit`]
//! runs core distances, the mutual-reachability spanning tree and the
//! hierarchy pipeline, reporting progress through [`FitStage`].

mod config;
mod model;
mod snapshot;
mod stage;

pub use self::{
    config::{Algorithm, HdbscanBuilder, HdbscanConfig},
    model::{FittedModel, Hdbscan},
    snapshot::ModelSnapshot,
    stage::{FitStage, FitWarning},
};

#[cfg(test)]
mod tests;
