//! Transformer computation validation: tap and loading sweeps over power-flow
//! backends, canonical result records, and cross-backend reconciliation.

/// Collaborator interfaces of the simulation backends.
pub mod backend;
/// Pure electrical calculations and sweep domains.
pub mod calc;
pub mod compare;
pub mod config;
pub mod context;
pub mod error;
/// Backend adapters producing canonical result records.
pub mod extract;
pub mod io;
pub mod result;
/// Tap and power sweeps driving a backend.
pub mod sweep;
/// Collection of on-disk time-series results of the external engine.
pub mod timeseries;
