//! Backends a sweep can drive.

use crate::backend::{ExternalApplication, Port, PowerFlowSolver, SolveFailure, Topology};
use crate::error::{ExtractError, SweepError};
use crate::extract::{
    ExternalExtractor, ExternalObjects, ExtractionConvention, LOAD_ATTRIBUTE, NumericExtractor,
    ResultExtractor,
};
use crate::result::GridResult;

/// One simulation backend, stepped through SET_TAP, SET_LOAD, SOLVE and EXTRACT
/// for every operating point.
pub trait SweepBackend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Moves the transformer tap changer to `position`.
    fn set_tap(&mut self, position: i32);

    /// Sets the active power of the load behind `port` (MW).
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::UnconfiguredLoad`] if no load is known at `port`.
    fn set_load(&mut self, port: Port, p_mw: f64) -> Result<(), SweepError>;

    /// Runs the power flow for the current operating point.
    fn solve(&mut self) -> Result<(), SolveFailure>;

    /// Reads the canonical result of the last solve.
    fn extract(&self, topology: Topology) -> Result<GridResult, ExtractError>;
}

/// A numeric solver driven through its tap and load setters.
///
/// The tap changer is assumed on the high voltage side.
#[derive(Debug)]
pub struct NumericBackend<S: PowerFlowSolver> {
    solver: S,
    extractor: NumericExtractor,
}

impl<S: PowerFlowSolver> NumericBackend<S> {
    pub fn new(solver: S, convention: ExtractionConvention) -> Self {
        Self {
            solver,
            extractor: NumericExtractor::new(convention),
        }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn into_inner(self) -> S {
        self.solver
    }
}

impl<S: PowerFlowSolver> SweepBackend for NumericBackend<S> {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn set_tap(&mut self, position: i32) {
        self.solver.set_tap(Port::High, position);
    }

    fn set_load(&mut self, port: Port, p_mw: f64) -> Result<(), SweepError> {
        if port == Port::High {
            return Err(SweepError::UnconfiguredLoad { port });
        }
        self.solver.set_load(port, p_mw);
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SolveFailure> {
        self.solver.solve()
    }

    fn extract(&self, topology: Topology) -> Result<GridResult, ExtractError> {
        self.extractor.extract(&self.solver, topology)
    }
}

/// An external application driven through object attributes.
#[derive(Debug)]
pub struct ExternalBackend<A: ExternalApplication> {
    app: A,
    extractor: ExternalExtractor,
}

impl<A: ExternalApplication> ExternalBackend<A> {
    pub fn new(app: A, objects: ExternalObjects) -> Self {
        Self {
            app,
            extractor: ExternalExtractor::new(objects),
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn into_inner(self) -> A {
        self.app
    }
}

impl<A: ExternalApplication> SweepBackend for ExternalBackend<A> {
    fn name(&self) -> &'static str {
        "external"
    }

    fn set_tap(&mut self, position: i32) {
        let objects = self.extractor.objects();
        self.app.set_attribute(
            &objects.transformer,
            &objects.tap_attribute,
            f64::from(position),
        );
    }

    fn set_load(&mut self, port: Port, p_mw: f64) -> Result<(), SweepError> {
        let load = self
            .extractor
            .objects()
            .load(port)
            .ok_or(SweepError::UnconfiguredLoad { port })?;
        self.app.set_attribute(load, LOAD_ATTRIBUTE, p_mw);
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SolveFailure> {
        match self.app.execute_loadflow() {
            0 => Ok(()),
            status => Err(SolveFailure::new(format!(
                "load flow command returned status {status}"
            ))),
        }
    }

    fn extract(&self, topology: Topology) -> Result<GridResult, ExtractError> {
        self.extractor.extract(&self.app, topology)
    }
}
