use designate_acme_solver::{
    challenge::{ChallengeAction, ChallengeRequest},
    solver::{Solver, SolverError},
};
use log::{debug, info};
use thiserror::Error;

/// An executor hands challenge requests to a solver, based on the requested action
pub struct Executor<'a> {
    solver: &'a dyn Solver,
}

#[derive(Error, Debug, Eq, PartialEq, Clone)]
pub enum ExecutorError {
    #[error("`{0}`")]
    Solver(SolverError),
    #[error("challenge request {0} does not specify an action")]
    MissingAction(String),
}
impl From<SolverError> for ExecutorError {
    fn from(s: SolverError) -> Self {
        ExecutorError::Solver(s)
    }
}

impl<'a> Executor<'a> {
    pub fn new(solver: &'a dyn Solver) -> Executor<'a> {
        Self { solver }
    }

    /// Run the action requested by the challenge itself
    pub fn handle(&self, ch: &ChallengeRequest) -> Result<ChallengeAction, ExecutorError> {
        let action = ch.action.ok_or_else(|| {
            ExecutorError::MissingAction(ch.uid.to_owned().unwrap_or_else(|| ch.to_string()))
        })?;
        self.run(action, ch)?;
        Ok(action)
    }

    pub fn run(&self, action: ChallengeAction, ch: &ChallengeRequest) -> Result<(), ExecutorError> {
        debug!(
            "Dispatching {} for {} to solver {}",
            action,
            ch,
            self.solver.name()
        );
        match action {
            ChallengeAction::Present => self.solver.present(ch)?,
            ChallengeAction::CleanUp => self.solver.cleanup(ch)?,
        }
        info!("{} for {} completed", action, ch);
        Ok(())
    }
}
