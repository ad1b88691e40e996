//! The unit of work in the fact collection pipeline.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::FactsError;

/// One fact-collection step: takes an input, calls an upstream source, and
/// returns a serializable output the pipeline can cache.
///
/// Implementations hold their own HTTP clients and configuration, so a
/// pipeline can mix remote and local implementations of the same step.
#[async_trait]
pub trait Step: Send + Sync {
    /// What the step consumes.
    type Input: Send + Sync;
    /// What the step produces.
    type Output: Serialize + DeserializeOwned + Send;

    /// Returns the step's name, used as its cache key and in errors
    /// (e.g., `"geoclient"`).
    fn name(&self) -> &str;

    /// Runs the step.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError`] if the upstream call fails or its response
    /// cannot be interpreted.
    async fn run(&self, input: &Self::Input) -> Result<Self::Output, FactsError>;
}
