//! Diagnostics port: where evaluation records go.

use std::future::Future;

use coverctl_domain::diagnostics::Diagnostics;
use coverctl_domain::error::CoverError;

/// Publishes the diagnostics record of every evaluation.
pub trait DiagnosticsPublisher {
    fn publish(
        &self,
        diagnostics: Diagnostics,
    ) -> impl Future<Output = Result<(), CoverError>> + Send;
}

impl<T: DiagnosticsPublisher + Send + Sync> DiagnosticsPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        diagnostics: Diagnostics,
    ) -> impl Future<Output = Result<(), CoverError>> + Send {
        (**self).publish(diagnostics)
    }
}
