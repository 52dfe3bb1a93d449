//! The intent classifier contract.
//!
//! Classification is an external, swappable capability: it may run a local
//! matcher, call a model, or reach a remote scoring service.  The dispatcher
//! only relies on this trait and applies its own score threshold to whatever
//! comes back.

use async_trait::async_trait;

use crate::envelope::ClassifiedIntent;
use crate::error::Result;

/// Maps raw text to a best-guess intent.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`.
    ///
    /// Return `Err` only when the classifier itself failed (for example its
    /// backend is unreachable).  A poor match is a low score, not an error.
    async fn classify(&self, text: &str) -> Result<ClassifiedIntent>;
}
