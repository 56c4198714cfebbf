//! Error types for the layout store and the link connector.

use crate::layout::RerouteId;
use thiserror::Error;

/// Errors raised by [`LayoutStore`](crate::LayoutStore) operations.
///
/// Stale references (ids that are no longer in the store) are not errors;
/// they come back as [`OperationOutcome::Ignored`](crate::OperationOutcome::Ignored).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The operation's own fields contradict each other
    #[error("malformed operation: {reason}")]
    MalformedOperation { reason: String },
    /// Following reroute parents led back to an already visited reroute
    #[error("reroute chain loops back to reroute {0}")]
    RerouteLoop(RerouteId),
}

impl LayoutError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        LayoutError::MalformedOperation {
            reason: reason.into(),
        }
    }
}

/// Errors raised by [`LinkConnector`](crate::LinkConnector).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    /// An entry operation was called while a gesture is in flight
    #[error("already dragging links")]
    AlreadyDragging,
    /// An event name that no [`ConnectorEventKind`](crate::ConnectorEventKind) uses
    #[error("unknown connector event: {0}")]
    UnknownEvent(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
