use thiserror::Error;

/// Failures from the probe and mutation layers.
///
/// Discovery failures abort a run before any mutation is attempted;
/// `ExtendFailed` and `ResizeFailed` are command-level failures that the
/// extension operation wraps with whatever partial state already applies.
#[derive(Error, Debug)]
pub enum LvmError {
    #[error("cannot resolve logical volume {device}: {reason}")]
    Resolution { device: String, reason: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("lvextend failed: {0}")]
    ExtendFailed(String),

    #[error("resize2fs failed: {0}")]
    ResizeFailed(String),
}
