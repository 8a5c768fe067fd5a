/*
 * Error type shared by every fallible operation of the crate. Failures are
 * reported at the call site that triggered them (window creation, subclass
 * installation, class registration) and never cross the dispatch boundary:
 * message handlers express failure through the handled/result pair instead.
 */
use crate::registry::SubclassId;
use crate::types::NativeHandle;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("window creation failed: {0}")]
    CreationFailed(String),
    #[error("handle {handle:?} is already intercepted by subclass {existing:?}")]
    AlreadyIntercepted {
        handle: NativeHandle,
        existing: SubclassId,
    },
    #[error("installing native interception on {0:?} failed")]
    SubclassFailed(NativeHandle),
    #[error("window has not been created yet")]
    NotCreated,
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        PlatformError::OperationFailed(format!("{err:?}"))
    }
}
