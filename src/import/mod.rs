// # Import Module
//
// Bulk import of local folder trees into remote albums, built from focused
// components:
//
// - **AlbumDirectory**: resolves album titles to remote albums, creating
//   them when absent, backed by a short-lived per-user cache
// - **DuplicateDetector**: per-album item cache for skip-if-present checks
// - **UploadExecutor**: single-file upload; failures go to the dead letter
// - **DeadLetterDrainer**: chunked, paced retry of persisted failures
// - **ImportService**: the orchestrator driving preflight, recursion,
//   batching, and postflight

mod album_directory;
mod deadletter;
mod duplicates;
mod service;
mod uploader;

pub use album_directory::AlbumDirectory;
pub use deadletter::DeadLetterDrainer;
pub use duplicates::DuplicateDetector;
pub use service::{ImportConfig, ImportService};
pub use uploader::{UploadExecutor, UPLOAD_TIMEOUT};
