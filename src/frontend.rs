//! Static serving for the prebuilt frontend bundle.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Serves files out of `static_dir`; any path with no matching file falls
/// back to `index.html` so history-mode client routing keeps working.
pub fn spa(static_dir: &Path) -> ServeDir<ServeFile> {
    let index = static_dir.join("index.html");
    ServeDir::new(static_dir).fallback(ServeFile::new(index))
}
