use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Serves the built admin UI.
///
/// Files under `static_dir` are served as-is; any other path gets
/// `index.html` so client-side routes resolve.
pub fn spa_service(static_dir: &str) -> ServeDir<ServeFile> {
    let index = Path::new(static_dir).join("index.html");
    ServeDir::new(static_dir).fallback(ServeFile::new(index))
}

/// Serves `static_dir` under `/static` without the SPA fallback.
pub fn static_service(static_dir: &str) -> ServeDir {
    ServeDir::new(static_dir)
}
