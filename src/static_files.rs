use crate::constants::CATCH_ALL_PARAM;
use crate::handler::{handler, HandlerFunc};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A handler serving the file named by the `filepath` parameter from under `root`.
pub(crate) fn serve_dir(root: PathBuf) -> HandlerFunc {
    let root = Arc::new(root);

    handler(move |c| {
        let root = Arc::clone(&root);
        Box::pin(async move {
            let rel = c.param(CATCH_ALL_PARAM).unwrap_or_default();
            let path = match map_path(&root, rel) {
                Some(path) => path,
                None => {
                    tracing::debug!(filepath = rel, "refusing static path");
                    c.status(StatusCode::NOT_FOUND);
                    return;
                }
            };

            let is_file = matches!(tokio::fs::metadata(&path).await, Ok(meta) if meta.is_file());
            if !is_file {
                c.status(StatusCode::NOT_FOUND);
                return;
            }

            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    c.header(CONTENT_TYPE.as_str(), content_type(&path));
                    c.data_bytes(StatusCode::OK, bytes);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), "could not read static file: {}", err);
                    c.status(StatusCode::NOT_FOUND);
                }
            }
        })
    })
}

/// Joins `rel` onto `root`, refusing parent, root and prefix components.
fn map_path(root: &Path, rel: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for comp in Path::new(rel.trim_start_matches('/')).components() {
        match comp {
            Component::Normal(s) => path.push(s),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::Context;
    use http::Method;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/a.css"), "body{}").unwrap();
        fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        dir
    }

    async fn get(app: &Engine, path: &str) -> Context {
        let mut c = Context::new(Method::GET, path).unwrap();
        app.handle(&mut c).await;
        c
    }

    #[test]
    fn should_refuse_traversal() {
        let root = Path::new("/srv/www");
        assert!(map_path(root, "../etc/passwd").is_none());
        assert!(map_path(root, "css/../../x").is_none());
        assert_eq!(map_path(root, "./css/a.css"), Some(PathBuf::from("/srv/www/css/a.css")));
        assert_eq!(map_path(root, ""), Some(PathBuf::from("/srv/www")));
    }

    #[test]
    fn should_pick_content_type_by_extension() {
        assert_eq!(content_type(Path::new("a.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("app.js")), "application/javascript");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn should_serve_files_under_root() {
        let dir = site();
        let mut app = Engine::new();
        app.static_files("/assets", dir.path());

        let c = get(&app, "/assets/css/a.css").await;
        assert_eq!(c.status_code(), StatusCode::OK);
        assert_eq!(c.written(), b"body{}");
        assert_eq!(
            c.response_headers().get(CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );

        let c = get(&app, "/assets/index.html").await;
        assert_eq!(c.written(), b"<h1>hi</h1>");
    }

    #[tokio::test]
    async fn should_answer_not_found_for_missing_files_and_directories() {
        let dir = site();
        let mut app = Engine::new();
        app.group("/v1").static_files("/static", dir.path());

        assert_eq!(get(&app, "/v1/static/nope.txt").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/v1/static/css").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/v1/static/").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/v1/static/%2E%2E/secret").await.status_code(), StatusCode::NOT_FOUND);
    }
}
