use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::catalog::Catalog;

/// Resolve the catalog and write it as the static JSON index the front end
/// fetches at load time. Nothing is written when resolution fails.
pub fn write_portfolio_index(catalog: &Catalog, output_path: &Path) -> Result<usize> {
    let items = catalog.resolve()?;
    let mut json = serde_json::to_string_pretty(&items)?;
    json.push('\n');

    if let Some(dir) = output_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
    }
    fs::write(output_path, json)
        .with_context(|| format!("write portfolio index {}", output_path.display()))?;
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn populated_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("images")).unwrap();
        fs::create_dir_all(root.path().join("videos")).unwrap();
        for name in ["p01.jpg", "p05.jpg", "thumbs.db"] {
            fs::write(root.path().join("images").join(name), b"").unwrap();
        }
        fs::write(root.path().join("videos/video-01.mp4"), b"").unwrap();
        fs::write(
            root.path().join("videos/video-05.txt"),
            "https://www.youtube.com/watch?v=p05\n",
        )
        .unwrap();
        root
    }

    #[test]
    fn writes_index_and_creates_parent() {
        let root = populated_root();
        let out = root.path().join("generated/portfolio-items.json");

        let count = write_portfolio_index(&Catalog::from_root(root.path()), &out).unwrap();
        assert_eq!(count, 2);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([
                {"type": "image", "src": "/images/p01.jpg", "alt": "Image: p01.jpg", "associatedVideo": "/videos/video-01.mp4"},
                {"type": "image", "src": "/images/p05.jpg", "alt": "Image: p05.jpg", "associatedVideo": "https://www.youtube.com/watch?v=p05"}
            ])
        );
    }

    #[test]
    fn rewriting_unchanged_directories_is_byte_identical() {
        let root = populated_root();
        let out = root.path().join("portfolio-items.json");
        let catalog = Catalog::from_root(root.path());

        write_portfolio_index(&catalog, &out).unwrap();
        let first = fs::read(&out).unwrap();
        write_portfolio_index(&catalog, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), first);
        assert!(first.ends_with(b"]\n"));
    }

    #[test]
    fn failed_resolution_leaves_previous_index() {
        let root = populated_root();
        let out = root.path().join("portfolio-items.json");
        fs::write(&out, "[]\n").unwrap();
        fs::remove_dir_all(root.path().join("images")).unwrap();

        let err = write_portfolio_index(&Catalog::from_root(root.path()), &out).unwrap_err();
        assert!(err.to_string().contains("images"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "[]\n");
    }
}
