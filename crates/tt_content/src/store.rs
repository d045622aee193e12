use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use tt_core::{Article, Error, Result};

use crate::document::{render_article, TierListDocument};

pub const CONTENT_EXTENSION: &str = "mdx";

/// The directory holding one content file per article.
#[derive(Debug, Clone)]
pub struct ContentDir {
    root: PathBuf,
}

impl ContentDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for_slug(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.{}", slug, CONTENT_EXTENSION))
    }

    /// Every content file in the directory, sorted by name.
    ///
    /// A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Content directory {} does not exist", self.root.display());
                return Ok(files);
            }
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_content_file(&path) && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Files in the directory that are not content files.
    pub async fn stray_files(&self) -> Result<Vec<PathBuf>> {
        let mut stray = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stray),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && !is_content_file(&path) {
                stray.push(path);
            }
        }
        stray.sort();
        Ok(stray)
    }

    /// One explicit file, or every content file when `file` is `None`.
    pub async fn resolve_targets(&self, file: Option<&Path>) -> Result<Vec<PathBuf>> {
        match file {
            Some(path) => {
                if fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
                    Ok(vec![path.to_path_buf()])
                } else {
                    Err(Error::Config(format!("File not found: {}", path.display())))
                }
            }
            None => self.list().await,
        }
    }

    /// Renders `article` and writes it to `<root>/<slug>.mdx`.
    pub async fn write_article(&self, article: &Article) -> Result<PathBuf> {
        let slug = article.slug();
        if slug.is_empty() {
            return Err(Error::Parse("Article has no slug".to_string()));
        }
        fs::create_dir_all(&self.root).await?;
        let path = self.path_for_slug(slug);
        fs::write(&path, render_article(article)).await?;
        info!("💾 Saved tier list to {}", path.display());
        Ok(path)
    }
}

pub fn is_content_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(CONTENT_EXTENSION)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn read_text(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).await?)
}

pub async fn read_document(path: &Path) -> Result<TierListDocument> {
    let text = read_text(path).await?;
    TierListDocument::parse(&text)
}

pub async fn write_document(path: &Path, document: &TierListDocument) -> Result<()> {
    fs::write(path, document.render()).await?;
    Ok(())
}
