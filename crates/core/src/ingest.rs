//! Ingestion pipeline: discover → load → chunk → embed → index → persist.
//!
//! Ingestion is an offline, all-or-nothing run: per-file load problems are
//! collected into the report (best effort), but an embedding or index failure
//! aborts the run so a half-embedded corpus never reaches disk. The index
//! swap itself is atomic, so readers of a previous index are unaffected by a
//! failed rebuild.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::chunking::{self, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::index::FlatIndex;
use crate::loader;
use crate::models::Chunk;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub chunking: ChunkingConfig,
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Finds ingestible documents under `path`: the file itself, or a sorted
/// recursive walk for a directory.
pub fn discover_documents(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).into_iter().filter_map(|item| item.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("pdf")
                    || ext.eq_ignore_ascii_case("docx")
                    || ext.eq_ignore_ascii_case("doc")
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Loads one document and cuts it into chunks tagged with page number and
/// document hash.
pub fn load_and_chunk(path: &Path, options: &IngestOptions) -> Result<Vec<Chunk>, IngestError> {
    let fingerprint = loader::fingerprint(path)?;
    let pages = loader::load_pages(path)?;

    let mut chunks = Vec::new();
    for page in pages {
        for text in chunking::split_text(&page.text, options.chunking)? {
            chunks.push(Chunk {
                text,
                source_page: page.number,
                source_doc_hash: fingerprint.checksum.clone(),
            });
        }
    }

    Ok(chunks)
}

/// Runs the full ingestion pipeline and persists the index to `index_dir`.
/// Returns the built index so callers can swap it into a live retriever.
pub async fn ingest_path(
    path: &Path,
    embedder: &dyn Embedder,
    options: &IngestOptions,
    index_dir: &Path,
) -> Result<(FlatIndex, IngestReport), IngestError> {
    options.chunking.validate()?;

    let files = discover_documents(path);
    if files.is_empty() {
        return Err(IngestError::NoDocuments(path.display().to_string()));
    }

    let mut chunks = Vec::new();
    let mut skipped = Vec::new();
    let mut ingested_files = 0usize;

    for file in files {
        match load_and_chunk(&file, options) {
            Ok(file_chunks) => {
                tracing::info!(
                    path = %file.display(),
                    chunks = file_chunks.len(),
                    "chunked document"
                );
                ingested_files += 1;
                chunks.extend(file_chunks);
            }
            Err(error @ (IngestError::UnsupportedFormat(_) | IngestError::Load(_))) => {
                tracing::warn!(path = %file.display(), %error, "skipping document");
                skipped.push(SkippedFile {
                    path: file,
                    reason: error.to_string(),
                });
            }
            Err(error) => return Err(error),
        }
    }

    if chunks.is_empty() {
        return Err(IngestError::NoDocuments(format!(
            "{} (all files were skipped)",
            path.display()
        )));
    }

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    let chunk_count = chunks.len();
    let index = FlatIndex::build(chunks, vectors)?;
    index.save(index_dir)?;
    tracing::info!(
        entries = index.len(),
        dir = %index_dir.display(),
        "index persisted"
    );

    Ok((
        index,
        IngestReport {
            files: ingested_files,
            chunks: chunk_count,
            skipped,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let file = std::fs::File::create(path).unwrap();
        let mut archive = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        archive.start_file("word/document.xml", options).unwrap();
        archive.write_all(xml.as_bytes()).unwrap();
        archive.finish().unwrap();
    }

    #[test]
    fn discovery_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(nested.join("a.docx"), b"zip").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let files = discover_documents(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("nested/a.docx"));
        assert!(files[1].ends_with("b.pdf"));
    }

    #[test]
    fn chunks_inherit_page_and_document_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("act.docx");
        write_docx(&path, &["Section 1. Short title.", "Section 2. Definitions."]);

        let chunks = load_and_chunk(&path, &IngestOptions::default()).unwrap();
        assert!(!chunks.is_empty());
        let hash = &chunks[0].source_doc_hash;
        assert_eq!(hash.len(), 64);
        for chunk in &chunks {
            assert_eq!(chunk.source_page, 1);
            assert_eq!(&chunk.source_doc_hash, hash);
            assert!(chunk.text.chars().count() <= 2_000);
        }
    }

    #[tokio::test]
    async fn ingest_builds_and_persists_a_searchable_index() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("act.docx");
        write_docx(
            &doc,
            &[
                "The writ of habeas corpus protects personal liberty.",
                "An appeal lies to the appellate court against a decree.",
            ],
        );

        let embedder = CharacterNgramEmbedder::default();
        let index_dir = dir.path().join("db").join("index");
        let (index, report) = ingest_path(&doc, &embedder, &IngestOptions::default(), &index_dir)
            .await
            .unwrap();

        assert_eq!(report.files, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(index.len(), report.chunks);

        let reopened = FlatIndex::open(&index_dir).unwrap();
        assert_eq!(reopened.len(), index.len());
        let query = embedder.embed("habeas corpus liberty");
        let hits = reopened.search(&query, 1, 5, 0.5).unwrap();
        assert!(hits[0].chunk.text.contains("habeas corpus"));
    }

    #[tokio::test]
    async fn unreadable_files_are_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.docx");
        write_docx(&good, &["A valid provision of the act."]);
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken").unwrap();

        let embedder = CharacterNgramEmbedder::default();
        let index_dir = dir.path().join("index");
        let (_, report) = ingest_path(
            dir.path(),
            &embedder,
            &IngestOptions::default(),
            &index_dir,
        )
        .await
        .unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("broken.pdf"));
    }

    #[tokio::test]
    async fn empty_folder_is_an_error() {
        let dir = tempdir().unwrap();
        let embedder = CharacterNgramEmbedder::default();
        let result = ingest_path(
            dir.path(),
            &embedder,
            &IngestOptions::default(),
            &dir.path().join("index"),
        )
        .await;
        assert!(matches!(result, Err(IngestError::NoDocuments(_))));
    }
}
