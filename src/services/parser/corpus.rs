//! Whole-corpus extraction into the fragment stream

use std::path::Path;

use super::page::{PageExtractor, PageInput};
use crate::error::{AppError, AppResult};
use crate::fragment::FragmentWriter;
use crate::utils::list_pdf_files;

/// Source of pages for one document
pub trait DocumentReader {
    /// Call `visit` once per page in ascending page order. A page that could
    /// not be read is passed as `Err` and the walk continues. An `Err`
    /// returned by `visit` stops the walk and is returned unchanged.
    fn read(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(u32, AppResult<PageInput>) -> AppResult<()>,
    ) -> AppResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusReport {
    pub documents: usize,
    pub failed_documents: usize,
    pub pages: usize,
    pub failed_pages: usize,
    pub fragments: usize,
}

pub struct CorpusExtractor<R: DocumentReader> {
    reader: R,
    pages: PageExtractor,
}

impl<R: DocumentReader> CorpusExtractor<R> {
    pub fn new(reader: R, pages: PageExtractor) -> Self {
        Self { reader, pages }
    }

    /// Extract every PDF in `docs_dir` (file-name order) into a fresh
    /// fragment stream at `output`. Unreadable documents and pages are
    /// logged and skipped; only stream write failures abort the run.
    pub fn run(&self, docs_dir: &Path, output: &Path) -> AppResult<CorpusReport> {
        let files = list_pdf_files(docs_dir)?;
        let mut writer = FragmentWriter::create(output)?;
        let mut report = CorpusReport::default();

        for path in files {
            let doc_id = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            tracing::info!(doc_id = %doc_id, "Parsing document");

            let mut write_failure = None;
            let mut pages = 0usize;
            let mut failed_pages = 0usize;

            let result = self.reader.read(&path, &mut |number, page| {
                pages += 1;
                let page = match page {
                    Ok(page) => page,
                    Err(err) => {
                        failed_pages += 1;
                        tracing::warn!(doc_id = %doc_id, page = number, error = %err, "Page skipped");
                        return Ok(());
                    }
                };

                let extraction = self.pages.extract(&doc_id, &page);
                for fragment in &extraction.fragments {
                    if let Err(err) = writer.write(fragment) {
                        let message = err.to_string();
                        write_failure = Some(err);
                        return Err(AppError::Index(message));
                    }
                }
                tracing::debug!(
                    doc_id = %doc_id,
                    page = number,
                    fragments = extraction.fragments.len(),
                    failed_steps = extraction.report.failures(),
                    "Page extracted"
                );
                Ok(())
            });

            if let Some(err) = write_failure {
                return Err(err);
            }

            report.pages += pages;
            report.failed_pages += failed_pages;
            match result {
                Ok(()) => report.documents += 1,
                Err(err) => {
                    report.failed_documents += 1;
                    tracing::error!(doc_id = %doc_id, error = %err, "Document failed");
                }
            }
        }

        report.fragments = writer.finish()?;
        tracing::info!(
            documents = report.documents,
            failed_documents = report.failed_documents,
            pages = report.pages,
            fragments = report.fragments,
            output = %output.display(),
            "Wrote fragment stream"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::fragment::{read_fragments, FragmentKind};
    use crate::services::parser::layout::{PageLayout, Word};
    use crate::services::ExtractionConfig;

    /// Pages keyed by file name; `broken.pdf` cannot be opened and page 2 of
    /// `gappy.pdf` cannot be read.
    struct FakeReader;

    impl DocumentReader for FakeReader {
        fn read(
            &self,
            path: &Path,
            visit: &mut dyn FnMut(u32, AppResult<PageInput>) -> AppResult<()>,
        ) -> AppResult<()> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if name == "broken.pdf" {
                return Err(AppError::Pdf("not a pdf".into()));
            }
            for number in 1..=3u32 {
                if name == "gappy.pdf" && number == 2 {
                    visit(number, Err(AppError::Pdf("bad page".into())))?;
                    continue;
                }
                let words = vec![Word::new(&format!("{name}-p{number}"), 50.0, 120.0, 100.0)];
                let page = PageInput {
                    number,
                    layout: PageLayout {
                        width: 600.0,
                        height: 800.0,
                        words,
                        rulings: Vec::new(),
                    },
                    raster: Err("disabled".into()),
                };
                visit(number, Ok(page))?;
            }
            Ok(())
        }
    }

    fn extractor() -> CorpusExtractor<FakeReader> {
        let config = ExtractionConfig {
            table_strategies: Vec::new(),
            ocr_regions: Vec::new(),
            ..ExtractionConfig::default()
        };
        CorpusExtractor::new(FakeReader, PageExtractor::new(&config, None))
    }

    #[test]
    fn documents_run_in_name_order_and_failures_are_isolated() {
        let docs = tempdir().unwrap();
        for name in ["b.pdf", "broken.pdf", "A.PDF", "gappy.pdf", "notes.txt"] {
            fs::write(docs.path().join(name), b"").unwrap();
        }
        let out = tempdir().unwrap();
        let chunks = out.path().join("chunks.jsonl");

        let report = extractor().run(docs.path(), &chunks).unwrap();
        assert_eq!(report.documents, 3);
        assert_eq!(report.failed_documents, 1);
        assert_eq!(report.failed_pages, 1);
        assert_eq!(report.pages, 9);
        assert_eq!(report.fragments, 8);

        let fragments = read_fragments(&chunks).unwrap();
        let order: Vec<_> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "A.PDF-p1", "A.PDF-p2", "A.PDF-p3",
                "b.pdf-p1", "b.pdf-p2", "b.pdf-p3",
                "gappy.pdf-p1", "gappy.pdf-p3",
            ]
        );
        assert!(fragments.iter().all(|f| f.kind == FragmentKind::Text));
        assert_eq!(fragments[7].page, 3);
    }

    #[test]
    fn missing_docs_dir_is_an_error() {
        let out = tempdir().unwrap();
        let missing = out.path().join("nope");
        assert!(extractor().run(&missing, &out.path().join("chunks.jsonl")).is_err());
    }
}
