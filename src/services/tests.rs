//! Extraction through retrieval on a synthetic two-column document

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use super::ai::embedding::testing::KeywordEmbedder;
use super::parser::layout::{PageLayout, Word};
use super::parser::{CorpusExtractor, DocumentReader, PageExtractor, PageInput};
use super::{
    write_index, ExtractionConfig, IndexArtifacts, IndexBuilder, Retriever, TextNormalizer,
    DEFAULT_EMBED_CHAR_CAP,
};
use crate::error::AppResult;
use crate::fragment::{read_fragments, FragmentKind};

/// Words laid out left to right from `x`, 40pt wide with 5pt gaps
fn line(texts: &[&str], x: f32, top: f32) -> Vec<Word> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let x0 = x + i as f32 * 45.0;
            Word::new(text, x0, x0 + 40.0, top)
        })
        .collect()
}

struct TwoColumnReader;

impl DocumentReader for TwoColumnReader {
    fn read(
        &self,
        _path: &Path,
        visit: &mut dyn FnMut(u32, AppResult<PageInput>) -> AppResult<()>,
    ) -> AppResult<()> {
        let pages = [
            vec![
                line(&["Gears", "mesh", "smoothly"], 50.0, 100.0),
                line(&["Chains", "transfer"], 340.0, 100.0),
                line(&["when", "oiled"], 50.0, 114.0),
                line(&["power", "well"], 340.0, 114.0),
            ],
            vec![
                line(&["Figure", "1:", "Widget"], 50.0, 100.0),
                line(&["Assembly", "notes"], 340.0, 100.0),
                line(&["The", "widget", "body"], 50.0, 114.0),
            ],
        ];

        for (index, lines) in pages.into_iter().enumerate() {
            let number = index as u32 + 1;
            let page = PageInput {
                number,
                layout: PageLayout {
                    width: 600.0,
                    height: 800.0,
                    words: lines.into_iter().flatten().collect(),
                    rulings: Vec::new(),
                },
                raster: Err("not rendered".to_string()),
            };
            visit(number, Ok(page))?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn figure_caption_is_retrievable_from_a_two_column_document() {
    let docs = tempdir().unwrap();
    std::fs::write(docs.path().join("widget.pdf"), b"").unwrap();
    let out = tempdir().unwrap();
    let chunks = out.path().join("chunks.jsonl");

    let config = ExtractionConfig::default();
    let extractor = CorpusExtractor::new(TwoColumnReader, PageExtractor::new(&config, None));
    let report = extractor.run(docs.path(), &chunks).unwrap();
    assert_eq!(report.pages, 2);

    let fragments = read_fragments(&chunks).unwrap();
    let page_one = fragments
        .iter()
        .find(|f| f.page == 1 && f.kind == FragmentKind::Text)
        .unwrap();
    assert_eq!(page_one.text, "Gears mesh smoothly\nwhen oiled\nChains transfer\npower well");
    assert!(fragments
        .iter()
        .any(|f| f.page == 2 && f.kind == FragmentKind::Figure && f.text == "Figure 1: Widget"));

    let normalizer = TextNormalizer::new(DEFAULT_EMBED_CHAR_CAP).unwrap();
    let entries = IndexBuilder::new(&KeywordEmbedder, &normalizer, 4).embed(fragments).unwrap();
    write_index(out.path(), "fragments", "keyword-test", &entries).await.unwrap();

    let artifacts = IndexArtifacts::open(out.path(), "fragments").await.unwrap();
    let retriever = Retriever::new(Arc::new(KeywordEmbedder), normalizer, artifacts);
    let results = retriever.retrieve("widget diagram", 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .any(|r| r.fragment.kind == FragmentKind::Figure && r.fragment.page == 2));
    assert!(results.iter().all(|r| r.fragment.page == 2));
}
