//! End-to-end markdown writes against an in-memory document

mod common;

use common::FakeDocumentStore;
use gworkspace::docs::{plain_text, DocsWriter, DocumentStore};
use gworkspace::edits::{EditPlan, EditRequest};
use gworkspace::error::WorkspaceError;
use gworkspace::layout::{IndexRange, InsertionAnchor};
use gworkspace::markdown::{parse_markdown, BlockStyle, Emphasis, ListKind};
use proptest::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn test_write_into_empty_document() {
    let store = FakeDocumentStore::empty("doc1");
    let writer = DocsWriter::new(&store, 50);

    let id = writer
        .write("doc1", "# Title\n\nBody **bold** text")
        .await
        .unwrap();

    assert_eq!(id, "doc1");
    assert_eq!(store.text(), "Title\n\nBody bold text\n\n");
    assert_eq!(
        store.styles(),
        vec![
            EditRequest::UpdateParagraphStyle {
                range: IndexRange::new(1, 7),
                block_style: BlockStyle::Heading1,
            },
            EditRequest::UpdateTextStyle {
                range: IndexRange::new(13, 17),
                emphasis: Emphasis::Bold,
            },
        ]
    );
}

#[tokio::test]
async fn test_write_twice_is_idempotent() {
    let markdown = "# Plan\n- first *step*\n- second\n1. one\n2. two\n\nDone **now** 😀";
    let store = FakeDocumentStore::empty("doc1");
    let writer = DocsWriter::new(&store, 50);

    writer.write("doc1", markdown).await.unwrap();
    let first_text = store.text();
    let first_styles = store.styles();

    writer.write("doc1", markdown).await.unwrap();
    assert_eq!(store.text(), first_text);
    assert_eq!(store.styles(), first_styles);
}

#[tokio::test]
async fn test_write_replaces_existing_content() {
    let store = FakeDocumentStore::new("doc1", "old line\nanother old line\n");
    let writer = DocsWriter::new(&store, 50);

    writer.write("doc1", "new").await.unwrap();
    assert_eq!(store.text(), "new\n\n");

    let calls = store.calls();
    assert_eq!(
        calls[0],
        vec![EditRequest::DeleteContentRange {
            range: IndexRange::new(1, 26),
        }]
    );
}

#[tokio::test]
async fn test_append_keeps_last_paragraph_intact() {
    let store = FakeDocumentStore::new("doc1", "Hello\n");
    let writer = DocsWriter::new(&store, 50);

    writer.append("doc1", "## World\n- item").await.unwrap();

    assert_eq!(store.text(), "Hello\nWorld\nitem\n");
    assert_eq!(
        store.styles(),
        vec![
            EditRequest::UpdateParagraphStyle {
                range: IndexRange::new(7, 13),
                block_style: BlockStyle::Heading2,
            },
            EditRequest::CreateParagraphBullets {
                range: IndexRange::new(13, 18),
                list_kind: ListKind::Bullet,
            },
        ]
    );
}

#[tokio::test]
async fn test_append_to_empty_document_inserts_at_start() {
    let store = FakeDocumentStore::empty("doc1");
    let writer = DocsWriter::new(&store, 50);

    writer.append("doc1", "*hi*").await.unwrap();
    assert_eq!(store.text(), "hi\n\n");
    assert_eq!(
        store.styles(),
        vec![EditRequest::UpdateTextStyle {
            range: IndexRange::new(1, 3),
            emphasis: Emphasis::Italic,
        }]
    );
}

#[tokio::test]
async fn test_clear_then_cat() {
    let store = FakeDocumentStore::new("doc1", "a\nb\n");
    let writer = DocsWriter::new(&store, 50);

    writer.clear("doc1").await.unwrap();
    assert_eq!(store.text(), "\n");

    // Clearing an empty document sends nothing
    writer.clear("doc1").await.unwrap();
    assert_eq!(store.calls().len(), 1);

    let snapshot = writer.store().get("doc1").await.unwrap();
    assert_eq!(plain_text(&snapshot, 0), "\n");
}

#[tokio::test]
async fn test_style_requests_are_split_into_ordered_batches() {
    let markdown = (0..120)
        .map(|i| format!("- item {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    let store = FakeDocumentStore::empty("doc1");
    let writer = DocsWriter::new(&store, 50);

    writer.write("doc1", &markdown).await.unwrap();

    let calls = store.calls();
    let sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1, 50, 50, 20]);
    assert!(matches!(calls[0][0], EditRequest::InsertText { index: 1, .. }));

    let starts: Vec<i64> = calls[1..]
        .iter()
        .flatten()
        .filter_map(|r| r.range().map(|range| range.start_index))
        .collect();
    assert!(starts.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_failed_style_batch_keeps_earlier_batches() {
    let markdown = (0..120)
        .map(|i| format!("- item {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    // Call 1 inserts, call 2 is the first style batch, call 3 fails
    let store = FakeDocumentStore::empty("doc1").failing_on_call(3);
    let writer = DocsWriter::new(&store, 50);

    let err = writer.write("doc1", &markdown).await.unwrap_err();
    match err {
        WorkspaceError::StylingIncomplete {
            ref document_id,
            applied_batches,
            total_batches,
            ..
        } => {
            assert_eq!(document_id, "doc1");
            assert_eq!(applied_batches, 1);
            assert_eq!(total_batches, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_transient());

    // Inserted text and the first batch stay; nothing is rolled back
    assert!(store.text().starts_with("item 0\nitem 1\n"));
    assert_eq!(store.styles().len(), 50);
    assert_eq!(store.calls().len(), 3);
}

#[tokio::test]
async fn test_failed_insert_sends_no_styles() {
    let store = FakeDocumentStore::empty("doc1").failing_on_call(1);
    let writer = DocsWriter::new(&store, 50);

    let err = writer.write("doc1", "# Title").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::ServerError { status: 503, .. }));
    assert_eq!(store.calls().len(), 1);
    assert_eq!(store.text(), "\n");
}

#[tokio::test]
async fn test_unknown_document() {
    let store = FakeDocumentStore::empty("doc1");
    let writer = DocsWriter::new(Arc::new(store), 50);

    let err = writer.append("other", "x").await.unwrap_err();
    assert_eq!(err.to_string(), "doc not found or not a Google Doc (id=other)");
}

#[test]
fn test_unterminated_bold_is_literal() {
    let segments = parse_markdown("a **b");
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "a **b\n");
    assert!(segments[0].emphasis.is_empty());
}

proptest! {
    #[test]
    fn plain_text_produces_no_style_edits(
        lines in prop::collection::vec("[a-zA-Z][a-zA-Z ,]{0,40}", 1..20)
    ) {
        let markdown = lines.join("\n");
        let segments = parse_markdown(&markdown);
        prop_assert_eq!(segments.len(), lines.len());
        prop_assert!(segments
            .iter()
            .all(|s| s.block_style == BlockStyle::Plain && s.list_kind == ListKind::None));

        let plan = EditPlan::from_markdown(&markdown, InsertionAnchor::Index(1));
        prop_assert!(plan.styling.is_empty());
        prop_assert_eq!(
            plan.insertion,
            EditRequest::InsertText { index: 1, text: format!("{}\n", markdown) }
        );
    }
}
