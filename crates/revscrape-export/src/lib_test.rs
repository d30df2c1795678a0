use revscrape_core::{ReviewRecord, Termination};

use super::*;

fn record(platform: Platform, text: &str, rating: Option<u8>) -> ReviewRecord {
    ReviewRecord {
        reviewer_name: "Jane".to_owned(),
        rating,
        text: text.to_owned(),
        date: "2025-01-15".to_owned(),
        source_link: Some("https://www.trustpilot.com/reviews/abc".to_owned()),
        platform,
    }
}

fn result_with(platform: Platform, rows: usize) -> CollectionResult {
    let mut result = CollectionResult::new(platform);
    for i in 0..rows {
        result.push(
            record(platform, &format!("review {i}"), Some(5)),
            vec!["great".to_owned()],
        );
    }
    result.record_page();
    result.finish(Termination::Exhausted)
}

/// `.xlsx` files are zip archives.
fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK")
}

#[test]
fn empty_result_is_rejected_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");

    let err = export_xlsx(
        &CollectionResult::new(Platform::Trustpilot),
        &target,
        "reviews.xlsx",
    )
    .unwrap_err();

    assert!(matches!(err, ExportError::Empty));
    assert!(!target.exists());
}

#[test]
fn writes_workbook_and_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("exports");

    let path = export_xlsx(&result_with(Platform::Trustpilot, 3), &target, "reviews.xlsx").unwrap();

    assert_eq!(path, target.join("reviews.xlsx"));
    assert!(is_zip(&std::fs::read(&path).unwrap()));
}

#[test]
fn second_export_with_same_name_gets_numbered_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let result = result_with(Platform::Google, 2);

    let first = export_xlsx(&result, dir.path(), "google_reviews.xlsx").unwrap();
    let first_bytes = std::fs::read(&first).unwrap();
    let second = export_xlsx(&result, dir.path(), "google_reviews.xlsx").unwrap();

    assert_eq!(first, dir.path().join("google_reviews.xlsx"));
    assert_eq!(second, dir.path().join("google_reviews (1).xlsx"));
    assert_eq!(std::fs::read(&first).unwrap(), first_bytes);
}

#[test]
fn export_skips_every_taken_suffix() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reviews.xlsx"), b"x").unwrap();
    std::fs::write(dir.path().join("reviews (1).xlsx"), b"x").unwrap();

    let result = result_with(Platform::Trustpilot, 1);

    let path = export_xlsx(&result, dir.path(), "reviews.xlsx").unwrap();

    assert_eq!(path, dir.path().join("reviews (2).xlsx"));
    assert!(is_zip(&std::fs::read(&path).unwrap()));
    assert_eq!(std::fs::read(dir.path().join("reviews (1).xlsx")).unwrap(), b"x");
}

fn text(value: &str) -> Option<CellValue> {
    Some(CellValue::Text(value.to_owned()))
}

fn sparse_match() -> ReviewMatch {
    let mut sparse = record(Platform::Google, "", None);
    sparse.source_link = None;
    sparse.reviewer_name = String::new();
    ReviewMatch {
        record: sparse,
        matched_keywords: Vec::new(),
    }
}

#[test]
fn trustpilot_rows_keep_order_and_fill_keyword_placeholder() {
    let matches = [
        ReviewMatch {
            record: record(Platform::Trustpilot, "Late delivery", Some(1)),
            matched_keywords: vec!["late".to_owned(), "delivery".to_owned()],
        },
        ReviewMatch {
            record: record(Platform::Trustpilot, "Fine overall", Some(3)),
            matched_keywords: Vec::new(),
        },
    ];

    let (header, cells) = rows(Platform::Trustpilot, &matches);

    assert_eq!(header, ["Review", "Rating", "Keyword", "Date", "Link to Review"]);
    assert_eq!(
        cells,
        [
            vec![
                text("Late delivery"),
                Some(CellValue::Number(1.0)),
                text("late, delivery"),
                text("2025-01-15"),
                text("https://www.trustpilot.com/reviews/abc"),
            ],
            vec![
                text("Fine overall"),
                Some(CellValue::Number(3.0)),
                text("N/A"),
                text("2025-01-15"),
                text("https://www.trustpilot.com/reviews/abc"),
            ],
        ]
    );
}

#[test]
fn google_rows_name_the_platform_and_join_keywords() {
    let matches = [ReviewMatch {
        record: record(Platform::Google, "Slow refund", Some(2)),
        matched_keywords: vec!["refund".to_owned(), "slow".to_owned()],
    }];

    let (header, cells) = rows(Platform::Google, &matches);

    assert_eq!(
        header,
        ["Platform", "Reviewer", "Review", "Rating", "Date", "Link", "Keywords"]
    );
    assert_eq!(
        cells,
        [vec![
            text("Google Reviews"),
            text("Jane"),
            text("Slow refund"),
            Some(CellValue::Number(2.0)),
            text("2025-01-15"),
            text("https://www.trustpilot.com/reviews/abc"),
            text("refund, slow"),
        ]]
    );
}

#[test]
fn missing_values_become_empty_cells() {
    let matches = [sparse_match()];

    let (_, trustpilot) = rows(Platform::Trustpilot, &matches);
    assert_eq!(
        trustpilot,
        [vec![None, None, text("N/A"), text("2025-01-15"), None]]
    );

    let (_, google) = rows(Platform::Google, &matches);
    assert_eq!(
        google,
        [vec![
            text("Google Reviews"),
            None,
            None,
            None,
            text("2025-01-15"),
            None,
            None,
        ]]
    );

    for platform in [Platform::Trustpilot, Platform::Google] {
        let bytes = render_workbook(platform, &matches).unwrap();
        assert!(is_zip(&bytes), "{platform:?} workbook should be a zip archive");
    }
}

#[test]
fn default_file_names_follow_platform() {
    assert_eq!(default_file_name(Platform::Trustpilot), "trustpilot_reviews.xlsx");
    assert_eq!(default_file_name(Platform::Google), "google_reviews.xlsx");
}
