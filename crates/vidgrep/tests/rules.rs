use std::fs;

use vidgrep::error::RuleLoadError;
use vidgrep::rules::{RuleKind, load_rules};
use vidgrep_ocr::BoundingBox;

#[test]
fn loads_rule_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("terms.txt");
    fs::write(
        &path,
        "victory royale #win\n\n~ storm closing\n- spectating victory 2\n",
    )
    .unwrap();

    let book = load_rules(&path).unwrap();

    assert_eq!(book.len(), 3);
    let kinds: Vec<RuleKind> = book.descriptors().iter().map(|rule| rule.kind()).collect();
    assert_eq!(kinds, vec![RuleKind::Hard, RuleKind::Soft, RuleKind::Blacklist]);
    assert_eq!(book.descriptors()[0].name(), "win");
    assert_eq!(book.descriptors()[2].name(), "#2");
}

#[test]
fn empty_rule_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("terms.txt");
    fs::write(&path, "\n   \n~\n").unwrap();

    let err = load_rules(&path).unwrap_err();

    assert!(matches!(err, RuleLoadError::NoRules { .. }));
}

#[test]
fn missing_rule_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");

    let err = load_rules(&path).unwrap_err();

    assert!(matches!(err, RuleLoadError::Io { .. }));
    assert!(err.to_string().contains("absent.txt"));
}

#[test]
fn loaded_rules_drive_a_frame_rule_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("terms.txt");
    fs::write(&path, "eliminated 1 #out\n- spectating eliminated 2\n").unwrap();
    let book = load_rules(&path).unwrap();
    let mut set = book.create();
    let bbox = BoundingBox::new(0, 0, 10, 4);

    assert!(!set.add_block("spectating: eliminated", bbox));
    assert_eq!(set.satisfied().count(), 0);

    assert!(set.add_block("you were eliminated", bbox));
    let satisfied: Vec<usize> = set.satisfied().map(|(index, _)| index).collect();
    assert_eq!(satisfied, vec![0]);

    set.clear();
    assert_eq!(set.satisfied().count(), 0);
}
