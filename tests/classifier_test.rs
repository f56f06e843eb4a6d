//! Tests for banner value classification.

use serde_json::json;
use vexillum::{FsVault, InputKind, classify};

fn vault_with(files: &[&str]) -> (tempfile::TempDir, FsVault) {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
    }
    let vault = FsVault::new(dir.path());
    (dir, vault)
}

#[test]
fn absolute_urls_are_urls() {
    let (_dir, vault) = vault_with(&[]);
    let d = classify(&json!("https://example.com/a.jpg"), &vault);
    assert_eq!(d.kind, InputKind::Url);
    assert_eq!(d.value, "https://example.com/a.jpg");

    let d = classify(&json!("  'http://example.com/b.png'  "), &vault);
    assert_eq!(d.kind, InputKind::Url);
    assert_eq!(d.value, "http://example.com/b.png");
}

#[test]
fn existing_image_paths_are_vault_paths() {
    let (_dir, vault) = vault_with(&["images/banner.PNG", "notes/readme.md"]);

    let d = classify(&json!("images/banner.PNG"), &vault);
    assert_eq!(d.kind, InputKind::VaultPath);
    assert_eq!(d.value, "images/banner.PNG");

    // Exists, but not an image.
    let d = classify(&json!("notes/readme.md"), &vault);
    assert_eq!(d.kind, InputKind::Keyword);

    // Image extension, but no such file.
    let d = classify(&json!("images/missing.png"), &vault);
    assert_eq!(d.kind, InputKind::Keyword);
}

#[test]
fn wiki_links_are_links() {
    let (_dir, vault) = vault_with(&[]);

    let d = classify(&json!("[[banner.png]]"), &vault);
    assert_eq!(d.kind, InputKind::ObsidianLink);
    assert_eq!(d.link_target(), Some("banner.png"));

    let d = classify(&json!("![[folder/banner.png|Banner]]"), &vault);
    assert_eq!(d.kind, InputKind::ObsidianLink);
    assert_eq!(d.link_target(), Some("folder/banner.png"));
}

#[test]
fn unquoted_yaml_link_arrives_as_nested_array() {
    let (_dir, vault) = vault_with(&[]);
    let d = classify(&json!([["banner.png"]]), &vault);
    assert_eq!(d.kind, InputKind::ObsidianLink);
    assert_eq!(d.link_target(), Some("banner.png"));
}

#[test]
fn arrays_use_their_first_element() {
    let (_dir, vault) = vault_with(&[]);
    let d = classify(&json!(["mountains", "ocean"]), &vault);
    assert_eq!(d.kind, InputKind::Keyword);
    assert_eq!(d.value, "mountains");
}

#[test]
fn free_text_is_keywords() {
    let (_dir, vault) = vault_with(&[]);
    let d = classify(&json!("sunset, ocean ,, forest"), &vault);
    assert_eq!(d.kind, InputKind::Keyword);
    assert_eq!(d.keywords(), vec!["sunset", "ocean", "forest"]);
}

#[test]
fn unusable_values_are_invalid() {
    let (_dir, vault) = vault_with(&[]);
    for raw in [json!(null), json!(""), json!("   "), json!("\"\""), json!([]), json!(42), json!({"a": 1})] {
        let d = classify(&raw, &vault);
        assert_eq!(d.kind, InputKind::Invalid, "{raw} should be invalid");
        assert!(d.value.is_empty());
    }
}

#[test]
fn classification_is_deterministic() {
    let (_dir, vault) = vault_with(&["a.jpg"]);
    for raw in [json!("a.jpg"), json!("[[a.jpg]]"), json!("cats"), json!("https://x.io/y")] {
        assert_eq!(classify(&raw, &vault), classify(&raw, &vault));
    }
}

#[test]
fn accessors_only_apply_to_their_kind() {
    let (_dir, vault) = vault_with(&[]);
    let url = classify(&json!("https://example.com/a.jpg"), &vault);
    assert!(url.keywords().is_empty());
    assert!(url.link_target().is_none());
}
