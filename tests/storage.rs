use courier::storage::workspace::{load_tree, save_tree};
use courier::{BodyEncoding, HttpMethod, Item, ItemTree, KeyValueEntry, PathSegment, RequestDocument};

#[test]
fn test_tree_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ws").join("tree.toml");

    let mut tree = ItemTree::new();
    let api = tree.create_folder(None).unwrap();
    tree.rename(api.id, "GitHub API").unwrap();
    let users = tree.create_folder(Some(api.id)).unwrap();

    let mut doc = RequestDocument::new("Get Users")
        .with_base_url("https://api.github.com")
        .with_method(HttpMethod::Post);
    doc.edit_path_segments(|p| p.push(PathSegment::new("users")));
    doc.edit_query_params(|q| q.push(KeyValueEntry::disabled("per_page", "50")));
    doc.edit_headers(|h| h.push(KeyValueEntry::new("Accept", "application/json")));
    doc.set_body_encoding(BodyEncoding::ShiftJis);
    doc.set_body_text("ユーザー").unwrap();
    doc.set_body_enabled(true);
    let file = tree.create_file(Some(users.id), Some(doc)).unwrap();
    tree.create_file(None, None).unwrap();

    save_tree(&path, &tree).unwrap();
    let loaded = load_tree(&path).unwrap();

    assert_eq!(loaded.items(), tree.items());
    assert_eq!(loaded.path_names(file.id()), vec!["GitHub API", "NewFolder1", "Get Users"]);
    let request = loaded.request(file.id()).unwrap();
    assert_eq!(request.body_text().unwrap().as_deref(), Some("ユーザー"));
    assert!(matches!(loaded.get(users.id), Some(Item::Folder(_))));
}

#[test]
fn test_save_overwrites_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.toml");

    let mut tree = ItemTree::new();
    let folder = tree.create_folder(None).unwrap();
    tree.create_file(Some(folder.id), None).unwrap();
    save_tree(&path, &tree).unwrap();

    tree.delete(folder.id).unwrap();
    save_tree(&path, &tree).unwrap();
    assert!(load_tree(&path).unwrap().is_empty());
}
