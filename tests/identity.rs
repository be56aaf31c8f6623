// tests/identity.rs

//! PathId and file version continuity across rebuilds.

mod common;

use common::{build_files, cook_and_commit, file_versions, fl, init_tracing, resolve, v};
use conary_cook::cook::nextversion::{next_version, NextVersionRequest};
use conary_cook::{Flavor, Label, MemoryRepository, PathId, Trove, TroveTuple};

#[test]
fn test_rebuild_keeps_path_id_and_version() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    let v2 = v("/repo@rpl:devel/1.0-2-1");

    let first = cook_and_commit(&mut repo, "foo", &v1, &Flavor::empty(), &[("/bin/foo", "A")]);
    let files = build_files(&[("/bin/foo", "A")]);
    let map = resolve(&repo, "foo", &v2, None, &files);

    let entry = map.get("/bin/foo").unwrap();
    let (old_id, _) = first.files().next().unwrap();
    assert_eq!(entry.path_id, *old_id);
    assert_eq!(entry.file_version.as_ref(), Some(&v1));
    assert_eq!(entry.file_id, Some(files[0].file_id()));
}

#[test]
fn test_changed_content_gets_new_version() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    let v2 = v("/repo@rpl:devel/1.0-2-1");

    let first = cook_and_commit(&mut repo, "foo", &v1, &Flavor::empty(), &[("/bin/foo", "A")]);
    let second = cook_and_commit(&mut repo, "foo", &v2, &Flavor::empty(), &[("/bin/foo", "B")]);

    let old_id: Vec<&PathId> = first.files().map(|(id, _)| id).collect();
    let new_id: Vec<&PathId> = second.files().map(|(id, _)| id).collect();
    assert_eq!(old_id, new_id);
    assert_eq!(file_versions(&second)["/bin/foo"], v2);
}

#[test]
fn test_path_missing_from_latest_found_in_history() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    let v2 = v("/repo@rpl:devel/1.0-2-1");
    let v3 = v("/repo@rpl:devel/1.0-3-1");

    let first = cook_and_commit(
        &mut repo,
        "foo",
        &v1,
        &Flavor::empty(),
        &[("/bin/foo", "A"), ("/usr/share/foo/data", "D")],
    );
    cook_and_commit(&mut repo, "foo", &v2, &Flavor::empty(), &[("/bin/foo", "A")]);

    let files = build_files(&[("/bin/foo", "A"), ("/usr/share/foo/data", "D")]);
    let map = resolve(&repo, "foo", &v3, None, &files);

    let data = map.get("/usr/share/foo/data").unwrap();
    let original = first
        .files()
        .find(|(_, f)| f.path == "/usr/share/foo/data")
        .map(|(id, _)| *id)
        .unwrap();
    assert_eq!(data.path_id, original);
    assert_eq!(data.file_version.as_ref(), Some(&v1));
    assert_eq!(map.get("/bin/foo").unwrap().file_version.as_ref(), Some(&v1));
}

#[test]
fn test_missing_component_falls_back_to_history() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    let v2 = v("/repo@rpl:devel/1.0-2-1");
    let v3 = v("/repo@rpl:devel/1.0-3-1");

    let first = cook_and_commit(&mut repo, "foo", &v1, &Flavor::empty(), &[("/bin/foo", "A")]);
    // Latest package points at a component the repository does not have
    let mut broken = Trove::new("foo", v2.clone(), Flavor::empty());
    broken.add_trove(TroveTuple::new("foo:runtime", v2, Flavor::empty()));
    repo.add_trove(broken);

    let files = build_files(&[("/bin/foo", "A")]);
    let map = resolve(&repo, "foo", &v3, None, &files);

    let entry = map.get("/bin/foo").unwrap();
    let (old_id, _) = first.files().next().unwrap();
    assert_eq!(entry.path_id, *old_id);
    assert_eq!(entry.file_version.as_ref(), Some(&v1));
}

#[test]
fn test_history_walk_starts_on_search_branch() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let shadow_v1 = v("/repo@rpl:devel//repo@rpl:shadow/1.0-1-1");
    let shadow_v2 = v("/repo@rpl:devel//repo@rpl:shadow/1.0-2-1");

    // foo:source once built /bin/foo into a differently named package
    let mut earlier = cook_and_commit(
        &mut repo,
        "foo-tools",
        &shadow_v1,
        &Flavor::empty(),
        &[("/bin/foo", "A")],
    );
    earlier.source_name = "foo:source".to_string();
    repo.add_trove(earlier.clone());

    let files = build_files(&[("/bin/foo", "A")]);
    let map = resolve(&repo, "foo", &shadow_v2, None, &files);

    let entry = map.get("/bin/foo").unwrap();
    let (old_id, _) = earlier.files().next().unwrap();
    assert!(entry.is_known());
    assert_eq!(entry.path_id, *old_id);
    assert_eq!(entry.file_version.as_ref(), Some(&shadow_v1));
}

#[test]
fn test_fresh_path_ids_depend_on_source() {
    let repo = MemoryRepository::new();
    let version = v("/repo@rpl:devel/1.0-1-1");
    let files = build_files(&[("/usr/share/doc/README", "R")]);

    let foo = resolve(&repo, "foo", &version, None, &files);
    let bar = resolve(&repo, "bar", &version, None, &files);

    let foo_id = foo.get("/usr/share/doc/README").unwrap().path_id;
    let bar_id = bar.get("/usr/share/doc/README").unwrap().path_id;
    assert_ne!(foo_id, bar_id);
    assert_eq!(foo.source_name(), "foo:source");
}

#[test]
fn test_shadow_inherits_parent_identities() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let parent = v("/repo@rpl:devel/1.0-1-1");
    let shadow = v("/repo@rpl:devel//repo@rpl:shadow/1.0-1-1");

    let first = cook_and_commit(&mut repo, "foo", &parent, &Flavor::empty(), &[("/bin/foo", "A")]);
    let files = build_files(&[("/bin/foo", "A"), ("/bin/new", "N")]);
    let map = resolve(&repo, "foo", &shadow, None, &files);

    let (old_id, _) = first.files().next().unwrap();
    assert_eq!(map.get("/bin/foo").unwrap().path_id, *old_id);
    assert_eq!(map.get("/bin/foo").unwrap().file_version.as_ref(), Some(&parent));

    let fresh = map.get("/bin/new").unwrap();
    assert!(!fresh.is_known());
    assert_eq!(fresh.path_id, PathId::mint("foo:source", "/bin/new", &shadow));
}

#[test]
fn test_denied_ancestor_is_skipped() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let parent = v("/repo@rpl:devel/1.0-1-1");
    let shadow = v("/repo@rpl:devel//repo@rpl:shadow/1.0-1-1");
    cook_and_commit(&mut repo, "foo", &parent, &Flavor::empty(), &[("/bin/foo", "A")]);
    repo.deny_label(Label::parse("repo@rpl:devel").unwrap());

    let files = build_files(&[("/bin/foo", "A")]);
    let map = resolve(&repo, "foo", &shadow, None, &files);

    let entry = map.get("/bin/foo").unwrap();
    assert!(!entry.is_known());
    assert_eq!(entry.path_id, PathId::mint("foo:source", "/bin/foo", &shadow));
}

#[test]
fn test_unavailable_repository_mints_everything() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    cook_and_commit(&mut repo, "foo", &v1, &Flavor::empty(), &[("/bin/foo", "A")]);
    repo.set_unavailable(true);

    let v2 = v("/repo@rpl:devel/1.0-2-1");
    let files = build_files(&[("/bin/foo", "A"), ("/bin/bar", "B")]);
    let map = resolve(&repo, "foo", &v2, None, &files);

    assert_eq!(map.len(), 2);
    assert!(map.iter().all(|(_, entry)| !entry.is_known()));
}

#[test]
fn test_local_cook_looks_past_cook_branch() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    let first = cook_and_commit(&mut repo, "foo", &v1, &fl("[ssl]"), &[("/bin/foo", "A")]);

    let source = v("/repo@rpl:devel/1.0-1");
    let names = vec!["foo".to_string()];
    let flavors = vec![fl("[ssl]")];
    let cook = Label::cook();
    let target = next_version(
        Some(&repo),
        &NextVersionRequest {
            source_version: &source,
            package_names: &names,
            flavors: &flavors,
            target_label: Some(&cook),
            always_bump_count: false,
        },
    )
    .unwrap();
    assert!(target.is_on_local_host());

    let files = build_files(&[("/bin/foo", "A")]);
    let map = resolve(&repo, "foo", &target, Some(&cook), &files);

    let (old_id, _) = first.files().next().unwrap();
    assert_eq!(map.get("/bin/foo").unwrap().path_id, *old_id);
    assert_eq!(map.get("/bin/foo").unwrap().file_version.as_ref(), Some(&v1));
}

#[test]
fn test_resolution_is_deterministic() {
    init_tracing();
    let mut repo = MemoryRepository::new();
    let v1 = v("/repo@rpl:devel/1.0-1-1");
    cook_and_commit(
        &mut repo,
        "foo",
        &v1,
        &Flavor::empty(),
        &[("/bin/foo", "A"), ("/etc/foo.conf", "C")],
    );

    let v2 = v("/repo@rpl:devel/1.0-2-1");
    let files = build_files(&[("/bin/foo", "A"), ("/etc/foo.conf", "C2"), ("/bin/baz", "Z")]);
    let first = resolve(&repo, "foo", &v2, None, &files);
    let second = resolve(&repo, "foo", &v2, None, &files);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
