use super::*;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn txt_parses_urls_posts_and_commands_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "urls.txt",
        "# watched pages\n\nhttps://example.com/\nhttps://example.org/form a=1&b=2\n|ls -l /tmp\n",
    );

    let jobs = UrlsTxt::new(&path).load().unwrap();

    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0], JobRecord::url("https://example.com/"));
    match &jobs[1] {
        JobRecord::Url(u) => {
            assert_eq!(u.url, "https://example.org/form");
            assert_eq!(u.data.as_ref().and_then(|d| d.as_str()), Some("a=1&b=2"));
        }
        other => panic!("expected url job, got {other:?}"),
    }
    assert_eq!(jobs[2], JobRecord::shell("ls -l /tmp"));
}

#[yare::parameterized(
    three_fields = { "https://example.com/ a=1 extra\n" },
    second_line  = { "https://example.com/\nhttps://a b c\n" },
)]
fn txt_rejects_malformed_lines(text: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "urls.txt", text);

    let err = UrlsTxt::new(&path).load().unwrap_err();
    assert!(matches!(err, WatchError::CorruptStore { .. }), "got {err}");
}

#[test]
fn yaml_save_then_load_keeps_order_and_extra_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.yaml");
    let mut named = JobRecord::url("https://example.com/");
    if let JobRecord::Url(u) = &mut named {
        u.name = Some("example".into());
        u.extra
            .insert("max_tries".into(), serde_yaml::Value::Number(3.into()));
    }
    let jobs = vec![named, JobRecord::shell("date"), JobRecord::url("https://b.example/")];

    let store = UrlsYaml::new(&path);
    store.save(&jobs).unwrap();

    assert_eq!(store.load().unwrap(), jobs);
}

#[test]
fn yaml_reads_browser_jobs_and_skips_empty_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "urls.yaml",
        "---\nname: app\nnavigate: https://app.example/\n---\nurl: https://example.com/\n---\n",
    );

    let jobs = UrlsYaml::new(&path).load().unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].location(), "https://app.example/");
    assert_eq!(jobs[0].name(), Some("app"));
    assert_eq!(jobs[1].location(), "https://example.com/");
}

#[test]
fn yaml_document_without_a_location_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "urls.yaml", "name: nothing to fetch\n");

    let err = UrlsYaml::new(&path).load().unwrap_err();
    assert!(matches!(err, WatchError::CorruptStore { .. }), "got {err}");
}

#[test]
fn guid_depends_only_on_location() {
    let mut a = JobRecord::url("https://example.com/");
    let b = JobRecord::url("https://example.com/");
    if let JobRecord::Url(u) = &mut a {
        u.name = Some("renamed".into());
    }
    assert_eq!(a.guid(), b.guid());
    assert_ne!(a.guid(), JobRecord::url("https://example.org/").guid());
}

#[test]
fn guid_is_sha1_hex_of_the_location() {
    assert_eq!(
        JobRecord::url("https://example.com/").guid(),
        "b559c7edd3fb67374c1a25e739cdd7edd1d79949"
    );
    assert_eq!(
        JobRecord::shell("ls").guid(),
        crate::domain::fingerprint("ls")
    );
}

#[test]
fn yaml_keeps_mapping_post_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "urls.yaml",
        "url: https://example.com/search\ndata:\n  q: 1\n  lang: en\n",
    );
    let store = UrlsYaml::new(&path);

    let jobs = store.load().unwrap();
    match &jobs[0] {
        JobRecord::Url(u) => {
            let data = u.data.as_ref().and_then(|d| d.as_mapping()).unwrap();
            assert_eq!(data.get("lang").and_then(|v| v.as_str()), Some("en"));
            assert_eq!(data.get("q").and_then(|v| v.as_u64()), Some(1));
        }
        other => panic!("expected url job, got {other:?}"),
    }

    store.save(&jobs).unwrap();
    assert_eq!(store.load().unwrap(), jobs);
}

#[cfg(unix)]
#[test]
fn load_secure_drops_shell_jobs_from_writable_files() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "urls.txt", "https://example.com/\n|rm -rf ~\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();

    let jobs = UrlsTxt::new(&path).load_secure().unwrap();

    assert_eq!(jobs, vec![JobRecord::url("https://example.com/")]);
}

#[cfg(unix)]
#[test]
fn load_secure_keeps_shell_jobs_from_private_files() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700)).unwrap();
    let path = write(dir.path(), "urls.txt", "|date\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

    let jobs = UrlsTxt::new(&path).load_secure().unwrap();

    assert_eq!(jobs, vec![JobRecord::shell("date")]);
}
