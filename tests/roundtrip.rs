use cryptex::{BoxError, BoxStore, Config, Fixed, Secret, Session, resolve};
use std::fs;
use tempfile::tempdir;

fn store_in(dir: &std::path::Path) -> BoxStore {
    BoxStore::with_dir(dir.to_path_buf(), Config::default())
}

#[test]
fn box_survives_save_and_reopen() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let mut opened = store.create("test", "me", "secret1").unwrap();
    let mut email = Secret::new("email");
    email.set_login("a@b.com");
    email.set_password("hunter2");
    opened.secret_box_mut().add_secret(email).unwrap();
    store.save(&opened).unwrap();

    let reopened = store.open(Some("test"), &Fixed::new("secret1")).unwrap();
    let secret_box = reopened.secret_box();
    assert_eq!(secret_box.name(), "test");
    assert_eq!(secret_box.owner(), "me");

    let resolution = resolve(secret_box, "email");
    assert_eq!(resolution.value, "hunter2");
    assert_eq!(resolution.secret.unwrap().login(), "a@b.com");

    let err = store.open(Some("test"), &Fixed::new("wrong")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BoxError>(),
        Some(BoxError::WrongPasswordOrCorruptBox)
    ));
}

#[test]
fn box_file_does_not_leak_plaintext() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let mut opened = store.create("test", "me", "secret1").unwrap();
    let mut email = Secret::new("email");
    email.set_password("hunter2");
    opened.secret_box_mut().add_secret(email).unwrap();
    store.save(&opened).unwrap();

    let raw = fs::read(dir.path().join("test")).unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("email"));
}

#[test]
fn tampered_box_is_rejected() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    store.create("test", "me", "secret1").unwrap();

    let path = dir.path().join("test");
    let mut raw = fs::read(&path).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;
    fs::write(&path, raw).unwrap();

    let err = store.open(Some("test"), &Fixed::new("secret1")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BoxError>(),
        Some(BoxError::WrongPasswordOrCorruptBox)
    ));
}

#[test]
fn session_edits_are_visible_to_a_new_session() {
    let dir = tempdir().unwrap();
    store_in(dir.path()).create("test", "me", "secret1").unwrap();

    let mut session = Session::new(store_in(dir.path()), Box::new(Fixed::new("secret1")));
    let opened = session.open(Some("test")).unwrap();
    let mut card = Secret::new("foo");
    card.set_password("p1");
    card.add_item("cc", "1234").unwrap();
    opened.secret_box_mut().add_secret(card).unwrap();
    session.save().unwrap();
    drop(session);

    let mut session = Session::new(store_in(dir.path()), Box::new(Fixed::new("secret1")));
    let opened = session.open(Some("test")).unwrap();
    assert_eq!(resolve(opened.secret_box(), "foo").value, "p1");
    assert_eq!(resolve(opened.secret_box(), "foo.cc").value, "1234");
    assert!(!resolve(opened.secret_box(), "bar").is_found());
}

#[test]
fn listing_reports_encrypted_size() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    store.create("a", "me", "secret1").unwrap();
    store.create("b", "me", "secret1").unwrap();

    let boxes = store.list_boxes(None).unwrap();
    let names: Vec<_> = boxes.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    for listing in &boxes {
        assert_eq!(listing.size, fs::metadata(&listing.path).unwrap().len());
    }
}
