use super::*;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
}

#[test]
fn fresh_snapshot_carries_the_current_version() {
    let snap = PersistedSnapshot::new(now());
    assert_eq!(snap.version, CURRENT_SNAPSHOT_VERSION);
}

#[test]
fn accept_passes_through_the_current_version() {
    let snap = PersistedSnapshot::new(now());
    assert_eq!(PersistedSnapshot::accept(snap.clone()), Some(snap));
}

#[test]
fn accept_rejects_version_zero() {
    let mut snap = PersistedSnapshot::new(now());
    snap.version = 0;
    assert_eq!(PersistedSnapshot::accept(snap), None);
}

#[test]
fn accept_rejects_a_version_newer_than_current() {
    let mut snap = PersistedSnapshot::new(now());
    snap.version = CURRENT_SNAPSHOT_VERSION + 1;
    assert_eq!(PersistedSnapshot::accept(snap), None);
}
