use proptest::prelude::*;
use sos_store::ObjectStore;
use std::collections::HashSet;
use tempfile::TempDir;

fn open(temp: &TempDir) -> ObjectStore {
    ObjectStore::builder().root(temp.path().join("objects")).sync(false).connect().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_arbitrary_keys_and_values(
        key in proptest::collection::vec(any::<u8>(), 0..256),
        value in proptest::collection::vec(any::<u8>(), 0..8192),
    ) {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        store.store_bytes(&key, &value).unwrap();
        prop_assert_eq!(store.get_bytes(&key).unwrap(), value);

        store.delete(&key).unwrap();
        prop_assert!(store.get_bytes(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn last_write_wins(values in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..512), 1..8)) {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        for value in &values {
            store.store_bytes("key", value).unwrap();
        }
        prop_assert_eq!(&store.get_bytes("key").unwrap(), values.last().unwrap());
    }

    #[test]
    fn resolved_paths_stay_under_root(key in ".*") {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let path = store.resolve(&key);
        prop_assert!(path.file().starts_with(store.root()));
        prop_assert_eq!(path.file().parent(), Some(path.shard_dir()));
        prop_assert_eq!(path.digest().len(), 64);
    }
}

#[test]
fn ten_thousand_keys_are_independent() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    let mut files = HashSet::new();

    for i in 0..10_000u32 {
        let key = format!("key-{i}");
        store.store_bytes(&key, &i.to_le_bytes()).unwrap();
        assert!(files.insert(store.resolve(&key).file().to_path_buf()));
    }

    for i in (0..10_000u32).step_by(97) {
        assert_eq!(store.get_bytes(format!("key-{i}")).unwrap(), i.to_le_bytes());
    }
}
