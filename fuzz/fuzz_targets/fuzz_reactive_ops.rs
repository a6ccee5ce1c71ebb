#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rebind_runtime::reactive::{ReactiveObject, Value, Watcher, get_path, set_path};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Arbitrary, Debug)]
enum Op {
    Set { path: Vec<u8>, value: i8 },
    SetObject { path: Vec<u8> },
    Remove { key: u8 },
    Watch { path: Vec<u8> },
    Drop { index: u8 },
}

fn path_of(raw: &[u8]) -> String {
    raw.iter()
        .take(4)
        .map(|b| KEYS[usize::from(*b) % KEYS.len()])
        .collect::<Vec<_>>()
        .join(".")
}

fuzz_target!(|ops: Vec<Op>| {
    let root = ReactiveObject::new();
    let mut watchers: Vec<Watcher> = Vec::new();

    for op in ops.into_iter().take(256) {
        match op {
            Op::Set { path, value } => {
                let _ = set_path(&root, &path_of(&path), i32::from(value));
            }
            Op::SetObject { path } => {
                let _ = set_path(&root, &path_of(&path), ReactiveObject::new());
            }
            Op::Remove { key } => {
                let _ = root.remove(KEYS[usize::from(key) % KEYS.len()]);
            }
            Op::Watch { path } => {
                if watchers.len() < 32 {
                    watchers.push(Watcher::new(&root, &path_of(&path), |_, _| {}));
                }
            }
            Op::Drop { index } => {
                if !watchers.is_empty() {
                    watchers.remove(usize::from(index) % watchers.len());
                }
            }
        }

        for w in &watchers {
            let fresh: Value = get_path(&root, w.expression());
            assert_eq!(w.value(), fresh, "watcher on {} is stale", w.expression());
        }
    }
});
