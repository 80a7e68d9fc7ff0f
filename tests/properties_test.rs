//! Property tests for allocation bookkeeping and payload round-trips

use pagefile::Page;
use proptest::prelude::*;
use std::io::Cursor;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Lock(usize),
    Release(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=8).prop_map(Op::Write),
        (0usize..16).prop_map(Op::Lock),
        (0usize..16).prop_map(Op::Release),
    ]
}

fn new_page(block_size: usize, block_count: usize) -> Page<Cursor<Vec<u8>>> {
    Page::in_memory(block_size, block_count).unwrap()
}

proptest! {
    #[test]
    fn used_blocks_tracks_refcounts(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let page = new_page(8, 16);
        let mut model = [0u32; 16];

        for op in ops {
            match op {
                Op::Write(data) => {
                    match model.iter().position(|&r| r == 0) {
                        Some(expected) => {
                            prop_assert_eq!(page.write(&data).unwrap(), expected);
                            model[expected] = 1;
                        }
                        None => prop_assert!(page.write(&data).is_err()),
                    }
                }
                Op::Lock(index) => {
                    if model[index] > 0 {
                        page.lock(index).unwrap();
                        model[index] += 1;
                    } else {
                        prop_assert!(page.lock(index).is_err());
                    }
                }
                Op::Release(index) => {
                    if model[index] > 0 {
                        page.release(index).unwrap();
                        model[index] -= 1;
                    } else {
                        prop_assert!(page.release(index).is_err());
                    }
                }
            }

            let expected_used = model.iter().filter(|&&r| r > 0).count();
            prop_assert_eq!(page.used_blocks(), expected_used);
        }

        for (index, &refs) in model.iter().enumerate() {
            prop_assert_eq!(page.refcount(index).unwrap(), refs);
            if refs == 0 {
                prop_assert!(page.read_block(index).unwrap().iter().all(|&b| b == 0));
            }
        }
    }

    #[test]
    fn put_get_pads_to_block_boundary(
        data in prop::collection::vec(any::<u8>(), 0..200),
        block_size in 1usize..32,
    ) {
        let page = new_page(block_size, 256);
        let address = page.put(&data).unwrap();
        let bytes = address.get().unwrap();

        let blocks = data.len().div_ceil(block_size);
        prop_assert_eq!(address.len(), blocks);
        prop_assert_eq!(bytes.len(), blocks * block_size);
        prop_assert_eq!(&bytes[..data.len()], &data[..]);
        prop_assert!(bytes[data.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn values_round_trip_at_any_granularity(
        value in prop::collection::vec((any::<i64>(), ".{0,12}"), 0..20),
        block_size in 1usize..64,
    ) {
        let page = new_page(block_size, 4096);
        let address = page.put_value(&value).unwrap();
        let decoded: Vec<(i64, String)> = address.get_value().unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn remove_range_removes_what_exists(allocated in 0usize..10, requested in 0usize..20) {
        let page = new_page(4, 10);
        for i in 0..allocated {
            page.write(&[i as u8]).unwrap();
        }

        let removed = page.remove_range(requested, 0).unwrap();
        prop_assert_eq!(removed, requested.min(allocated));
        prop_assert_eq!(page.used_blocks(), allocated - removed);
    }
}
