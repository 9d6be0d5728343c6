use crate::engine::sector_range;
use crate::sector::{parse_sector_spec, SectorState};
use crate::storage::MemoryImage;
use crate::{Engine, Error, SECTOR_SIZE};
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Write { offset: u64, data: Vec<u8> },
    Read { offset: u64, len: usize },
}

const MAX_DEVICE_SECTORS: u64 = 32;
const MAX_OPS: usize = 48;
const MAX_RW_LEN: usize = 3 * SECTOR_SIZE as usize;

fn term_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..200, 0u64..20).prop_map(|(first, span)| (first, first + span))
}

fn op_strategy(device_size: u64) -> impl Strategy<Value = Op> {
    // Offsets may run a little past the end to exercise clamping.
    let max_offset = device_size + SECTOR_SIZE;
    prop_oneof![
        (0..=max_offset, prop::collection::vec(any::<u8>(), 0..MAX_RW_LEN))
            .prop_map(|(offset, data)| Op::Write { offset, data }),
        (0..=max_offset, 0..MAX_RW_LEN).prop_map(|(offset, len)| Op::Read { offset, len }),
    ]
}

fn scenario_strategy() -> impl Strategy<Value = (u64, BTreeSet<u64>, u64, Vec<Op>)> {
    (1..=MAX_DEVICE_SECTORS).prop_flat_map(|sectors| {
        let device_size = sectors * SECTOR_SIZE;
        (
            Just(device_size),
            // Includes the sector just past the end, which aligned requests still check.
            prop::collection::vec(0..sectors + 1, 0..8)
                .prop_map(|bad| bad.into_iter().collect::<BTreeSet<u64>>()),
            0u64..6,
            prop::collection::vec(op_strategy(device_size), 0..MAX_OPS),
        )
    })
}

/// Reference model: same rules, no locking, plain loops.
struct Model {
    data: Vec<u8>,
    bad: BTreeSet<u64>,
    reserve: u64,
}

impl Model {
    fn clamp(&self, offset: u64, len: usize) -> Option<usize> {
        let size = self.data.len() as u64;
        if offset >= size {
            return None;
        }
        Some(len.min((size - offset) as usize))
    }
}

fn run_scenario(
    device_size: u64,
    bad: BTreeSet<u64>,
    reserve: u64,
    ops: Vec<Op>,
) -> TestCaseResult {
    let image = MemoryImage::new(device_size as usize);
    let engine = Engine::with_store(
        Box::new(image.clone()),
        SectorState::new(bad.iter().copied(), reserve),
    )
    .unwrap();
    let initial_bad = bad.len();
    let mut model = Model {
        data: vec![0u8; device_size as usize],
        bad,
        reserve,
    };

    for op in ops {
        match op {
            Op::Read { offset, len } => {
                let result = engine.read(offset, len);
                match model.clamp(offset, len) {
                    None => prop_assert!(result.unwrap().is_empty()),
                    Some(len) => {
                        let range = sector_range(offset, len as u64);
                        match range.sectors().find(|s| model.bad.contains(s)) {
                            Some(sector) => {
                                let faulted =
                                    matches!(result, Err(Error::DeviceFault { sector: s }) if s == sector);
                                prop_assert!(faulted, "expected read fault at sector {}", sector);
                            }
                            None => {
                                let start = offset as usize;
                                prop_assert_eq!(result.unwrap(), &model.data[start..start + len]);
                            }
                        }
                    }
                }
            }
            Op::Write { offset, data } => {
                let result = engine.write(offset, &data);
                match model.clamp(offset, data.len()) {
                    None => prop_assert_eq!(result.unwrap(), 0),
                    Some(len) => {
                        let range = sector_range(offset, len as u64);
                        let mut fault = None;
                        for sector in range.sectors() {
                            if model.bad.contains(&sector) {
                                if model.reserve == 0 {
                                    fault = Some(sector);
                                    break;
                                }
                                model.bad.remove(&sector);
                                model.reserve -= 1;
                            }
                        }
                        match fault {
                            Some(sector) => {
                                let faulted =
                                    matches!(result, Err(Error::DeviceFault { sector: s }) if s == sector);
                                prop_assert!(faulted, "expected write fault at sector {}", sector);
                            }
                            None => {
                                prop_assert_eq!(result.unwrap(), len);
                                let start = offset as usize;
                                model.data[start..start + len].copy_from_slice(&data[..len]);
                            }
                        }
                    }
                }
            }
        }

        let stats = engine.stats();
        prop_assert_eq!(engine.bad_sectors(), model.bad.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(stats.reserve_remaining, model.reserve);
        prop_assert_eq!(initial_bad - stats.bad_sectors, (reserve - stats.reserve_remaining) as usize);
        prop_assert_eq!(stats.repaired, reserve - stats.reserve_remaining);
    }

    prop_assert_eq!(image.contents(), model.data);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parse_matches_expanded_terms(terms in prop::collection::vec(term_strategy(), 1..8)) {
        let spec = terms
            .iter()
            .map(|(first, last)| {
                if first == last {
                    first.to_string()
                } else {
                    format!("{}-{}", first, last)
                }
            })
            .collect::<Vec<_>>()
            .join(",");

        let expected: BTreeSet<u64> = terms.iter().flat_map(|&(first, last)| first..=last).collect();
        prop_assert_eq!(parse_sector_spec(&spec).unwrap(), expected);
    }

    #[test]
    fn engine_matches_model((device_size, bad, reserve, ops) in scenario_strategy()) {
        run_scenario(device_size, bad, reserve, ops)?;
    }
}
