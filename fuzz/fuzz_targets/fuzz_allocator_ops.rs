#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use partition_sim::{Allocator, PlacementStrategy, ProcessId};

#[derive(Arbitrary, Debug)]
enum Op {
    Allocate { pid: u8, units: u8 },
    Deallocate { pid: u8 },
    FragmentCount,
}

#[derive(Arbitrary, Debug)]
struct Input {
    best_fit: bool,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let strategy = if input.best_fit {
        PlacementStrategy::BestFit
    } else {
        PlacementStrategy::FirstFit
    };
    let mut alloc = Allocator::new(strategy);

    for op in input.ops {
        match op {
            Op::Allocate { pid, units } => {
                let _ = alloc.allocate(ProcessId(pid as u32), units as u32);
            }
            Op::Deallocate { pid } => {
                let _ = alloc.deallocate(ProcessId(pid as u32));
            }
            Op::FragmentCount => {
                let before = alloc.fragment_count();
                assert_eq!(before, alloc.fragment_count());
            }
        }

        if let Err(err) = alloc.check_consistency() {
            panic!("ledger invariant broken under {}: {}", strategy, err);
        }
    }
});
