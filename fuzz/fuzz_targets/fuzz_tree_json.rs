#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = forest_stand_simulator::io::read_tree_records_json_from_bytes(data);
});
