//! Learns a tiny checkerboard tilemap and prints a freshly synthesized one.
//!
//! Run with `cargo run --example wfc-tiles-demo`.

use wfc_tiles::Model;

fn sample() -> Vec<Vec<u64>> {
    vec![
        vec![0, 1, 0, 1, 0, 1],
        vec![1, 0, 1, 0, 1, 0],
        vec![0, 1, 0, 1, 0, 1],
        vec![1, 0, 1, 0, 1, 0],
    ]
}

fn main() {
    env_logger::init();

    let model = Model::learn(&[sample()], 2).expect("sample tilemap is well-formed");

    match model.generate(12, 8, 20).expect("valid generation parameters") {
        Some(tilemap) => {
            for row in tilemap {
                let line: String = row.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" ");
                println!("{line}");
            }
        }
        None => eprintln!("no consistent tilemap found within the attempt budget"),
    }
}
