//! Throughput of the frame masking/unmasking XOR loop, the hottest path
//! on both the transmit and receive side for large binary frames.

use std::time::Instant;

fn main() {
    let sizes = [64usize, 4096, 262_144];
    let key = [0x11u8, 0x22, 0x33, 0x44];

    for size in sizes {
        let mut data = vec![0u8; size];
        let iterations = 2000;

        let start = Instant::now();
        for _ in 0..iterations {
            mimi_client::mask_bytes(&mut data, key);
        }
        let elapsed = start.elapsed();
        let bytes_total = size * iterations;
        let secs = elapsed.as_secs_f64();
        let throughput_mb_s = (bytes_total as f64 / (1024.0 * 1024.0)) / secs.max(1e-9);
        println!("size={size:>7}B  iters={iterations}  {elapsed:?}  {throughput_mb_s:.1} MiB/s");
    }
}
