// Quick release mode performance check
//
// Run with: cargo test --release -p sift-ac automaton_perf -- --ignored

#[cfg(test)]
mod perf_tests {
    use crate::{AcConfig, Automaton, TransitionStrategy};
    use std::time::Instant;

    fn haystack() -> Vec<u8> {
        let phrase = b"the quick brown fox jumps over pattern_4 lazy dogs ";
        (0..64 * 1024).map(|i| phrase[i % phrase.len()]).collect()
    }

    #[test]
    #[ignore] // Run with: cargo test --release automaton_perf -- --ignored
    fn automaton_perf() {
        let text = haystack();

        for strategy in [TransitionStrategy::Dense, TransitionStrategy::Lazy] {
            let automaton = Automaton::builder()
                .add_patterns((0..1000u32).map(|i| (i, format!("pattern_{}", i))))
                .config(AcConfig {
                    transitions: strategy,
                    ..AcConfig::default()
                })
                .build()
                .unwrap();

            // Warmup
            for _ in 0..10 {
                let _ = automaton.find_iter(&text).count();
            }

            let iterations = 200;
            let start = Instant::now();
            let mut matches = 0;
            for _ in 0..iterations {
                matches += automaton.find_iter(&text).count();
            }
            let duration = start.elapsed();
            let bytes = (text.len() * iterations) as f64;
            let mb_per_sec = bytes / duration.as_secs_f64() / (1024.0 * 1024.0);

            println!("\n=== Release Mode Automaton Performance ({}) ===", strategy);
            println!("Nodes: {}", automaton.node_count());
            println!("Memory: {} bytes", automaton.memory_usage());
            println!("Matches: {}", matches);
            println!("Total time: {:?}", duration);
            println!("Throughput: {:.2} MiB/sec", mb_per_sec);

            assert!(matches > 0);
            assert!(mb_per_sec > 50.0, "{} scan too slow: {:.2} MiB/sec", strategy, mb_per_sec);
        }
    }
}
