use std::thread;
use std::time::Duration;

use rs_markov_core::model::limiter::Limiter;
use rs_markov_core::model::limiter_config::LimiterConfig;
use rs_markov_core::model::markov_model::Model;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug shows training and refresh events
    env_logger::init();

    // Train from ./data/corpus.txt (one sentence per line), or load
    // ./data/corpus.bin if it was cached by a previous run
    let model = Model::from_corpus_file("./data/corpus.txt", 2)?;
    log::info!("Model ready: order {}, {} contexts", model.order(), model.len());

    // Each refresh generates 100 sentences and keeps the highest scoring one.
    // Candidates longer than 200 tokens are dropped so a refresh cannot spin forever
    let config = LimiterConfig::new(100)?.with_max_len(200);
    let limiter = Limiter::new(model, config);

    // Never blocks: returns the cached sentence and refreshes in the background
    for _ in 0..100 {
        println!("{}", limiter.get_text());
        thread::sleep(Duration::from_millis(500));
    }

    Ok(())
}
