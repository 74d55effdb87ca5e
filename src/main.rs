use cdc_seed_finder::hits::{CylindricalLayout, LayoutParams};
use cdc_seed_finder::synthetic::{simulate_event, SyntheticParams};
use cdc_seed_finder::{FinderParams, TrackFinder};

fn main() {
    // Demo stub: simulates three helices on the default layout and runs the finder
    env_logger::init();
    let layout = match CylindricalLayout::new(LayoutParams::default()) {
        Ok(layout) => layout,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let event = simulate_event(&layout, &SyntheticParams::default());
    let result = TrackFinder::new(FinderParams::default())
        .and_then(|finder| finder.process_event(&event.hits, &layout));
    match result {
        Ok(res) => println!(
            "hits={} tracks={} latency_ms={:.3}",
            event.hits.len(),
            res.tracks.len(),
            res.diagnostics.timings.total_ms
        ),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
