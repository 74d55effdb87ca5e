use cdc_seed_finder::config::track_demo;
use cdc_seed_finder::hits::{CylindricalLayout, RawHit};
use cdc_seed_finder::io::{load_events, write_json_file};
use cdc_seed_finder::synthetic::{simulate_event, SyntheticEvent, SyntheticParams};
use cdc_seed_finder::{EventResult, TrackFinder};
use serde::Serialize;
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = track_demo::load_config(Path::new(&config_path))?;

    let layout = CylindricalLayout::new(config.layout.clone()).map_err(|e| e.to_string())?;
    let finder = TrackFinder::new(config.finder.clone()).map_err(|e| e.to_string())?;

    let simulated: Vec<SyntheticEvent> = match &config.input {
        Some(_) => Vec::new(),
        None => (0..config.events.max(1))
            .map(|i| {
                let params = SyntheticParams {
                    seed: config.synthetic.seed + i as u64,
                    ..config.synthetic.clone()
                };
                simulate_event(&layout, &params)
            })
            .collect(),
    };
    let events: Vec<Vec<RawHit>> = match &config.input {
        Some(path) => load_events(path).map_err(|e| e.to_string())?,
        None => simulated.iter().map(|event| event.hits.clone()).collect(),
    };

    let results = finder
        .process_events(&events, &layout)
        .into_iter()
        .collect::<Result<Vec<EventResult>, _>>()
        .map_err(|e| e.to_string())?;

    for (i, result) in results.iter().enumerate() {
        println!(
            "event {i}: {} hits -> {} tracks ({:.3} ms)",
            result.diagnostics.hits.total,
            result.tracks.len(),
            result.diagnostics.timings.total_ms
        );
        for track in &result.tracks {
            let p = &track.parameters;
            println!(
                "  {:?}: {} hits ({} stereo) curvature={:.5} phi0={:.4} z0={} tanλ={}",
                track.origin,
                track.hits.len(),
                track.stereo_hit_count,
                p.curvature,
                p.phi0,
                p.z0.map_or("-".to_string(), |v| format!("{v:.3}")),
                p.tan_lambda.map_or("-".to_string(), |v| format!("{v:.4}"))
            );
        }
    }

    if let Some(path) = &config.output.result_json {
        write_json_file(path, &TrackDemoReport { events: &results })?;
        println!("Saved results to {}", path.display());
    }
    if let (Some(path), false) = (&config.output.events_json, simulated.is_empty()) {
        write_json_file(path, &simulated)?;
        println!("Saved {} simulated events to {}", simulated.len(), path.display());
    }

    Ok(())
}

fn usage() -> String {
    "Usage: track_demo <config.json>".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackDemoReport<'a> {
    events: &'a [EventResult],
}
