//! CLI command implementations.

use tracing::info;

use kessler_sim::{SimConfig, Simulation, StepOutcome};
use kessler_telemetry::{TelemetryRecorder, TracingSink};
use kessler_types::KesslerResult;

use crate::scenario::Scenario;

/// Runs a scenario and prints every reported event.
pub fn screen(config_path: &str, steps_override: Option<u32>) -> KesslerResult<()> {
    let scenario = Scenario::load(config_path)?;
    let steps = steps_override.unwrap_or(scenario.steps);
    info!(name = %scenario.name, nparts = scenario.particles.len(), steps, "screening");

    let mut sim = scenario.build()?;
    let mut telemetry = TelemetryRecorder::new();
    telemetry.add_sink(Box::new(TracingSink));
    sim.set_telemetry(Some(telemetry));

    for step in 0..steps {
        let outcome = sim.step()?;
        print_step_report(&sim, step, outcome);
        if outcome == StepOutcome::Collision {
            break;
        }
    }
    Ok(())
}

/// Parses and builds a scenario without stepping it.
pub fn validate(path: &str) -> KesslerResult<()> {
    let scenario = Scenario::load(path)?;
    let sim = scenario.build()?;
    println!(
        "OK: '{}' — {} particles, dynamics '{}', ct {}",
        scenario.name,
        sim.nparts(),
        sim.dynamics_name(),
        sim.ct()
    );
    Ok(())
}

/// Runs the built-in head-on demonstration.
pub fn demo() -> KesslerResult<()> {
    let state = vec![
        -1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.01, //
        1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.01,
    ];
    let config = SimConfig {
        ct: 2.0,
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(
        Box::new(kessler_dynamics::FreeMotion),
        state,
        vec![],
        config,
    )?;

    let outcome = sim.step()?;
    print_step_report(&sim, 0, outcome);
    Ok(())
}

fn print_step_report(sim: &Simulation, step: u32, outcome: StepOutcome) {
    println!("step {step}: {outcome:?} (t = {:.6})", sim.time());
    for c in sim.collisions() {
        println!("  collision: particles {} and {} at t = {:.9}", c.i, c.j, c.t);
    }
    for conj in sim.conjunctions().iter().flatten() {
        println!(
            "  conjunction: particles {} and {} at t = {:.9}, miss distance {:.6}",
            conj.i, conj.j, conj.t, conj.dist
        );
    }
    for e in sim.terminal_events() {
        println!(
            "  terminal: particle {} at t = {:.9} ({:?})",
            e.particle, e.t, e.code
        );
    }
}
