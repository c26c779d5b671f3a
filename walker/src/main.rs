use log::info;

use scenario::Scenario;
use sim::Simulation;

mod npc;
mod scenario;
mod sim;

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // use the scenario given on the command line, or the built in one
    let scenario = match std::env::args().nth(1) {
        Some(path) => Scenario::load(&path)?,
        None => {
            info!("no scenario given, running the default one");
            Scenario::default()
        }
    };

    let mut sim = Simulation::new(scenario)?;
    let report = sim.run();
    info!("agent rests at {}", sim.npc().start());

    println!("{}", sim.map());
    println!("{}", report);

    Ok(())
}
