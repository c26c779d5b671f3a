use anyhow::anyhow;
use log::info;
use stepfind::{load_map, Location, Metric, PathFinder, PathResult};

const USAGE: &str = "usage: stepfind <map> <start x,y> <goal x,y> [g metric] [h metric]";

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        return Err(anyhow!(USAGE));
    }

    let map = load_map(&args[0])?;
    let start: Location = args[1].parse()?;
    let goal: Location = args[2].parse()?;
    if !map.is_valid(start) {
        return Err(anyhow!("start {} is outside of the map", start));
    }
    let g_cost: Metric = args.get(3).map_or(Ok(Metric::Euclidean), |s| s.parse())?;
    let h_cost: Metric = args.get(4).map_or(Ok(Metric::Manhattan), |s| s.parse())?;

    println!("{}", map);

    let mut finder = PathFinder::with_costs(g_cost.as_fn(), h_cost.as_fn());
    finder.try_initialize(start, goal)?;

    let mut steps = 0;
    while !finder.step(&map).is_done() {
        steps += 1;
    }
    info!("search finished after {} steps: {}", steps, finder.status());

    match PathResult::from_finder(&finder) {
        Some(result) => {
            println!("cost: {}", result.total_cost);
            for location in result.locations() {
                println!("{}", location);
            }
        }
        None => println!("no path from {} to {}", start, goal),
    }

    Ok(())
}
