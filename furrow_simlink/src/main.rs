// CLI driver for the Furrow simulation link.
//
// Connects to a running simulation server, initializes a session, and
// advances it day by day, printing metrics as they stream back. Useful for
// exercising a server build without launching the game.
//
// Usage:
//   furrow-sim [OPTIONS]
//     --host <HOST>          Server host (default: 127.0.0.1)
//     --port <PORT>          Server port (default: 5005)
//     --date <YYYY-MM-DD>    Sowing date (default: today, UTC)
//     --crop <NAME>          Crop to grow (default: wheat)
//     --fertilizer <PRESET>  none|low|medium|high (default: none)
//     --irrigation <PRESET>  none|drip|sprinkler|flood (default: none)
//     --days <N>             Days to simulate (default: 30)
//     --water <CM>           Irrigate this much after the first week
//     --fert <KG_HA>         Fertilize this much after the first week
//
// Diagnostics go through tracing (RUST_LOG=debug for frame-level detail);
// simulation output goes to stdout.

use furrow_protocol::types::InitContext;
use furrow_simlink::{LinkConfig, SimClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct CliOptions {
    config: LinkConfig,
    context: InitContext,
    days: u32,
    water_cm: Option<f64>,
    fert_kg_ha: Option<f64>,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = parse_args();
    let mut client = SimClient::new(options.config);
    client.set_context(options.context);

    let init = match client.initialize(true) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Failed to initialize simulation: {err}");
            std::process::exit(1);
        }
    };
    println!(
        "Session initialized: {}",
        init.message.as_deref().unwrap_or("ok")
    );

    for day in 1..=options.days {
        // One-off interventions after the first simulated week.
        if day == 8 {
            if let Some(amount) = options.water_cm {
                match client.water(amount, 0.75) {
                    Ok(result) => print_day("water", &result),
                    Err(err) => eprintln!("water failed: {err}"),
                }
                continue;
            }
        }
        if day == 9 {
            if let Some(amount) = options.fert_kg_ha {
                match client.fertilize(amount, 0.7) {
                    Ok(result) => print_day("fertilize", &result),
                    Err(err) => eprintln!("fertilize failed: {err}"),
                }
                continue;
            }
        }

        match client.advance_tick(1) {
            Ok(result) => {
                let finished = result.finished;
                print_day("tick", &result);
                if finished {
                    println!("Simulation run finished after {day} days.");
                    break;
                }
            }
            Err(err) => {
                eprintln!("tick failed: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn print_day(action: &str, result: &furrow_protocol::TickResult) {
    let metrics = result.metrics.unwrap_or_default();
    let forecast = result
        .weather
        .as_ref()
        .map(|w| w.forecast.join(","))
        .unwrap_or_default();
    println!(
        "[{action}] tick={} day={} sm={:.3} soil_n={:.3} yield={:.1} forecast={forecast}",
        result.tick, result.day, metrics.soil_moisture, metrics.soil_n, metrics.yield_rate
    );
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching —
/// no clap dependency.
fn parse_args() -> CliOptions {
    let mut options = CliOptions {
        config: LinkConfig::default(),
        context: InitContext::default(),
        days: 30,
        water_cm: None,
        fert_kg_ha: None,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                options.config.host = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--host requires a value");
                    std::process::exit(2);
                });
            }
            "--port" => {
                i += 1;
                options.config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(2);
                });
            }
            "--date" => {
                i += 1;
                options.context.date = args.get(i).cloned().unwrap_or_default();
            }
            "--crop" => {
                i += 1;
                options.context.crop = args.get(i).cloned().unwrap_or_default();
            }
            "--fertilizer" => {
                i += 1;
                options.context.fertilizer_type = args.get(i).cloned().unwrap_or_default();
            }
            "--irrigation" => {
                i += 1;
                options.context.irrigation_type = args.get(i).cloned().unwrap_or_default();
            }
            "--days" => {
                i += 1;
                options.days = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--days requires a number");
                    std::process::exit(2);
                });
            }
            "--water" => {
                i += 1;
                options.water_cm = args.get(i).and_then(|s| s.parse().ok());
            }
            "--fert" => {
                i += 1;
                options.fert_kg_ha = args.get(i).and_then(|s| s.parse().ok());
            }
            other => {
                eprintln!("Unknown option: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    options
}
