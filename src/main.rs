use slopebrain::observer::BrainAdapter;
use slopebrain::prelude::*;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("--help") | Some("-h") | Some("help") => print_help(),
        Some("forecast") => {
            if let Err(msg) = run_forecast(&args[1..]) {
                eprintln!("error: {msg}");
                std::process::exit(2);
            }
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(2);
        }
    }
}

fn print_help() {
    println!(
        "slopebrain - forecast the next value of a numeric series\n\n\
         USAGE:\n  \
           slopebrain forecast <v1,v2,...> [options]\n  \
           slopebrain help\n\n\
         OPTIONS:\n  \
           --granularity <deg>     encoder bucket width, must divide 180 (default 15)\n  \
           --context <n>           context window per level (default 10)\n  \
           --learning-rate <n>     minimum association count to trust (default 2)\n  \
           --level-weight <f>      per-level prediction weight factor (default 1)\n  \
           --trace                 print every encoded step and the learned patterns\n  \
           --json                  print the full report as JSON"
    );
}

#[derive(Debug, Default)]
struct Options {
    values: Vec<f64>,
    cfg: ForecastConfig,
    trace: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{flag} expects a value"))
        };
        match arg.as_str() {
            "--granularity" => opts.cfg.granularity = parse_num(&value(arg)?)?,
            "--context" => opts.cfg.brain.context_size = parse_num(&value(arg)?)?,
            "--learning-rate" => opts.cfg.brain.learning_rate = parse_num(&value(arg)?)?,
            "--level-weight" => opts.cfg.brain.level_weight_factor = parse_num(&value(arg)?)?,
            "--trace" => opts.trace = true,
            "--json" => opts.json = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            list => {
                for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    opts.values.push(parse_num(part)?);
                }
            }
        }
    }
    Ok(opts)
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("not a number: {s:?}"))
}

fn run_forecast(args: &[String]) -> Result<(), String> {
    let opts = parse_args(args)?;
    let mut forecaster = Forecaster::new(&opts.cfg).map_err(|e| e.to_string())?;
    let report = forecaster.run(&opts.values).map_err(|e| e.to_string())?;

    if opts.json {
        let out = serde_json::json!({
            "report": report,
            "snapshot": BrainAdapter::new(forecaster.brain()).snapshot(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?
        );
        return Ok(());
    }

    if opts.trace {
        for step in &report.steps {
            println!(
                "step {:3}: {:<10} next={:<24} accuracy={}",
                step.index,
                step.symbol,
                step.predicted.as_deref().unwrap_or("-"),
                step.accuracy
                    .map(|a| format!("{a:.1}%"))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        let snap = BrainAdapter::new(forecaster.brain()).snapshot();
        for p in &snap.patterns {
            println!("pattern #{:<4} strength={:<4} {}", p.id, p.strength, p.name);
        }
        let d = report.diagnostics;
        println!(
            "symbols={} (derived {}) transitions={} pattern_edges={} levels={} elevations={}",
            d.symbol_count,
            d.derived_symbols,
            d.transition_count,
            d.pattern_edge_count,
            d.levels,
            d.elevations
        );
        if let Some(acc) = report.mean_accuracy {
            println!("mean accuracy: {acc:.1}%");
        }
    }

    if report.is_fallback() {
        println!("forecast: {} (no learned evidence; last value)", report.value_or_last());
    } else {
        println!("forecast: {}", report.value_or_last());
    }
    Ok(())
}
