/// Map a Python source tree and print the rendered objects as JSON
///
/// Usage: `cargo run --example dump_api -- <dir> [<dir>...]`
///
/// Unreadable files and unresolvable imports are listed on stderr; the
/// mapping itself carries on without them.
use docgraph::export::export_objects_json;
use docgraph::DisplayConfig;
use docgraph_python::{LoaderConfig, PythonMapper};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dirs: Vec<String> = env::args().skip(1).collect();
    if dirs.is_empty() {
        eprintln!("usage: dump_api <dir> [<dir>...]");
        std::process::exit(2);
    }

    let config = LoaderConfig::new(&dirs).with_ignore(["*migrations*"]);
    let mut mapper = PythonMapper::new(config, DisplayConfig::default())?;
    let api = mapper.run()?;

    eprintln!(
        "Mapped {} modules ({} objects) in {:?}",
        api.modules.len(),
        api.objects.len(),
        api.metrics.total_parse_time
    );
    eprintln!("  Success rate: {:.1}%", api.metrics.success_rate());
    for diagnostic in api.diagnostics.iter() {
        eprintln!("  warning: {diagnostic}");
    }

    println!("{}", export_objects_json(&api.objects)?);
    Ok(())
}
