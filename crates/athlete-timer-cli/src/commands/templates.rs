use athlete_timer_core::builtin_templates;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let templates = builtin_templates();
    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }
    for t in templates {
        println!(
            "{:<18} {:<12} {} x {}s  {}",
            t.id,
            t.kind.as_str(),
            t.total_sets,
            t.set_duration_secs,
            t.label
        );
    }
    Ok(())
}
