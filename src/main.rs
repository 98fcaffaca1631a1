//! Mathhammer combat-resolution engine: CLI.

use clap::{Parser, Subcommand};
use mathhammer::ability::{normalize, AbilityInput};
use mathhammer::advisory::collect_for_selection;
use mathhammer::allocator::allocate;
use mathhammer::calculator::calculate_volley;
use mathhammer::config::EngineConfig;
use mathhammer::eligibility::{eligible_weapons, EligibleWeapons, WeaponSelection};
use mathhammer::report::{write_html_report, write_json_report, CalculationReport};
use mathhammer::scenario::{load_scenario, load_unit_state};
use mathhammer::util::init_logging;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mathhammer")]
#[command(about = "Tabletop wargame combat resolution: expected damage, kill odds and wound allocation")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration (TOML).
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a scenario's eligible weapons against its defender and print expected results.
    Calc {
        #[arg(long, value_name = "JSON")]
        scenario: PathBuf,
        /// Directory for report.json and report.html.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Show which weapons a scenario's unit may use in its phase.
    Weapons {
        #[arg(long, value_name = "JSON")]
        scenario: PathBuf,
    },
    /// Redistribute a unit's wound total across its models and print the survivors as JSON.
    Allocate {
        #[arg(long, value_name = "JSON")]
        unit: PathBuf,
        /// New total wounds remaining on the unit.
        #[arg(long, allow_hyphen_values = true, conflicts_with = "damage")]
        wounds: Option<i64>,
        /// Damage taken; subtracted from the unit's current total.
        #[arg(long, conflicts_with = "wounds")]
        damage: Option<i64>,
    },
    /// Parse ability text (and optional weapon name tags) into modifiers.
    Abilities {
        text: String,
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = EngineConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Calc { scenario, out } => run_calc(&config, scenario, out),
        Commands::Weapons { scenario } => run_weapons(&config, scenario),
        Commands::Allocate {
            unit,
            wounds,
            damage,
        } => run_allocate(unit, wounds, damage),
        Commands::Abilities { text, name } => run_abilities(&text, name.as_deref()),
    }
}

fn run_calc(config: &EngineConfig, path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let scenario = load_scenario(&path, config).map_err(|e| e.to_string())?;
    let eligible = eligible_weapons(scenario.phase, &scenario.weapons, &scenario.context);
    let volley = calculate_volley(&eligible, &scenario.defender, &scenario.modifiers, config);
    let advisories = collect_for_selection(&scenario.weapons, &eligible, &scenario.defender, &scenario.modifiers);
    for a in &advisories {
        tracing::debug!(code = %a.code, "{}", a.technical);
    }
    let report = CalculationReport::new(&scenario, volley, advisories);

    println!("{} ({:?} phase)", report.unit, report.phase);
    for w in &report.volley.per_weapon {
        let r = &w.result;
        println!(
            "  {:<28} attacks={:.1}  hits={:.2}  wounds={:.2}  unsaved={:.2}  damage={:.2}  kills={:.2}",
            w.weapon,
            r.attacks,
            r.expected_hits,
            r.expected_wounds,
            r.expected_unsaved,
            r.expected_damage,
            r.expected_models_killed
        );
    }
    let total = &report.volley.total;
    println!(
        "Total: damage={:.2}  models killed={:.2}  P(at least one)={:.1}%",
        total.expected_damage,
        total.expected_models_killed,
        total.prob_at_least_one * 100.0
    );
    for (n, p) in total.kill_probabilities.iter().enumerate() {
        if *p >= config.probability_epsilon {
            println!("  {:>3} killed: {:>5.1}%", n, p * 100.0);
        }
    }
    for a in &report.advisories {
        println!("[{}] {}", a.code, a.summary);
    }

    if let Some(out_dir) = out {
        fs::create_dir_all(&out_dir).map_err(|e| e.to_string())?;
        let json_path = out_dir.join("report.json");
        write_json_report(&report, &json_path).map_err(|e| e.to_string())?;
        write_html_report(&report, &out_dir, config.probability_epsilon)
            .map_err(|e| e.to_string())?;
        tracing::info!("wrote {} and report.html", json_path.display());
    }
    Ok(())
}

fn print_selection(s: &WeaponSelection) {
    println!(
        "  {:<28} {:?}  attacks={:.1}{}",
        s.weapon.name,
        s.class,
        s.attacks,
        if s.counted { "" } else { "  (alternate profile)" }
    );
}

fn print_eligible(e: &EligibleWeapons) {
    println!("Primary:");
    e.primary.iter().for_each(print_selection);
    if !e.pistols.is_empty() {
        println!("Pistols (not counted):");
        e.pistols.iter().for_each(print_selection);
    }
    if !e.extra_attacks.is_empty() {
        println!("Extra attacks:");
        e.extra_attacks.iter().for_each(print_selection);
    }
    for (group, profiles) in &e.profile_groups {
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        println!("Profile group {}: {}", group, names.join(" | "));
    }
    println!("Total attacks: {:.1}", e.total_attacks);
}

fn run_weapons(config: &EngineConfig, path: PathBuf) -> Result<(), String> {
    let scenario = load_scenario(&path, config).map_err(|e| e.to_string())?;
    let eligible = eligible_weapons(scenario.phase, &scenario.weapons, &scenario.context);
    println!("{} ({:?} phase)", scenario.unit.name, scenario.phase);
    print_eligible(&eligible);
    Ok(())
}

fn run_allocate(path: PathBuf, wounds: Option<i64>, damage: Option<i64>) -> Result<(), String> {
    let state = load_unit_state(&path).map_err(|e| e.to_string())?;
    let remaining = match (wounds, damage) {
        (Some(w), _) => w,
        (None, Some(d)) => state.total_wounds().saturating_sub(d),
        (None, None) => return Err("provide --wounds or --damage".to_string()),
    };
    let survivors = allocate(&state.into_request(remaining));
    tracing::info!("{} model(s) remain", survivors.len());
    let json = serde_json::to_string_pretty(&survivors).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn run_abilities(text: &str, name: Option<&str>) -> Result<(), String> {
    let modifiers = normalize(&[AbilityInput::Text(text.to_string())], name.unwrap_or(""));
    let json = serde_json::to_string_pretty(&modifiers).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}
