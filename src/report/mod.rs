//! JSON and HTML report generation.

use crate::advisory::{Advisory, AdvisorySeverity};
use crate::calculator::VolleyResult;
use crate::error::EngineResult;
use crate::model::{DefenderProfile, Modifiers, Phase};
use crate::scenario::Scenario;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One calculation as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationReport {
    pub generated_at: DateTime<Utc>,
    pub unit: String,
    pub phase: Phase,
    pub defender: DefenderProfile,
    pub modifiers: Modifiers,
    pub volley: VolleyResult,
    pub advisories: Vec<Advisory>,
}

impl CalculationReport {
    pub fn new(scenario: &Scenario, volley: VolleyResult, advisories: Vec<Advisory>) -> Self {
        Self {
            generated_at: Utc::now(),
            unit: scenario.unit.name.clone(),
            phase: scenario.phase,
            defender: scenario.defender.clone(),
            modifiers: scenario.modifiers.clone(),
            volley,
            advisories,
        }
    }
}

pub fn write_json_report(report: &CalculationReport, path: &Path) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// Writes `report.html` into `out_dir`. Kill rows below `epsilon` are omitted.
pub fn write_html_report(report: &CalculationReport, out_dir: &Path, epsilon: f64) -> EngineResult<()> {
    fs::create_dir_all(out_dir)?;
    fs::write(out_dir.join("report.html"), render_report(report, epsilon))?;
    Ok(())
}

fn render_report(r: &CalculationReport, epsilon: f64) -> String {
    let weapon_rows: String = r
        .volley
        .per_weapon
        .iter()
        .map(|w| {
            let d = &w.result;
            format!(
                "<tr><td>{}</td><td>{:.1}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                html_escape(&w.weapon),
                d.attacks,
                d.expected_hits,
                d.expected_wounds,
                d.expected_unsaved,
                d.expected_mortal,
                d.expected_damage,
                d.expected_models_killed
            )
        })
        .collect();
    let total = &r.volley.total;
    let kill_rows: String = total
        .kill_probabilities
        .iter()
        .enumerate()
        .filter(|(_, p)| **p >= epsilon)
        .map(|(n, p)| format!("<tr><td>{}</td><td>{:.1}%</td></tr>", n, p * 100.0))
        .collect();
    let advisory_list: String = r
        .advisories
        .iter()
        .map(|a| {
            let sev = match a.severity {
                AdvisorySeverity::Info => "info",
                AdvisorySeverity::Warn => "warn",
            };
            format!(
                r#"<li class="{}"><strong>{}:</strong> {} <br><em>{}</em></li>"#,
                sev,
                html_escape(&a.code),
                html_escape(&a.summary),
                html_escape(&a.technical)
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{} - Mathhammer</title>
<style>body{{font-family:system-ui,sans-serif;margin:1rem;}} table{{border-collapse:collapse;margin-bottom:1rem;}} th,td{{border:1px solid #ccc;padding:6px;}} .info{{color:#666;}} .warn{{color:#c60;}}</style>
</head>
<body>
<h1>{}</h1>
<p>{:?} phase vs T{} Sv{}+{} ({} models, {}W each). Generated {}.</p>
<h2>Per weapon</h2>
<table><thead><tr><th>Weapon</th><th>Attacks</th><th>Hits</th><th>Wounds</th><th>Unsaved</th><th>Mortal</th><th>Damage</th><th>Models killed</th></tr></thead><tbody>{}</tbody></table>
<h2>Total</h2>
<p>Expected damage {:.2}, expected models killed {:.2}, P(at least one) {:.1}%.</p>
<table><thead><tr><th>Models killed</th><th>Probability</th></tr></thead><tbody>{}</tbody></table>
<h2>Advisories</h2>
<ul>{}</ul>
</body>
</html>"#,
        html_escape(&r.unit),
        html_escape(&r.unit),
        r.phase,
        r.defender.toughness,
        r.defender.save,
        r.defender
            .invuln
            .map(|i| format!(" / {}++", i))
            .unwrap_or_default(),
        r.defender.model_count,
        r.defender.wounds(),
        r.generated_at.to_rfc3339(),
        weapon_rows,
        total.expected_damage,
        total.expected_models_killed,
        total.prob_at_least_one * 100.0,
        kill_rows,
        if advisory_list.is_empty() {
            "<li>None</li>".to_string()
        } else {
            advisory_list
        }
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate_volley;
    use crate::config::EngineConfig;
    use crate::eligibility::eligible_weapons;
    use crate::scenario::parse_scenario;

    const SCENARIO: &str = r#"{
        "unit": { "name": "Hellblasters <Vet>", "model_count": 5 },
        "weapons": [ { "name": "Plasma incinerator", "range": "24\"", "attacks": 2,
                       "skill": 3, "strength": 7, "ap": -2, "damage": 1,
                       "abilities": ["Rapid Fire 1", "Hazardous"] } ],
        "defender": { "toughness": 4, "save": 3, "wounds_per_model": 2, "model_count": 5 }
    }"#;

    fn report() -> CalculationReport {
        let cfg = EngineConfig::default();
        let s = parse_scenario(SCENARIO, &cfg).unwrap();
        let eligible = eligible_weapons(s.phase, &s.weapons, &s.context);
        let volley = calculate_volley(&eligible, &s.defender, &s.modifiers, &cfg);
        let advisories = crate::advisory::collect(&s.weapons, &s.defender, &s.modifiers);
        CalculationReport::new(&s, volley, advisories)
    }

    #[test]
    fn html_report_sanity() {
        let dir = tempfile::tempdir().unwrap();
        let r = report();
        write_html_report(&r, dir.path(), 1e-9).unwrap();
        let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
        assert!(html.contains("Hellblasters &lt;Vet&gt;"));
        assert!(html.contains("Plasma incinerator"));
        assert!(html.contains("UNRECOGNIZED_ABILITY"));
    }

    #[test]
    fn json_report_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let r = report();
        write_json_report(&r, &path).unwrap();
        let back: CalculationReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.unit, r.unit);
        assert_eq!(back.volley.per_weapon.len(), 1);
        assert_eq!(back.advisories.len(), 1);
    }
}
