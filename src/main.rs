// src/main.rs
//
// Thin CLI driver around the level-set evolution engine.
//
// Outputs are written to `runs/` (or the directory given via `out=`) and are
// not committed to version control.
//
// Examples:
//
//   cargo run --release -- shape=square n=128 filter=2 normal=5 conductance=0.5 trigger=0.1
//       -> square step seed (65x65 block in a 128x128 grid), two outer iterations.
//
//   RUST_LOG=debug cargo run --release -- shape=disk dim=3 n=48 noise=0.2 filter=20 par=on
//       -> noisy 3D sphere, parallel passes, per-iteration logging.
//
// Typical outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── midrow_slice.csv     (phi before/after along the middle row)
//     └── <name>.json          (result as a persisted volume)

use std::env;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use aniso_levelset::config::{GeometryConfig, NumericsConfig, RunConfig, RunInfo, SeedConfig};
use aniso_levelset::evolution::LevelSetEvolution;
use aniso_levelset::grid::Grid;
use aniso_levelset::initial_states::{add_noise, centered_square_step, sphere_distance};
use aniso_levelset::meta::ImageConverter;
use aniso_levelset::normal_diffusion::normal_time_step;
use aniso_levelset::params::{EvolutionParams, NormalProcessType};
use aniso_levelset::scalar_field::ScalarField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Square,
    Disk,
}

impl Shape {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "square" | "box" => Some(Self::Square),
            "disk" | "sphere" | "circle" => Some(Self::Disk),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Disk => "disk",
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [shape=square|disk] [n=N] [dim=2|3] [noise=VAL]
             [filter=N] [normal=N] [conductance=VAL] [trigger=VAL]
             [process=aniso|iso] [params=FILE.json] [par=on|off]
             [name=NAME] [separate=on|off] [out=DIR] [run=RUN_ID]

Notes:
  - filter/normal/conductance/trigger map to MaxFilterIteration, MaxNormalIteration,
    NormalProcessConductance and RMSChangeNormalProcessTrigger.
  - params=FILE.json loads a parameter block first; explicit keys override it.
  - Set RUST_LOG=debug for per-iteration output.
"#
    );
}

fn parse_on_off(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("on") || v == "1" || v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v.eq_ignore_ascii_case("off") || v == "0" || v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(shape: Shape, n: usize, dim: usize) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    let ts = format!("{}{:03}", now.as_secs(), now.subsec_millis());
    format!("{}_{}_{}d_n{}", ts, shape.as_str(), dim, n)
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

/// φ before/after along the row through the grid centre (axis 0 varies).
fn write_midrow_slice(
    before: &ScalarField,
    after: &ScalarField,
    filename: &Path,
) -> std::io::Result<()> {
    let grid = &before.grid;
    let mut f = BufWriter::new(File::create(filename)?);

    let mut index: Vec<usize> = grid.size().iter().map(|&n| n / 2).collect();
    let h = grid.spacing()[0];

    writeln!(f, "x,phi0,phi")?;
    for i in 0..grid.row_len() {
        index[0] = i;
        let x = i as f64 * h;
        writeln!(
            f,
            "{:.6e},{:.6e},{:.6e}",
            x,
            before.get(&index),
            after.get(&index)
        )?;
    }
    f.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = env::args().collect();

    let mut shape = Shape::Square;
    let mut n: usize = 128;
    let mut dim: usize = 2;
    let mut noise: f64 = 0.0;

    let mut params_file: Option<String> = None;
    let mut filter_override: Option<i64> = None;
    let mut normal_override: Option<i64> = None;
    let mut conductance_override: Option<f64> = None;
    let mut trigger_override: Option<f64> = None;
    let mut process_override: Option<NormalProcessType> = None;
    let mut par_override: Option<bool> = None;

    let mut name = String::from("phi");
    let mut separate = false;
    let mut out_root_override: Option<String> = None;
    let mut run_id_override: Option<String> = None;

    for arg in argv.iter().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }

        if let Some(v) = arg.strip_prefix("shape=") {
            shape = Shape::from_str(v).unwrap_or_else(|| {
                warn!("unknown shape '{v}', using square");
                Shape::Square
            });
            continue;
        }
        if let Some(v) = arg.strip_prefix("n=") {
            n = v.parse::<usize>().unwrap_or(n);
            continue;
        }
        if let Some(v) = arg.strip_prefix("dim=") {
            dim = v.parse::<usize>().unwrap_or(dim);
            continue;
        }
        if let Some(v) = arg.strip_prefix("noise=") {
            noise = v.parse::<f64>().unwrap_or(noise);
            continue;
        }

        if let Some(v) = arg.strip_prefix("params=") {
            params_file = Some(v.to_string());
            continue;
        }
        if let Some(v) = arg.strip_prefix("filter=") {
            filter_override = v.parse::<i64>().ok();
            continue;
        }
        if let Some(v) = arg.strip_prefix("normal=") {
            normal_override = v.parse::<i64>().ok();
            continue;
        }
        if let Some(v) = arg.strip_prefix("conductance=") {
            conductance_override = v.parse::<f64>().ok();
            continue;
        }
        if let Some(v) = arg.strip_prefix("trigger=") {
            trigger_override = v.parse::<f64>().ok();
            continue;
        }
        if let Some(v) = arg.strip_prefix("process=") {
            process_override = NormalProcessType::from_arg(v);
            if process_override.is_none() {
                warn!("could not parse process '{v}', expected aniso/iso");
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("par=") {
            par_override = parse_on_off(v);
            continue;
        }

        if let Some(v) = arg.strip_prefix("name=") {
            name = v.to_string();
            continue;
        }
        if let Some(v) = arg.strip_prefix("separate=") {
            separate = parse_on_off(v).unwrap_or(false);
            continue;
        }
        if let Some(v) = arg.strip_prefix("out=") {
            out_root_override = Some(v.to_string());
            continue;
        }
        if let Some(v) = arg.strip_prefix("run=") {
            run_id_override = Some(v.to_string());
            continue;
        }

        warn!("ignoring unknown argument '{arg}'");
    }

    // -------- parameters --------
    let mut params = match &params_file {
        Some(p) => EvolutionParams::from_json_str(&std::fs::read_to_string(p)?)?,
        None => EvolutionParams::default(),
    };
    if let Some(t) = process_override {
        params.normal_process_type = t;
    }
    if let Some(on) = par_override {
        params.parallel = on;
    }

    let mut evolution = LevelSetEvolution::with_params(params)?;
    evolution.configure(
        filter_override.unwrap_or(evolution.max_filter_iteration() as i64),
        normal_override.unwrap_or(evolution.max_normal_iteration() as i64),
        conductance_override.unwrap_or(evolution.normal_process_conductance()),
        trigger_override.unwrap_or(evolution.rms_change_normal_process_trigger()),
    )?;

    // -------- seed --------
    let mut phi0 = match shape {
        Shape::Square => centered_square_step(n, dim),
        Shape::Disk => {
            let c = 0.5 * (n as f64 - 1.0);
            sphere_distance(Grid::unit(&vec![n; dim]), &vec![c; dim], 0.25 * n as f64)
        }
    };
    if noise > 0.0 {
        add_noise(&mut phi0, noise, 1);
    }

    // -------- output directory setup --------
    let out_root = out_root_override.unwrap_or_else(|| "runs".to_string());
    create_dir_all(&out_root)?;

    let run_id = sanitize_run_id(
        &run_id_override.unwrap_or_else(|| default_run_id(shape, n, dim)),
    );
    let run_dir = unique_run_dir(&out_root, &run_id);
    create_dir_all(&run_dir)?;

    info!(
        "--- aniso-levelset run: {} {}d n={} filter={} normal={} K={} trigger={} ---",
        shape.as_str(),
        dim,
        n,
        evolution.max_filter_iteration(),
        evolution.max_normal_iteration(),
        evolution.normal_process_conductance(),
        evolution.rms_change_normal_process_trigger()
    );

    let (phi, report) = evolution.run_with_report(phi0.clone())?;

    // -------- outputs --------
    let run_config = RunConfig {
        geometry: GeometryConfig::from_grid(&phi.grid),
        seed: SeedConfig {
            shape: shape.as_str().to_string(),
            noise,
        },
        evolution: evolution.params().clone(),
        numerics: NumericsConfig {
            normal_dt: normal_time_step(&phi.grid),
            propagation_dt: report.propagation_reports.iter().map(|r| r.dt).collect(),
            normal_iterations: report.normal_reports.iter().map(|r| r.iterations).collect(),
        },
        run: RunInfo {
            binary: "aniso-levelset".to_string(),
            run_id: run_id.clone(),
            git_commit: None,
            timestamp_utc: None,
        },
    };
    run_config.write_to_dir(&run_dir)?;

    write_midrow_slice(&phi0, &phi, &run_dir.join("midrow_slice.csv"))?;

    let converter = ImageConverter::image().with_separate_file(separate);
    let export = converter.to_volume(&phi, 0, None, &name);
    if let Some(w) = &export.warning {
        warn!("{w}");
    }
    let file_stem = if name.is_empty() { "phi" } else { name.as_str() };
    aniso_levelset::meta::PersistedObject::Volume(export.volume)
        .save_json(&run_dir.join(format!("{}.json", file_stem)))?;

    info!(
        "wrote {} ({} outer steps, {} inner normal iterations)",
        run_dir.display(),
        report.outer_iterations,
        report.total_normal_iterations()
    );
    Ok(())
}
