use crate::cli::args::{N1SweepArgs, N2SweepArgs, SweepCommonArgs};
use crate::exit_codes::{
    BUILD_UNAVAILABLE, CONFIG_ERROR, GENERATION_FAILED, RENDER_FAILED, SUCCESS,
};
use anyhow::{Context, Result};
use isobench_core::{
    CacheKeyMode, Figure, GenerationParams, InstanceCache, SizeSweep, SolverArgs, StopPolicy,
    SweepAxis, SweepController, SweepError, SweepPlan, SweepReport, SystemRunner, Toolchain,
    ToolchainError, Variant,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_N1_FIGURE: &str = "runtime_vs_n1.png";
const DEFAULT_N2_FIGURE: &str = "approx_runtime_vs_n2.png";

pub fn cmd_n1_sweep(args: N1SweepArgs) -> Result<i32> {
    let sweep = match SizeSweep::new(args.n1_start, args.n1_end, args.n1_step) {
        Ok(s) => s,
        Err(e) => return Ok(config_error(e)),
    };
    let axis = SweepAxis::N1 { n2: args.n2 };
    run_sweep(axis, sweep, &args.common, DEFAULT_N1_FIGURE, |tc, c| {
        vec![
            Variant {
                name: "exact".into(),
                label: "Exact".into(),
                program: tc.bin(&tc.exact),
                args: SolverArgs::exact(c.k),
                policy: StopPolicy::StopOnFirstFailure,
            },
            approx_variant(tc, c),
        ]
    })
}

pub fn cmd_n2_sweep(args: N2SweepArgs) -> Result<i32> {
    let sweep = match SizeSweep::new(args.n2_start, args.n2_end, args.n2_step) {
        Ok(s) => s,
        Err(e) => return Ok(config_error(e)),
    };
    let axis = SweepAxis::N2 { n1: args.n1 };
    run_sweep(axis, sweep, &args.common, DEFAULT_N2_FIGURE, |tc, c| {
        vec![approx_variant(tc, c)]
    })
}

fn approx_variant(tc: &Toolchain, c: &SweepCommonArgs) -> Variant {
    Variant {
        name: "approx".into(),
        label: "Approximation".into(),
        program: tc.bin(&tc.approx),
        args: SolverArgs::approx(c.k, c.trials_multiplier),
        policy: StopPolicy::AlwaysRun,
    }
}

fn config_error(e: impl std::fmt::Display) -> i32 {
    eprintln!("Config error: {e}");
    CONFIG_ERROR
}

fn run_sweep(
    axis: SweepAxis,
    sweep: SizeSweep,
    common: &SweepCommonArgs,
    default_figure: &str,
    variants: impl FnOnce(&Toolchain, &SweepCommonArgs) -> Vec<Variant>,
) -> Result<i32> {
    if !common.timeout_seconds.is_finite() || common.timeout_seconds <= 0.0 {
        return Ok(config_error(format!(
            "--timeout-seconds must be > 0 (got {})",
            common.timeout_seconds
        )));
    }
    let timeout = match Duration::try_from_secs_f64(common.timeout_seconds) {
        Ok(t) => t,
        Err(e) => {
            return Ok(config_error(format!(
                "--timeout-seconds {} is out of range: {e}",
                common.timeout_seconds
            )))
        }
    };

    let report_to_stdout = common.report.as_deref() == Some(Path::new("-"));
    let log = |msg: &str| {
        if report_to_stdout {
            eprintln!("{msg}");
        } else {
            println!("{msg}");
        }
    };

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let paths = &common.paths;
    let project_root = absolutize(&cwd, &paths.project_root);
    let mut toolchain = Toolchain::new(&project_root);
    if let Some(bin_dir) = &paths.bin_dir {
        toolchain = toolchain.with_bin_dir(absolutize(&cwd, bin_dir));
    }
    toolchain.generator = paths.generator_bin.clone();
    toolchain.exact = paths.exact_bin.clone();
    toolchain.approx = paths.approx_bin.clone();

    let variants = variants(&toolchain, common);
    let mut required = vec![toolchain.generator.as_str()];
    required.extend(variants.iter().filter_map(|v| {
        v.program.file_name().and_then(|n| n.to_str())
    }));

    log(&format!("Project root: {}", project_root.display()));
    log(&format!(
        "Varying {} over {:?} with {}, k: {}",
        axis.name(),
        sweep.sizes(),
        fixed_label(axis),
        common.k
    ));

    if let Err(e) = toolchain.ensure_built(&SystemRunner, &required, !common.no_build) {
        eprintln!("Error: {e}");
        if let ToolchainError::BuildFailed { output, .. } = &e {
            eprintln!("{output}");
            eprintln!("Failed to build project. Please check the output above.");
        }
        return Ok(BUILD_UNAVAILABLE);
    }

    let cache_dir = paths
        .cache_dir
        .as_ref()
        .map(|d| absolutize(&cwd, d))
        .unwrap_or_else(|| project_root.join("examples").join("generated_benchmarks"));
    let plan = SweepPlan {
        axis,
        sweep,
        params: GenerationParams {
            density_g: common.density_g,
            density_h: common.density_h,
            seed: (!common.no_seed).then_some(common.seed),
            noise: true,
        },
        variants,
        timeout,
        generator: toolchain.bin(&toolchain.generator),
        workdir: project_root.clone(),
        cache: InstanceCache::new(cache_dir, CacheKeyMode::from(common.cache_key)),
    };

    debug!(
        cache = %plan.cache.dir().display(),
        timeout = ?plan.timeout,
        variants = plan.variants.len(),
        "sweep plan ready"
    );

    let table = match SweepController::new(&SystemRunner, &plan).run() {
        Ok(t) => t,
        Err(e @ (SweepError::GenerationFailed { .. } | SweepError::CacheDir { .. })) => {
            eprintln!("Error: {e}");
            if let Some(out) = e.diagnostics() {
                eprintln!("{out}");
            }
            return Ok(GENERATION_FAILED);
        }
        Err(e) => return Ok(config_error(e)),
    };

    log("");
    log("Summary (seconds):");
    let policies: Vec<StopPolicy> = plan.variants.iter().map(|v| v.policy).collect();
    for line in table.summary_lines(axis.name(), &policies) {
        log(&line);
    }

    if let Some(path) = &common.report {
        let json = SweepReport::new(&plan, &table).to_json()?;
        if report_to_stdout {
            println!("{json}");
        } else {
            let path = absolutize(&cwd, path);
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            log(&format!("Report written to: {}", path.display()));
        }
    }

    let output = common
        .output
        .as_ref()
        .map(|p| absolutize(&cwd, p))
        .unwrap_or_else(|| project_root.join(default_figure));
    let figure = Figure::for_sweep(axis, common.k, &plan.variants, &table, !common.no_log_scale);
    if let Err(e) = figure.render(&output) {
        eprintln!("Error: {e}");
        return Ok(RENDER_FAILED);
    }
    log(&format!("Saved figure to: {}", output.display()));
    Ok(SUCCESS)
}

fn fixed_label(axis: SweepAxis) -> String {
    match axis {
        SweepAxis::N1 { n2 } => format!("fixed n2 (|VH|): {n2}"),
        SweepAxis::N2 { n1 } => format!("fixed n1 (|VG|): {n1}"),
    }
}

fn absolutize(cwd: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}
