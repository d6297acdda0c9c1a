use anyhow::{anyhow, bail, Context, Result};
use fracsig::convert::{voltage_to_strain, BridgeConfig};
use fracsig::kernel::KernelLifecycle;
use fracsig::plot::waveform_plot_to_path;
use fracsig::signal::correlate::{cross_correlate_full, CrossCorrelateConfig, CrossCorrelateKernel};
use fracsig::signal::deconvolve::{
    deconvolve, DeconvolveConfig, DeconvolveKernel, Stabilization,
};
use fracsig::signal::detrend::{detrend, DetrendConfig, DetrendKernel, DetrendType};
use fracsig::signal::filter::{
    butter_filtfilt, ButterConfig, ButterKernel, FilterBandType, SosFiltFiltConfig,
    SosFiltFiltKernel,
};
use fracsig::signal::traits::{CrossCorrelate1D, Deconvolve1D, Detrend1D, IirDesign, SosFiltFilt1D};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const DEFAULT_PYTHON_BIN: &str = "python";

/// Sample rate of the synthetic gauge records.
const FS: f64 = 100_000.0;

const PY_REFERENCE_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np
import scipy
import scipy.signal

env = json.loads(sys.stdin.read())
op = env["op"]
iters = int(env["iters"])
p = env["payload"]

def _arr(key):
    return np.asarray(p[key], dtype=float)

def _deconvolve(num, den, policy, level, ratio):
    n = max(len(num), len(den))
    Num = np.fft.fft(num, n)
    Den = np.fft.fft(den, n)
    if policy == "water_level":
        mag = np.abs(Den)
        threshold = max(level * mag.max(), 0.0)
        low = mag < threshold
        Den = Den.copy()
        nz = low & (mag > 0)
        Den[nz] = Den[nz] / mag[nz] * threshold
        Den[low & (mag == 0)] = threshold
        with np.errstate(divide="ignore", invalid="ignore"):
            Q = np.where(Den == 0, 0, Num / Den)
    else:
        damp = np.mean(np.abs(Den) ** 2) * ratio
        denom = np.abs(Den) ** 2 + damp
        with np.errstate(divide="ignore", invalid="ignore"):
            Q = np.where(denom == 0, 0, Num * np.conj(Den) / denom)
    raw = np.fft.ifft(Q)
    return np.real(np.roll(raw, -(n // 2)))

def _prep(x):
    x = x - x.mean()
    x = scipy.signal.detrend(x, type="linear")
    return x - x.mean()

def _compute():
    if op == "deconvolve":
        return _deconvolve(_arr("num"), _arr("den"), p["policy"], float(p["level"]), float(p["ratio"]))
    if op == "cross_correlate_full":
        return np.correlate(_prep(_arr("a")), _prep(_arr("b")), mode="full")
    if op == "detrend":
        return scipy.signal.detrend(_arr("x"), type=p["type"])
    if op == "butter_filtfilt":
        sos = scipy.signal.butter(int(p["order"]), float(p["cutoff"]), btype=p["btype"], fs=float(p["fs"]), output="sos")
        return scipy.signal.sosfiltfilt(sos, _arr("x"))
    if op == "voltage_to_strain":
        return _arr("v") / float(p["vex"]) / float(p["gain"]) * 2 / float(p["gf"])
    raise ValueError(f"unknown op {op}")

y = _compute()
t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": np.asarray(y, dtype=float).reshape(-1).tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
    "scipy_version": scipy.__version__,
}))
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    output: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
    scipy_version: Option<String>,
}

/// Agreement between the Rust output and the numpy/scipy reference for one
/// case.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    samples: usize,
    pearson_r: f64,
    rmse: f64,
    max_abs: f64,
    tolerance: f64,
    passed: bool,
    rust_kernel_ns: f64,
    rust_oneshot_ns: f64,
    python_ns: f64,
    speedup_vs_python: f64,
    plot: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    scipy_version: String,
    rows: Vec<ContractRow>,
}

/// One comparison: the reused-kernel output and timings against a Python
/// reference evaluation.
struct Case<'a> {
    id: &'a str,
    candidate: Vec<f64>,
    reference: PythonEval,
    kernel_ns: f64,
    oneshot_ns: f64,
    /// Allowed max absolute error, relative to the reference's peak magnitude.
    tolerance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            eprintln!();
            eprintln!("Compares fracsig against numpy/scipy references. Needs `python` with");
            eprintln!("numpy, scipy and matplotlib. Set RUST_LOG=fracsig=debug for kernel logs.");
            Ok(())
        }
    }
}

/// Synthetic excitation: a short half-sine force pulse, as from a projectile
/// impact, followed by silence.
fn excitation(len: usize) -> Vec<f64> {
    let width = 40;
    (0..len)
        .map(|i| {
            if i < width {
                (std::f64::consts::PI * i as f64 / width as f64).sin()
            } else {
                0.0
            }
        })
        .collect()
}

/// Response of a damped resonator driven by `input`, plus a slow drift.
fn gauge_response(input: &[f64], delay: usize) -> Vec<f64> {
    let ring: Vec<f64> = (0..input.len())
        .map(|i| {
            let t = i as f64 / FS;
            (-t * 4_000.0).exp() * (2.0 * std::f64::consts::PI * 9_000.0 * t).sin()
        })
        .collect();
    (0..input.len())
        .map(|n| {
            let forced: f64 = (0..=n.saturating_sub(delay))
                .filter(|k| n >= delay + k)
                .map(|k| ring[k] * input[n - delay - k])
                .sum();
            forced + 2e-4 * n as f64
        })
        .collect()
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    let plots_dir = out_dir.join("plots");
    fs::create_dir_all(&plots_dir).context("creating contract output directories")?;

    let python_bin = detect_python_bin();
    let mut rows = Vec::new();

    let reference = excitation(1024);
    let response = gauge_response(&reference, 96);

    // Deconvolution, both policies
    for (policy, stabilization) in [
        ("water_level", Stabilization::WaterLevel { level: 0.05 }),
        ("damp", Stabilization::Damped { ratio: 0.05 }),
    ] {
        let kernel = DeconvolveKernel::try_new(DeconvolveConfig {
            nfft: None,
            stabilization,
        })?;
        let candidate = kernel
            .run_alloc(response.as_slice(), reference.as_slice())
            .map_err(|e| anyhow!("deconvolve candidate execution failed: {e}"))?;
        let (level, ratio) = match stabilization {
            Stabilization::WaterLevel { level } => (level, 0.0),
            Stabilization::Damped { ratio } => (0.0, ratio),
        };
        let py = python_eval(
            &python_bin,
            "deconvolve",
            json!({ "num": response, "den": reference, "policy": policy, "level": level, "ratio": ratio }),
            200,
        )?;
        let kernel_ns = benchmark_avg_ns(200, || {
            kernel
                .run_alloc(response.as_slice(), reference.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("deconvolve benchmark failed: {e}"))
        })?;
        let oneshot_ns = benchmark_avg_ns(200, || {
            deconvolve(&response, &reference, stabilization)
                .map(|_| ())
                .map_err(|e| anyhow!("deconvolve benchmark failed: {e}"))
        })?;
        rows.push(record_case(
            &plots_dir,
            Case {
                id: &format!("deconvolve_{policy}"),
                candidate,
                reference: py,
                kernel_ns,
                oneshot_ns,
                tolerance: 1e-9,
            },
        )?);
    }

    // Detrended full cross-correlation of two gauges
    {
        let a = gauge_response(&reference, 180);
        let b = gauge_response(&reference, 96);
        let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default())?;
        let candidate = kernel
            .run_alloc(a.as_slice(), b.as_slice())
            .map_err(|e| anyhow!("cross-correlation candidate execution failed: {e}"))?;
        let py = python_eval(&python_bin, "cross_correlate_full", json!({ "a": a, "b": b }), 100)?;
        let kernel_ns = benchmark_avg_ns(100, || {
            kernel
                .run_alloc(a.as_slice(), b.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("cross-correlation benchmark failed: {e}"))
        })?;
        let oneshot_ns = benchmark_avg_ns(100, || {
            cross_correlate_full(&a, &b)
                .map(|_| ())
                .map_err(|e| anyhow!("cross-correlation benchmark failed: {e}"))
        })?;
        rows.push(record_case(
            &plots_dir,
            Case {
                id: "cross_correlate_full",
                candidate,
                reference: py,
                kernel_ns,
                oneshot_ns,
                tolerance: 1e-9,
            },
        )?);
    }

    // Linear detrend
    {
        let kernel = DetrendKernel::try_new(DetrendConfig {
            kind: DetrendType::Linear,
        })?;
        let candidate = kernel
            .run_alloc(response.as_slice())
            .map_err(|e| anyhow!("detrend candidate execution failed: {e}"))?;
        let py = python_eval(&python_bin, "detrend", json!({ "x": response, "type": "linear" }), 200)?;
        let kernel_ns = benchmark_avg_ns(200, || {
            kernel
                .run_alloc(response.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("detrend benchmark failed: {e}"))
        })?;
        let oneshot_ns = benchmark_avg_ns(200, || {
            detrend(&response, DetrendType::Linear)
                .map(|_| ())
                .map_err(|e| anyhow!("detrend benchmark failed: {e}"))
        })?;
        rows.push(record_case(
            &plots_dir,
            Case {
                id: "detrend_linear",
                candidate,
                reference: py,
                kernel_ns,
                oneshot_ns,
                tolerance: 1e-12,
            },
        )?);
    }

    // Butterworth zero-phase preprocessing
    for (order, btype, label) in [
        (4, FilterBandType::Lowpass, "low"),
        (3, FilterBandType::Highpass, "high"),
    ] {
        let config = ButterConfig {
            order,
            cutoff_hz: 15_000.0,
            fs: FS,
            btype,
        };
        let sos = ButterKernel::try_new(config)?
            .run_alloc()
            .map_err(|e| anyhow!("butter design failed: {e}"))?;
        let kernel = SosFiltFiltKernel::try_new(SosFiltFiltConfig { sos })?;
        let candidate = kernel
            .run_alloc(response.as_slice())
            .map_err(|e| anyhow!("sosfiltfilt candidate execution failed: {e}"))?;
        let py = python_eval(
            &python_bin,
            "butter_filtfilt",
            json!({ "x": response, "order": order, "cutoff": config.cutoff_hz, "fs": FS, "btype": label }),
            200,
        )?;
        let kernel_ns = benchmark_avg_ns(200, || {
            kernel
                .run_alloc(response.as_slice())
                .map(|_| ())
                .map_err(|e| anyhow!("sosfiltfilt benchmark failed: {e}"))
        })?;
        let oneshot_ns = benchmark_avg_ns(200, || {
            butter_filtfilt(&response, config)
                .map(|_| ())
                .map_err(|e| anyhow!("butter_filtfilt benchmark failed: {e}"))
        })?;
        rows.push(record_case(
            &plots_dir,
            Case {
                id: &format!("butter_filtfilt_{label}pass_{order}"),
                candidate,
                reference: py,
                kernel_ns,
                oneshot_ns,
                tolerance: 1e-8,
            },
        )?);
    }

    // Bridge voltage to strain
    {
        let bridge = BridgeConfig::default();
        let volts: Vec<f64> = response.iter().map(|v| v * 1e-2).collect();
        let candidate = voltage_to_strain(&volts, &bridge)?;
        let py = python_eval(
            &python_bin,
            "voltage_to_strain",
            json!({ "v": volts, "vex": bridge.excitation_voltage, "gain": bridge.gain, "gf": bridge.gauge_factor }),
            200,
        )?;
        let oneshot_ns = benchmark_avg_ns(200, || {
            voltage_to_strain(&volts, &bridge)
                .map(|_| ())
                .map_err(|e| anyhow!("voltage_to_strain benchmark failed: {e}"))
        })?;
        rows.push(record_case(
            &plots_dir,
            Case {
                id: "voltage_to_strain",
                candidate,
                reference: py,
                kernel_ns: oneshot_ns,
                oneshot_ns,
                tolerance: 1e-12,
            },
        )?);
    }

    let versions = python_eval(&python_bin, "voltage_to_strain", json!({ "v": [0.0], "vex": 1.0, "gain": 1.0, "gf": 1.0 }), 0)?;
    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version: versions.python_version,
        numpy_version: versions.numpy_version,
        scipy_version: versions
            .scipy_version
            .unwrap_or_else(|| "unknown".to_string()),
        rows,
    };

    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;
    fs::write(
        out_dir.join("summary.json"),
        serde_json::to_vec_pretty(&bundle).context("serializing summary bundle")?,
    )
    .context("writing summary.json")?;

    println!("Contract artifacts generated in: {}", out_dir.display());
    println!("  - {}", out_dir.join("summary.csv").display());
    println!("  - {}", out_dir.join("summary.json").display());
    println!("  - {}", plots_dir.display());

    let failed = bundle
        .rows
        .iter()
        .filter(|row| !row.passed)
        .map(|row| row.case_id.as_str())
        .collect::<Vec<_>>();
    if !failed.is_empty() {
        bail!("{} of {} cases exceeded tolerance: {}", failed.len(), bundle.rows.len(), failed.join(", "));
    }
    println!("  - cases: {} (all within tolerance)", bundle.rows.len());
    Ok(())
}

fn detect_python_bin() -> PathBuf {
    std::env::var_os("PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN))
}

fn python_eval(
    python_bin: &Path,
    op: &str,
    payload: serde_json::Value,
    iters: usize,
) -> Result<PythonEval> {
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(PY_REFERENCE_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let env = json!({ "op": op, "iters": iters, "payload": payload });
        let env_bytes = serde_json::to_vec(&env).context("serializing python payload")?;
        stdin
            .write_all(&env_bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("python reference `{op}` failed: {stderr}");
    }
    let stdout = String::from_utf8(output.stdout).context("parsing python stdout utf8")?;
    serde_json::from_str(stdout.trim()).context("parsing python json")
}

fn record_case(plots_dir: &Path, case: Case<'_>) -> Result<ContractRow> {
    let reference = &case.reference.output;
    if case.candidate.len() != reference.len() {
        bail!(
            "case {} has mismatched output lengths: rust={}, python={}",
            case.id,
            case.candidate.len(),
            reference.len()
        );
    }

    let agreement = Agreement::between(&case.candidate, reference);
    let scale = reference.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-300);
    let passed = agreement.max_abs <= case.tolerance * scale;
    if passed {
        tracing::info!(case = case.id, max_abs = agreement.max_abs, "within tolerance");
    } else {
        tracing::error!(
            case = case.id,
            max_abs = agreement.max_abs,
            allowed = case.tolerance * scale,
            "exceeded tolerance"
        );
    }

    let residual = case
        .candidate
        .iter()
        .zip(reference.iter())
        .map(|(r, p)| r - p)
        .collect::<Vec<_>>();
    let plot_path = plots_dir.join(format!("{}.png", case.id));
    let plot = match waveform_plot_to_path(
        &[case.candidate.as_slice(), reference.as_slice(), residual.as_slice()],
        FS,
        &plot_path,
    ) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(err) => {
            tracing::warn!(case = case.id, error = %err, "skipping contract plot");
            String::new()
        }
    };

    Ok(ContractRow {
        case_id: case.id.to_string(),
        samples: reference.len(),
        pearson_r: agreement.pearson_r,
        rmse: agreement.rmse,
        max_abs: agreement.max_abs,
        tolerance: case.tolerance,
        passed,
        rust_kernel_ns: case.kernel_ns,
        rust_oneshot_ns: case.oneshot_ns,
        python_ns: case.reference.avg_ns,
        speedup_vs_python: case.reference.avg_ns / case.kernel_ns,
        plot,
    })
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters.max(1) as f64)
}

struct Agreement {
    pearson_r: f64,
    rmse: f64,
    max_abs: f64,
}

impl Agreement {
    fn between(rust: &[f64], python: &[f64]) -> Self {
        let n = rust.len().max(1) as f64;
        let mean_r = rust.iter().sum::<f64>() / n;
        let mean_p = python.iter().sum::<f64>() / n;
        let (mut cov, mut var_r, mut var_p, mut sq, mut max_abs) =
            (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for (r, p) in rust.iter().zip(python.iter()) {
            let (dr, dp) = (r - mean_r, p - mean_p);
            cov += dr * dp;
            var_r += dr * dr;
            var_p += dp * dp;
            sq += (r - p) * (r - p);
            max_abs = max_abs.max((r - p).abs());
        }
        let pearson_r = if var_r == 0.0 || var_p == 0.0 {
            if rust == python {
                1.0
            } else {
                0.0
            }
        } else {
            cov / (var_r.sqrt() * var_p.sqrt())
        };
        Agreement {
            pearson_r,
            rmse: (sq / n).sqrt(),
            max_abs,
        }
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::from(
        "case_id,samples,pearson_r,rmse,max_abs,tolerance,passed,rust_kernel_ns,rust_oneshot_ns,python_ns,speedup_vs_python,plot\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{},{},{:.12},{:.6e},{:.6e},{:.1e},{},{:.3},{:.3},{:.3},{:.3},{}\n",
            row.case_id,
            row.samples,
            row.pearson_r,
            row.rmse,
            row.max_abs,
            row.tolerance,
            row.passed,
            row.rust_kernel_ns,
            row.rust_oneshot_ns,
            row.python_ns,
            row.speedup_vs_python,
            row.plot
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
