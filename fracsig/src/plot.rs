use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use alloc::{format, string::String, vec::Vec};

use crate::stats::argmax;

/// Errors raised by plot utilities.
#[derive(Debug)]
pub enum PlotError {
    /// Nothing to plot, or a non-positive sample rate.
    InvalidInput(crate::Error),
    /// Underlying process or filesystem I/O failure.
    Io(std::io::Error),
    /// Python subprocess stdin was unavailable.
    StdinUnavailable,
    /// Python subprocess exited unsuccessfully.
    PythonExitFailure(ExitStatus),
}

impl core::fmt::Display for PlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlotError::InvalidInput(err) => write!(f, "{err}"),
            PlotError::Io(err) => write!(f, "plot I/O failure: {err}"),
            PlotError::StdinUnavailable => {
                write!(f, "failed to open stdin for python plotting process")
            }
            PlotError::PythonExitFailure(status) => {
                write!(f, "python plotting script failed with status: {status}")
            }
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::InvalidInput(err) => Some(err),
            PlotError::Io(err) => Some(err),
            PlotError::StdinUnavailable | PlotError::PythonExitFailure(_) => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(value: std::io::Error) -> Self {
        PlotError::Io(value)
    }
}

/// Peak sample of each trace, `None` for traces that are empty or all NaN.
pub fn trace_peaks(traces: &[&[f64]]) -> Vec<Option<usize>> {
    traces
        .iter()
        .map(|trace| argmax::<_, f64>(trace.iter()))
        .collect()
}

fn waveform_script(traces: &[&[f64]], fs: f64, output_path: &Path) -> String {
    let peaks = trace_peaks(traces)
        .into_iter()
        .map(|p| p.map_or(-1, |i| i as isize))
        .collect::<Vec<_>>();
    let output_path_literal = output_path.to_string_lossy().replace('\\', "\\\\");
    format!(
        r#"
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import matplotlib.gridspec as gridspec

xs = {traces:?}
peaks = {peaks:?}
fs = {fs:?}
fig = plt.figure(figsize=(16, 12))
gs = gridspec.GridSpec(len(xs), 1)
for i, (x, peak) in enumerate(zip(xs, peaks)):
    ax = plt.subplot(gs[i, 0])
    t = [k / fs for k in range(len(x))]
    ax.plot(t, x, color="C0", label=f"Max Index: {{peak}}")
    if peak >= 0:
        ax.axvline(x=t[peak], color="red")
    ax.set_yticks([])
    ax.legend(loc="upper right")
ax.set_xlabel("Time (s)")
fig.tight_layout()
fig.subplots_adjust(wspace=0.0, hspace=0.0)
fig.savefig(r"{output_path_literal}", dpi=300, bbox_inches="tight")
plt.close(fig)
"#
    )
}

/// Stack each trace in its own subplot against time `i / fs`, with a vertical
/// marker and legend entry at the trace's peak sample, and save the figure.
///
/// Rendering is done by a non-interactive matplotlib subprocess; `python` must
/// be on the `PATH`. Returns the output path when plotting succeeds.
pub fn waveform_plot_to_path<P: AsRef<Path>>(
    traces: &[&[f64]],
    fs: f64,
    output_path: P,
) -> Result<PathBuf, PlotError> {
    if traces.is_empty() {
        return Err(PlotError::InvalidInput(crate::Error::invalid_input(
            "traces",
            "nothing to plot",
        )));
    }
    if !fs.is_finite() || fs <= 0.0 {
        return Err(PlotError::InvalidInput(crate::Error::invalid_input(
            "fs",
            "must be finite and > 0",
        )));
    }
    let output_path = output_path.as_ref().to_path_buf();
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let script = waveform_script(traces, fs, &output_path);
    tracing::debug!(
        traces = traces.len(),
        path = %output_path.display(),
        "rendering waveform plot"
    );
    let mut python = std::process::Command::new("python")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null()) // noisy
        .stderr(std::process::Stdio::null()) // noisy
        .spawn()?;

    if let Some(mut stdin) = python.stdin.take() {
        stdin.write_all(script.as_bytes())?;
    } else {
        return Err(PlotError::StdinUnavailable);
    }

    let status = python.wait()?;
    if !status.success() {
        return Err(PlotError::PythonExitFailure(status));
    }
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_mark_first_maximum_per_trace() {
        let a = [0.0, 2.0, 1.0, 2.0];
        let b: [f64; 0] = [];
        let c = [f64::NAN, -1.0];
        assert_eq!(trace_peaks(&[&a, &b, &c]), alloc::vec![Some(1), None, Some(1)]);
    }

    #[test]
    fn script_embeds_traces_peaks_and_rate() {
        let a = [0.0, 3.0, 1.0];
        let script = waveform_script(&[&a], 100000.0, Path::new("out/plot.pdf"));
        assert!(script.contains("xs = [[0.0, 3.0, 1.0]]"));
        assert!(script.contains("peaks = [1]"));
        assert!(script.contains("fs = 100000.0"));
        assert!(script.contains(r#"fig.savefig(r"out/plot.pdf""#));
    }

    #[test]
    fn invalid_arguments_fail_before_spawning() {
        let a = [1.0, 2.0];
        assert!(matches!(
            waveform_plot_to_path(&[], 1000.0, "target/never.png"),
            Err(PlotError::InvalidInput(_))
        ));
        assert!(matches!(
            waveform_plot_to_path(&[&a], 0.0, "target/never.png"),
            Err(PlotError::InvalidInput(_))
        ));
    }
}
