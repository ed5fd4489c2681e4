use std::{
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use anyhow::Result;
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;

use crate::exit;

lazy_static::lazy_static! {
    static ref DOTS_STYLE: ProgressStyle = ProgressStyle::with_template("{spinner} {msg} {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    static ref GREEN_TICK: StyledObject<&'static str> = style("✔").green();
    static ref RED_CROSS: StyledObject<&'static str> = style("✗").red();
}

/// Messages shown while an external command runs, and after it ends.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub ongoing: &'static str,
    pub failure: &'static str,
    pub success: &'static str,
}

pub fn progress(msg: &str) -> ProgressBar {
    let w = ProgressBar::new_spinner();
    w.set_style(DOTS_STYLE.clone());
    w.enable_steady_tick(Duration::from_millis(80));
    w.set_message(msg.to_owned());
    w
}

/// Runs `cmd` inside `dir`. Output is captured behind a spinner unless `verbose`.
pub async fn command(
    cmd: &str,
    args: &[&str],
    verbose: bool,
    stage: Stage,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    tracing::info!("{cmd} {args:?} in {}", dir.display());
    let mut command = Command::new(cmd);
    command.current_dir(dir).args(args);

    let mut pb = None;
    if !verbose {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        pb = Some(progress(stage.ongoing));
    }

    let start_time = Instant::now();
    let output = command.spawn()?.wait_with_output().await?;
    let dur = start_time.elapsed();
    if !output.status.success() {
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        exit!(captured, "{} {}", RED_CROSS.to_string(), stage.failure);
    }

    finish_progress(stage.success, &dir.display().to_string(), dur, pb);
    Ok(())
}

pub fn elapsed_time_str(dur: &Duration) -> String {
    let seconds = dur.as_secs() % 60;
    let minutes = (dur.as_secs() / 60) % 60;
    let hours = (dur.as_secs() / 60) / 60;
    format!("{:0>2}:{:0>2}:{:0>2}", hours, minutes, seconds)
}

pub fn finish_progress(
    status_message: &str,
    context: &str,
    dur: Duration,
    pb: Option<ProgressBar>,
) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!(
        "{} {} ({}) took, {}",
        GREEN_TICK.to_string(),
        status_message,
        context,
        elapsed_time_str(&dur)
    );
}

/// Prints a green tick next to `msg`, for steps that have no external command.
pub fn done(msg: &str) {
    println!("{} {}", GREEN_TICK.to_string(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(elapsed_time_str(&Duration::from_secs(0)), "00:00:00");
        assert_eq!(elapsed_time_str(&Duration::from_secs(3725)), "01:02:05");
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let stage = Stage {
            ongoing: "running",
            failure: "failed",
            success: "ok",
        };
        let result = command("false", &[], false, stage, std::env::temp_dir()).await;
        assert!(result.is_err());
    }
}
