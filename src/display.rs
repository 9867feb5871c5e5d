//! Text rendering of usage windows: progress bars and reset countdowns.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use crossterm::style::{style, Color, Stylize};

use crate::codex::{plan_limits_for, PlanLimits, Usage, UsageWindow};

/// Number of cells in a progress bar.
pub const PROGRESS_BAR_WIDTH: usize = 20;
pub const FILLED_CHAR: char = '█';
pub const EMPTY_CHAR: char = '░';

const RULE_WIDTH: usize = 60;

/// Whether ANSI colour is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorConfig {
    pub enabled: bool,
}

impl ColorConfig {
    /// Colour when `allowed` and stdout is a terminal.
    pub fn detect(allowed: bool) -> Self {
        Self {
            enabled: allowed && io::stdout().is_terminal(),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

/// Colour for a utilisation: above 80% red, from 50% yellow, otherwise green.
fn utilization_color(utilization: f64) -> Color {
    let percentage = utilization * 100.0;
    if percentage > 80.0 {
        Color::Red
    } else if percentage >= 50.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Render `[████████████░░░░░░░░]  60%` for a utilisation in 0.0-1.0.
///
/// Values outside the range are clamped.
pub fn format_progress_bar(utilization: f64, color: ColorConfig) -> String {
    let utilization = if utilization.is_nan() {
        0.0
    } else {
        utilization.clamp(0.0, 1.0)
    };

    let filled = ((utilization * PROGRESS_BAR_WIDTH as f64) as usize).min(PROGRESS_BAR_WIDTH);
    let empty = PROGRESS_BAR_WIDTH - filled;
    let percentage = (utilization * 100.0).round() as u32;

    let bar = format!(
        "[{}{}] {:>3}%",
        FILLED_CHAR.to_string().repeat(filled),
        EMPTY_CHAR.to_string().repeat(empty),
        percentage
    );

    if color.enabled {
        style(bar).with(utilization_color(utilization)).to_string()
    } else {
        bar
    }
}

/// Render the time until `reset_at` as `resets in 2h 15m`.
///
/// Returns an empty string when the reset time is unknown and
/// `resets now` once it has passed.
pub fn format_relative_time(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(reset_at) = reset_at else {
        return String::new();
    };

    let remaining = reset_at - now;
    if remaining <= chrono::TimeDelta::zero() {
        return "resets now".to_string();
    }

    let total_hours = remaining.num_hours();
    let days = total_hours / 24;
    let hours = total_hours % 24;
    let minutes = remaining.num_minutes() % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() {
        parts.push(format!("{}s", remaining.num_seconds()));
    }

    format!("resets in {}", parts.join(" "))
}

/// One display line: label, progress bar and reset countdown.
pub fn format_metric(
    label: &str,
    utilization: f64,
    reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    color: ColorConfig,
) -> String {
    format!(
        "{:<14} {}  {}",
        label,
        format_progress_bar(utilization, color),
        format_relative_time(reset_at, now)
    )
}

/// Label for a window length: `5-hour`, `7-day`, `90-min`, or `Limit`.
pub fn label_for_window(window_mins: i64) -> String {
    if window_mins <= 0 {
        return "Limit".to_string();
    }
    if window_mins % 1440 == 0 {
        return format!("{}-day", window_mins / 1440);
    }
    if window_mins % 60 == 0 {
        return format!("{}-hour", window_mins / 60);
    }
    format!("{}-min", window_mins)
}

fn format_window(window: &UsageWindow, now: DateTime<Utc>, color: ColorConfig) -> String {
    format_metric(
        &label_for_window(window.window_duration_mins),
        window.utilization,
        window.reset_at,
        now,
        color,
    )
}

/// Published allowance line for a plan, e.g.
/// `Plan limits: 45-225 local messages / 5h, 10-60 cloud tasks / 5h, 10-25 code reviews / week`.
pub fn format_plan_limits(limits: &PlanLimits) -> String {
    format!(
        "Plan limits: {} local messages / 5h, {} cloud tasks / 5h, {} code reviews / week",
        limits.local_messages_5h, limits.cloud_tasks_5h, limits.code_reviews_week
    )
}

/// Write the Codex usage section.
pub fn write_codex_usage<W: Write>(
    w: &mut W,
    usage: &Usage,
    now: DateTime<Utc>,
    color: ColorConfig,
) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "Codex Usage Limits (Plan: {})", usage.plan)?;
    writeln!(w, "{}", "─".repeat(RULE_WIDTH))?;

    let mut any = false;
    for window in usage.windows() {
        writeln!(w, "{}", format_window(window, now, color))?;
        any = true;
    }

    if !any {
        writeln!(w, "No Codex rate-limit data available.")?;
        writeln!(w, "Run `codex login` and try again.")?;
    }
    if let Some(limits) = plan_limits_for(usage.plan) {
        writeln!(w, "{}", format_plan_limits(limits))?;
    }
    writeln!(w)
}
