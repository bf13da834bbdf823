//! Auto-size search
//!
//! Reruns the layout pass until it fits. Adjustments are tried in a fixed
//! order: line spacing down to its floor, then character width down to its
//! floor, then point size by bisection between the configured bounds.

use crate::layout::options::AutoSizeOptions;
use crate::layout::output::{AutoSizeReport, LayoutDiagnostic};
use crate::layout::pass::{PassOutput, PassParams};

/// Point size precision of the bisection
pub const SIZE_EPSILON: f32 = 0.05;

/// Outcome of [`search`]
#[derive(Debug)]
pub struct SearchResult {
    pub output: PassOutput,
    pub params: PassParams,
    pub report: AutoSizeReport,
    pub diagnostic: Option<LayoutDiagnostic>,
}

struct Search<F> {
    run: F,
    iterations: u32,
    cap: u32,
}

impl<F: FnMut(PassParams) -> PassOutput> Search<F> {
    fn exhausted(&self) -> bool {
        self.iterations >= self.cap
    }

    fn attempt(&mut self, params: PassParams) -> PassOutput {
        self.iterations += 1;
        tracing::debug!(
            "Auto-size attempt {}: size {:.2}, line spacing {:.1}, width {:.0}%",
            self.iterations,
            params.font_size,
            params.line_spacing,
            params.width_percent
        );
        (self.run)(params)
    }
}

/// Find the largest configuration that fits.
///
/// `run` performs one layout pass; a pass fits when it does not ask for
/// adjustment. The iteration cap is the lower of `options.max_iterations`
/// and `settings_cap`.
pub fn search(
    run: impl FnMut(PassParams) -> PassOutput,
    base: PassParams,
    options: &AutoSizeOptions,
    settings_cap: u32,
) -> SearchResult {
    let mut search = Search {
        run,
        iterations: 0,
        cap: options.max_iterations.min(settings_cap).max(1),
    };
    let max_size = options.max_size.max(options.min_size);
    let min_size = options.min_size.min(max_size);

    let mut params = PassParams {
        font_size: max_size,
        ..base
    };
    let mut last = search.attempt(params);
    if !last.wants_adjustment {
        return finish(search.iterations, last, params, true);
    }

    let spacing_step = (options.line_spacing_floor.abs() / 10.0).max(1.0);
    while params.line_spacing > options.line_spacing_floor && !search.exhausted() {
        params.line_spacing = (params.line_spacing - spacing_step).max(options.line_spacing_floor);
        last = search.attempt(params);
        if !last.wants_adjustment {
            return finish(search.iterations, last, params, true);
        }
    }

    let width_step = ((100.0 - options.min_width_percent) / 10.0).max(1.0);
    while params.width_percent > options.min_width_percent && !search.exhausted() {
        params.width_percent = (params.width_percent - width_step).max(options.min_width_percent);
        last = search.attempt(params);
        if !last.wants_adjustment {
            return finish(search.iterations, last, params, true);
        }
    }

    if search.exhausted() {
        return finish(search.iterations, last, params, false);
    }

    // Even the smallest size may not fit; that is the best there is
    params.font_size = min_size;
    let at_min = search.attempt(params);
    if at_min.wants_adjustment {
        tracing::debug!("Text does not fit even at {:.2}", min_size);
        return finish(search.iterations, at_min, params, true);
    }

    let mut best = at_min;
    let (mut lo, mut hi) = (min_size, max_size);
    while hi - lo > SIZE_EPSILON && !search.exhausted() {
        let mid = (lo + hi) / 2.0;
        let out = search.attempt(PassParams {
            font_size: mid,
            ..params
        });
        if out.wants_adjustment {
            hi = mid;
        } else {
            lo = mid;
            best = out;
        }
    }

    params.font_size = lo;
    finish(search.iterations, best, params, hi - lo <= SIZE_EPSILON)
}

fn finish(
    iterations: u32,
    output: PassOutput,
    params: PassParams,
    converged: bool,
) -> SearchResult {
    let diagnostic = if converged {
        None
    } else {
        tracing::warn!(
            "Auto-size stopped after {} iterations at size {:.2}",
            iterations,
            params.font_size
        );
        Some(LayoutDiagnostic::AutoSizeIterationExceeded { iterations })
    };
    SearchResult {
        output,
        params,
        report: AutoSizeReport {
            font_size: params.font_size,
            line_spacing: params.line_spacing,
            width_percent: params.width_percent,
            iterations,
            converged,
        },
        diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PassParams {
        PassParams {
            font_size: 36.0,
            line_spacing: 0.0,
            width_percent: 100.0,
        }
    }

    fn pass(fits: bool) -> PassOutput {
        PassOutput {
            wants_adjustment: !fits,
            overflowed: !fits,
            ..Default::default()
        }
    }

    #[test]
    fn test_fits_at_max_immediately() {
        let auto = AutoSizeOptions {
            min_size: 10.0,
            max_size: 40.0,
            ..Default::default()
        };
        let result = search(|_| pass(true), base(), &auto, 100);
        assert_eq!(result.params.font_size, 40.0);
        assert_eq!(result.report.iterations, 1);
        assert!(result.report.converged);
    }

    #[test]
    fn test_bisection_converges() {
        let auto = AutoSizeOptions {
            min_size: 10.0,
            max_size: 100.0,
            ..Default::default()
        };
        let largest = 37.3;
        let result = search(|p| pass(p.font_size <= largest), base(), &auto, 100);
        let size = result.params.font_size;
        assert!(size <= largest && largest - size <= SIZE_EPSILON, "{size}");
        assert!(result.report.iterations <= 100);
        assert!(result.report.converged);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn test_spacing_then_width_then_size() {
        let auto = AutoSizeOptions {
            min_size: 10.0,
            max_size: 50.0,
            line_spacing_floor: -30.0,
            min_width_percent: 80.0,
            max_iterations: 100,
        };
        let mut seen = Vec::new();
        let result = search(
            |p| {
                seen.push(p);
                pass(p.width_percent <= 90.0)
            },
            base(),
            &auto,
            100,
        );
        // Spacing is exhausted before width moves; size never moves
        assert_eq!(result.params.line_spacing, -30.0);
        assert_eq!(result.params.width_percent, 90.0);
        assert_eq!(result.params.font_size, 50.0);
        let first_width_step = seen.iter().position(|p| p.width_percent < 100.0).unwrap();
        assert!(seen[..first_width_step].iter().all(|p| p.font_size == 50.0));
        assert_eq!(seen[first_width_step - 1].line_spacing, -30.0);
    }

    #[test]
    fn test_cap_reports_diagnostic() {
        let auto = AutoSizeOptions {
            min_size: 1.0,
            max_size: 1000.0,
            max_iterations: 5,
            ..Default::default()
        };
        let result = search(|p| pass(p.font_size <= 3.0), base(), &auto, 100);
        assert_eq!(result.report.iterations, 5);
        assert!(!result.report.converged);
        assert_eq!(
            result.diagnostic,
            Some(LayoutDiagnostic::AutoSizeIterationExceeded { iterations: 5 })
        );
        // Best fitting size so far is still accepted
        assert!(result.params.font_size <= 3.0);
    }

    #[test]
    fn test_nothing_fits_uses_min() {
        let auto = AutoSizeOptions {
            min_size: 8.0,
            max_size: 20.0,
            ..Default::default()
        };
        let result = search(|_| pass(false), base(), &auto, 100);
        assert_eq!(result.params.font_size, 8.0);
        assert_eq!(result.report.iterations, 2);
    }

    #[test]
    fn test_settings_cap_applies() {
        let auto = AutoSizeOptions {
            min_size: 1.0,
            max_size: 1000.0,
            ..Default::default()
        };
        let result = search(|p| pass(p.font_size <= 3.0), base(), &auto, 4);
        assert_eq!(result.report.iterations, 4);
    }
}
