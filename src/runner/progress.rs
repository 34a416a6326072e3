//! @ai:module:intent Progress accounting for an evaluation run
//! @ai:module:layer infrastructure
//! @ai:module:public_api Progress, total_steps
//! @ai:module:stateless false

use indicatif::{ProgressBar, ProgressStyle};

/// @ai:intent Step count of a run, computed before any trial executes
/// @ai:post images x algorithms x sizes x (1 + descriptors + combinations), plus one per (image, algorithm) with capacity
/// @ai:effects pure
pub fn total_steps(
    images: usize,
    algorithms: usize,
    payload_sizes: usize,
    descriptors: usize,
    combinations: usize,
    capacity: bool,
) -> u64 {
    let per_size = 1 + descriptors + combinations;
    let trials = images * algorithms * payload_sizes * per_size;
    let capacity_steps = if capacity { images * algorithms } else { 0 };
    (trials + capacity_steps) as u64
}

/// @ai:intent Shared progress bar, hidden when progress output is disabled
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// @ai:intent Create a visible or hidden progress bar
    /// @ai:effects io
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} Evaluating [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn inc(&self, steps: u64) {
        self.bar.inc(steps);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_steps_formula() {
        assert_eq!(total_steps(2, 3, 4, 5, 0, false), 2 * 3 * 4 * 6);
        assert_eq!(total_steps(2, 3, 4, 5, 2, true), 2 * 3 * 4 * 8 + 6);
        assert_eq!(total_steps(0, 3, 4, 5, 2, true), 0);
    }

    #[test]
    fn test_hidden_progress_counts() {
        let progress = Progress::new(10, false);
        progress.inc(3);
        progress.clone().inc(2);
        assert_eq!(progress.position(), 5);
    }
}
