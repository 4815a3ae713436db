use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::differ::Differ;
use crate::error::Result;
use crate::render::{RenderSink, TermCodes};
use crate::runner::Runner;
use crate::snapshot::GenerationPair;
use crate::state::LoopState;

/// Summary of a finished loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopResult {
    /// Number of iterations run
    pub iterations: u64,
    /// Iterations rendered in full
    pub full_renders: u64,
    /// Iterations that only refreshed the timestamp
    pub suppressed: u64,
}

/// Drives the capture, compare, render and swap cycle
pub struct LoopController<R: Runner, D: Differ, W: Write> {
    config: Arc<Config>,
    runner: R,
    differ: D,
    sink: RenderSink<W>,
    pair: GenerationPair,
    state: LoopState,
}

impl<R: Runner, D: Differ, W: Write> LoopController<R, D, W> {
    /// Create a new LoopController and allocate both generations
    ///
    /// In redraw mode, terminal capabilities are queried here unless the sink
    /// already carries its sequences.
    pub fn new(config: Config, runner: R, differ: D, mut sink: RenderSink<W>) -> Result<Self> {
        if config.redraw && !sink.has_codes() {
            sink.set_codes(TermCodes::query()?);
        }

        Ok(Self {
            config: Arc::new(config),
            runner,
            differ,
            sink,
            pair: GenerationPair::new()?,
            state: LoopState::new(),
        })
    }

    /// Get the loop counters
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Consume the controller and return its sink
    pub fn into_sink(self) -> RenderSink<W> {
        self.sink
    }

    /// Run until the repeat count is reached (forever when it is 0)
    pub async fn run(&mut self) -> Result<LoopResult> {
        let limit = self.config.repeat_limit();
        let redraw = self.config.redraw;

        if redraw {
            self.sink.clear_screen()?;
        }

        loop {
            debug!("Starting iteration {}", self.state.iteration + 1);

            self.pair.old.rewind()?;
            self.runner.update(&mut self.pair.new).await?;
            debug!(
                "Captured {:?} at {}",
                self.pair.new.commands(),
                self.pair.new.timestamp()
            );

            let diff = self
                .differ
                .compare(self.pair.old.path(), self.pair.new.path())
                .await?;

            if diff.is_empty() && self.config.silent {
                let stamp = format!("{}\r", self.pair.new.timestamp());
                self.sink.flush_now(&stamp)?;
                self.state.record_suppressed();
            } else {
                let body = if diff.is_empty() {
                    self.pair.new.read_text()?
                } else {
                    diff
                };
                self.render_full(&body)?;
            }

            self.pair.swap();
            self.state.increment_iteration();

            if self.state.is_done(limit) {
                break;
            }

            tokio::time::sleep(self.config.interval_duration()).await;
        }

        if redraw {
            self.sink.erase_line_now()?;
        }

        let result = LoopResult {
            iterations: self.state.iteration,
            full_renders: self.state.redraw_count,
            suppressed: self.state.suppressed,
        };
        info!(
            "Finished after {} iteration(s): {} rendered, {} unchanged",
            result.iterations, result.full_renders, result.suppressed
        );
        Ok(result)
    }

    fn render_full(&mut self, body: &str) -> Result<()> {
        let redraw = self.config.redraw;

        let mut frame = String::with_capacity(body.len() + 64);
        if self.config.show_date {
            frame.push_str(self.pair.new.timestamp());
            frame.push_str("\n\n");
        }
        frame.push_str(body);
        if self.config.trailing_newline {
            frame.push('\n');
        }

        if redraw {
            if self.state.home_due(self.config.refresh) {
                self.sink.home()?;
            }
            frame = self.sink.erase_lines(&frame);
        }
        self.state.record_full_render();

        self.sink.print(&frame)?;
        if redraw && self.config.clear_after {
            self.sink.erase_down_now()
        } else {
            self.sink.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use crate::snapshot::Snapshot;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock runner cycling through fixed outputs, stamping "t1", "t2", ...
    struct MockRunner {
        outputs: Vec<&'static str>,
        calls: AtomicUsize,
        fail_at: Option<usize>,
    }

    impl MockRunner {
        fn new(outputs: &[&'static str]) -> Self {
            Self {
                outputs: outputs.to_vec(),
                calls: AtomicUsize::new(0),
                fail_at: None,
            }
        }

        fn failing_at(outputs: &[&'static str], call: usize) -> Self {
            Self {
                fail_at: Some(call),
                ..Self::new(outputs)
            }
        }
    }

    #[async_trait]
    impl Runner for MockRunner {
        async fn update(&self, snapshot: &mut Snapshot) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(call) {
                return Err(WatchError::ShutdownRequested);
            }
            let output = self.outputs[call % self.outputs.len()];
            snapshot.record(
                output.as_bytes(),
                format!("t{}", call + 1),
                Arc::from(vec!["mock".to_string()]),
            )
        }
    }

    /// Mock differ: empty when equal, otherwise the new content
    struct MockDiffer;

    #[async_trait]
    impl Differ for MockDiffer {
        async fn compare(&self, old: &Path, new: &Path) -> Result<String> {
            let old = std::fs::read(old).map_err(WatchError::Buffer)?;
            let new = std::fs::read(new).map_err(WatchError::Buffer)?;
            if old == new {
                Ok(String::new())
            } else {
                Ok(String::from_utf8_lossy(&new).into_owned())
            }
        }
    }

    /// Mock differ that never reports a difference
    struct SilentDiffer;

    #[async_trait]
    impl Differ for SilentDiffer {
        async fn compare(&self, _old: &Path, _new: &Path) -> Result<String> {
            Ok(String::new())
        }
    }

    fn base_config(repeat: u32) -> Config {
        Config {
            commands: vec!["mock".to_string()],
            interval: 0.0,
            repeat,
            ..Config::default()
        }
    }

    fn sink_for(config: &Config) -> RenderSink<Vec<u8>> {
        if config.redraw {
            RenderSink::with_codes(Vec::new(), TermCodes::ansi())
        } else {
            RenderSink::new(Vec::new())
        }
    }

    async fn run_with<D: Differ>(
        config: Config,
        runner: MockRunner,
        differ: D,
    ) -> (LoopResult, String) {
        let sink = sink_for(&config);
        let mut controller = LoopController::new(config, runner, differ, sink).unwrap();
        let result = controller.run().await.unwrap();
        let out = String::from_utf8(controller.into_sink().into_inner()).unwrap();
        (result, out)
    }

    #[tokio::test]
    async fn test_static_output_renders_full_snapshot_each_iteration() {
        let config = Config {
            show_date: false,
            trailing_newline: false,
            ..base_config(2)
        };

        let (result, out) = run_with(config, MockRunner::new(&["hi\n"]), MockDiffer).await;

        assert_eq!(out, "hi\nhi\n");
        assert_eq!(result.iterations, 2);
        assert_eq!(result.full_renders, 2);
        assert_eq!(result.suppressed, 0);
    }

    #[tokio::test]
    async fn test_fallback_reads_current_buffer_when_diff_is_empty() {
        let config = Config {
            show_date: false,
            trailing_newline: false,
            ..base_config(2)
        };

        let (_, out) = run_with(config, MockRunner::new(&["one\n", "two\n"]), SilentDiffer).await;

        assert_eq!(out, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_silent_mode_prints_only_timestamp_when_unchanged() {
        let config = Config {
            silent: true,
            ..base_config(3)
        };

        let (result, out) = run_with(config, MockRunner::new(&["hi\n"]), MockDiffer).await;

        assert_eq!(out, "t1\n\nhi\n\nt2\rt3\r");
        assert_eq!(result.full_renders, 1);
        assert_eq!(result.suppressed, 2);
    }

    #[tokio::test]
    async fn test_silent_mode_renders_every_change() {
        let config = Config {
            silent: true,
            show_date: false,
            trailing_newline: false,
            ..base_config(3)
        };

        let (result, out) = run_with(config, MockRunner::new(&["A\n", "B\n"]), MockDiffer).await;

        assert_eq!(out, "A\nB\nA\n");
        assert_eq!(result.full_renders, 3);
        assert_eq!(result.suppressed, 0);
    }

    #[tokio::test]
    async fn test_date_header_precedes_diff() {
        let config = Config {
            trailing_newline: false,
            ..base_config(2)
        };

        let (_, out) = run_with(config, MockRunner::new(&["A\n", "B\n"]), MockDiffer).await;

        assert_eq!(out, "t1\n\nA\nt2\n\nB\n");
    }

    #[tokio::test]
    async fn test_plain_output_has_no_header_or_trailing_newline() {
        let config = Config {
            show_date: false,
            trailing_newline: false,
            ..base_config(1)
        };

        let (_, out) = run_with(config, MockRunner::new(&["no newline"]), MockDiffer).await;

        assert_eq!(out, "no newline");
    }

    #[tokio::test]
    async fn test_trailing_newline_appended() {
        let config = Config {
            show_date: false,
            ..base_config(1)
        };

        let (_, out) = run_with(config, MockRunner::new(&["x\n"]), MockDiffer).await;

        assert_eq!(out, "x\n\n");
    }

    #[tokio::test]
    async fn test_redraw_homes_on_refresh_cadence() {
        let config = Config {
            redraw: true,
            refresh: 2,
            show_date: false,
            ..base_config(5)
        };
        let codes = TermCodes::ansi();

        let (_, out) =
            run_with(config, MockRunner::new(&["a\n", "b\n"]), MockDiffer).await;

        assert!(out.starts_with(&codes.clear_screen));
        assert_eq!(out.matches(&codes.clear_screen).count(), 1);
        // Full renders 0, 2 and 4
        assert_eq!(out.matches(&codes.home).count(), 3);
        let frames: Vec<&str> = out.split(codes.erase_down.as_str()).collect();
        assert_eq!(frames.len(), 6);
        assert!(frames[0].contains(&codes.home));
        assert!(!frames[1].contains(&codes.home));
        assert!(frames[2].contains(&codes.home));
        assert!(!frames[3].contains(&codes.home));
        assert!(frames[4].contains(&codes.home));
        assert_eq!(frames[5], codes.erase_line);
    }

    #[tokio::test]
    async fn test_refresh_zero_never_homes_but_still_erases_lines() {
        let config = Config {
            redraw: true,
            refresh: 0,
            show_date: false,
            trailing_newline: false,
            ..base_config(3)
        };
        let codes = TermCodes::ansi();

        let (_, out) =
            run_with(config, MockRunner::new(&["a\n", "b\n"]), MockDiffer).await;

        assert_eq!(out.matches(&codes.home).count(), 0);
        assert!(out.contains(&format!("{}a\n", codes.erase_line)));
        assert!(out.contains(&format!("{}b\n", codes.erase_line)));
    }

    #[tokio::test]
    async fn test_redraw_prefixes_every_line() {
        let config = Config {
            redraw: true,
            ..base_config(1)
        };
        let codes = TermCodes::ansi();

        let (_, out) = run_with(config, MockRunner::new(&["x\ny\n"]), MockDiffer).await;

        let el = &codes.erase_line;
        let expected = format!(
            "{}{}{el}t1\n{el}\n{el}x\n{el}y\n{el}\n{}{el}",
            codes.clear_screen,
            codes.home,
            codes.erase_down,
            el = el
        );
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_no_clear_after_skips_erase_down() {
        let config = Config {
            redraw: true,
            clear_after: false,
            ..base_config(2)
        };
        let codes = TermCodes::ansi();

        let (_, out) =
            run_with(config, MockRunner::new(&["a\n", "b\n"]), MockDiffer).await;

        assert!(!out.contains(&codes.erase_down));
    }

    #[tokio::test]
    async fn test_plain_mode_emits_no_control_sequences() {
        let config = base_config(2);

        let (_, out) = run_with(config, MockRunner::new(&["a\n", "b\n"]), MockDiffer).await;

        assert!(!out.contains('\x1b'));
    }

    #[tokio::test]
    async fn test_repeat_zero_runs_until_stopped() {
        let config = base_config(0);
        let sink = sink_for(&config);
        let mut controller =
            LoopController::new(config, MockRunner::failing_at(&["a\n", "b\n"], 50), MockDiffer, sink)
                .unwrap();

        let result = controller.run().await;

        assert!(matches!(result, Err(WatchError::ShutdownRequested)));
        assert_eq!(controller.state().iteration, 50);
    }

    #[tokio::test]
    async fn test_runner_error_is_fatal() {
        let config = base_config(10);
        let sink = sink_for(&config);
        let mut controller =
            LoopController::new(config, MockRunner::failing_at(&["a\n"], 1), MockDiffer, sink)
                .unwrap();

        let result = controller.run().await;

        assert!(result.is_err());
        assert_eq!(controller.state().iteration, 1);
    }
}
