//! Human-readable console output

use std::io::{self, Write};
use std::time::Duration;

use super::Writer;
use crate::config::duration::{format_duration, round_millis};
use crate::config::Job;
use crate::engine::result::{JobResult, RunResult, Status};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";

const RULE_WIDTH: usize = 40;

pub struct ConsoleWriter<W: Write + Send> {
    out: W,
    colors: bool,
    verbose: bool,
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W, colors: bool, verbose: bool) -> Self {
        Self {
            out,
            colors,
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self, code: &'static str) -> &'static str {
        if self.colors {
            code
        } else {
            ""
        }
    }

    fn rule(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))
    }

    fn verdict(&self, passed: bool) -> String {
        if passed {
            format!("{}[PASS]{}", self.color(GREEN), self.color(RESET))
        } else {
            format!("{}[FAIL]{}", self.color(RED), self.color(RESET))
        }
    }
}

fn round_secs(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs_f64().round() as u64)
}

impl<W: Write + Send> Writer for ConsoleWriter<W> {
    fn write_header(&mut self, version: &str) -> io::Result<()> {
        let (bold, reset) = (self.color(BOLD), self.color(RESET));
        writeln!(self.out)?;
        writeln!(self.out, "{}JobProbe {}{}", bold, version, reset)?;
        self.rule()?;
        writeln!(self.out)
    }

    fn write_config_summary(&mut self, environments: usize, jobs: usize) -> io::Result<()> {
        writeln!(self.out, "Loading configuration...")?;
        writeln!(self.out, "  Environments: {} loaded", environments)?;
        writeln!(self.out, "  Jobs: {} loaded", jobs)?;
        writeln!(self.out)
    }

    fn write_job_start(&mut self, index: usize, total: usize, job: &Job) -> io::Result<()> {
        let (bold, reset) = (self.color(BOLD), self.color(RESET));
        writeln!(
            self.out,
            "[{}/{}] {}{}{} ({})",
            index, total, bold, job.name, reset, job.environment
        )
    }

    fn write_job_progress(
        &mut self,
        _job_name: &str,
        _status: Status,
        message: &str,
    ) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        let (gray, reset) = (self.color(GRAY), self.color(RESET));
        writeln!(self.out, "      {}{}{}", gray, message, reset)
    }

    fn write_job_complete(
        &mut self,
        _index: usize,
        _total: usize,
        result: &JobResult,
    ) -> io::Result<()> {
        let duration = format_duration(round_millis(result.duration));
        let verdict = self.verdict(result.passed());

        if result.passed() {
            writeln!(self.out, "      Completed in {}", duration)?;
        } else {
            let (red, reset) = (self.color(RED), self.color(RESET));
            writeln!(self.out, "      {}Failed after {}{}", red, duration, reset)?;
            if !result.error.is_empty() {
                writeln!(self.out, "      Error: {}", result.error)?;
            }
        }
        writeln!(self.out, "      {}", verdict)?;
        writeln!(self.out)
    }

    fn write_result(&mut self, result: &RunResult) -> io::Result<()> {
        let summary = result.summary;
        let (red, green, yellow, reset) = (
            self.color(RED),
            self.color(GREEN),
            self.color(YELLOW),
            self.color(RESET),
        );
        let failed_color = if summary.failed > 0 { red } else { green };

        self.rule()?;
        writeln!(self.out, "Summary")?;
        self.rule()?;
        writeln!(self.out, "Total:    {}", summary.total)?;
        writeln!(self.out, "Passed:   {}{}{}", green, summary.passed, reset)?;
        writeln!(self.out, "Failed:   {}{}{}", failed_color, summary.failed, reset)?;
        if summary.skipped > 0 {
            writeln!(self.out, "Skipped:  {}{}{}", yellow, summary.skipped, reset)?;
        }
        writeln!(
            self.out,
            "Duration: {}",
            format_duration(round_secs(result.duration))
        )?;

        let failed: Vec<&JobResult> = result.failed_results().collect();
        if !failed.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "{}Failed Jobs:{}", red, reset)?;
            for job in failed {
                writeln!(self.out, "  - {}: {}", job.job_name, job.error)?;
            }
        }

        writeln!(self.out)?;
        if result.success() {
            writeln!(self.out, "{}All jobs passed!{}", green, reset)?;
        } else {
            writeln!(self.out, "{}Some jobs failed.{}", red, reset)?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(colors: bool, verbose: bool, f: impl FnOnce(&mut ConsoleWriter<Vec<u8>>)) -> String {
        let mut writer = ConsoleWriter::new(Vec::new(), colors, verbose);
        f(&mut writer);
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn job() -> Job {
        Job::rest("health", "prod", "GET", "/health")
    }

    #[test]
    fn test_header_and_job_start() {
        let out = render(false, false, |w| {
            w.write_header("0.1.0").unwrap();
            w.write_config_summary(2, 5).unwrap();
            w.write_job_start(1, 5, &job()).unwrap();
        });
        assert!(out.contains("JobProbe 0.1.0"));
        assert!(out.contains(&"=".repeat(40)));
        assert!(out.contains("  Environments: 2 loaded"));
        assert!(out.contains("  Jobs: 5 loaded"));
        assert!(out.contains("[1/5] health (prod)"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_progress_only_when_verbose() {
        let quiet = render(false, false, |w| {
            w.write_job_progress("health", Status::Running, "GET /health").unwrap();
        });
        assert!(quiet.is_empty());

        let verbose = render(false, true, |w| {
            w.write_job_progress("health", Status::Running, "GET /health").unwrap();
        });
        assert_eq!(verbose, "      GET /health\n");
    }

    #[test]
    fn test_job_complete_pass_and_fail() {
        let passed = render(false, false, |w| {
            w.write_job_complete(1, 1, &JobResult::planned(&job())).unwrap();
        });
        assert!(passed.contains("Completed in"));
        assert!(passed.contains("[PASS]"));

        let failed = render(false, false, |w| {
            let result = JobResult::failed(&job(), "expected status code 200, got 503");
            w.write_job_complete(1, 1, &result).unwrap();
        });
        assert!(failed.contains("Failed after"));
        assert!(failed.contains("Error: expected status code 200, got 503"));
        assert!(failed.contains("[FAIL]"));
    }

    #[test]
    fn test_summary_lists_failed_jobs() {
        let mut run = RunResult::new("0.1.0");
        run.add_result(JobResult::planned(&job()));
        run.add_result(JobResult::failed(
            &Job::rest("orders", "prod", "GET", "/orders"),
            "boom",
        ));
        run.add_skipped();
        run.finish();

        let out = render(false, false, |w| w.write_result(&run).unwrap());
        assert!(out.contains("Total:    2"));
        assert!(out.contains("Passed:   1"));
        assert!(out.contains("Failed:   1"));
        assert!(out.contains("Skipped:  1"));
        assert!(out.contains("Failed Jobs:"));
        assert!(out.contains("  - orders: boom"));
        assert!(out.contains("Some jobs failed."));
    }

    #[test]
    fn test_colors() {
        let mut run = RunResult::new("0.1.0");
        run.add_result(JobResult::planned(&job()));
        let out = render(true, false, |w| w.write_result(&run).unwrap());
        assert!(out.contains("\x1b[32mAll jobs passed!\x1b[0m"));
        assert!(!out.contains("Skipped"));
    }
}
