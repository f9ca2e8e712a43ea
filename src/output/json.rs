//! JSON output - silent while running, one document at the end

use std::io::{self, Write};

use super::Writer;
use crate::config::Job;
use crate::engine::result::{JobResult, RunResult, Status};

pub struct JsonWriter<W: Write + Send> {
    out: W,
    pretty: bool,
}

impl<W: Write + Send> JsonWriter<W> {
    pub fn new(out: W, pretty: bool) -> Self {
        Self { out, pretty }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Writer for JsonWriter<W> {
    fn write_header(&mut self, _version: &str) -> io::Result<()> {
        Ok(())
    }

    fn write_config_summary(&mut self, _environments: usize, _jobs: usize) -> io::Result<()> {
        Ok(())
    }

    fn write_job_start(&mut self, _index: usize, _total: usize, _job: &Job) -> io::Result<()> {
        Ok(())
    }

    fn write_job_progress(
        &mut self,
        _job_name: &str,
        _status: Status,
        _message: &str,
    ) -> io::Result<()> {
        Ok(())
    }

    fn write_job_complete(
        &mut self,
        _index: usize,
        _total: usize,
        _result: &JobResult,
    ) -> io::Result<()> {
        Ok(())
    }

    fn write_result(&mut self, result: &RunResult) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, result)?;
        } else {
            serde_json::to_writer(&mut self.out, result)?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}
