//! Console report: one section per variant with raw phase totals.

use std::io::{self, Write};

use crate::harness::{RunReport, Validation};

const RULE: &str = "==================";

pub struct Report<W: Write> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Report { out }
    }

    pub fn section(&mut self, run: &RunReport) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", run.variant)?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "Building index took {} s", run.build.elapsed_seconds)?;
        writeln!(self.out, "Query duration: {} s", run.query.elapsed_seconds)?;
        self.out.flush()
    }

    pub fn validation(&mut self, validation: &Validation) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "Validation: {} of {} queries differ",
            validation.mismatches, validation.compared
        )?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
