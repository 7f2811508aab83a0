//! Writing and printing solutions.
//!
//! A solution file is comma-separated text: an optional preamble record, a
//! header, then one row per state holding the state's identifier, the chosen
//! action and the value estimate.

use std::fmt;
use std::io::Write;
use std::path::Path;

use super::bellman_equation::MarkovDecisionProcess;
use super::indexing::unflatten;
use super::value_iteration::ValueIteration;
use crate::error::Result;

/// Describes how states are labelled in a solution file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionLayout {
    preamble: Option<Vec<String>>,
    state_columns: Vec<String>,
    dims: Vec<usize>,
    action_column: String,
    value_column: String,
}

impl SolutionLayout {
    /// One column holding the flat state index: header `s,a,v`.
    pub fn flat() -> Self {
        Self {
            preamble: None,
            state_columns: vec!["s".to_string()],
            dims: Vec::new(),
            action_column: "a".to_string(),
            value_column: "v".to_string(),
        }
    }

    /// One column per coordinate of a factored state, as produced by
    /// [`unflatten`] over `dims`. The header is the column names followed by
    /// `action,value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bellman::dynamic::SolutionLayout;
    ///
    /// let layout = SolutionLayout::factored(["x", "y"], &[3, 2]);
    /// assert_eq!(layout.header(), vec!["x", "y", "action", "value"]);
    /// assert_eq!(layout.state_fields(5), vec!["2", "1"]);
    /// ```
    pub fn factored<I, S>(columns: I, dims: &[usize]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preamble: None,
            state_columns: columns.into_iter().map(Into::into).collect(),
            dims: dims.to_vec(),
            action_column: "action".to_string(),
            value_column: "value".to_string(),
        }
    }

    /// Adds a record written before the header.
    pub fn with_preamble<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preamble = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.state_columns.clone();
        header.push(self.action_column.clone());
        header.push(self.value_column.clone());
        header
    }

    /// Identifier fields for state `s`.
    pub fn state_fields(&self, s: usize) -> Vec<String> {
        if self.dims.is_empty() {
            vec![s.to_string()]
        } else {
            unflatten(s, &self.dims)
                .iter()
                .map(ToString::to_string)
                .collect()
        }
    }
}

impl Default for SolutionLayout {
    fn default() -> Self {
        Self::flat()
    }
}

/// Pipe-delimited console rendering of a value function and policy.
#[derive(Debug, Clone, Copy)]
pub struct SolutionTable<'a> {
    value: &'a [f64],
    policy: &'a [usize],
}

impl fmt::Display for SolutionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================")?;
        writeln!(f, "Bellman Solution")?;
        writeln!(f, "s | a | v")?;
        writeln!(f, "----------------")?;
        for (s, (a, v)) in self.policy.iter().zip(self.value).enumerate() {
            writeln!(f, "{} | {} | {}", s, a, v)?;
        }
        write!(f, "================")
    }
}

impl<M: MarkovDecisionProcess> ValueIteration<M> {
    /// Writes the current solution as CSV.
    pub fn write_solution<W: Write>(&self, writer: W, layout: &SolutionLayout) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);
        self.write_records(&mut out, layout)
    }

    /// Writes the current solution to `path` with a flat `s,a,v` layout,
    /// replacing any existing file.
    pub fn record_solution<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.record_solution_with(path, &SolutionLayout::flat())
    }

    /// Writes the current solution to `path` with the given layout.
    pub fn record_solution_with<P: AsRef<Path>>(
        &self,
        path: P,
        layout: &SolutionLayout,
    ) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;
        self.write_records(&mut out, layout)?;
        log::info!("solution written to {}", path.as_ref().display());
        Ok(())
    }

    fn write_records<W: Write>(
        &self,
        out: &mut csv::Writer<W>,
        layout: &SolutionLayout,
    ) -> Result<()> {
        let (value, policy) = self.estimates();
        if let Some(preamble) = &layout.preamble {
            out.write_record(preamble)?;
        }
        out.write_record(layout.header())?;
        for (s, (a, v)) in policy.iter().zip(value).enumerate() {
            let mut record = layout.state_fields(s);
            record.push(a.to_string());
            record.push(v.to_string());
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Console table of the current solution.
    pub fn solution_table(&self) -> SolutionTable<'_> {
        let (value, policy) = self.estimates();
        SolutionTable { value, policy }
    }

    /// Prints the current solution to stdout.
    pub fn print_solution(&self) {
        println!("{}", self.solution_table());
    }
}
