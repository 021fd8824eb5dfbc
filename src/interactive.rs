//! Line-oriented dashboard session.
//!
//! Each command that changes the filters or the view triggers one render
//! cycle (load, filter, aggregate, print). The loader is kept for the whole
//! session, so repeated cycles inside the cache window reuse the same table.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    cli::{InteractiveArgs, parse_positive},
    config::SourceConfig,
    data::Field,
    filter::{FilterCriteria, filter_table},
    io_utils,
    loader::DataLoader,
    report::{assemble, write_text},
    source::TableSource,
    table::render_table,
    view::AnalysisView,
};

const HELP: &str = "\
Commands:
  country <text>   filter by country name (no text clears)
  code <text>      filter by customs code
  item <text>      filter by item description
  year <text>      filter by fiscal year
  clear            remove all filters
  view <name>      overview | items | counterparties | customs-codes
  top <n>          entries per ranking
  show             render the current view
  rows             print the filtered rows
  reload           drop cached data and fetch again
  help             show this text
  quit             leave the session";

pub fn execute(args: &InteractiveArgs) -> Result<()> {
    let config = crate::resolve_config(&args.source)?;
    // Commands are read from stdin, so the data cannot come from it as well.
    if let SourceConfig::CsvFile { path, .. } = &config.source
        && io_utils::is_dash(path)
    {
        bail!("The interactive session reads commands from stdin; pass a file path to --csv");
    }
    let loader = crate::build_loader(&config)?;
    let mut session = Session::new(loader, args.analysis, args.top.unwrap_or(config.top));
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    session.run(stdin.lock(), &mut out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Session<S> {
    loader: DataLoader<S>,
    criteria: FilterCriteria,
    view: AnalysisView,
    top: usize,
}

impl<S: TableSource> Session<S> {
    pub fn new(loader: DataLoader<S>, view: AnalysisView, top: usize) -> Self {
        Self {
            loader,
            criteria: FilterCriteria::default(),
            view,
            top,
        }
    }

    pub fn loader(&self) -> &DataLoader<S> {
        &self.loader
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "Type 'help' for commands.")?;
        self.render(out)?;
        let mut commands = 0usize;
        for line in input.lines() {
            let line = line.context("Reading command")?;
            commands += 1;
            if self.handle(line.trim(), out)? == Flow::Quit {
                break;
            }
        }
        info!("Session ended after {commands} command(s)");
        Ok(())
    }

    fn handle<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let pattern = (!argument.is_empty()).then(|| argument.to_string());

        match command.to_lowercase().as_str() {
            "country" => self.set_filter(Field::Country, pattern, out)?,
            "code" => self.set_filter(Field::CustomsCode, pattern, out)?,
            "item" => self.set_filter(Field::Item, pattern, out)?,
            "year" => self.set_filter(Field::Year, pattern, out)?,
            "clear" => {
                self.criteria = FilterCriteria::default();
                self.render(out)?;
            }
            "view" => match argument.parse::<AnalysisView>() {
                Ok(view) => {
                    self.view = view;
                    self.render(out)?;
                }
                Err(err) => writeln!(out, "{err}")?,
            },
            "top" => match parse_positive(argument) {
                Ok(top) => {
                    self.top = top;
                    self.render(out)?;
                }
                Err(err) => writeln!(out, "{err}")?,
            },
            "show" => self.render(out)?,
            "rows" => self.print_rows(out)?,
            "reload" => {
                self.loader.invalidate();
                self.render(out)?;
            }
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => writeln!(out, "Unknown command '{other}'; type 'help' for commands.")?,
        }
        Ok(Flow::Continue)
    }

    fn set_filter<W: Write>(
        &mut self,
        field: Field,
        pattern: Option<String>,
        out: &mut W,
    ) -> Result<()> {
        self.criteria.set(field, pattern);
        self.render(out)
    }

    fn render<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let outcome = self.loader.load();
        let report = assemble(&outcome, &self.criteria, self.view, self.top);
        for diagnostic in &report.diagnostics {
            writeln!(out, "{diagnostic}")?;
        }
        write_text(out, &report).context("Writing report")?;
        writeln!(out)?;
        Ok(())
    }

    fn print_rows<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let outcome = self.loader.load();
        for diagnostic in &outcome.diagnostics {
            writeln!(out, "{diagnostic}")?;
        }
        let filtered = filter_table(&outcome.table, &self.criteria);
        writeln!(out, "{} row(s), {}", filtered.len(), self.criteria.describe())?;
        if !filtered.has_no_columns() {
            write!(out, "{}", render_table(filtered.headers(), &filtered.text_rows()))?;
        }
        Ok(())
    }
}
