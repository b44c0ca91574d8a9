use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tortoise::{gnuplot::DEFAULT_EXTENT, DrawSink};
use tortoise_host::{GnuplotProcess, GnuplotSink, PlotConfig};
use tortoiselogo::{describe_parse_error, Env};

#[derive(Parser, Debug)]
#[command(version, about = "Drive a tortoise with logo, and watch it draw in gnuplot")]
struct Args {
    /// A logo program to run. Without one, commands are read from stdin.
    input: Option<PathBuf>,

    /// Write the gnuplot commands to stdout instead of starting gnuplot.
    #[arg(long)]
    dump: bool,

    /// The gnuplot executable.
    #[arg(long, default_value = "gnuplot")]
    gnuplot: String,

    /// Close the plot window as soon as gnuplot quits.
    #[arg(long)]
    no_persist: bool,

    /// Half the width (and height) of the plotting area.
    #[arg(long, default_value_t = DEFAULT_EXTENT, value_parser = parse_extent)]
    extent: f64,
}

fn parse_extent(s: &str) -> Result<f64, String> {
    let x: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if x.is_finite() && x > 0.0 {
        Ok(x)
    } else {
        Err(format!("{s} isn't a positive number"))
    }
}

impl Args {
    fn plot_config(&self) -> PlotConfig {
        PlotConfig {
            program: self.gnuplot.clone(),
            persist: !self.no_persist,
            extent: self.extent,
        }
    }
}

fn open_sink(args: &Args) -> anyhow::Result<Box<dyn DrawSink>> {
    if args.dump {
        Ok(Box::new(GnuplotSink::new(io::stdout(), args.extent)?))
    } else {
        Ok(Box::new(GnuplotProcess::spawn(&args.plot_config())?))
    }
}

fn show_printed(env: &mut Env, out: &mut dyn Write) -> io::Result<()> {
    for line in env.take_printed() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn run_script(env: &mut Env, path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    run_program(env, &input, out)
}

fn run_program(env: &mut Env, source: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let prog =
        tortoiselogo::program(source).map_err(|e| anyhow!("{}", describe_parse_error(&e)))?;

    let res = prog.eval(env);
    show_printed(env, out)?;
    match res {
        Ok(None) => {}
        Ok(Some(val)) => {
            writeln!(out, "Warning: program evaluated to an unexpected value: {val}")?;
        }
        // `EvalError` holds on to expressions, which aren't `Send`, so it can't go inside an
        // `anyhow::Error` as it is.
        Err(e) => bail!("Evaluation error: {e}"),
    }
    Ok(())
}

/// Read one entry from the prompt. Usually that's a single line, but a procedure definition
/// keeps going until a line that just says `end`.
fn read_entry(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    out: &mut dyn Write,
) -> io::Result<Option<String>> {
    write!(out, "? ")?;
    out.flush()?;
    let Some(line) = lines.next() else {
        return Ok(None);
    };
    let mut entry = line?;
    if entry.trim_start().starts_with("to ") {
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            entry.push('\n');
            entry.push_str(&line);
            if line.trim() == "end" {
                break;
            }
        }
    }
    Ok(Some(entry))
}

fn repl(env: &mut Env, input: impl BufRead, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut lines = input.lines();
    while let Some(entry) = read_entry(&mut lines, out)? {
        if entry.trim().is_empty() {
            continue;
        }
        let prog = match tortoiselogo::program(&entry) {
            Ok(prog) => prog,
            Err(e) => {
                writeln!(out, "{}", describe_parse_error(&e))?;
                continue;
            }
        };
        let res = prog.eval(env);
        show_printed(env, out)?;
        match res {
            Ok(None) => {}
            Ok(Some(val)) => writeln!(out, "{val}")?,
            Err(e) => writeln!(out, "{e}")?,
        }
    }
    writeln!(out)?;
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<()> {
    // When dumping, stdout belongs to gnuplot.
    let mut out: Box<dyn Write> = if args.dump {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let mut env = Env::new(open_sink(args)?);
    env.turtle_do(|t, s| t.reset(s))?;

    let res = match &args.input {
        Some(path) => run_script(&mut env, path, &mut out),
        None => repl(&mut env, io::stdin().lock(), &mut out),
    };
    let closed = env.close();
    res?;
    closed?;
    Ok(())
}

fn main() {
    pretty_env_logger::init();

    let args = Args::parse();
    log::debug!("{args:?}");
    if let Err(e) = run(&args) {
        eprintln!("{e:#}");
        exit(1);
    }
}
