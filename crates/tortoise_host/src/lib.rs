use std::{
    io::Write,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use anyhow::{anyhow, Context};
use tortoise::{
    gnuplot::{self, Gnuplot},
    DrawCmd, DrawSink, SinkError,
};

#[derive(Debug, Clone)]
pub struct PlotConfig {
    /// The gnuplot executable.
    pub program: String,
    /// Keep the plot window open after gnuplot quits.
    pub persist: bool,
    /// Half the width (and height) of the plotting area.
    pub extent: f64,
}

impl Default for PlotConfig {
    fn default() -> PlotConfig {
        PlotConfig {
            program: "gnuplot".to_owned(),
            persist: true,
            extent: gnuplot::DEFAULT_EXTENT,
        }
    }
}

/// Writes drawing commands to gnuplot (or anything pretending to be gnuplot).
pub struct GnuplotSink<W: Write> {
    // `None` once we've sent "quit".
    write: Option<W>,
}

impl<W: Write> GnuplotSink<W> {
    /// Set up the plotting area and start accepting commands.
    pub fn new(mut write: W, extent: f64) -> Result<Self, SinkError> {
        for line in gnuplot::preamble(extent) {
            writeln!(write, "{line}")?;
        }
        write.flush()?;
        Ok(GnuplotSink { write: Some(write) })
    }

    /// Tell gnuplot to quit, and give back the writer.
    pub fn finish(&mut self) -> Result<W, SinkError> {
        let mut write = self.write.take().ok_or(SinkError::Closed)?;
        writeln!(write, "{}", gnuplot::QUIT)?;
        write.flush()?;
        Ok(write)
    }

    pub fn is_closed(&self) -> bool {
        self.write.is_none()
    }
}

impl<W: Write> DrawSink for GnuplotSink<W> {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError> {
        let write = self.write.as_mut().ok_or(SinkError::Closed)?;
        log::debug!("{:?}", cmd);
        writeln!(write, "{}", Gnuplot(&cmd))?;
        write.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if !self.is_closed() {
            self.finish()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for GnuplotSink<W> {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.finish() {
                log::warn!("failed to quit gnuplot: {e}");
            }
        }
    }
}

/// A gnuplot child process, fed through a pipe.
///
/// The child is always reaped: by `wait`, by `close`, or failing those, on drop.
pub struct GnuplotProcess {
    sink: GnuplotSink<ChildStdin>,
    child: Child,
    status: Option<ExitStatus>,
}

impl GnuplotProcess {
    pub fn spawn(config: &PlotConfig) -> anyhow::Result<GnuplotProcess> {
        let mut cmd = Command::new(&config.program);
        if config.persist {
            cmd.arg("-persist");
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start '{}'", config.program))?;
        let Some(stdin) = child.stdin.take() else {
            reap(&mut child);
            return Err(anyhow!("no pipe to the stdin of '{}'", config.program));
        };
        log::info!("started '{}' (pid {})", config.program, child.id());

        match GnuplotSink::new(stdin, config.extent) {
            Ok(sink) => Ok(GnuplotProcess {
                sink,
                child,
                status: None,
            }),
            Err(e) => {
                // The failed sink already dropped the pipe.
                reap(&mut child);
                Err(e).with_context(|| format!("failed to set up '{}'", config.program))
            }
        }
    }

    /// Quit gnuplot and wait for it to exit.
    ///
    /// Waiting again just gives back the same status.
    pub fn wait(&mut self) -> Result<ExitStatus, SinkError> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        // The pipe is closed after this, even if "quit" couldn't be sent.
        let closed = self.sink.close();
        let status = self.child.wait()?;
        log::info!("gnuplot exited with {status}");
        self.status = Some(status);
        closed.map(|()| status)
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.wait() {
        log::warn!("failed to wait for pid {}: {e}", child.id());
    }
}

impl Drop for GnuplotProcess {
    fn drop(&mut self) {
        if self.status.is_none() {
            if let Err(e) = self.wait() {
                log::warn!("failed to shut down gnuplot: {e}");
            }
        }
    }
}

impl DrawSink for GnuplotProcess {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError> {
        self.sink.draw(cmd)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let status = self.wait()?;
        if !status.success() {
            log::warn!("gnuplot exited unsuccessfully ({status})");
        }
        Ok(())
    }
}
