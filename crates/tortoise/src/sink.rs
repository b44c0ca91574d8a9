use std::{cell::RefCell, rc::Rc};

use kurbo::Point;

/// Something the turtle asks a sink to draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DrawCmd {
    /// Erase everything drawn so far.
    Clear,
    /// A straight segment, traced from `from` to `to`.
    Line { from: Point, to: Point },
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("draw sink unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
    #[error("draw sink was already closed")]
    Closed,
}

/// The consumer of the turtle's drawing commands.
///
/// Commands must be handled (flushed, committed, whatever that means for the sink)
/// before `draw` returns, and in the order they were sent.
pub trait DrawSink {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError>;

    /// Shut the sink down. Sinks that have nothing to tear down can ignore this.
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: DrawSink + ?Sized> DrawSink for &mut S {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError> {
        (**self).draw(cmd)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

impl<S: DrawSink + ?Sized> DrawSink for Box<S> {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError> {
        (**self).draw(cmd)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// A sink that just remembers what it was asked to draw.
///
/// Clones share the same log, so you can give one away (to an interpreter, say) and keep
/// the other for looking at the results.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    cmds: Rc<RefCell<Vec<DrawCmd>>>,
}

impl RecordingSink {
    pub fn new() -> RecordingSink {
        RecordingSink::default()
    }

    pub fn commands(&self) -> Vec<DrawCmd> {
        self.cmds.borrow().clone()
    }

    /// All the segments drawn so far, as `(from, to)` pairs.
    pub fn lines(&self) -> Vec<(Point, Point)> {
        self.cmds
            .borrow()
            .iter()
            .filter_map(|cmd| match *cmd {
                DrawCmd::Line { from, to } => Some((from, to)),
                DrawCmd::Clear => None,
            })
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.cmds
            .borrow()
            .iter()
            .filter(|cmd| **cmd == DrawCmd::Clear)
            .count()
    }
}

impl DrawSink for RecordingSink {
    fn draw(&mut self, cmd: DrawCmd) -> Result<(), SinkError> {
        self.cmds.borrow_mut().push(cmd);
        Ok(())
    }
}
