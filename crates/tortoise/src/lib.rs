//! A Logo-style turtle that draws straight line segments.
//!
//! The turtle itself ([`TurtleState`]) is just a position, a heading and a pen. Every
//! operation that draws something hands a [`DrawCmd`] to a [`DrawSink`], which is
//! where the actual plotting happens.

use kurbo::{Point, Vec2};

pub mod gnuplot;
pub mod sink;

pub use kurbo;
pub use sink::{DrawCmd, DrawSink, RecordingSink, SinkError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PenState {
    Up,
    Down,
}

impl PenState {
    pub fn is_down(self) -> bool {
        self == PenState::Down
    }
}

/// The state of a turtle.
///
/// `(position, heading, pen)` is all there is: two turtles with equal state behave
/// identically from then on.
#[derive(Clone, Debug, PartialEq)]
pub struct TurtleState {
    pos: Point,
    // In radians, counter-clockwise from the positive x axis. This is the running sum of
    // every turn since the last reset, and it is never wrapped.
    heading: f64,
    pen: PenState,
}

impl Default for TurtleState {
    fn default() -> TurtleState {
        TurtleState::new()
    }
}

impl TurtleState {
    /// A turtle at the origin, facing along the positive x axis, with its pen down.
    pub fn new() -> TurtleState {
        TurtleState {
            pos: Point::ORIGIN,
            heading: 0.0,
            pen: PenState::Down,
        }
    }

    /// Clear the sink and put the turtle back in its initial state.
    ///
    /// If the sink refuses the clear, the turtle is left alone.
    pub fn reset<S: DrawSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SinkError> {
        sink.draw(DrawCmd::Clear)?;
        *self = TurtleState::new();
        log::debug!("reset turtle");
        Ok(())
    }

    /// Lift the pen to stop drawing.
    ///
    /// Returns whether the pen was down before.
    pub fn pen_up(&mut self) -> bool {
        self.set_pen(PenState::Up)
    }

    /// Lower the pen to start drawing.
    ///
    /// Returns whether the pen was down before.
    pub fn pen_down(&mut self) -> bool {
        self.set_pen(PenState::Down)
    }

    fn set_pen(&mut self, pen: PenState) -> bool {
        let was_down = self.pen.is_down();
        self.pen = pen;
        was_down
    }

    /// Turn counter-clockwise by `degrees` (clockwise if negative).
    ///
    /// Returns the new heading, in degrees.
    pub fn turn(&mut self, degrees: f64) -> f64 {
        self.heading += degrees.to_radians();
        self.heading_degrees()
    }

    /// Move `length` units along the current heading (backwards if `length` is negative).
    ///
    /// If the pen is down, the segment from the old position to the new one goes to the
    /// sink first; the position only changes once the sink has accepted it. Zero-length
    /// moves still draw a (degenerate) segment.
    ///
    /// Returns the new position.
    pub fn move_by<S: DrawSink + ?Sized>(
        &mut self,
        length: f64,
        sink: &mut S,
    ) -> Result<Point, SinkError> {
        let to = self.pos + Vec2::from_angle(self.heading) * length;
        if self.pen.is_down() {
            sink.draw(DrawCmd::Line { from: self.pos, to })?;
        }
        self.pos = to;
        Ok(to)
    }

    pub fn position(&self) -> Point {
        self.pos
    }

    /// The heading in radians.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn heading_degrees(&self) -> f64 {
        self.heading.to_degrees()
    }

    pub fn pen(&self) -> PenState {
        self.pen
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen.is_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < EPS
    }

    struct Broken;

    impl DrawSink for Broken {
        fn draw(&mut self, _cmd: DrawCmd) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[test]
    fn reset_from_anywhere() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.turn(33.0);
        t.move_by(4.0, &mut sink).unwrap();
        t.pen_up();

        t.reset(&mut sink).unwrap();
        assert_eq!(t.position(), Point::ORIGIN);
        assert_eq!(t.heading(), 0.0);
        assert!(t.is_pen_down());
        assert_eq!(t, TurtleState::new());
        assert_eq!(sink.commands().last(), Some(&DrawCmd::Clear));

        // Resetting twice is the same as resetting once, apart from the extra clear.
        t.reset(&mut sink).unwrap();
        assert_eq!(t, TurtleState::new());
        assert_eq!(sink.clears(), 2);
    }

    #[test]
    fn turns_accumulate_without_wrapping() {
        let mut t = TurtleState::new();
        let mut total = 0.0;
        for d in [90.0, 270.0, 45.5, -720.0, 400.0, 1e3] {
            total += d;
            let reported = t.turn(d);
            assert!((reported - total).abs() < EPS, "{reported} != {total}");
        }
        assert!((t.heading_degrees() - 1095.5).abs() < EPS);

        let mut t = TurtleState::new();
        assert!((t.turn(-30.0) + 30.0).abs() < EPS);
    }

    #[test]
    fn move_geometry() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.turn(30.0);
        let start = t.move_by(2.0, &mut sink).unwrap();
        let h = t.heading();

        for len in [1.5, -4.0, 0.0, 1e6] {
            let before = t.position();
            let after = t.move_by(len, &mut sink).unwrap();
            let expected = Point::new(before.x + len * h.cos(), before.y + len * h.sin());
            assert!(close(after, expected));
            assert_eq!(after, t.position());
        }
        assert!(close(start, Point::new(3f64.sqrt(), 1.0)));
    }

    #[test]
    fn pen_gates_drawing() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();

        for len in [1.0, 0.0, -2.0] {
            t.move_by(len, &mut sink).unwrap();
        }
        assert_eq!(sink.lines().len(), 3);
        // The zero-length move still draws.
        let (from, to) = sink.lines()[1];
        assert_eq!(from, to);

        t.pen_up();
        for len in [1.0, 0.0, -2.0] {
            t.move_by(len, &mut sink).unwrap();
        }
        assert_eq!(sink.lines().len(), 3);
        assert!(close(t.position(), Point::new(-2.0, 0.0)));
    }

    #[test]
    fn line_starts_at_the_old_position() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.move_by(2.0, &mut sink).unwrap();
        t.turn(90.0);
        t.move_by(1.0, &mut sink).unwrap();

        let lines = sink.lines();
        assert!(close(lines[1].0, Point::new(2.0, 0.0)));
        assert!(close(lines[1].1, Point::new(2.0, 1.0)));
    }

    #[test]
    fn pen_feedback() {
        let mut t = TurtleState::new();
        assert!(t.pen_up());
        assert!(!t.pen_down());

        // Setting the pen is unconditional.
        assert!(t.pen_down());
        assert!(t.is_pen_down());
        assert!(t.pen_up());
        assert!(!t.pen_up());
        assert_eq!(t.pen(), PenState::Up);
    }

    #[test]
    fn square() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.reset(&mut sink).unwrap();
        for _ in 0..4 {
            t.move_by(3.0, &mut sink).unwrap();
            t.turn(90.0);
        }

        let corners = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 3.0),
            Point::new(0.0, 0.0),
        ];
        let lines = sink.lines();
        assert_eq!(lines.len(), 4);
        for (i, (from, to)) in lines.iter().enumerate() {
            assert!(close(*from, corners[i]));
            assert!(close(*to, corners[i + 1]));
        }
        assert_eq!(sink.commands()[0], DrawCmd::Clear);
        assert!((t.heading_degrees() - 360.0).abs() < EPS);
        assert!(close(t.position(), Point::ORIGIN));
    }

    #[test]
    fn pen_up_skip() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.reset(&mut sink).unwrap();
        t.pen_up();
        let pos = t.move_by(5.0, &mut sink).unwrap();

        assert_eq!(sink.commands(), vec![DrawCmd::Clear]);
        assert_eq!(pos, Point::new(5.0, 0.0));
    }

    #[test]
    fn failed_draws_do_not_commit() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        t.turn(45.0);
        t.move_by(1.0, &mut sink).unwrap();
        let before = t.clone();

        assert!(matches!(t.move_by(3.0, &mut Broken), Err(SinkError::Closed)));
        assert_eq!(t, before);
        assert!(matches!(t.reset(&mut Broken), Err(SinkError::Closed)));
        assert_eq!(t, before);

        // With the pen up nothing needs to be drawn, so the sink isn't consulted.
        t.pen_up();
        assert!(t.move_by(3.0, &mut Broken).is_ok());
    }

    #[test]
    fn non_finite_input_propagates() {
        let mut sink = RecordingSink::new();
        let mut t = TurtleState::new();
        assert!(t.turn(f64::NAN).is_nan());
        let pos = t.move_by(1.0, &mut sink).unwrap();
        assert!(pos.x.is_nan() && pos.y.is_nan());
    }
}
