use std::path::Path;

use tortoise::{kurbo::Point, DrawCmd, RecordingSink};
use tortoiselogo::{Env, EvalError};

const EPS: f64 = 1e-9;

#[derive(Default, Clone)]
pub struct TestCase {
    input: String,
    expected: String,
}

fn exec_one(s: &str) -> (Result<(), EvalError>, Env, Vec<DrawCmd>) {
    let prog = tortoiselogo::program(s).unwrap();
    let sink = RecordingSink::new();
    let mut env = Env::new(sink.clone());
    let res = prog.eval(&mut env).map(|_| ());
    (res, env, sink.commands())
}

fn nums<const N: usize>(s: &str) -> [f64; N] {
    let v: Vec<f64> = s.split_whitespace().map(|x| x.parse().unwrap()).collect();
    v.try_into().unwrap()
}

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < EPS
}

impl TestCase {
    fn exec(&self) {
        let (res, env, cmds) = exec_one(&self.input);
        res.unwrap();

        let mut expected_cmds = Vec::new();
        for line in self.expected.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "clear" {
                expected_cmds.push(DrawCmd::Clear);
            } else if let Some(rest) = line.strip_prefix("line ") {
                let [x1, y1, x2, y2] = nums(rest);
                expected_cmds.push(DrawCmd::Line {
                    from: Point::new(x1, y1),
                    to: Point::new(x2, y2),
                });
            } else if let Some(rest) = line.strip_prefix("pos ") {
                let [x, y] = nums(rest);
                let pos = env.turtle().position();
                assert!(close(pos, Point::new(x, y)), "{}: ended at {pos:?}", self.input);
            } else {
                panic!("bad expectation {line:?}");
            }
        }

        assert_eq!(cmds.len(), expected_cmds.len(), "{}: {cmds:?}", self.input);
        for (got, want) in cmds.iter().zip(&expected_cmds) {
            let ok = match (got, want) {
                (DrawCmd::Clear, DrawCmd::Clear) => true,
                (DrawCmd::Line { from: f0, to: t0 }, DrawCmd::Line { from: f1, to: t1 }) => {
                    close(*f0, *f1) && close(*t0, *t1)
                }
                _ => false,
            };
            assert!(ok, "{}: got {got:?}, expected {want:?}", self.input);
        }
    }

    fn exec_failure(&self) {
        let (res, _, _) = exec_one(&self.input);
        let err = res.unwrap_err();
        assert_eq!(err.to_string(), self.expected.trim());
    }
}

pub fn read_tests(path: impl AsRef<Path>) -> Vec<TestCase> {
    let text = std::fs::read_to_string(path).unwrap();
    let mut ret = Vec::new();
    let mut in_input = true;
    let mut cur = TestCase::default();

    fn separator_line(line: &str, ch: u8) -> bool {
        line.trim().len() >= 2 && line.trim().bytes().all(|c| c == ch)
    }

    for line in text.split_inclusive('\n') {
        if in_input {
            if separator_line(line, b'-') {
                in_input = false;
            } else {
                cur.input += line;
            }
        } else if separator_line(line, b'=') {
            in_input = true;
            ret.push(std::mem::take(&mut cur));
        } else {
            cur.expected += line;
        }
    }
    ret
}

#[test]
fn text_tests() {
    let tests = read_tests("tests/basic.txt");
    assert!(!tests.is_empty());
    for test in tests {
        test.exec();
    }
}

#[test]
fn exec_failures() {
    let tests = read_tests("tests/exec-failures.txt");
    assert!(!tests.is_empty());
    for test in tests {
        test.exec_failure();
    }
}
