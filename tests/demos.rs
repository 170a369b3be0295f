use mila::{
    compile,
    ir::interp::{self, Config, Outcome},
};

#[track_caller]
fn run_demo(src: &str, input: &[i32]) -> Outcome {
    let module = compile(src).unwrap_or_else(|error| panic!("compilation failed: {error}"));
    module.verify().unwrap();
    interp::run(&module, input.iter().copied(), &Config::default()).unwrap()
}

#[test]
fn test_factorial() {
    let src = include_str!("../demos/factorial.mila");
    assert_eq!(run_demo(src, &[5]).output, [120]);
    assert_eq!(run_demo(src, &[0]).output, [1]);
    assert_eq!(run_demo(src, &[12]).output, [479_001_600]);
}

#[test]
fn test_arrays() {
    let outcome = run_demo(include_str!("../demos/arrays.mila"), &[]);
    assert_eq!(outcome.output, [-8, -7, -5, -4, -1, 0, 1, 4, 7, 8, -5]);
    assert_eq!(outcome.exit_code, 0);
}

#[test]
fn test_big() {
    let outcome = run_demo(include_str!("../demos/big.mila"), &[7, 3]);
    assert_eq!(
        outcome.output,
        [6, 343, 0, 1, 6765, 610, 25, 12, 6, 0, 3, 3, 2, 1, 2, 1]
    );
    assert_eq!(outcome.exit_code, 0);
}

#[test]
fn test_factorial_without_input() {
    let module = compile(include_str!("../demos/factorial.mila")).unwrap();
    let result = interp::run(&module, [], &Config::default());
    assert_eq!(result, Err(interp::Error::InputExhausted));
}
