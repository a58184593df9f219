//! The listener sees the reference squaring sequence whatever the fast path
//! returns.

use classgroup::{Discriminant, QuadraticForm};
use num_bigint::BigInt;
use num_traits::One;
use proptest::prelude::*;
use std::{
    sync::{atomic::AtomicBool, Arc, Mutex},
    time::Duration,
};
use vdf::{
    driver::{BatchOutcome, FastBatchSquare, IterationListener, SquaringDriver},
    fence::ProgressFence,
};

fn discriminant() -> Discriminant {
    let p: BigInt = (BigInt::one() << 127u32) - 1;
    Discriminant::new(-p).unwrap()
}

fn other_discriminant() -> Discriminant {
    let p: BigInt = (BigInt::one() << 89u32) - 1;
    Discriminant::new(-p).unwrap()
}

#[derive(Clone, Copy, Debug)]
enum Response {
    Correct(u64),
    Empty,
    TooMany,
    WrongDiscriminant,
    Unreduced,
    Corrupted,
    Unavailable,
}

fn response() -> impl Strategy<Value = Response> {
    prop_oneof![
        3 => (1u64..12).prop_map(Response::Correct),
        1 => Just(Response::Empty),
        1 => Just(Response::TooMany),
        1 => Just(Response::WrongDiscriminant),
        1 => Just(Response::Unreduced),
        1 => Just(Response::Corrupted),
        1 => Just(Response::Unavailable),
    ]
}

struct Scripted {
    script: Vec<Response>,
    next: usize,
}

fn squarings(form: &QuadraticForm, d: &Discriminant, n: u64) -> Vec<QuadraticForm> {
    let mut f = form.clone();
    (0..n)
        .map(|_| {
            f = f.square(d);
            f.clone()
        })
        .collect()
}

impl FastBatchSquare for Scripted {
    fn attempt(
        &mut self,
        form: &QuadraticForm,
        discriminant: &Discriminant,
        _done: u64,
        batch_size: u64,
    ) -> BatchOutcome {
        let response = self.script[self.next % self.script.len()];
        self.next += 1;
        match response {
            Response::Correct(n) => {
                BatchOutcome::Completed(squarings(form, discriminant, n.min(batch_size)))
            }
            Response::Empty => BatchOutcome::Completed(vec![]),
            Response::TooMany => {
                BatchOutcome::Completed(squarings(form, discriminant, batch_size + 1))
            }
            Response::WrongDiscriminant => {
                let other = other_discriminant();
                BatchOutcome::Completed(vec![QuadraticForm::generator(&other)])
            }
            Response::Unreduced => {
                let f = form.square(discriminant);
                // the same class, moved by x -> x + y
                let moved = QuadraticForm::from_coefficients_unchecked(
                    f.a().clone(),
                    f.b() + (f.a() << 1u32),
                    f.a() + f.b() + f.c(),
                );
                BatchOutcome::Completed(vec![moved])
            }
            Response::Corrupted => BatchOutcome::Corrupted,
            Response::Unavailable => BatchOutcome::Unavailable,
        }
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(u64, QuadraticForm)>>,
}

impl IterationListener for Recorder {
    fn on_iteration(&self, form: &QuadraticForm, iteration: u64) {
        self.seen.lock().unwrap().push((iteration, form.clone()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_driver_is_transparent(
        script in proptest::collection::vec(response(), 1..16),
        batch_size in 1u64..10,
        bound in 1u64..80,
    ) {
        let d = discriminant();
        let x = QuadraticForm::generator(&d);
        let recorder = Arc::new(Recorder::default());
        let fence = Arc::new(ProgressFence::new(Duration::from_millis(1)));
        let driver = SquaringDriver {
            discriminant: d.clone(),
            listener: recorder.clone(),
            fence: fence.clone(),
            stop: Arc::new(AtomicBool::new(false)),
            accelerator: Box::new(Scripted { script, next: 0 }),
            batch_size,
            bound: Some(bound),
        };
        let report = driver.run(x.clone()).unwrap();

        let expected = squarings(&x, &d, bound);
        let seen = recorder.seen.lock().unwrap();
        prop_assert_eq!(seen.len() as u64, bound);
        for (i, (iteration, form)) in seen.iter().enumerate() {
            prop_assert_eq!(*iteration, i as u64 + 1);
            prop_assert_eq!(form, &expected[i]);
        }
        prop_assert_eq!(report.iterations, bound);
        prop_assert_eq!(report.fast_iterations + report.slow_iterations, bound);
        prop_assert_eq!(&report.y, &expected[bound as usize - 1]);
        prop_assert_eq!(fence.current(), bound);
        prop_assert!(fence.is_closed());
    }
}
